use sprintspace_auth::Identity;

/// Authenticated caller for a request.
///
/// Inserted into request extensions by the auth guard; present on every
/// protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity: Identity,
}

impl PrincipalContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn email(&self) -> &str {
        self.identity.email()
    }
}
