use thiserror::Error;

use crate::Identity;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: {caller} does not own this record")]
    NotOwner { caller: String },
}

/// Record-ownership rule: only the owner may mutate a record.
///
/// Emails compare ASCII case-insensitively.
///
/// - No IO
/// - No panics
pub fn ensure_owner(identity: &Identity, owner_email: &str) -> Result<(), AuthzError> {
    if identity.email().eq_ignore_ascii_case(owner_email.trim()) {
        Ok(())
    } else {
        Err(AuthzError::NotOwner {
            caller: identity.email().to_string(),
        })
    }
}
