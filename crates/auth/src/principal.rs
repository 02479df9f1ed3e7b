use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Authenticated caller identity (an email address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid email: {0:?}")]
    InvalidEmail(String),
}

impl Identity {
    /// Minimal shape check: non-empty local part and domain around one `@`.
    pub fn new(email: impl Into<String>) -> Result<Self, IdentityError> {
        let email = email.into().trim().to_string();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
                Ok(Self(email))
            }
            _ => Err(IdentityError::InvalidEmail(email)),
        }
    }

    pub fn email(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Identity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
