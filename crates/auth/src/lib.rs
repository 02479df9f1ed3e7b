//! `sprintspace-auth` — token issuing/validation and ownership checks.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod principal;
pub mod token;

pub use authorize::{AuthzError, ensure_owner};
pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use credentials::StaticCredentials;
pub use principal::{Identity, IdentityError};
pub use token::{Hs256JwtCodec, IssuedToken, JwtValidator, TokenError};
