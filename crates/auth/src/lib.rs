//! `beyondwork-auth`: authentication/authorization boundary.
//!
//! Credential issuance lives with the external identity provider. This crate
//! only turns an already-issued bearer token into a trusted
//! [`CallerIdentity`] and answers role questions about it. It is decoupled
//! from HTTP and storage.

pub mod claims;
pub mod principal;
pub mod roles;
pub mod verifier;

pub use claims::{TokenClaims, TokenValidationError, validate_claims};
pub use principal::CallerIdentity;
pub use roles::Role;
pub use verifier::{Hs256TokenVerifier, TokenError, TokenVerifier};
