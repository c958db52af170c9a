//! Bearer token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use thiserror::Error;

use crate::claims::{TokenClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed or unsigned token: {0}")]
    Decode(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Turns a bearer credential into verified claims.
///
/// Implementations are the seam to the external identity provider; the rest
/// of the system only sees the resulting claims.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError>;
}

/// HS256 shared-secret verifier.
pub struct Hs256TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256TokenVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time checks run in `validate_claims`, which reads our own RFC 3339 fields.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl TokenVerifier for Hs256TokenVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| TokenError::Decode(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beyondwork_core::UserId;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header};

    use crate::Role;

    fn mint(secret: &str, claims: &TokenClaims) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>) -> TokenClaims {
        TokenClaims {
            sub: UserId::new("u-42"),
            role: Role::CorporateAdmin,
            issued_at: now - Duration::seconds(5),
            expires_at: now + Duration::minutes(10),
        }
    }

    #[test]
    fn verifies_token_signed_with_same_secret() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now));
        let verified = Hs256TokenVerifier::new("s3cret").verify(&token, now).unwrap();
        assert_eq!(verified.sub, UserId::new("u-42"));
        assert_eq!(verified.role, Role::CorporateAdmin);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_token() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now));
        assert!(matches!(
            Hs256TokenVerifier::new("other").verify(&token, now),
            Err(TokenError::Decode(_))
        ));
        assert_eq!(
            Hs256TokenVerifier::new("s3cret").verify(&token, now + Duration::hours(1)),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }
}
