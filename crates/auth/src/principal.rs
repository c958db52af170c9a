use serde::{Deserialize, Serialize};

use beyondwork_core::UserId;

use crate::{Role, TokenClaims};

/// Verified identity of the caller of a protected operation.
///
/// Downstream code trusts this value as-is; it is only ever built from claims
/// that passed [`crate::TokenVerifier::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub role: Role,
}

impl CallerIdentity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn has_at_least(&self, required: Role) -> bool {
        self.role.has_at_least(required)
    }
}

impl From<TokenClaims> for CallerIdentity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
        }
    }
}
