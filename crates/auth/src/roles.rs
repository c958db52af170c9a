use serde::{Deserialize, Serialize};

/// Application role, ordered by privilege.
///
/// `User < CorporateAdmin < SuperAdmin`. Unknown role names coming from a
/// token or a profile degrade to [`Role::User`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    User,
    CorporateAdmin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::CorporateAdmin => "CORPORATE_ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Lenient parse used for claims and configuration.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Role::SuperAdmin,
            "CORPORATE_ADMIN" => Role::CorporateAdmin,
            _ => Role::User,
        }
    }

    /// Whether this role grants at least the privileges of `required`.
    pub fn has_at_least(&self, required: Role) -> bool {
        *self >= required
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
