//! Account role tags.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a role tag is malformed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role tag {0:?}: use 1-32 lowercase letters, digits or underscores")]
pub struct RoleError(pub String);

/// A role tag attached to an account.
///
/// Roles are an open set: administrators may assign any well-formed tag, and
/// routes decide which tags they accept. The tags the storefront itself
/// routes on are [`Role::USER`], [`Role::ADMIN`] and [`Role::MANAGER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Role(String);

impl Role {
    /// Default role for self-registered accounts.
    pub const USER: &'static str = "user";
    /// Full catalog, order and account administration.
    pub const ADMIN: &'static str = "admin";
    /// Read access to the customer list.
    pub const MANAGER: &'static str = "manager";

    const MAX_LENGTH: usize = 32;

    /// Parse a role tag.
    ///
    /// # Errors
    ///
    /// Returns `RoleError` if the tag is empty, too long, or contains
    /// anything other than lowercase ASCII letters, digits and underscores.
    pub fn parse(s: &str) -> Result<Self, RoleError> {
        let s = s.trim();
        let well_formed = !s.is_empty()
            && s.len() <= Self::MAX_LENGTH
            && s.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if well_formed {
            Ok(Self(s.to_owned()))
        } else {
            Err(RoleError(s.to_owned()))
        }
    }

    /// The default `user` role.
    #[must_use]
    pub fn user() -> Self {
        Self(Self::USER.to_owned())
    }

    /// The `admin` role.
    #[must_use]
    pub fn admin() -> Self {
        Self(Self::ADMIN.to_owned())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::user()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Role {
    type Error = RoleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_user() {
        assert_eq!(Role::default().as_str(), "user");
    }

    #[test]
    fn test_open_set_accepts_new_tags() {
        assert_eq!(Role::parse("support_agent").unwrap().as_str(), "support_agent");
        assert_eq!(Role::parse(" manager ").unwrap().as_str(), "manager");
    }

    #[test]
    fn test_rejects_malformed_tags() {
        assert!(Role::parse("").is_err());
        assert!(Role::parse("Admin").is_err());
        assert!(Role::parse("super-admin").is_err());
        assert!(Role::parse(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_deserialize_rejects_malformed() {
        assert!(serde_json::from_str::<Role>("\"ADMIN\"").is_err());
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::admin());
    }
}
