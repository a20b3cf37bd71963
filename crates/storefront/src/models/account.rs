//! Account domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use teeshop_core::{AccountId, Email, ImageRef, Role};

/// Longest accepted display name, in characters.
pub const MAX_NAME_LENGTH: usize = 40;

/// A registered account.
///
/// The password hash and reset-token state never leave the repository, so
/// this type is safe to serialize straight into a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub role: Role,
    pub photo: ImageRef,
    pub created_at: DateTime<Utc>,
}

/// Trim and validate a display name.
///
/// # Errors
///
/// Returns a client-facing message if the name is blank or too long.
pub fn validate_name(name: &str) -> Result<String, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required".to_owned());
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        ));
    }
    Ok(name.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ada  ").unwrap(), "Ada");
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(41)).is_err());
        assert!(validate_name(&"é".repeat(40)).is_ok());
    }

    #[test]
    fn test_serializes_without_secrets() {
        let account = Account {
            id: AccountId::new(7),
            name: "Ada".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            role: Role::user(),
            photo: ImageRef {
                id: "users/ada".to_owned(),
                secure_url: "https://res.cloudinary.com/demo/users/ada.jpg".to_owned(),
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["photo"]["id"], "users/ada");
        assert!(json.get("password").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
