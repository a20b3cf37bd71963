//! Role-based access rules.
//!
//! A [`RoleGate`] is fixed when a route is registered and evaluated against
//! the role of an already-authenticated account on every request. It never
//! looks anything up and never mutates state.

use crate::types::Role;

/// Rejection produced when an account's role is outside the accepted set.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("role {role} is not permitted here (accepted: {accepted})")]
pub struct Forbidden {
    /// The role the account carried.
    pub role: String,
    /// Comma-separated accepted roles, for logging.
    pub accepted: String,
}

/// Accepts a request only when the account role is in a fixed set.
///
/// ```
/// use teeshop_core::{Role, RoleGate};
///
/// let gate = RoleGate::new(&[Role::ADMIN]);
/// assert!(gate.check(&Role::admin()).is_ok());
/// assert!(gate.check(&Role::user()).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGate {
    accepted: &'static [&'static str],
}

impl RoleGate {
    /// Create a gate accepting exactly the given role tags.
    #[must_use]
    pub const fn new(accepted: &'static [&'static str]) -> Self {
        Self { accepted }
    }

    /// Gate that admits only administrators.
    #[must_use]
    pub const fn admin() -> Self {
        Self::new(&[Role::ADMIN])
    }

    /// Gate that admits only managers.
    #[must_use]
    pub const fn manager() -> Self {
        Self::new(&[Role::MANAGER])
    }

    /// The accepted role tags.
    #[must_use]
    pub const fn accepted(&self) -> &'static [&'static str] {
        self.accepted
    }

    /// Whether `role` is a member of the accepted set.
    #[must_use]
    pub fn admits(&self, role: &Role) -> bool {
        self.accepted.contains(&role.as_str())
    }

    /// Check `role` against the accepted set.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` if the role is not accepted.
    pub fn check(&self, role: &Role) -> Result<(), Forbidden> {
        if self.admits(role) {
            Ok(())
        } else {
            Err(Forbidden {
                role: role.to_string(),
                accepted: self.accepted.join(","),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn role(tag: &str) -> Role {
        Role::parse(tag).unwrap()
    }

    #[test]
    fn test_admin_gate_denies_user_and_manager() {
        let gate = RoleGate::admin();
        assert!(gate.check(&role("user")).is_err());
        assert!(gate.check(&role("manager")).is_err());
        assert!(gate.check(&role("admin")).is_ok());
    }

    #[test]
    fn test_multi_role_gate() {
        let gate = RoleGate::new(&["admin", "manager"]);
        assert!(gate.admits(&role("admin")));
        assert!(gate.admits(&role("manager")));
        assert!(!gate.admits(&role("user")));
        assert!(!gate.admits(&role("support")));
    }

    #[test]
    fn test_empty_gate_denies_everyone() {
        let gate = RoleGate::new(&[]);
        assert!(!gate.admits(&role("admin")));
    }

    #[test]
    fn test_forbidden_reports_roles() {
        let err = RoleGate::manager().check(&role("user")).unwrap_err();
        assert_eq!(err.role, "user");
        assert_eq!(err.accepted, "manager");
    }
}
