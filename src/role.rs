use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;

/// Role
///
/// The closed set of account roles, ordered by trust: `User < Developer < Admin`.
/// Developer and Admin are both "privileged" and bypass board ownership checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Developer,
    Admin,
}

impl Role {
    /// Every role. Used by routes open to any authenticated caller.
    pub const ALL: &'static [Role] = &[Role::User, Role::Developer, Role::Admin];

    /// Developer and Admin only.
    pub const PRIVILEGED: &'static [Role] = &[Role::Developer, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Developer => "Developer",
            Role::Admin => "Admin",
        }
    }

    /// Privileged roles skip ownership checks entirely.
    pub fn is_privileged(&self) -> bool {
        match self {
            Role::User => false,
            Role::Developer | Role::Admin => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Developer" => Ok(Role::Developer),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// Lets `#[sqlx(try_from = "String")]` decode the TEXT column straight into a Role.
impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_trust() {
        assert!(Role::User < Role::Developer);
        assert!(Role::Developer < Role::Admin);
    }

    #[test]
    fn only_developer_and_admin_are_privileged() {
        assert!(!Role::User.is_privileged());
        assert!(Role::Developer.is_privileged());
        assert!(Role::Admin.is_privileged());
        assert!(Role::PRIVILEGED.iter().all(Role::is_privileged));
    }

    #[test]
    fn parses_its_own_names() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), *role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn serializes_as_bare_name() {
        assert_eq!(serde_json::to_string(&Role::Developer).unwrap(), "\"Developer\"");
    }
}
