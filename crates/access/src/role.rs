//! Roles and their permission statements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tabula_core::format::capitalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "customRoleExample")]
    CustomRoleExample,
}

/// Roles treated as administrators. Holding every permission does not make a role an admin.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin];

/// One resource with the actions a role may perform on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub resource: &'static str,
    pub actions: &'static [&'static str],
}

/// Every statement known to the access layer.
pub const STATEMENTS: &[Statement] = &[
    Statement {
        resource: "user",
        actions: &["create", "list", "set-role", "ban", "impersonate", "delete", "set-password"],
    },
    Statement { resource: "session", actions: &["list", "revoke", "delete"] },
    Statement { resource: "project", actions: &["create", "read", "update", "delete"] },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoleMeta {
    pub display_name: Option<&'static str>,
    pub icon: &'static str,
    pub description: &'static str,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Admin, Role::CustomRoleExample];

    #[inline]
    pub const fn code(&self) -> &'static str {
        use Role::*;
        match self {
            User => "user",
            Admin => "admin",
            CustomRoleExample => "customRoleExample",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> { Self::ALL.into_iter().find(|r| r.code() == code) }

    pub const fn meta(&self) -> RoleMeta {
        use Role::*;
        match self {
            User => RoleMeta {
                display_name: None,
                icon: "user-round",
                description: "Standard user with basic access and permissions.",
            },
            Admin => RoleMeta {
                display_name: None,
                icon: "user-round-check",
                description: "Administrator with full access and management capabilities.",
            },
            CustomRoleExample => RoleMeta {
                display_name: Some("Custom Role Example"),
                icon: "flask-conical",
                description: "A sample custom role for demonstration or testing purposes.",
            },
        }
    }

    /// Display name from metadata, else the capitalized code.
    pub fn display_name(&self) -> String {
        self.meta().display_name.map(str::to_string).unwrap_or_else(|| capitalize(self.code()))
    }

    pub fn statements(&self) -> &'static [Statement] {
        use Role::*;
        match self {
            User => &[Statement { resource: "project", actions: &["create"] }],
            Admin => STATEMENTS,
            CustomRoleExample => &[Statement { resource: "project", actions: &["create", "read"] }],
        }
    }

    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        self.statements().iter().any(|s| s.resource == resource && s.actions.contains(&action))
    }

    #[inline]
    pub fn is_admin(&self) -> bool { ADMIN_ROLES.contains(self) }
}

/// All roles that are not admin roles, in declaration order.
pub fn user_roles() -> Vec<Role> { Role::ALL.into_iter().filter(|r| !r.is_admin()).collect() }

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.code()) }
}

impl FromStr for Role {
    type Err = crate::AccessError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| crate::AccessError::UnknownRole(s.to_string()))
    }
}
