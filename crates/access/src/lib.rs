//! Tabula access layer: roles, permission statements, route metadata, the role gate
//! consumed by host pages, and role-filtered navigation.

#![forbid(unsafe_code)]

pub mod menu;
pub mod role;
pub mod route;

pub use menu::{dashboard_menu, menu_for_role, MenuItem, MenuSection, SubMenu};
pub use role::{user_roles, Role, RoleMeta, Statement, ADMIN_ROLES, STATEMENTS};
pub use route::{
    authorize, page_title, redirect_for, Authorized, RouteAccess, RouteId, RouteMeta, SessionRole, PROTECTED_PATH,
    SIGN_IN_PATH,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AccessError {
    /// Deliberately indistinguishable from a missing page.
    #[error("not found: {path}")]
    NotFound { path: String },
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("unknown route: {0}")]
    UnknownRoute(String),
}
