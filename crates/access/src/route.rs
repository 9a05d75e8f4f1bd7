//! Route metadata and the role gate.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::role::Role;
use crate::AccessError;

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const PROTECTED_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteId {
    SignIn,
    Dashboard,
    Profile,
    Account,
}

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAccess {
    All,
    Roles(&'static [Role]),
}

impl RouteAccess {
    pub fn allows(&self, role: &str) -> bool {
        match self {
            RouteAccess::All => true,
            RouteAccess::Roles(set) => Role::from_code(role).map(|r| set.contains(&r)).unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteMeta {
    pub path: &'static str,
    pub display_name: &'static str,
    /// `None` for public routes; the gate never admits them.
    pub access: Option<RouteAccess>,
}

impl RouteId {
    pub const ALL: [RouteId; 4] = [RouteId::SignIn, RouteId::Dashboard, RouteId::Profile, RouteId::Account];

    pub const fn key(&self) -> &'static str {
        match self {
            RouteId::SignIn => "signIn",
            RouteId::Dashboard => "dashboard",
            RouteId::Profile => "profile",
            RouteId::Account => "account",
        }
    }

    pub const fn meta(&self) -> RouteMeta {
        match self {
            RouteId::SignIn => RouteMeta { path: SIGN_IN_PATH, display_name: "Sign In", access: None },
            RouteId::Dashboard => RouteMeta { path: PROTECTED_PATH, display_name: "Dashboard", access: Some(RouteAccess::All) },
            RouteId::Profile => RouteMeta {
                path: "/dashboard/profile",
                display_name: "My Profile",
                access: Some(RouteAccess::All),
            },
            RouteId::Account => RouteMeta {
                path: "/dashboard/account",
                display_name: "Users",
                access: Some(RouteAccess::Roles(&[Role::Admin])),
            },
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        Self::ALL.into_iter().find(|r| r.meta().path == path)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.key()) }
}

/// Accepts the route key (`account`) or its path (`/dashboard/account`).
impl FromStr for RouteId {
    type Err = AccessError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.key().eq_ignore_ascii_case(s))
            .or_else(|| Self::from_path(s))
            .ok_or_else(|| AccessError::UnknownRoute(s.to_string()))
    }
}

/// Anything the identity layer hands back as "the current session".
pub trait SessionRole {
    fn role(&self) -> Option<&str>;
}

impl SessionRole for Role {
    fn role(&self) -> Option<&str> { Some(self.code()) }
}

impl<S: SessionRole + ?Sized> SessionRole for &S {
    fn role(&self) -> Option<&str> { (**self).role() }
}

#[derive(Debug, Clone)]
pub struct Authorized<S> {
    pub session: S,
    pub route: RouteMeta,
}

/// Admit `session` to `route` or signal not-found. Public routes, missing sessions,
/// sessions without a role and roles outside the route's set are all not-found.
pub fn authorize<S: SessionRole>(route: RouteId, session: Option<S>) -> Result<Authorized<S>, AccessError> {
    let meta = route.meta();
    let not_found = || AccessError::NotFound { path: meta.path.to_string() };
    let Some(access) = meta.access else {
        debug!(route = %route, "route carries no role metadata");
        return Err(not_found());
    };
    let Some(session) = session else {
        debug!(route = %route, "no session");
        return Err(not_found());
    };
    match session.role() {
        Some(role) if access.allows(role) => Ok(Authorized { session, route: meta }),
        role => {
            debug!(route = %route, role = role.unwrap_or("-"), "role not allowed");
            Err(not_found())
        }
    }
}

/// Redirect for a request path. Only `/sign-in` and `/dashboard/**` are guarded.
pub fn redirect_for(path: &str, has_session: bool) -> Option<&'static str> {
    let guarded = path == SIGN_IN_PATH
        || path == PROTECTED_PATH
        || path.strip_prefix(PROTECTED_PATH).is_some_and(|rest| rest.starts_with('/'));
    if !guarded { return None; }
    let on_sign_in = path.starts_with(SIGN_IN_PATH);
    match (has_session, on_sign_in) {
        (false, false) => Some(SIGN_IN_PATH),
        (true, true) => Some(PROTECTED_PATH),
        _ => None,
    }
}

/// `"<display name> | <app>"`.
pub fn page_title(route: RouteId, app_name: &str) -> String { format!("{} | {}", route.meta().display_name, app_name) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_resolve_by_key_and_path() {
        assert_eq!("account".parse::<RouteId>().unwrap(), RouteId::Account);
        assert_eq!("/dashboard/profile/".parse::<RouteId>().unwrap(), RouteId::Profile);
        assert_eq!(RouteId::from_path("/dashboard"), Some(RouteId::Dashboard));
        assert!("/nowhere".parse::<RouteId>().is_err());
    }

    #[test]
    fn access_sets() {
        assert!(RouteAccess::All.allows("anything"));
        let admin_only = RouteAccess::Roles(&[Role::Admin]);
        assert!(admin_only.allows("admin"));
        assert!(!admin_only.allows("user"));
        assert!(!admin_only.allows("ghost"));
    }

    #[test]
    fn redirects() {
        assert_eq!(redirect_for("/dashboard/account", false), Some("/sign-in"));
        assert_eq!(redirect_for("/dashboard", false), Some("/sign-in"));
        assert_eq!(redirect_for("/sign-in", true), Some("/dashboard"));
        assert_eq!(redirect_for("/sign-in", false), None);
        assert_eq!(redirect_for("/dashboard/profile", true), None);
        assert_eq!(redirect_for("/", false), None);
        assert_eq!(redirect_for("/dashboards", false), None);
    }

    #[test]
    fn titles() {
        assert_eq!(page_title(RouteId::Account, "tabula"), "Users | tabula");
        assert_eq!(page_title(RouteId::Profile, "tabula"), "My Profile | tabula");
    }
}
