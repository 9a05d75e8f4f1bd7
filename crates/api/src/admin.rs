//! Admin actions on the user table rows.

use serde::Serialize;
use tabula_access::{user_roles, Role};
use tracing::{info, warn};

use crate::storage::{delete_profile_picture, ObjectStore};
use crate::{ApiError, ApiResult, CreateUserRequest, IdentityProvider, Session, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowAction {
    ChangeRole,
    ImpersonateSession,
    RevokeSessions,
    Ban,
    RemoveUser,
}

impl RowAction {
    pub const ALL: [RowAction; 5] =
        [RowAction::ChangeRole, RowAction::ImpersonateSession, RowAction::RevokeSessions, RowAction::Ban, RowAction::RemoveUser];

    pub fn label(&self) -> &'static str {
        match self {
            RowAction::ChangeRole => "Change Role",
            RowAction::ImpersonateSession => "Impersonate Session",
            RowAction::RevokeSessions => "Terminate Sessions",
            RowAction::Ban => "Ban",
            RowAction::RemoveUser => "Remove User",
        }
    }

    /// Impersonation and banning are listed but not offered yet.
    pub fn enabled(&self) -> bool { !matches!(self, RowAction::ImpersonateSession | RowAction::Ban) }

    pub fn destructive(&self) -> bool { matches!(self, RowAction::Ban | RowAction::RemoveUser) }
}

/// Actions offered on `row` to `current`. The acting user's own row gets none.
pub fn row_actions(current: &User, row: &User) -> Vec<RowAction> {
    if current.id == row.id { return Vec::new(); }
    RowAction::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoleChange {
    Changed(User),
    NoChanges,
}

impl RoleChange {
    /// Feedback line for the host.
    pub fn message(&self, name: &str) -> String {
        match self {
            RoleChange::Changed(u) => {
                let role = u.role().map(|r| r.display_name()).unwrap_or_default();
                format!("{name}'s role has been successfully updated to {role}!")
            }
            RoleChange::NoChanges => format!("No changes were made to {name} role."),
        }
    }
}

async fn acting_on_other<P: IdentityProvider + ?Sized>(provider: &P, token: &str, target: &User) -> ApiResult<Session> {
    let me = provider.get_session(token).await?.ok_or_else(|| ApiError::Unauthorized("no session".into()))?;
    if me.user.id == target.id {
        warn!(user = %me.user.id, "admin: action on own account rejected");
        return Err(ApiError::Validation("admin actions cannot target the current user".into()));
    }
    Ok(me)
}

/// Set `target`'s role; an unchanged role is reported, not sent.
pub async fn change_user_role<P: IdentityProvider + ?Sized>(
    provider: &P,
    token: &str,
    target: &User,
    role: Role,
) -> ApiResult<RoleChange> {
    acting_on_other(provider, token, target).await?;
    if target.role() == Some(role) { return Ok(RoleChange::NoChanges); }
    let user = provider.set_role(token, &target.id, role).await?;
    Ok(RoleChange::Changed(user))
}

pub async fn revoke_user_sessions<P: IdentityProvider + ?Sized>(provider: &P, token: &str, target: &User) -> ApiResult<usize> {
    acting_on_other(provider, token, target).await?;
    provider.revoke_user_sessions(token, &target.id).await
}

/// Remove `target`, deleting the stored profile picture first.
pub async fn remove_user<P, S>(provider: &P, store: &S, token: &str, target: &User) -> ApiResult<()>
where
    P: IdentityProvider + ?Sized,
    S: ObjectStore + ?Sized,
{
    let me = acting_on_other(provider, token, target).await?;
    if let Some(image) = target.image.as_deref() {
        delete_profile_picture(store, image).await?;
    }
    provider.remove_user(token, &target.id).await?;
    info!(by = %me.user.id, user = %target.id, "admin: user removed");
    Ok(())
}

/// Create an account; without an explicit role the first non-admin role is used.
pub async fn create_user<P: IdentityProvider + ?Sized>(
    provider: &P,
    token: &str,
    mut request: CreateUserRequest,
) -> ApiResult<User> {
    if request.role.is_none() {
        request.role = user_roles().first().copied();
    }
    provider.create_user(token, request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str, role: &str) -> User {
        User {
            id: id.into(),
            name: id.into(),
            email: format!("{id}@x.io"),
            image: None,
            role: Some(role.into()),
            email_verified: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn own_row_has_no_actions() {
        let me = user("me", "admin");
        assert!(row_actions(&me, &me).is_empty());
        let actions = row_actions(&me, &user("other", "user"));
        assert_eq!(actions.len(), 5);
        assert!(!RowAction::Ban.enabled());
        assert!(RowAction::RemoveUser.destructive());
    }

    #[test]
    fn role_change_messages() {
        assert_eq!(RoleChange::NoChanges.message("Rose"), "No changes were made to Rose role.");
        let changed = RoleChange::Changed(user("rose", "customRoleExample"));
        assert_eq!(changed.message("Rose"), "Rose's role has been successfully updated to Custom Role Example!");
    }
}
