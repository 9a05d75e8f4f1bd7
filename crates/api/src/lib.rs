//! Tabula collaborator contracts (in-process).
//!
//! Host pages depend on two external services: an identity/session provider and an
//! object store. Both are async traits here, with in-memory implementations used by
//! the CLI and tests.

#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabula_access::{authorize, Authorized, Role, RouteId, SessionRole};
use tabula_core::SortDirection;

pub mod admin;
pub mod columns;
pub mod identity;
pub mod media;
pub mod storage;
pub mod validate;

pub use admin::{change_user_role, create_user, remove_user, revoke_user_sessions, row_actions, RoleChange, RowAction};
pub use columns::user_columns;
pub use identity::InMemoryIdentity;
pub use media::{validate_files, FileCategory, MediaFile};
pub use storage::{
    change_profile_picture, delete_profile_picture, remove_profile_picture, upload_all, InMemoryObjectStore, ObjectStore,
    StorageConfig, Upload,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: Option<String>,
    pub role: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> { self.role.as_deref().and_then(Role::from_code) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// The current session together with its user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session: SessionInfo,
    pub user: User,
}

impl SessionRole for Session {
    fn role(&self) -> Option<&str> { self.user.role.as_deref() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserSortField {
    Name,
    Email,
    #[default]
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    pub sort_by: UserSortField,
    pub sort_direction: SortDirection,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Newest users first.
impl Default for ListUsersQuery {
    fn default() -> Self {
        Self { sort_by: UserSortField::CreatedAt, sort_direction: SortDirection::Desc, limit: None, offset: 0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub is_agree: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub revoke_other_sessions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    /// Defaults to the first non-admin role.
    pub role: Option<Role>,
}

/// Partial profile update. `image: Some(None)` clears the picture.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub image: Option<Option<String>>,
}

/// API errors suitable for transport over RPC later.
#[derive(Debug, thiserror::Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("not_found: {0}")]
    NotFound(String),
    #[error("internal: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<tabula_access::AccessError> for ApiError {
    fn from(e: tabula_access::AccessError) -> Self {
        match e {
            tabula_access::AccessError::NotFound { path } => ApiError::NotFound(path),
            other => ApiError::Validation(other.to_string()),
        }
    }
}

/// Identity/session provider. Every call acting on behalf of someone takes the
/// caller's session token.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `None` for unknown or expired tokens.
    async fn get_session(&self, token: &str) -> ApiResult<Option<Session>>;

    async fn list_users(&self, token: &str, query: ListUsersQuery) -> ApiResult<Vec<User>>;

    /// Sessions of the caller.
    async fn list_sessions(&self, token: &str) -> ApiResult<Vec<SessionInfo>>;

    async fn revoke_session(&self, token: &str, target_token: &str) -> ApiResult<()>;

    /// Revoke every session of the caller except the current one; returns how many.
    async fn revoke_other_sessions(&self, token: &str) -> ApiResult<usize>;

    async fn revoke_user_sessions(&self, token: &str, user_id: &str) -> ApiResult<usize>;

    async fn set_role(&self, token: &str, user_id: &str, role: Role) -> ApiResult<User>;

    async fn create_user(&self, token: &str, request: CreateUserRequest) -> ApiResult<User>;

    async fn remove_user(&self, token: &str, user_id: &str) -> ApiResult<()>;

    async fn delete_current_user(&self, token: &str) -> ApiResult<()>;

    async fn update_user(&self, token: &str, update: UpdateUserRequest) -> ApiResult<User>;

    async fn change_password(&self, token: &str, request: ChangePasswordRequest) -> ApiResult<()>;

    async fn sign_in(&self, request: SignInRequest) -> ApiResult<Session>;

    /// Registers without signing in.
    async fn sign_up(&self, request: SignUpRequest) -> ApiResult<User>;

    async fn sign_out(&self, token: &str) -> ApiResult<()>;

    /// Start a social sign-in; returns the provider redirect URL.
    async fn sign_in_social(&self, provider: &str) -> ApiResult<String>;
}

/// Resolve the caller's session and run it through the route gate.
pub async fn authorized_session<P: IdentityProvider + ?Sized>(
    provider: &P,
    token: &str,
    route: RouteId,
) -> ApiResult<Authorized<Session>> {
    let session = provider.get_session(token).await?;
    Ok(authorize(route, session)?)
}
