//! In-memory identity/session provider.

use std::cmp::Ordering;

use chrono::{Duration, Utc};
use tabula_access::{user_roles, Role};
use tabula_core::SortDirection;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::validate;
use crate::{
    ApiError, ApiResult, ChangePasswordRequest, CreateUserRequest, IdentityProvider, ListUsersQuery, Session,
    SessionInfo, SignInRequest, SignUpRequest, UpdateUserRequest, User, UserSortField,
};

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: Vec<Account>,
    sessions: Vec<SessionInfo>,
}

impl Inner {
    fn account(&self, user_id: &str) -> Option<&Account> { self.accounts.iter().find(|a| a.user.id == user_id) }

    fn account_mut(&mut self, user_id: &str) -> Option<&mut Account> {
        self.accounts.iter_mut().find(|a| a.user.id == user_id)
    }

    fn email_taken(&self, email: &str) -> bool { self.accounts.iter().any(|a| a.user.email == email) }

    fn session(&self, token: &str) -> Option<Session> {
        let now = Utc::now();
        let info = self.sessions.iter().find(|s| s.token == token && s.expires_at > now)?;
        let account = self.account(&info.user_id)?;
        Some(Session { session: info.clone(), user: account.user.clone() })
    }

    fn caller(&self, token: &str) -> ApiResult<Session> {
        self.session(token).ok_or_else(|| ApiError::Unauthorized("no session".into()))
    }

    fn remove_account(&mut self, user_id: &str) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.user.id != user_id);
        self.sessions.retain(|s| s.user_id != user_id);
        self.accounts.len() != before
    }
}

fn require(session: &Session, resource: &str, action: &str) -> ApiResult<()> {
    let allowed = session.user.role().map(|r| r.has_permission(resource, action)).unwrap_or(false);
    if allowed { return Ok(()); }
    warn!(user = %session.user.id, resource, action, "identity: permission denied");
    Err(ApiError::Unauthorized(format!("missing permission {resource}:{action}")))
}

fn new_user(name: String, email: String, role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4().simple().to_string(),
        name,
        email,
        image: None,
        role: Some(role.code().to_string()),
        email_verified: false,
        created_at: now,
        updated_at: now,
    }
}

fn compare_users(a: &User, b: &User, field: UserSortField) -> Ordering {
    match field {
        UserSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        UserSortField::Email => a.email.cmp(&b.email),
        UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        UserSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
    }
}

/// Accounts and sessions kept in memory behind an async lock.
#[derive(Debug)]
pub struct InMemoryIdentity {
    inner: RwLock<Inner>,
    session_ttl: Duration,
    /// (provider, authorize URL)
    social_providers: Vec<(String, String)>,
}

impl Default for InMemoryIdentity {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            session_ttl: Duration::days(7),
            social_providers: vec![("github".into(), "https://github.com/login/oauth/authorize".into())],
        }
    }
}

/// Demo accounts: (name, email, role, days since creation, has picture).
const DEMO_USERS: &[(&str, &str, Role, i64, bool)] = &[
    ("Admin", "admin@tabula.dev", Role::Admin, 120, true),
    ("Rose Marie", "rose@tabula.dev", Role::User, 90, true),
    ("Lily Evans", "lily@tabula.dev", Role::User, 75, false),
    ("Ambrose Bierce", "ambrose@tabula.dev", Role::CustomRoleExample, 60, false),
    ("Marcus Wright", "marcus@tabula.dev", Role::User, 45, true),
    ("Nadia Rahman", "nadia@tabula.dev", Role::Admin, 40, false),
    ("Budi Santoso", "budi@tabula.dev", Role::User, 33, false),
    ("Chen Wei", "chen@tabula.dev", Role::User, 21, true),
    ("Priya Nair", "priya@tabula.dev", Role::CustomRoleExample, 14, false),
    ("Tomas Novak", "tomas@tabula.dev", Role::User, 9, false),
    ("Hana Sato", "hana@tabula.dev", Role::User, 4, true),
    ("Oliver Grant", "oliver@tabula.dev", Role::User, 1, false),
];

pub const DEMO_PASSWORD: &str = "password123";

impl InMemoryIdentity {
    pub fn new() -> Self { Self::default() }

    /// Seeded with a fixed set of demo accounts, all using `DEMO_PASSWORD`.
    pub fn with_demo_users() -> Self { Self::with_users(demo_users(), DEMO_PASSWORD) }

    /// Seed existing users (e.g. loaded from a file) sharing one password. Emails are
    /// stored trimmed and lowercased to match how sign-in normalizes them.
    pub fn with_users(users: Vec<User>, password: &str) -> Self {
        let accounts = users
            .into_iter()
            .map(|mut user| {
                user.email = user.email.trim().to_lowercase();
                Account { user, password: password.to_string() }
            })
            .collect();
        Self { inner: RwLock::new(Inner { accounts, sessions: Vec::new() }), ..Self::default() }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Every account, unsorted and unchecked. Hosts use it to build tables.
    pub async fn users(&self) -> Vec<User> { self.inner.read().await.accounts.iter().map(|a| a.user.clone()).collect() }

    fn open_session(&self, inner: &mut Inner, user_id: &str) -> SessionInfo {
        let now = Utc::now();
        let info = SessionInfo {
            id: Uuid::new_v4().simple().to_string(),
            token: Uuid::new_v4().simple().to_string(),
            user_id: user_id.to_string(),
            expires_at: now + self.session_ttl,
            created_at: now,
            ip_address: None,
            user_agent: None,
        };
        inner.sessions.push(info.clone());
        info
    }
}

/// Users from `DEMO_USERS`, with creation dates relative to now.
pub fn demo_users() -> Vec<User> {
    let now = Utc::now();
    DEMO_USERS
        .iter()
        .enumerate()
        .map(|(i, (name, email, role, age_days, picture))| {
            let created = now - Duration::days(*age_days);
            let slug = email.split('@').next().unwrap_or(*email);
            User {
                id: format!("user-{:02}", i + 1),
                name: name.to_string(),
                email: email.to_string(),
                image: picture.then(|| format!("http://localhost:9000/tabula/user-{:02}_{slug}.png", i + 1)),
                role: Some(role.code().to_string()),
                email_verified: true,
                created_at: created,
                updated_at: created + Duration::days(age_days / 3),
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn get_session(&self, token: &str) -> ApiResult<Option<Session>> { Ok(self.inner.read().await.session(token)) }

    async fn list_users(&self, token: &str, query: ListUsersQuery) -> ApiResult<Vec<User>> {
        let inner = self.inner.read().await;
        require(&inner.caller(token)?, "user", "list")?;
        let mut users: Vec<User> = inner.accounts.iter().map(|a| a.user.clone()).collect();
        users.sort_by(|a, b| {
            let o = compare_users(a, b, query.sort_by);
            if query.sort_direction == SortDirection::Desc { o.reverse() } else { o }
        });
        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(users.into_iter().skip(query.offset).take(limit).collect())
    }

    async fn list_sessions(&self, token: &str) -> ApiResult<Vec<SessionInfo>> {
        let inner = self.inner.read().await;
        let me = inner.caller(token)?;
        let now = Utc::now();
        Ok(inner.sessions.iter().filter(|s| s.user_id == me.user.id && s.expires_at > now).cloned().collect())
    }

    async fn revoke_session(&self, token: &str, target_token: &str) -> ApiResult<()> {
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        let before = inner.sessions.len();
        inner.sessions.retain(|s| !(s.token == target_token && s.user_id == me.user.id));
        if inner.sessions.len() == before { return Err(ApiError::NotFound("session".into())); }
        info!(user = %me.user.id, "identity: session revoked");
        Ok(())
    }

    async fn revoke_other_sessions(&self, token: &str) -> ApiResult<usize> {
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.user_id != me.user.id || s.token == token);
        let revoked = before - inner.sessions.len();
        info!(user = %me.user.id, revoked, "identity: other sessions revoked");
        Ok(revoked)
    }

    async fn revoke_user_sessions(&self, token: &str, user_id: &str) -> ApiResult<usize> {
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        require(&me, "session", "revoke")?;
        if inner.account(user_id).is_none() { return Err(ApiError::NotFound(format!("user {user_id}"))); }
        let before = inner.sessions.len();
        inner.sessions.retain(|s| s.user_id != user_id);
        let revoked = before - inner.sessions.len();
        info!(by = %me.user.id, user = user_id, revoked, "identity: user sessions revoked");
        Ok(revoked)
    }

    async fn set_role(&self, token: &str, user_id: &str, role: Role) -> ApiResult<User> {
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        require(&me, "user", "set-role")?;
        let account = inner.account_mut(user_id).ok_or_else(|| ApiError::NotFound(format!("user {user_id}")))?;
        account.user.role = Some(role.code().to_string());
        account.user.updated_at = Utc::now();
        info!(by = %me.user.id, user = user_id, role = %role, "identity: role set");
        Ok(account.user.clone())
    }

    async fn create_user(&self, token: &str, request: CreateUserRequest) -> ApiResult<User> {
        let name = validate::name(&request.name)?;
        let email = validate::email(&request.email)?;
        let password = validate::password(&request.password)?;
        validate::confirmed(&request.password, &request.confirm_password)?;
        let role = match request.role {
            Some(r) => r,
            None => user_roles().first().copied().ok_or_else(|| ApiError::Internal("no non-admin role".into()))?,
        };

        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        require(&me, "user", "create")?;
        if inner.email_taken(&email) { return Err(ApiError::Conflict(format!("user with email {email} already exists"))); }
        let user = new_user(name, email, role);
        inner.accounts.push(Account { user: user.clone(), password });
        info!(by = %me.user.id, user = %user.id, role = %role, "identity: user created");
        Ok(user)
    }

    async fn remove_user(&self, token: &str, user_id: &str) -> ApiResult<()> {
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        require(&me, "user", "delete")?;
        if !inner.remove_account(user_id) { return Err(ApiError::NotFound(format!("user {user_id}"))); }
        info!(by = %me.user.id, user = user_id, "identity: user removed");
        Ok(())
    }

    async fn delete_current_user(&self, token: &str) -> ApiResult<()> {
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        inner.remove_account(&me.user.id);
        info!(user = %me.user.id, "identity: account deleted");
        Ok(())
    }

    async fn update_user(&self, token: &str, update: UpdateUserRequest) -> ApiResult<User> {
        let name = update.name.as_deref().map(validate::name).transpose()?;
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        let account = inner.account_mut(&me.user.id).ok_or_else(|| ApiError::NotFound("user".into()))?;
        if let Some(name) = name { account.user.name = name; }
        if let Some(image) = update.image { account.user.image = image; }
        account.user.updated_at = Utc::now();
        info!(user = %me.user.id, "identity: profile updated");
        Ok(account.user.clone())
    }

    async fn change_password(&self, token: &str, request: ChangePasswordRequest) -> ApiResult<()> {
        let new_password = validate::password(&request.new_password)?;
        validate::confirmed(&request.new_password, &request.confirm_password)?;
        let mut inner = self.inner.write().await;
        let me = inner.caller(token)?;
        let account = inner.account_mut(&me.user.id).ok_or_else(|| ApiError::NotFound("user".into()))?;
        if account.password != request.current_password.trim() {
            warn!(user = %me.user.id, "identity: wrong current password");
            return Err(ApiError::Validation("Invalid password.".into()));
        }
        account.password = new_password;
        account.user.updated_at = Utc::now();
        if request.revoke_other_sessions {
            inner.sessions.retain(|s| s.user_id != me.user.id || s.token == token);
        }
        info!(user = %me.user.id, "identity: password changed");
        Ok(())
    }

    async fn sign_in(&self, request: SignInRequest) -> ApiResult<Session> {
        let email = request.email.trim().to_lowercase();
        let mut inner = self.inner.write().await;
        let user = inner
            .accounts
            .iter()
            .find(|a| a.user.email == email && a.password == request.password.trim())
            .map(|a| a.user.clone());
        let Some(user) = user else {
            metrics::counter!("identity_sign_in_total", 1u64, "result" => "rejected");
            warn!(email = %email, "identity: sign-in rejected");
            return Err(ApiError::Unauthorized("Invalid email or password".into()));
        };
        let info = self.open_session(&mut inner, &user.id);
        metrics::counter!("identity_sign_in_total", 1u64, "result" => "ok");
        info!(user = %user.id, remember = request.remember_me, "identity: signed in");
        Ok(Session { session: info, user })
    }

    async fn sign_up(&self, request: SignUpRequest) -> ApiResult<User> {
        validate::agreed(request.is_agree)?;
        let name = validate::name(&request.name)?;
        let email = validate::email(&request.email)?;
        let password = validate::password(&request.password)?;
        validate::confirmed(&request.password, &request.confirm_password)?;
        let mut inner = self.inner.write().await;
        if inner.email_taken(&email) { return Err(ApiError::Conflict("User already exists".into())); }
        let user = new_user(name, email, Role::User);
        inner.accounts.push(Account { user: user.clone(), password });
        info!(user = %user.id, "identity: signed up");
        Ok(user)
    }

    async fn sign_out(&self, token: &str) -> ApiResult<()> {
        self.inner.write().await.sessions.retain(|s| s.token != token);
        Ok(())
    }

    async fn sign_in_social(&self, provider: &str) -> ApiResult<String> {
        let (_, url) = self
            .social_providers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider))
            .ok_or_else(|| ApiError::Validation(format!("unsupported social provider: {provider}")))?;
        Ok(format!("{url}?state={}", Uuid::new_v4().simple()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_users_are_unique_and_mixed() {
        let users = demo_users();
        let mut emails: Vec<&str> = users.iter().map(|u| u.email.as_str()).collect();
        emails.sort();
        emails.dedup();
        assert_eq!(emails.len(), users.len());
        assert!(users.iter().any(|u| u.role() == Some(Role::Admin)));
        assert!(users.iter().any(|u| u.role() == Some(Role::CustomRoleExample)));
    }

    #[test]
    fn user_sort_by_name_ignores_case() {
        let mut a = new_user("alice".into(), "a@x.io".into(), Role::User);
        let b = new_user("Bob".into(), "b@x.io".into(), Role::User);
        assert_eq!(compare_users(&a, &b, UserSortField::Name), Ordering::Less);
        a.name = "carl".into();
        assert_eq!(compare_users(&a, &b, UserSortField::Name), Ordering::Greater);
    }
}
