//! Admin user service
//!
//! Account management, login/logout and session validation for the admin
//! panel. Sessions live in memory (moka cache with a TTL), so a restart signs
//! everybody out.

use anyhow::Context;
use chrono::{Duration, Utc};
use moka::future::Cache;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::activity::{ActivityService, Actor};
use super::password::{hash_password, verify_password};
use super::rate_limiter::LoginRateLimiter;
use crate::config::AuthConfig;
use crate::db::Repository;
use crate::models::{
    AdminUser, CreateUserInput, Permission, Record, Session, UpdateUserInput, UserRole,
};

/// Upper bound on concurrently open sessions
const MAX_SESSIONS: u64 = 10_000;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials or disabled account
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationErrors),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("{0} not found")]
    NotFound(String),

    /// The change would leave no active admin
    #[error("At least one active admin account is required")]
    LastAdmin,

    #[error("Too many failed login attempts, try again later")]
    RateLimited,

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Login form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginInput {
    /// Username or email
    #[serde(alias = "username", alias = "email")]
    #[validate(length(min = 1, message = "username is required"))]
    pub login: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

impl LoginInput {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

pub struct UserService {
    repo: Arc<dyn Repository<AdminUser>>,
    activity: Arc<ActivityService>,
    rate_limiter: Arc<LoginRateLimiter>,
    sessions: Cache<String, Session>,
    session_ttl: Duration,
    /// Held across account writes so the last-admin check cannot race
    mutations: Mutex<()>,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn Repository<AdminUser>>,
        activity: Arc<ActivityService>,
        rate_limiter: Arc<LoginRateLimiter>,
        session_ttl_hours: u64,
    ) -> Self {
        let ttl = std::time::Duration::from_secs(session_ttl_hours.max(1) * 3600);
        Self {
            repo,
            activity,
            rate_limiter,
            sessions: Cache::builder()
                .max_capacity(MAX_SESSIONS)
                .time_to_live(ttl)
                .build(),
            session_ttl: Duration::hours(session_ttl_hours.max(1) as i64),
            mutations: Mutex::new(()),
        }
    }

    /// Create the first admin account when there are no users at all.
    ///
    /// Without a configured password a random one is generated and logged.
    pub async fn bootstrap_admin(
        &self,
        config: &AuthConfig,
    ) -> Result<Option<AdminUser>, UserServiceError> {
        let count = self.repo.count().await.context("Failed to count users")?;
        if count > 0 {
            return Ok(None);
        }

        let password = match config.initial_admin_password.as_deref() {
            Some(password) if !password.is_empty() => password.to_string(),
            _ => {
                let generated = Uuid::new_v4().simple().to_string();
                tracing::warn!(
                    "No admin password configured; created '{}' with generated password {}",
                    config.initial_admin_username,
                    generated
                );
                generated
            }
        };

        let mut user = AdminUser::new(
            config.initial_admin_username.trim().to_string(),
            config.initial_admin_email.trim().to_lowercase(),
            hash_password(&password)?,
            UserRole::Admin,
        );
        user.full_name = "Administrator".to_string();

        let user = self
            .repo
            .create(&user)
            .await
            .context("Failed to create initial admin")?;
        tracing::info!("Created initial admin account {}", user.username);
        self.activity
            .record(
                &Actor::system(),
                "create",
                AdminUser::COLLECTION,
                Some(&user.id),
                json!({ "username": user.username, "bootstrap": true }),
            )
            .await;
        Ok(Some(user))
    }

    /// Check credentials and open a session
    pub async fn login(
        &self,
        input: LoginInput,
        ip_address: Option<String>,
    ) -> Result<(Session, AdminUser), UserServiceError> {
        input.validate()?;
        let login = input.login.trim();
        let user = self.find_by_login(login).await?;

        // Failures count against the account, whichever identifier was typed
        let limit_key = user.as_ref().map_or(login, |u| u.username.as_str()).to_string();
        if self.rate_limiter.is_login_limited(&limit_key).await {
            tracing::warn!("Login rate limited for {}", limit_key);
            return Err(UserServiceError::RateLimited);
        }

        let invalid = || UserServiceError::AuthenticationError("Invalid username or password".into());

        let Some(mut user) = user else {
            self.rate_limiter.record_failed_login(&limit_key).await;
            return Err(invalid());
        };

        if !verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?
        {
            self.rate_limiter.record_failed_login(&limit_key).await;
            tracing::warn!("Failed login for {}", user.username);
            return Err(invalid());
        }

        if !user.active {
            return Err(UserServiceError::AuthenticationError(
                "This account is disabled".into(),
            ));
        }

        self.rate_limiter.clear_failed_logins(&limit_key).await;

        let now = Utc::now();
        user.last_login = Some(now);
        let user = self
            .repo
            .update(&user)
            .await
            .context("Failed to record last login")?;

        let session = Session {
            token: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
            user_id: user.id.clone(),
            expires_at: now + self.session_ttl,
            created_at: now,
        };
        self.sessions.insert(session.token.clone(), session.clone()).await;

        tracing::info!("User {} logged in", user.username);
        self.activity
            .record(
                &Actor::user(&user, ip_address),
                "login",
                AdminUser::COLLECTION,
                Some(&user.id),
                json!({}),
            )
            .await;

        Ok((session, user))
    }

    pub async fn logout(&self, token: &str) {
        self.sessions.invalidate(token).await;
    }

    /// The user behind a session token, if the session is live and the
    /// account still active
    pub async fn validate_session(&self, token: &str) -> Result<Option<AdminUser>, UserServiceError> {
        let Some(session) = self.sessions.get(token).await else {
            return Ok(None);
        };
        if session.is_expired() {
            self.sessions.invalidate(token).await;
            return Ok(None);
        }

        let user = self
            .repo
            .get_by_id(&session.user_id)
            .await
            .context("Failed to get session user")?;
        match user {
            Some(user) if user.active => Ok(Some(user)),
            _ => {
                self.sessions.invalidate(token).await;
                Ok(None)
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<AdminUser>, UserServiceError> {
        let mut users = self.repo.list_all().await.context("Failed to list users")?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    pub async fn get(&self, id: &str) -> Result<AdminUser, UserServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or_else(|| UserServiceError::NotFound(format!("User {}", id)))
    }

    pub async fn create(
        &self,
        mut input: CreateUserInput,
        actor: &Actor,
    ) -> Result<AdminUser, UserServiceError> {
        input.username = input.username.trim().to_string();
        input.email = input.email.trim().to_lowercase();
        input.validate()?;
        let _guard = self.mutations.lock().await;

        let users = self.repo.list_all().await.context("Failed to list users")?;
        if users.iter().any(|u| u.username.eq_ignore_ascii_case(&input.username)) {
            return Err(UserServiceError::UserExists(input.username));
        }
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&input.email)) {
            return Err(UserServiceError::UserExists(input.email));
        }

        let mut user = AdminUser::new(
            input.username,
            input.email,
            hash_password(&input.password)?,
            input.role,
        );
        user.full_name = input.full_name.trim().to_string();
        user.permissions = extra_permissions(input.role, input.permissions);

        let user = self.repo.create(&user).await.context("Failed to create user")?;

        tracing::info!("Created user {} ({})", user.username, user.role);
        self.activity
            .record(
                actor,
                "create",
                AdminUser::COLLECTION,
                Some(&user.id),
                json!({ "username": user.username, "role": user.role }),
            )
            .await;
        Ok(user)
    }

    pub async fn update(
        &self,
        id: &str,
        mut input: UpdateUserInput,
        actor: &Actor,
    ) -> Result<AdminUser, UserServiceError> {
        input.email = input.email.map(|e| e.trim().to_lowercase());
        input.validate()?;
        let _guard = self.mutations.lock().await;
        let current = self.get(id).await?;
        let mut user = current.clone();

        if let Some(email) = input.email {
            if email != user.email {
                let taken = self
                    .repo
                    .list_all()
                    .await
                    .context("Failed to list users")?
                    .iter()
                    .any(|u| u.id != id && u.email.eq_ignore_ascii_case(&email));
                if taken {
                    return Err(UserServiceError::UserExists(email));
                }
                user.email = email;
            }
        }
        if let Some(full_name) = input.full_name {
            user.full_name = full_name.trim().to_string();
        }
        if let Some(role) = input.role {
            user.role = role;
        }
        if let Some(permissions) = input.permissions {
            user.permissions = permissions;
        }
        user.permissions = extra_permissions(user.role, std::mem::take(&mut user.permissions));
        if let Some(active) = input.active {
            user.active = active;
        }

        if is_active_admin(&current) && !is_active_admin(&user) {
            self.ensure_other_admin(id).await?;
        }

        let password_changed = input.password.is_some();
        if let Some(password) = input.password {
            user.password_hash = hash_password(&password)?;
        }
        user.updated_at = Utc::now();

        let user = self.repo.update(&user).await.context("Failed to update user")?;

        tracing::info!("Updated user {}", user.username);
        self.activity
            .record(
                actor,
                "update",
                AdminUser::COLLECTION,
                Some(id),
                json!({
                    "username": user.username,
                    "role": user.role,
                    "active": user.active,
                    "password_changed": password_changed,
                }),
            )
            .await;
        Ok(user)
    }

    pub async fn delete(&self, id: &str, actor: &Actor) -> Result<(), UserServiceError> {
        let _guard = self.mutations.lock().await;
        let user = self.get(id).await?;
        if actor.user_id.as_deref() == Some(id) {
            return Err(UserServiceError::ValidationError(
                "You cannot delete your own account".into(),
            ));
        }
        if is_active_admin(&user) {
            self.ensure_other_admin(id).await?;
        }

        self.repo.delete(id).await.context("Failed to delete user")?;

        tracing::info!("Deleted user {}", user.username);
        self.activity
            .record(
                actor,
                "delete",
                AdminUser::COLLECTION,
                Some(id),
                json!({ "username": user.username }),
            )
            .await;
        Ok(())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<AdminUser>, UserServiceError> {
        if let Some(user) = self
            .repo
            .get_by_key(login)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }
        Ok(self
            .repo
            .list_all()
            .await
            .context("Failed to list users")?
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(login) || u.email.eq_ignore_ascii_case(login)))
    }

    async fn ensure_other_admin(&self, id: &str) -> Result<(), UserServiceError> {
        let others = self
            .repo
            .list_all()
            .await
            .context("Failed to list users")?
            .iter()
            .filter(|u| u.id != id && is_active_admin(u))
            .count();
        if others == 0 {
            return Err(UserServiceError::LastAdmin);
        }
        Ok(())
    }
}

fn is_active_admin(user: &AdminUser) -> bool {
    user.active && user.is_admin()
}

/// Keep only grants the role does not already give, sorted and deduplicated
fn extra_permissions(role: UserRole, mut permissions: Vec<Permission>) -> Vec<Permission> {
    permissions.retain(|p| !role.grants(*p));
    permissions.sort();
    permissions.dedup();
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repositories;
    use proptest::prelude::*;

    fn service(dir: &std::path::Path) -> UserService {
        let repos = Repositories::json(dir);
        UserService::new(
            repos.users.clone(),
            Arc::new(ActivityService::new(repos.activity.clone())),
            Arc::new(LoginRateLimiter::new()),
            24,
        )
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            initial_admin_password: Some("bootstrap-pass".into()),
            ..Default::default()
        }
    }

    fn editor_input(username: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.into(),
            email: format!("{}@example.com", username),
            password: "editor-pass".into(),
            role: UserRole::Editor,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let admin = service.bootstrap_admin(&auth_config()).await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.username, "admin");
        assert!(service.bootstrap_admin(&auth_config()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_by_username_or_email() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.bootstrap_admin(&auth_config()).await.unwrap();

        let (session, user) = service
            .login(LoginInput::new("admin", "bootstrap-pass"), None)
            .await
            .unwrap();
        assert!(user.last_login.is_some());
        let found = service.validate_session(&session.token).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);

        let (by_email, _) = service
            .login(LoginInput::new("ADMIN@localhost", "bootstrap-pass"), None)
            .await
            .unwrap();
        assert_ne!(by_email.token, session.token);

        service.logout(&session.token).await;
        assert!(service.validate_session(&session.token).await.unwrap().is_none());
        assert!(service.validate_session("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_password_then_rate_limit() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.bootstrap_admin(&auth_config()).await.unwrap();

        for _ in 0..5 {
            let err = service
                .login(LoginInput::new("admin", "wrong-pass"), None)
                .await
                .unwrap_err();
            assert!(matches!(err, UserServiceError::AuthenticationError(_)));
        }
        let err = service
            .login(LoginInput::new("admin", "bootstrap-pass"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::RateLimited));
    }

    #[tokio::test]
    async fn test_rate_limit_shared_by_username_and_email() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        service.bootstrap_admin(&auth_config()).await.unwrap();

        for login in ["admin", "admin@localhost", "ADMIN", "Admin@Localhost", "admin"] {
            let err = service
                .login(LoginInput::new(login, "wrong-pass"), None)
                .await
                .unwrap_err();
            assert!(matches!(err, UserServiceError::AuthenticationError(_)));
        }
        let err = service
            .login(LoginInput::new("admin@localhost", "bootstrap-pass"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::RateLimited));
    }

    #[tokio::test]
    async fn test_concurrent_admin_deletes_keep_one_admin() {
        let dir = tempfile::tempdir().unwrap();
        let service = Arc::new(service(dir.path()));
        let actor = Actor::system();
        let first = service.bootstrap_admin(&auth_config()).await.unwrap().unwrap();
        let mut input = editor_input("second");
        input.role = UserRole::Admin;
        let second = service.create(input, &actor).await.unwrap();

        let (a, b) = tokio::join!(
            service.delete(&first.id, &actor),
            service.delete(&second.id, &actor)
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let admins = service.list().await.unwrap();
        assert_eq!(admins.iter().filter(|u| is_active_admin(u)).count(), 1);
    }

    #[tokio::test]
    async fn test_inactive_user_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let actor = Actor::system();
        let editor = service.create(editor_input("eddie"), &actor).await.unwrap();

        let (session, _) = service
            .login(LoginInput::new("eddie", "editor-pass"), None)
            .await
            .unwrap();

        let deactivate = UpdateUserInput {
            active: Some(false),
            ..Default::default()
        };
        service.update(&editor.id, deactivate, &actor).await.unwrap();

        assert!(service.validate_session(&session.token).await.unwrap().is_none());
        let err = service
            .login(LoginInput::new("eddie", "editor-pass"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::AuthenticationError(_)));
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let actor = Actor::system();
        service.create(editor_input("maya"), &actor).await.unwrap();

        let err = service.create(editor_input("MAYA"), &actor).await.unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));

        let mut other = editor_input("maya2");
        other.email = "Maya@Example.com".into();
        let err = service.create(other, &actor).await.unwrap_err();
        assert!(matches!(err, UserServiceError::UserExists(_)));
    }

    #[tokio::test]
    async fn test_last_admin_is_protected() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let actor = Actor::system();
        let admin = service.bootstrap_admin(&auth_config()).await.unwrap().unwrap();

        let demote = UpdateUserInput {
            role: Some(UserRole::Editor),
            ..Default::default()
        };
        let err = service.update(&admin.id, demote.clone(), &actor).await.unwrap_err();
        assert!(matches!(err, UserServiceError::LastAdmin));
        let err = service.delete(&admin.id, &actor).await.unwrap_err();
        assert!(matches!(err, UserServiceError::LastAdmin));

        let mut second = editor_input("second");
        second.role = UserRole::Admin;
        service.create(second, &actor).await.unwrap();

        let demoted = service.update(&admin.id, demote, &actor).await.unwrap();
        assert_eq!(demoted.role, UserRole::Editor);
    }

    #[tokio::test]
    async fn test_cannot_delete_self() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let editor = service.create(editor_input("solo"), &Actor::system()).await.unwrap();
        let err = service
            .delete(&editor.id, &Actor::user(&editor, None))
            .await
            .unwrap_err();
        assert!(matches!(err, UserServiceError::ValidationError(_)));
    }

    fn any_permission() -> impl Strategy<Value = Permission> {
        proptest::sample::select(Permission::ALL.to_vec())
    }

    fn any_role() -> impl Strategy<Value = UserRole> {
        proptest::sample::select(vec![UserRole::Admin, UserRole::Editor, UserRole::Viewer])
    }

    proptest! {
        #[test]
        fn prop_extra_permissions_preserve_effective_set(
            role in any_role(),
            grants in proptest::collection::vec(any_permission(), 0..10),
        ) {
            let mut raw = AdminUser::new("u".into(), "u@x.io".into(), "h".into(), role);
            raw.permissions = grants.clone();
            let mut normalized = raw.clone();
            normalized.permissions = extra_permissions(role, grants);

            prop_assert_eq!(raw.effective_permissions(), normalized.effective_permissions());
            prop_assert!(normalized.permissions.iter().all(|p| !role.grants(*p)));
            prop_assert!(normalized.permissions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
