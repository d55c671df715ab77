//! Admin user model
//!
//! This module defines the admin panel account, its role and the
//! permission set derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use super::record::{new_id, Record};

/// Account allowed to sign in to the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    /// Unique identifier
    pub id: String,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2 PHC string)
    pub password_hash: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    /// Grants on top of the role
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Inactive accounts cannot sign in
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl AdminUser {
    /// Create a new user.
    ///
    /// The password must already be hashed, see `services::password::hash_password()`.
    pub fn new(username: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            username,
            email,
            password_hash,
            full_name: String::new(),
            role,
            permissions: Vec::new(),
            active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Check a permission against the role grants and the extra grants
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.role.grants(permission) || self.permissions.contains(&permission)
    }

    /// Every permission this user holds, sorted
    pub fn effective_permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .filter(|p| self.has_permission(*p))
            .collect()
    }
}

impl Record for AdminUser {
    const COLLECTION: &'static str = "admin-users";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.username
    }
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access
    Admin,
    /// Manages and publishes content and subscribers
    Editor,
    /// Read-only access to the admin panel
    #[default]
    Viewer,
}

impl UserRole {
    pub fn grants(&self, permission: Permission) -> bool {
        match self {
            UserRole::Admin => true,
            UserRole::Editor => !matches!(permission, Permission::ManageUsers),
            UserRole::Viewer => matches!(permission, Permission::ViewContent),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => write!(f, "admin"),
            UserRole::Editor => write!(f, "editor"),
            UserRole::Viewer => write!(f, "viewer"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "editor" => Ok(UserRole::Editor),
            "viewer" => Ok(UserRole::Viewer),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Admin panel permission
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewContent,
    ManageContent,
    PublishContent,
    ManageSubscribers,
    ManageUsers,
    ViewActivity,
}

impl Permission {
    pub const ALL: [Permission; 6] = [
        Permission::ViewContent,
        Permission::ManageContent,
        Permission::PublishContent,
        Permission::ManageSubscribers,
        Permission::ManageUsers,
        Permission::ViewActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ViewContent => "view_content",
            Permission::ManageContent => "manage_content",
            Permission::PublishContent => "publish_content",
            Permission::ManageSubscribers => "manage_subscribers",
            Permission::ManageUsers => "manage_users",
            Permission::ViewActivity => "view_activity",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid permission: {}", s))
    }
}

/// Input for creating an admin user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 50, message = "username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// Input for updating an admin user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(email(message = "invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub permissions: Option<Vec<Permission>>,
    pub active: Option<bool>,
}

/// User as returned by the API, without the password hash
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub permissions: Vec<Permission>,
    pub active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&AdminUser> for UserResponse {
    fn from(user: &AdminUser) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            permissions: user.effective_permissions(),
            active: user.active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Session bound to an admin user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session token
    pub token: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}
