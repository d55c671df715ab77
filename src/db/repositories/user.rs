//! Admin user table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::{get_parsed, PgRecord};
use crate::models::{AdminUser, Permission};

impl PgRecord for AdminUser {
    const TABLE: &'static str = "admin_users";
    const KEY_COLUMN: &'static str = "username";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "username",
        "email",
        "password_hash",
        "full_name",
        "role",
        "permissions",
        "active",
        "last_login",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "created_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        let permissions: Vec<String> = self
            .permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        values
            .push_bind(self.id.clone())
            .push_bind(self.username.clone())
            .push_bind(self.email.clone())
            .push_bind(self.password_hash.clone())
            .push_bind(self.full_name.clone())
            .push_bind(self.role.to_string())
            .push_bind(permissions)
            .push_bind(self.active)
            .push_bind(self.last_login)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        let permissions: Vec<String> = row.try_get("permissions")?;
        let permissions = permissions
            .iter()
            .map(|p| p.parse::<Permission>())
            .collect::<Result<Vec<_>>>()?;

        Ok(AdminUser {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            full_name: row.try_get("full_name")?,
            role: get_parsed(row, "role")?,
            permissions,
            active: row.try_get("active")?,
            last_login: row.try_get("last_login")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
