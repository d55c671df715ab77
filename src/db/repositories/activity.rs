//! Activity log table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::PgRecord;
use crate::models::ActivityLog;

impl PgRecord for ActivityLog {
    const TABLE: &'static str = "activity_logs";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "user_id",
        "username",
        "action",
        "entity_type",
        "entity_id",
        "details",
        "ip_address",
        "created_at",
    ];
    const ORDER_BY: &'static str = "created_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.user_id.clone())
            .push_bind(self.username.clone())
            .push_bind(self.action.clone())
            .push_bind(self.entity_type.clone())
            .push_bind(self.entity_id.clone())
            .push_bind(self.details.clone())
            .push_bind(self.ip_address.clone())
            .push_bind(self.created_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(ActivityLog {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            username: row.try_get("username")?,
            action: row.try_get("action")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            details: row.try_get("details")?,
            ip_address: row.try_get("ip_address")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
