//! Content version table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::PgRecord;
use crate::models::ContentVersion;

impl PgRecord for ContentVersion {
    const TABLE: &'static str = "content_versions";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "entity_type",
        "entity_id",
        "version",
        "snapshot",
        "changed_by",
        "change_summary",
        "created_at",
    ];
    const ORDER_BY: &'static str = "entity_type, entity_id, version";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.entity_type.clone())
            .push_bind(self.entity_id.clone())
            .push_bind(self.version)
            .push_bind(self.snapshot.clone())
            .push_bind(self.changed_by.clone())
            .push_bind(self.change_summary.clone())
            .push_bind(self.created_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(ContentVersion {
            id: row.try_get("id")?,
            entity_type: row.try_get("entity_type")?,
            entity_id: row.try_get("entity_id")?,
            version: row.try_get("version")?,
            snapshot: row.try_get("snapshot")?,
            changed_by: row.try_get("changed_by")?,
            change_summary: row.try_get("change_summary")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
