//! Contact message table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::{get_parsed, PgRecord};
use crate::models::ContactMessage;

impl PgRecord for ContactMessage {
    const TABLE: &'static str = "contact_messages";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "subject",
        "message",
        "property_slug",
        "status",
        "created_at",
    ];
    const ORDER_BY: &'static str = "created_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.name.clone())
            .push_bind(self.email.clone())
            .push_bind(self.phone.clone())
            .push_bind(self.subject.clone())
            .push_bind(self.message.clone())
            .push_bind(self.property_slug.clone())
            .push_bind(self.status.as_str())
            .push_bind(self.created_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(ContactMessage {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            subject: row.try_get("subject")?,
            message: row.try_get("message")?,
            property_slug: row.try_get("property_slug")?,
            status: get_parsed(row, "status")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
