//! Newsletter subscriber table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::{get_parsed, PgRecord};
use crate::models::NewsletterSubscriber;

impl PgRecord for NewsletterSubscriber {
    const TABLE: &'static str = "newsletter_subscribers";
    const KEY_COLUMN: &'static str = "email";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "email",
        "name",
        "status",
        "source",
        "subscribed_at",
        "unsubscribed_at",
    ];
    const ORDER_BY: &'static str = "subscribed_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.email.clone())
            .push_bind(self.name.clone())
            .push_bind(self.status.as_str())
            .push_bind(self.source.clone())
            .push_bind(self.subscribed_at)
            .push_bind(self.unsubscribed_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(NewsletterSubscriber {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            status: get_parsed(row, "status")?,
            source: row.try_get("source")?,
            subscribed_at: row.try_get("subscribed_at")?,
            unsubscribed_at: row.try_get("unsubscribed_at")?,
        })
    }
}
