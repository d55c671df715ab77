//! Testimonial table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::{get_parsed, PgRecord};
use crate::models::Testimonial;

impl PgRecord for Testimonial {
    const TABLE: &'static str = "testimonials";
    const KEY_COLUMN: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "client_name",
        "client_title",
        "company",
        "content",
        "rating",
        "project",
        "photo",
        "featured",
        "status",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "created_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.client_name.clone())
            .push_bind(self.client_title.clone())
            .push_bind(self.company.clone())
            .push_bind(self.content.clone())
            .push_bind(self.rating)
            .push_bind(self.project.clone())
            .push_bind(self.photo.clone())
            .push_bind(self.featured)
            .push_bind(self.status.as_str())
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(Testimonial {
            id: row.try_get("id")?,
            client_name: row.try_get("client_name")?,
            client_title: row.try_get("client_title")?,
            company: row.try_get("company")?,
            content: row.try_get("content")?,
            rating: row.try_get("rating")?,
            project: row.try_get("project")?,
            photo: row.try_get("photo")?,
            featured: row.try_get("featured")?,
            status: get_parsed(row, "status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::postgres::test_support::fresh_pool;
    use super::super::{PgRepository, Repository};
    use super::*;

    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_rating_check_constraint() {
        let repo = PgRepository::<Testimonial>::new(fresh_pool().await);
        let bad = Testimonial::new("Jo".into(), "Too good".into(), 9);
        assert!(repo.create(&bad).await.is_err());

        let good = Testimonial::new("Jo".into(), "Good".into(), 4);
        assert_eq!(repo.create(&good).await.unwrap().rating, 4);
    }
}
