//! Blog post table mapping

use anyhow::Result;
use sqlx::postgres::{PgRow, Postgres};
use sqlx::query_builder::Separated;
use sqlx::Row;

use super::postgres::{get_parsed, PgRecord};
use crate::models::BlogPost;

impl PgRecord for BlogPost {
    const TABLE: &'static str = "blog_posts";
    const KEY_COLUMN: &'static str = "slug";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "slug",
        "title",
        "excerpt",
        "content",
        "content_html",
        "author",
        "category",
        "tags",
        "featured_image",
        "status",
        "published_at",
        "scheduled_for",
        "views",
        "created_at",
        "updated_at",
    ];
    const ORDER_BY: &'static str = "created_at, id";

    fn push_binds(&self, values: &mut Separated<'_, '_, Postgres, &'static str>) {
        values
            .push_bind(self.id.clone())
            .push_bind(self.slug.clone())
            .push_bind(self.title.clone())
            .push_bind(self.excerpt.clone())
            .push_bind(self.content.clone())
            .push_bind(self.content_html.clone())
            .push_bind(self.author.clone())
            .push_bind(self.category.clone())
            .push_bind(self.tags.clone())
            .push_bind(self.featured_image.clone())
            .push_bind(self.status.as_str())
            .push_bind(self.published_at)
            .push_bind(self.scheduled_for)
            .push_bind(self.views)
            .push_bind(self.created_at)
            .push_bind(self.updated_at);
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        Ok(BlogPost {
            id: row.try_get("id")?,
            slug: row.try_get("slug")?,
            title: row.try_get("title")?,
            excerpt: row.try_get("excerpt")?,
            content: row.try_get("content")?,
            content_html: row.try_get("content_html")?,
            author: row.try_get("author")?,
            category: row.try_get("category")?,
            tags: row.try_get("tags")?,
            featured_image: row.try_get("featured_image")?,
            status: get_parsed(row, "status")?,
            published_at: row.try_get("published_at")?,
            scheduled_for: row.try_get("scheduled_for")?,
            views: row.try_get("views")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
