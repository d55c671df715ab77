//! Blog post model
//!
//! This module provides:
//! - `BlogPost` entity
//! - Input types for creating and updating posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::record::{new_id, Record};
use super::status::{ContentStatus, Publication};

/// Blog post entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    /// Unique identifier
    pub id: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Post title
    pub title: String,
    /// Short summary shown in listings
    #[serde(default)]
    pub excerpt: String,
    /// Markdown content
    pub content: String,
    /// Rendered HTML content
    #[serde(default)]
    pub content_html: String,
    /// Display name of the author
    #[serde(default)]
    pub author: String,
    /// Free-form category label
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cover image URL
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: ContentStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Public view count
    #[serde(default)]
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlogPost {
    /// Create a new draft post
    pub fn new(slug: String, title: String, content: String, author: String) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            slug,
            title,
            excerpt: String::new(),
            content,
            content_html: String::new(),
            author,
            category: None,
            tags: Vec::new(),
            featured_image: None,
            status: ContentStatus::Draft,
            published_at: None,
            scheduled_for: None,
            views: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn publication(&self) -> Publication {
        Publication {
            status: self.status,
            published_at: self.published_at,
            scheduled_for: self.scheduled_for,
        }
    }

    pub fn set_publication(&mut self, publication: Publication) {
        self.status = publication.status;
        self.published_at = publication.published_at;
        self.scheduled_for = publication.scheduled_for;
    }

    /// Whether the post is visible on the public site
    pub fn is_public(&self) -> bool {
        self.status == ContentStatus::Published
    }
}

impl Record for BlogPost {
    const COLLECTION: &'static str = "blog-posts";

    fn id(&self) -> &str {
        &self.id
    }

    fn key(&self) -> &str {
        &self.slug
    }
}

/// Input for creating a new blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateBlogPostInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,
    /// Generated from the title when empty
    #[serde(default)]
    #[validate(length(max = 200))]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, message = "content cannot be empty"))]
    pub content: String,
    /// Defaults to the logged-in user's name
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    #[validate(url)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub status: Option<ContentStatus>,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Input for updating an existing blog post
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateBlogPostInput {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub slug: Option<String>,
    #[validate(length(max = 500))]
    pub excerpt: Option<String>,
    #[validate(length(min = 1, message = "content cannot be empty"))]
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    #[validate(url)]
    pub featured_image: Option<String>,
    pub status: Option<ContentStatus>,
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Stored with the version snapshot
    pub change_summary: Option<String>,
}

impl UpdateBlogPostInput {
    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.slug.is_some()
            || self.excerpt.is_some()
            || self.content.is_some()
            || self.author.is_some()
            || self.category.is_some()
            || self.tags.is_some()
            || self.featured_image.is_some()
            || self.status.is_some()
            || self.scheduled_for.is_some()
    }
}
