//! Repositories
//!
//! Repository pattern implementations for storage access. Every entity is
//! reached through `Repository<T>`, backed either by a JSON collection file
//! (`JsonRepository`) or a PostgreSQL table (`PgRepository`).

pub mod activity;
pub mod blog_post;
pub mod contact;
pub mod json;
pub mod postgres;
pub mod property;
pub mod subscriber;
pub mod testimonial;
pub mod user;
pub mod version;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;

use crate::models::{
    ActivityLog, AdminUser, BlogPost, ContactMessage, ContentVersion, NewsletterSubscriber,
    Property, Record, Testimonial,
};

pub use json::JsonRepository;
pub use postgres::{PgRecord, PgRepository};

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Storage operations shared by every entity
#[async_trait]
pub trait Repository<T: Record>: Send + Sync {
    /// Insert a new record. Fails if the id or key is taken.
    async fn create(&self, record: &T) -> Result<T>;

    async fn get_by_id(&self, id: &str) -> Result<Option<T>>;

    /// Look up by the unique key (slug, email, username or id)
    async fn get_by_key(&self, key: &str) -> Result<Option<T>>;

    async fn list_all(&self) -> Result<Vec<T>>;

    /// Replace the record with the same id. Fails if it does not exist.
    async fn update(&self, record: &T) -> Result<T>;

    /// Returns false when nothing was deleted
    async fn delete(&self, id: &str) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    /// Insert, or overwrite the stored record. A record with the same id is
    /// updated (its key may change); otherwise the one holding the same key is.
    async fn upsert(&self, record: &T) -> Result<UpsertOutcome>;

    /// Add one to an integer field in place. `None` when the id is unknown.
    async fn increment(&self, id: &str, field: &str) -> Result<Option<T>>;
}

/// All repositories of one storage backend
#[derive(Clone)]
pub struct Repositories {
    pub blog_posts: Arc<dyn Repository<BlogPost>>,
    pub properties: Arc<dyn Repository<Property>>,
    pub testimonials: Arc<dyn Repository<Testimonial>>,
    pub users: Arc<dyn Repository<AdminUser>>,
    pub subscribers: Arc<dyn Repository<NewsletterSubscriber>>,
    pub contacts: Arc<dyn Repository<ContactMessage>>,
    pub activity: Arc<dyn Repository<ActivityLog>>,
    pub versions: Arc<dyn Repository<ContentVersion>>,
}

impl Repositories {
    /// JSON collection files under `dir`
    pub fn json(dir: &Path) -> Self {
        Self {
            blog_posts: JsonRepository::boxed(dir),
            properties: JsonRepository::boxed(dir),
            testimonials: JsonRepository::boxed(dir),
            users: JsonRepository::boxed(dir),
            subscribers: JsonRepository::boxed(dir),
            contacts: JsonRepository::boxed(dir),
            activity: JsonRepository::boxed(dir),
            versions: JsonRepository::boxed(dir),
        }
    }

    /// PostgreSQL tables. The schema must already be migrated.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            blog_posts: PgRepository::boxed(pool.clone()),
            properties: PgRepository::boxed(pool.clone()),
            testimonials: PgRepository::boxed(pool.clone()),
            users: PgRepository::boxed(pool.clone()),
            subscribers: PgRepository::boxed(pool.clone()),
            contacts: PgRepository::boxed(pool.clone()),
            activity: PgRepository::boxed(pool.clone()),
            versions: PgRepository::boxed(pool),
        }
    }
}
