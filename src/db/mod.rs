//! Storage layer
//!
//! Keystone stores its data in one of two backends:
//! - JSON files (default, one file per collection under `storage.data_dir`)
//! - PostgreSQL (when `storage.driver` is `postgres`)
//!
//! Both are reached through the same `Repository<T>` trait, bundled in
//! `Repositories`, so services never know which one is active.
//!
//! # Usage
//!
//! ```ignore
//! use keystone::db::open_storage;
//!
//! let repos = open_storage(&config.storage).await?;
//! let posts = repos.blog_posts.list_all().await?;
//! ```

pub mod json;
pub mod migrations;
pub mod pool;
pub mod repositories;

use anyhow::Result;

use crate::config::{StorageConfig, StorageDriver};

pub use pool::{connect, create_pool};
pub use repositories::{Repositories, Repository, UpsertOutcome};

/// Build the repositories selected by the configuration.
///
/// For PostgreSQL this connects and applies pending schema migrations.
pub async fn open_storage(config: &StorageConfig) -> Result<Repositories> {
    match config.driver {
        StorageDriver::Json => {
            tracing::info!("Using JSON storage in {}", config.data_dir.display());
            Ok(Repositories::json(&config.data_dir))
        }
        StorageDriver::Postgres => {
            let pool = create_pool(config).await?;
            migrations::run_migrations(&pool).await?;
            tracing::info!("Using PostgreSQL storage");
            Ok(Repositories::postgres(pool))
        }
    }
}
