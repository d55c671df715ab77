//! PostgreSQL connection pool
//!
//! Only used when `storage.driver` is `postgres`, and by the migration tools.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::config::StorageConfig;

/// Connect to PostgreSQL using the storage configuration
pub async fn create_pool(config: &StorageConfig) -> Result<PgPool> {
    let url = config
        .database_url
        .as_deref()
        .context("storage.database_url is required for the postgres driver")?;
    connect(url, config.max_connections).await
}

/// Connect to PostgreSQL and check the connection
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await
        .with_context(|| format!("Failed to connect to PostgreSQL at {}", redact_url(url)))?;

    ping(&pool).await?;
    Ok(pool)
}

/// Check if the database connection is healthy
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .context("Database ping failed")?;
    Ok(())
}

/// Hide the password of a connection URL for logs
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url() {
        assert_eq!(
            redact_url("postgres://app:s3cret@db:5432/keystone"),
            "postgres://app:***@db:5432/keystone"
        );
        assert_eq!(redact_url("postgres://db/keystone"), "postgres://db/keystone");
        assert_eq!(redact_url("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_create_pool_requires_url() {
        let config = StorageConfig::default();
        assert!(create_pool(&config).await.is_err());
    }

    // Requires a running PostgreSQL server; set POSTGRES_TEST_URL to run.
    #[tokio::test]
    #[ignore = "Requires PostgreSQL server"]
    async fn test_postgres_ping() {
        let url = std::env::var("POSTGRES_TEST_URL")
            .unwrap_or_else(|_| "postgres://postgres@localhost/keystone_test".to_string());
        let pool = connect(&url, 2).await.expect("Failed to create pool");
        ping(&pool).await.expect("Ping should succeed");
    }
}
