//! Copy JSON collections into another storage backend

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::{render_table, COLLECTIONS};
use crate::db::json::{collection_path, read_raw};
use crate::db::{Repositories, Repository, UpsertOutcome};
use crate::models::Record;

/// Counts for one collection
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CollectionReport {
    pub collection: String,
    pub read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    /// The collection file did not exist
    pub missing: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub backup_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub collections: Vec<CollectionReport>,
}

impl MigrationReport {
    pub fn total_failed(&self) -> usize {
        self.collections.iter().map(|c| c.failed).sum()
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.collection == name)
    }

    /// Summary table for the terminal
    pub fn render(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .collections
            .iter()
            .map(|c| {
                if c.missing {
                    vec![
                        c.collection.clone(),
                        "-".into(),
                        "-".into(),
                        "-".into(),
                        "-".into(),
                    ]
                } else {
                    vec![
                        c.collection.clone(),
                        c.read.to_string(),
                        c.inserted.to_string(),
                        c.updated.to_string(),
                        c.failed.to_string(),
                    ]
                }
            })
            .collect();
        render_table(&["Collection", "Read", "Inserted", "Updated", "Failed"], &rows)
    }
}

/// Copy every existing collection file to `<data_dir>/backups/<timestamp>/`.
///
/// Returns `Ok(None)` when there was nothing to back up.
pub async fn backup_collections(data_dir: &Path) -> Result<Option<PathBuf>> {
    let existing: Vec<&str> = COLLECTIONS
        .iter()
        .copied()
        .filter(|name| data_dir.join(format!("{name}.json")).is_file())
        .collect();
    if existing.is_empty() {
        return Ok(None);
    }

    let backup_dir = data_dir
        .join("backups")
        .join(Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string());
    tokio::fs::create_dir_all(&backup_dir)
        .await
        .with_context(|| format!("Failed to create {}", backup_dir.display()))?;

    for name in existing {
        let file = format!("{name}.json");
        tokio::fs::copy(data_dir.join(&file), backup_dir.join(&file))
            .await
            .with_context(|| format!("Failed to back up {file}"))?;
    }

    tracing::info!("Backed up JSON collections to {}", backup_dir.display());
    Ok(Some(backup_dir))
}

/// Read one collection file and upsert its records into `target`.
///
/// Records that fail to parse or write are counted and logged; they do not
/// stop the rest of the collection. With no target nothing is written and
/// every parsed record counts as an insert.
pub async fn migrate_collection<T: Record>(
    data_dir: &Path,
    target: Option<&dyn Repository<T>>,
) -> Result<CollectionReport> {
    let mut report = CollectionReport {
        collection: T::COLLECTION.to_string(),
        ..Default::default()
    };

    let Some(values) = read_raw(&collection_path::<T>(data_dir)).await? else {
        tracing::warn!("{}.json not found, skipping", T::COLLECTION);
        report.missing = true;
        return Ok(report);
    };

    report.read = values.len();
    for (index, value) in values.into_iter().enumerate() {
        let record: T = match serde_json::from_value(value) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("{} record #{} is invalid: {}", T::COLLECTION, index, e);
                report.failed += 1;
                continue;
            }
        };

        let Some(target) = target else {
            report.inserted += 1;
            continue;
        };

        match target.upsert(&record).await {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Updated) => report.updated += 1,
            Err(e) => {
                tracing::error!(
                    "Failed to write {} record {}: {:#}",
                    T::COLLECTION,
                    record.key(),
                    e
                );
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "{}: read {}, inserted {}, updated {}, failed {}",
        report.collection,
        report.read,
        report.inserted,
        report.updated,
        report.failed
    );
    Ok(report)
}

/// Migrate all collections from `data_dir` into `target`.
///
/// `None` is a dry run: files are read and parsed but nothing is written.
/// Running it again is safe because records are upserted by key.
pub async fn migrate(data_dir: &Path, target: Option<&Repositories>) -> Result<MigrationReport> {
    let collections = vec![
        migrate_collection(data_dir, target.map(|r| r.users.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.blog_posts.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.properties.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.testimonials.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.subscribers.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.contacts.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.activity.as_ref())).await?,
        migrate_collection(data_dir, target.map(|r| r.versions.as_ref())).await?,
    ];

    Ok(MigrationReport {
        backup_dir: None,
        dry_run: target.is_none(),
        collections,
    })
}
