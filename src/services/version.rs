//! Content version history

use anyhow::{Context, Result};
use std::sync::Arc;

use super::activity::Actor;
use crate::db::Repository;
use crate::models::{ContentVersion, Record};

/// Stores snapshots of content records before they change
pub struct VersionService {
    repo: Arc<dyn Repository<ContentVersion>>,
}

impl VersionService {
    pub fn new(repo: Arc<dyn Repository<ContentVersion>>) -> Self {
        Self { repo }
    }

    /// Save the current state of `record` as the next version
    pub async fn snapshot<T: Record>(
        &self,
        record: &T,
        actor: &Actor,
        change_summary: Option<String>,
    ) -> Result<ContentVersion> {
        let existing = self.list(T::COLLECTION, record.id()).await?;
        let next = existing.first().map(|v| v.version + 1).unwrap_or(1);

        let snapshot = serde_json::to_value(record)
            .with_context(|| format!("Failed to snapshot {} {}", T::COLLECTION, record.id()))?;

        let mut version = ContentVersion::new(T::COLLECTION, record.id(), next, snapshot);
        version.changed_by = actor.username.clone();
        version.change_summary = change_summary;

        self.repo
            .create(&version)
            .await
            .context("Failed to store content version")
    }

    /// Versions of one record, newest first
    pub async fn list(&self, entity_type: &str, entity_id: &str) -> Result<Vec<ContentVersion>> {
        let mut versions: Vec<ContentVersion> = self
            .repo
            .list_all()
            .await
            .context("Failed to list content versions")?
            .into_iter()
            .filter(|v| v.entity_type == entity_type && v.entity_id == entity_id)
            .collect();
        versions.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(versions)
    }

    pub async fn get(
        &self,
        entity_type: &str,
        entity_id: &str,
        version: i32,
    ) -> Result<Option<ContentVersion>> {
        Ok(self
            .list(entity_type, entity_id)
            .await?
            .into_iter()
            .find(|v| v.version == version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::JsonRepository;
    use crate::models::Testimonial;

    #[tokio::test]
    async fn test_versions_increment_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let versions = VersionService::new(JsonRepository::boxed(dir.path()));
        let actor = Actor::system();

        let mut a = Testimonial::new("A".into(), "first".into(), 5);
        let b = Testimonial::new("B".into(), "other".into(), 4);

        versions.snapshot(&a, &actor, None).await.unwrap();
        a.content = "second".into();
        let v2 = versions
            .snapshot(&a, &actor, Some("typo".into()))
            .await
            .unwrap();
        let b1 = versions.snapshot(&b, &actor, None).await.unwrap();

        assert_eq!(v2.version, 2);
        assert_eq!(v2.changed_by.as_deref(), Some("system"));
        assert_eq!(b1.version, 1);

        let list = versions.list("testimonials", &a.id).await.unwrap();
        assert_eq!(list.iter().map(|v| v.version).collect::<Vec<_>>(), vec![2, 1]);

        let first = versions.get("testimonials", &a.id, 1).await.unwrap().unwrap();
        assert_eq!(first.snapshot["content"], "first");
        assert!(versions.get("testimonials", &a.id, 3).await.unwrap().is_none());
    }
}
