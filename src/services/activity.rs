//! Admin activity log service

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

use crate::db::Repository;
use crate::models::{ActivityLog, AdminUser};

/// Who performed an admin action
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub ip_address: Option<String>,
}

impl Actor {
    pub fn user(user: &AdminUser, ip_address: Option<String>) -> Self {
        Self {
            user_id: Some(user.id.clone()),
            username: Some(user.username.clone()),
            ip_address,
        }
    }

    /// Background jobs such as the scheduler
    pub fn system() -> Self {
        Self {
            username: Some("system".to_string()),
            ..Default::default()
        }
    }
}

pub struct ActivityService {
    repo: Arc<dyn Repository<ActivityLog>>,
}

impl ActivityService {
    pub fn new(repo: Arc<dyn Repository<ActivityLog>>) -> Self {
        Self { repo }
    }

    /// Record an action.
    ///
    /// Failures are logged and swallowed: the action itself already happened.
    pub async fn record(
        &self,
        actor: &Actor,
        action: &str,
        entity_type: &str,
        entity_id: Option<&str>,
        details: Value,
    ) {
        let mut entry = ActivityLog::new(action, entity_type, entity_id.map(str::to_string));
        entry.user_id = actor.user_id.clone();
        entry.username = actor.username.clone();
        entry.ip_address = actor.ip_address.clone();
        if details.is_object() {
            entry.details = details;
        }

        if let Err(e) = self.repo.create(&entry).await {
            tracing::error!(
                "Failed to record activity {} on {}: {:#}",
                action,
                entity_type,
                e
            );
        }
    }

    /// Newest entries first, optionally limited to one entity type
    pub async fn recent(&self, limit: usize, entity_type: Option<&str>) -> Result<Vec<ActivityLog>> {
        let mut entries = self
            .repo
            .list_all()
            .await
            .context("Failed to list activity")?;

        if let Some(kind) = entity_type {
            entries.retain(|e| e.entity_type == kind);
        }
        // Stored oldest first; reversing keeps insertion order for equal timestamps
        entries.reverse();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);
        Ok(entries)
    }
}
