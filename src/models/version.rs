//! Content version snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{new_id, Record};

/// Snapshot of a content record taken before it changed.
///
/// `version` starts at 1 and increases per `(entity_type, entity_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub version: i32,
    pub snapshot: Value,
    #[serde(default)]
    pub changed_by: Option<String>,
    #[serde(default)]
    pub change_summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ContentVersion {
    pub fn new(entity_type: &str, entity_id: &str, version: i32, snapshot: Value) -> Self {
        Self {
            id: new_id(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            version,
            snapshot,
            changed_by: None,
            change_summary: None,
            created_at: Utc::now(),
        }
    }
}

impl Record for ContentVersion {
    const COLLECTION: &'static str = "content-versions";

    fn id(&self) -> &str {
        &self.id
    }
}
