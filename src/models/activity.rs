//! Admin activity log model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::record::{new_id, Record};

/// One admin action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// e.g. "create", "update", "delete", "login"
    pub action: String,
    /// Collection name of the affected entity
    pub entity_type: String,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default = "empty_object")]
    pub details: Value,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl ActivityLog {
    pub fn new(action: &str, entity_type: &str, entity_id: Option<String>) -> Self {
        Self {
            id: new_id(),
            user_id: None,
            username: None,
            action: action.to_string(),
            entity_type: entity_type.to_string(),
            entity_id,
            details: empty_object(),
            ip_address: None,
            created_at: Utc::now(),
        }
    }
}

impl Record for ActivityLog {
    const COLLECTION: &'static str = "activity-logs";

    fn id(&self) -> &str {
        &self.id
    }
}
