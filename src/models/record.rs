//! Storage record trait

use serde::{de::DeserializeOwned, Serialize};

/// A persisted entity.
///
/// `COLLECTION` names both the JSON file (`<COLLECTION>.json`) and the
/// collection shown in migration reports. `key` is the unique field used for
/// upserts; it defaults to the id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn id(&self) -> &str;

    fn key(&self) -> &str {
        self.id()
    }
}

/// Generate a new record identifier
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
