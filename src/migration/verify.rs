//! Compare JSON collections with another storage backend

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

use super::render_table;
use crate::db::json::{collection_path, read_raw};
use crate::db::{Repositories, Repository};
use crate::models::Record;

/// A record present on both sides whose fields differ
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldMismatch {
    pub key: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionDiff {
    pub collection: String,
    pub json_count: usize,
    pub db_count: usize,
    /// JSON entries that could not be parsed
    pub invalid: usize,
    /// Keys only in the JSON file
    pub missing: Vec<String>,
    /// Keys only in the database
    pub extra: Vec<String>,
    pub mismatched: Vec<FieldMismatch>,
    /// Keys held by more than one JSON entry
    pub duplicates: Vec<String>,
}

impl CollectionDiff {
    pub fn is_ok(&self) -> bool {
        self.invalid == 0
            && self.json_count == self.db_count
            && self.duplicates.is_empty()
            && self.missing.is_empty()
            && self.extra.is_empty()
            && self.mismatched.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub collections: Vec<CollectionDiff>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.collections.iter().all(CollectionDiff::is_ok)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionDiff> {
        self.collections.iter().find(|c| c.collection == name)
    }

    /// Summary table followed by the individual differences
    pub fn render(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .collections
            .iter()
            .map(|c| {
                vec![
                    c.collection.clone(),
                    c.json_count.to_string(),
                    c.db_count.to_string(),
                    c.missing.len().to_string(),
                    c.extra.len().to_string(),
                    c.mismatched.len().to_string(),
                    if c.is_ok() { "ok" } else { "FAIL" }.to_string(),
                ]
            })
            .collect();
        let mut out = render_table(
            &["Collection", "JSON", "Database", "Missing", "Extra", "Differ", "Status"],
            &rows,
        );

        for diff in self.collections.iter().filter(|c| !c.is_ok()) {
            out.push('\n');
            out.push_str(&format!("{}:\n", diff.collection));
            if diff.invalid > 0 {
                out.push_str(&format!("  {} unreadable JSON entries\n", diff.invalid));
            }
            if diff.json_count != diff.db_count {
                out.push_str(&format!(
                    "  record count differs: {} in JSON, {} in database\n",
                    diff.json_count, diff.db_count
                ));
            }
            for key in &diff.duplicates {
                out.push_str(&format!("  duplicate key in JSON: {key}\n"));
            }
            for key in &diff.missing {
                out.push_str(&format!("  missing from database: {key}\n"));
            }
            for key in &diff.extra {
                out.push_str(&format!("  only in database: {key}\n"));
            }
            for m in &diff.mismatched {
                out.push_str(&format!("  {} differs in: {}\n", m.key, m.fields.join(", ")));
            }
        }
        out
    }
}

/// Rewrite every RFC 3339 timestamp string at microsecond precision, which is
/// what PostgreSQL stores.
fn normalize(value: Value) -> Value {
    match value {
        Value::String(s) => match DateTime::parse_from_rfc3339(&s) {
            Ok(ts) => Value::String(
                ts.trunc_subsecs(6)
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Micros, true),
            ),
            Err(_) => Value::String(s),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(normalize).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, normalize(v))).collect())
        }
        other => other,
    }
}

/// Serialize a record into its normalized comparison form
fn comparable<T: Record>(record: &T) -> Result<Value> {
    let value = serde_json::to_value(record)
        .with_context(|| format!("Failed to serialize {} record", T::COLLECTION))?;
    Ok(normalize(value))
}

/// Names of the top-level fields whose values differ
fn differing_fields(left: &Value, right: &Value) -> Vec<String> {
    match (left, right) {
        (Value::Object(l), Value::Object(r)) => {
            let mut names: Vec<String> = l
                .keys()
                .chain(r.keys())
                .filter(|k| l.get(*k) != r.get(*k))
                .cloned()
                .collect();
            names.sort();
            names.dedup();
            names
        }
        _ if left != right => vec!["<record>".to_string()],
        _ => Vec::new(),
    }
}

pub async fn verify_collection<T: Record>(
    data_dir: &Path,
    target: &dyn Repository<T>,
) -> Result<CollectionDiff> {
    let mut diff = CollectionDiff {
        collection: T::COLLECTION.to_string(),
        ..Default::default()
    };

    let mut expected = BTreeMap::new();
    let values = read_raw(&collection_path::<T>(data_dir))
        .await?
        .unwrap_or_default();
    diff.json_count = values.len();
    for value in values {
        match serde_json::from_value::<T>(value) {
            Ok(record) => {
                let key = record.key().to_string();
                if expected.insert(key.clone(), comparable(&record)?).is_some() {
                    diff.duplicates.push(key);
                }
            }
            Err(e) => {
                tracing::warn!("Unreadable {} entry: {}", T::COLLECTION, e);
                diff.invalid += 1;
            }
        }
    }

    let stored = target.list_all().await?;
    diff.db_count = stored.len();
    let mut actual = BTreeMap::new();
    for record in &stored {
        actual.insert(record.key().to_string(), comparable(record)?);
    }

    for (key, json_value) in &expected {
        match actual.get(key) {
            None => diff.missing.push(key.clone()),
            Some(db_value) => {
                let fields = differing_fields(json_value, db_value);
                if !fields.is_empty() {
                    diff.mismatched.push(FieldMismatch {
                        key: key.clone(),
                        fields,
                    });
                }
            }
        }
    }
    diff.extra = actual
        .keys()
        .filter(|key| !expected.contains_key(*key))
        .cloned()
        .collect();

    Ok(diff)
}

/// Compare every collection under `data_dir` with `target`
pub async fn verify(data_dir: &Path, target: &Repositories) -> Result<VerifyReport> {
    let collections = vec![
        verify_collection(data_dir, target.users.as_ref()).await?,
        verify_collection(data_dir, target.blog_posts.as_ref()).await?,
        verify_collection(data_dir, target.properties.as_ref()).await?,
        verify_collection(data_dir, target.testimonials.as_ref()).await?,
        verify_collection(data_dir, target.subscribers.as_ref()).await?,
        verify_collection(data_dir, target.contacts.as_ref()).await?,
        verify_collection(data_dir, target.activity.as_ref()).await?,
        verify_collection(data_dir, target.versions.as_ref()).await?,
    ];
    Ok(VerifyReport { collections })
}
