//! JSON file repository

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::{Repository, UpsertOutcome};
use crate::db::json::JsonCollection;
use crate::models::Record;

/// `Repository<T>` over one JSON collection file.
///
/// Ids and keys are unique, mirroring the PostgreSQL constraints.
pub struct JsonRepository<T> {
    collection: JsonCollection<T>,
}

impl<T: Record> JsonRepository<T> {
    pub fn new(dir: &Path) -> Self {
        Self {
            collection: JsonCollection::open(dir),
        }
    }

    pub fn boxed(dir: &Path) -> Arc<dyn Repository<T>> {
        Arc::new(Self::new(dir))
    }
}

fn check_unique<T: Record>(records: &[T], record: &T) -> Result<()> {
    for existing in records.iter().filter(|r| r.id() != record.id()) {
        if existing.key() == record.key() {
            bail!("Duplicate {} key: {}", T::COLLECTION, record.key());
        }
    }
    Ok(())
}

#[async_trait]
impl<T: Record> Repository<T> for JsonRepository<T> {
    async fn create(&self, record: &T) -> Result<T> {
        let record = record.clone();
        self.collection
            .modify(move |records| {
                if records.iter().any(|r| r.id() == record.id()) {
                    bail!("Duplicate {} id: {}", T::COLLECTION, record.id());
                }
                check_unique(records, &record)?;
                records.push(record.clone());
                Ok(record)
            })
            .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<T>> {
        let records = self.collection.load().await?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<T>> {
        let records = self.collection.load().await?;
        Ok(records.into_iter().find(|r| r.key() == key))
    }

    async fn list_all(&self) -> Result<Vec<T>> {
        self.collection.load().await
    }

    async fn update(&self, record: &T) -> Result<T> {
        let record = record.clone();
        self.collection
            .modify(move |records| {
                check_unique(records, &record)?;
                match records.iter_mut().find(|r| r.id() == record.id()) {
                    Some(slot) => {
                        *slot = record.clone();
                        Ok(record)
                    }
                    None => bail!("{} record {} not found", T::COLLECTION, record.id()),
                }
            })
            .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.collection
            .modify(move |records| {
                let before = records.len();
                records.retain(|r| r.id() != id);
                Ok(records.len() != before)
            })
            .await
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.collection.load().await?.len() as i64)
    }

    async fn upsert(&self, record: &T) -> Result<UpsertOutcome> {
        let record = record.clone();
        self.collection
            .modify(move |records| {
                let slot = records
                    .iter()
                    .position(|r| r.id() == record.id())
                    .or_else(|| records.iter().position(|r| r.key() == record.key()));
                match slot {
                    Some(i) => {
                        let taken = records
                            .iter()
                            .enumerate()
                            .any(|(j, r)| j != i && r.key() == record.key());
                        if taken {
                            bail!("Duplicate {} key: {}", T::COLLECTION, record.key());
                        }
                        records[i] = record;
                        Ok(UpsertOutcome::Updated)
                    }
                    None => {
                        records.push(record);
                        Ok(UpsertOutcome::Inserted)
                    }
                }
            })
            .await
    }

    async fn increment(&self, id: &str, field: &str) -> Result<Option<T>> {
        let id = id.to_string();
        let field = field.to_string();
        self.collection
            .modify(move |records| {
                let Some(slot) = records.iter_mut().find(|r| r.id() == id) else {
                    return Ok(None);
                };
                let mut value = serde_json::to_value(&*slot)?;
                let Some(current) = value.get(&field).and_then(Value::as_i64) else {
                    bail!("{} has no integer field {}", T::COLLECTION, field);
                };
                value[field.as_str()] = Value::from(current + 1);
                *slot = serde_json::from_value(value)?;
                Ok(Some(slot.clone()))
            })
            .await
    }
}
