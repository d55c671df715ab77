//! JSON file collections
//!
//! Every collection lives in `<data_dir>/<COLLECTION>.json` as a JSON array.
//! A missing or empty file reads as an empty collection. Writes go through a
//! per-collection mutex and replace the file atomically (temp file + rename),
//! so readers never observe a half-written file.

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::Record;

/// Path of the file backing collection `T` inside `dir`
pub fn collection_path<T: Record>(dir: &Path) -> PathBuf {
    dir.join(format!("{}.json", T::COLLECTION))
}

/// Read a collection file as raw JSON values.
///
/// Returns `Ok(None)` when the file does not exist.
pub async fn read_raw(path: &Path) -> Result<Option<Vec<Value>>> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    if content.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }

    let values: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;
    Ok(Some(values))
}

/// A typed JSON collection file
pub struct JsonCollection<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> JsonCollection<T> {
    pub fn open(dir: &Path) -> Self {
        Self {
            path: collection_path::<T>(dir),
            write_lock: Mutex::new(()),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record
    pub async fn load(&self) -> Result<Vec<T>> {
        let Some(values) = read_raw(&self.path).await? else {
            return Ok(Vec::new());
        };

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                serde_json::from_value(value).with_context(|| {
                    format!("Invalid record #{} in {}", i, self.path.display())
                })
            })
            .collect()
    }

    /// Load, change and save the collection while holding the write lock.
    ///
    /// Nothing is written when `f` returns an error.
    pub async fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> Result<R>,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let result = f(&mut records)?;
        self.save(&records).await?;
        Ok(result)
    }

    async fn save(&self, records: &[T]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)
            .with_context(|| format!("Failed to serialize {}", T::COLLECTION))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .context("JSON writer task panicked")?
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Testimonial;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let collection = JsonCollection::<Testimonial>::open(dir.path());
        assert!(collection.load().await.unwrap().is_empty());
        assert!(read_raw(collection.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("testimonials.json"), "  \n").unwrap();
        let collection = JsonCollection::<Testimonial>::open(dir.path());
        assert!(collection.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_modify_persists() {
        let dir = tempfile::tempdir().unwrap();
        let collection = JsonCollection::<Testimonial>::open(dir.path());

        collection
            .modify(|records| {
                records.push(Testimonial::new("Ana".into(), "Great".into(), 5));
                Ok(())
            })
            .await
            .unwrap();

        let reopened = JsonCollection::<Testimonial>::open(dir.path());
        let records = reopened.load().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].client_name, "Ana");
    }

    #[tokio::test]
    async fn test_failed_modify_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let collection = JsonCollection::<Testimonial>::open(dir.path());

        let result: Result<()> = collection
            .modify(|records| {
                records.push(Testimonial::new("Ana".into(), "Great".into(), 5));
                anyhow::bail!("rejected")
            })
            .await;

        assert!(result.is_err());
        assert!(!collection.path().exists());
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("testimonials.json"), "{\"not\": \"array\"}").unwrap();
        let collection = JsonCollection::<Testimonial>::open(dir.path());
        assert!(collection.load().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let collection = std::sync::Arc::new(JsonCollection::<Testimonial>::open(dir.path()));

        let mut handles = Vec::new();
        for i in 0..10 {
            let collection = collection.clone();
            handles.push(tokio::spawn(async move {
                collection
                    .modify(|records| {
                        records.push(Testimonial::new(format!("Client {}", i), "Ok".into(), 4));
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(collection.load().await.unwrap().len(), 10);
    }
}
