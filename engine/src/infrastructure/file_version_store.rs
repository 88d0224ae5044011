//! File-backed version store
//!
//! One JSON document keyed by subject id. Every write rewrites the document
//! through a temp-file-then-rename so a crash mid-write can never truncate
//! previously stored records.

use crate::domain::ports::VersionStore;
use crate::domain::value_objects::{SubjectId, VersionRecord};
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

pub struct FileVersionStore {
    path: PathBuf,
    records: RwLock<HashMap<SubjectId, VersionRecord>>,
}

impl FileVersionStore {
    /// Open the store, loading existing records. A missing file is an empty
    /// store, not an error.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<HashMap<SubjectId, VersionRecord>>(&bytes)
                .map_err(|e| {
                    DomainError::Store(format!("corrupt store at {}: {}", path.display(), e))
                })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(DomainError::Store(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        debug!(path = %path.display(), records = records.len(), "version store opened");
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and atomically replace the on-disk document.
    async fn persist(&self, records: &HashMap<SubjectId, VersionRecord>) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| DomainError::Store(format!("serialize failed: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    DomainError::Store(format!("cannot create {}: {}", parent.display(), e))
                })?;
            }
        }
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| DomainError::Store(format!("cannot write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            DomainError::Store(format!(
                "cannot rename {} to {}: {}",
                tmp.display(),
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl VersionStore for FileVersionStore {
    async fn get(&self, subject: &SubjectId) -> Result<Option<VersionRecord>> {
        Ok(self.records.read().await.get(subject).cloned())
    }

    async fn set(&self, subject: &SubjectId, version: &str) -> Result<()> {
        let mut records = self.records.write().await;
        let previous = records.insert(
            subject.clone(),
            VersionRecord::new(subject.clone(), version),
        );

        if let Err(e) = self.persist(&records).await {
            // Roll the in-memory copy back so a later successful write for
            // another subject cannot persist this failed one.
            match previous {
                Some(record) => {
                    records.insert(subject.clone(), record);
                }
                None => {
                    records.remove(subject);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    async fn all(&self) -> Result<HashMap<SubjectId, VersionRecord>> {
        Ok(self.records.read().await.clone())
    }
}
