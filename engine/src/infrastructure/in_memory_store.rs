//! In-memory version store
//! Used by tests and anywhere durability is explicitly not wanted.

use crate::domain::ports::VersionStore;
use crate::domain::value_objects::{SubjectId, VersionRecord};
use crate::domain::DomainError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryVersionStore {
    records: RwLock<HashMap<SubjectId, VersionRecord>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn get(&self, subject: &SubjectId) -> Result<Option<VersionRecord>, DomainError> {
        Ok(self.records.read().await.get(subject).cloned())
    }

    async fn set(&self, subject: &SubjectId, version: &str) -> Result<(), DomainError> {
        self.records.write().await.insert(
            subject.clone(),
            VersionRecord::new(subject.clone(), version),
        );
        Ok(())
    }

    async fn all(&self) -> Result<HashMap<SubjectId, VersionRecord>, DomainError> {
        Ok(self.records.read().await.clone())
    }
}
