//! VersionStore port
//! Durable record of the last version applied for each subject

use crate::domain::value_objects::{SubjectId, VersionRecord};
use crate::domain::DomainError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Port for the durable applied-version record.
///
/// Writes are single-subject and independent: a failed write must not
/// corrupt previously stored records, and success means the record is
/// durable, not merely buffered.
#[async_trait]
pub trait VersionStore: Send + Sync {
    /// Last applied version for a subject, if any was ever recorded.
    async fn get(&self, subject: &SubjectId) -> Result<Option<VersionRecord>, DomainError>;

    /// Atomically upsert the applied version for one subject.
    async fn set(&self, subject: &SubjectId, version: &str) -> Result<(), DomainError>;

    /// All recorded subjects.
    async fn all(&self) -> Result<HashMap<SubjectId, VersionRecord>, DomainError>;
}
