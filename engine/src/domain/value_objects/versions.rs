//! Version records for tracked subjects

use crate::domain::value_objects::SubjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last version known to have been successfully applied for a subject.
///
/// Persisted across restarts. Advanced only after the corresponding
/// fetch-and-apply step reported success, so a partial apply never skips its
/// retry on the next tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub subject_id: SubjectId,
    pub applied_version: String,
    pub applied_at: DateTime<Utc>,
}

impl VersionRecord {
    pub fn new(subject_id: SubjectId, applied_version: impl Into<String>) -> Self {
        Self {
            subject_id,
            applied_version: applied_version.into(),
            applied_at: Utc::now(),
        }
    }
}

/// Version reported by the remote content source for a subject.
///
/// Produced fresh each tick; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVersion {
    pub subject_id: SubjectId,
    pub remote_version: String,
    pub fetched_at: DateTime<Utc>,
}

impl RemoteVersion {
    pub fn new(subject_id: SubjectId, remote_version: impl Into<String>) -> Self {
        Self {
            subject_id,
            remote_version: remote_version.into(),
            fetched_at: Utc::now(),
        }
    }
}
