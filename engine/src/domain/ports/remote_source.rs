//! RemoteContentSource port
//! Interface to the authoritative remote content source

use crate::domain::value_objects::Subject;
use crate::domain::DomainError;
use async_trait::async_trait;

/// Port for querying and fetching remote content.
///
/// The transport behind this port (command-line downloader, HTTP API) is a
/// collaborator; the orchestrator only decides when to call it. Errors are
/// typed, never silent defaults.
#[async_trait]
pub trait RemoteContentSource: Send + Sync {
    /// Current authoritative version identifier for a subject.
    ///
    /// The returned string is opaque; any difference from the recorded local
    /// version counts as drift.
    async fn query_version(&self, subject: &Subject) -> Result<String, DomainError>;

    /// Download and install the subject's content into its configured
    /// destination. Success here is the precondition for advancing the
    /// recorded version.
    async fn fetch(&self, subject: &Subject) -> Result<(), DomainError>;
}
