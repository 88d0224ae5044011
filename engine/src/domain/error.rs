//! Domain error taxonomy
//!
//! Per-subject errors stay local to that subject; lifecycle errors are fatal
//! to the current tick but never to the orchestrator itself.

use crate::domain::value_objects::{SubjectId, SupervisorState};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Remote lookup failed but is worth retrying within the same probe call.
    #[error("transient remote failure for '{subject}': {message}")]
    TransientRemote { subject: SubjectId, message: String },

    /// Remote lookup failed after retry exhaustion. The subject is skipped
    /// for this tick and retried on the next one.
    #[error("remote lookup failed for '{subject}': {message}")]
    PersistentRemote { subject: SubjectId, message: String },

    /// Fetching or recording an update for a subject failed. Remaining plan
    /// entries in the same tick are aborted.
    #[error("apply failed for '{subject}': {message}")]
    ApplyFailure { subject: SubjectId, message: String },

    /// The server did not become live within the startup timeout.
    #[error("server did not become live within {timeout_sec}s")]
    StartupTimeout { timeout_sec: u64 },

    /// Could not signal or probe the supervised process. Escalated rather
    /// than treated as "stopped".
    #[error("supervisor I/O error: {0}")]
    SupervisorIo(String),

    #[error("invalid supervisor state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: SupervisorState,
        to: SupervisorState,
    },

    #[error("version store error: {0}")]
    Store(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
