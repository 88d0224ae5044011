//! Orchestration engine for a supervised game server.
//!
//! The engine watches an authoritative remote content source for new server
//! builds and add-on package versions, reconciles them against the locally
//! recorded state, and restarts the supervised server process safely when
//! something changed or when it crashed.

pub mod domain;
pub mod infrastructure;

pub use domain::{DomainError, Result};
pub use domain::{
    Action, ActionKind, ActionPlan, ControllerPhase, EventKind, Notification, ProcessSupervisor,
    RecoveryController, RemoteStateProbe, RestartPolicyHint, RetryPolicy, Subject, SubjectId,
    SubjectKind, SupervisorState, SupervisorTimeouts, TickOptions, TickOutcome, TickReport,
    VersionRecord,
};
pub use infrastructure::Config;
