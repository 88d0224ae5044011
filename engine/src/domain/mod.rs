pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use error::{DomainError, Result};
pub use services::{
    plan, seed_store, ControllerPhase, ProbeOutcome, ProcessSupervisor, RecoveryController,
    RemoteStateProbe, RetryPolicy, SeedSummary, SupervisorTimeouts, TickOptions, TickOutcome,
    TickReport,
};
pub use value_objects::{
    Action, ActionKind, ActionPlan, EventKind, Notification, RemoteVersion, RestartPolicyHint,
    Subject, SubjectId, SubjectKind, SupervisorState, VersionRecord,
};
