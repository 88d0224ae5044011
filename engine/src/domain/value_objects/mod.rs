mod action;
mod event;
mod restart_policy;
mod subject;
mod supervisor_state;
mod versions;

pub use action::{Action, ActionKind, ActionPlan};
pub use event::{EventKind, Notification};
pub use restart_policy::RestartPolicyHint;
pub use subject::{Subject, SubjectId, SubjectKind};
pub use supervisor_state::SupervisorState;
pub use versions::{RemoteVersion, VersionRecord};
