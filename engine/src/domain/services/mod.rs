mod reconciliation;
mod recovery;
mod remote_probe;
mod seeding;
mod supervisor;

pub use reconciliation::plan;
pub use recovery::{
    ControllerPhase, RecoveryController, TickOptions, TickOutcome, TickReport,
};
pub use remote_probe::{ProbeOutcome, RemoteStateProbe, RetryPolicy};
pub use seeding::{seed_store, SeedSummary};
pub use supervisor::{ProcessSupervisor, SupervisorTimeouts};
