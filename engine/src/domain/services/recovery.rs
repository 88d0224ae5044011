//! Recovery controller
//!
//! The top-level state machine tying the version store, remote probe,
//! reconciliation, and process supervisor together. One tick runs to
//! completion before the next begins, which serializes every mutation of the
//! version store and the process handle:
//!
//!   Idle -> Monitoring (crash check) -> Reconciling -> Applying ->
//!   Restarting -> Idle
//!
//! A running server found dead is restarted directly, without consulting the
//! remote source: a crash never triggers reconciliation, only a restart.

use crate::domain::ports::{NotificationSink, RemoteContentSource, VersionStore};
use crate::domain::services::reconciliation;
use crate::domain::services::remote_probe::RemoteStateProbe;
use crate::domain::services::supervisor::ProcessSupervisor;
use crate::domain::value_objects::{
    Action, ActionPlan, EventKind, Notification, Subject, SupervisorState,
};
use crate::domain::{DomainError, Result, SubjectId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Phase the controller is in while a tick executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Idle,
    Reconciling,
    Applying,
    Restarting,
    Monitoring,
}

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerPhase::Idle => write!(f, "idle"),
            ControllerPhase::Reconciling => write!(f, "reconciling"),
            ControllerPhase::Applying => write!(f, "applying"),
            ControllerPhase::Restarting => write!(f, "restarting"),
            ControllerPhase::Monitoring => write!(f, "monitoring"),
        }
    }
}

/// Per-tick behavior switches. Passed in explicitly; the tick reads no
/// global state.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOptions {
    /// Compute and report the plan, but never stop, apply, or restart.
    pub dry_run: bool,
}

/// Summary of what one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Empty plan, server verified alive.
    NoDrift,
    /// All plan entries applied and the server came back up.
    Applied { subjects: Vec<SubjectId> },
    /// An entry failed; later entries were skipped, earlier ones stand.
    ApplyFailed {
        applied: Vec<SubjectId>,
        failed: SubjectId,
        skipped: Vec<SubjectId>,
    },
    /// The server crashed outside the update path and was restarted.
    CrashRecovered,
    /// The server did not come back up; retried on the next tick.
    StartupTimeout,
    /// Dry run: drift was found but nothing was touched.
    PlanOnly,
}

/// Transient per-tick record used to build the notification payload and the
/// caller-visible report. Constructed and discarded each tick.
#[derive(Debug)]
pub struct TickReport {
    pub plan: ActionPlan,
    pub state_before: SupervisorState,
    pub state_after: SupervisorState,
    pub outcome: TickOutcome,
}

/// Orchestrates the periodic reconcile/apply/restart cycle and crash
/// recovery for the supervised server.
pub struct RecoveryController {
    subjects: Vec<Subject>,
    server_subject: SubjectId,
    store: Arc<dyn VersionStore>,
    probe: RemoteStateProbe,
    source: Arc<dyn RemoteContentSource>,
    supervisor: ProcessSupervisor,
    sink: Arc<dyn NotificationSink>,
    options: TickOptions,
    phase: ControllerPhase,
}

impl RecoveryController {
    pub fn new(
        subjects: Vec<Subject>,
        store: Arc<dyn VersionStore>,
        probe: RemoteStateProbe,
        source: Arc<dyn RemoteContentSource>,
        supervisor: ProcessSupervisor,
        sink: Arc<dyn NotificationSink>,
        options: TickOptions,
    ) -> Result<Self> {
        let server_subject = subjects
            .iter()
            .find(|s| s.is_server_build())
            .map(|s| s.id.clone())
            .ok_or_else(|| {
                DomainError::Config("watch list contains no server-build subject".to_string())
            })?;
        Ok(Self {
            subjects,
            server_subject,
            store,
            probe,
            source,
            supervisor,
            sink,
            options,
            phase: ControllerPhase::Idle,
        })
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn supervisor_state(&self) -> SupervisorState {
        self.supervisor.state()
    }

    /// Run one complete cycle: crash check, reconcile, apply, restart,
    /// verify, notify. Never panics the loop; every failure is deferred to
    /// the next tick.
    pub async fn tick(&mut self) -> TickReport {
        let state_before = self.supervisor.state();

        // Crash detection comes first and bypasses reconciliation entirely.
        self.set_phase(ControllerPhase::Monitoring);
        if state_before.is_running() && !self.supervisor.is_alive() {
            self.supervisor.mark_crashed();
            let outcome = self.recover_from_crash().await;
            self.set_phase(ControllerPhase::Idle);
            return TickReport {
                plan: ActionPlan::empty(),
                state_before,
                state_after: self.supervisor.state(),
                outcome,
            };
        }

        self.set_phase(ControllerPhase::Reconciling);
        let plan = self.build_plan().await;

        let outcome = if plan.is_empty() {
            self.finish_quiet_tick(state_before).await
        } else if self.options.dry_run {
            for action in plan.iter() {
                info!(
                    subject = %action.subject.id,
                    kind = %action.kind,
                    from = action.from_version.as_deref().unwrap_or("-"),
                    to = %action.to_version,
                    "dry run: would apply"
                );
            }
            TickOutcome::PlanOnly
        } else {
            self.apply_and_restart(&plan).await
        };

        self.set_phase(ControllerPhase::Idle);
        TickReport {
            plan,
            state_before,
            state_after: self.supervisor.state(),
            outcome,
        }
    }

    /// Tick on a fixed interval until shutdown is requested.
    ///
    /// Shutdown is honored only between ticks, never while the server is
    /// stopped mid-update; the controller finishes bringing it back up
    /// first. On the way out the server is stopped deliberately, with the
    /// reason logged.
    pub async fn run(&mut self, poll_interval: Duration, shutdown: CancellationToken) {
        info!(
            interval_sec = poll_interval.as_secs(),
            subjects = self.subjects.len(),
            "recovery controller started"
        );

        loop {
            let report = self.tick().await;
            debug!(
                outcome = ?report.outcome,
                state = %report.state_after,
                "tick complete"
            );

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(poll_interval) => {}
            }
        }

        info!("shutdown requested, stopping supervised server");
        if self.supervisor.state().is_running() {
            if let Err(e) = self.supervisor.stop().await {
                error!(error = %e, "failed to stop server during shutdown");
            }
        }
        info!("recovery controller stopped");
    }

    fn set_phase(&mut self, phase: ControllerPhase) {
        debug!(from = %self.phase, to = %phase, "controller phase");
        self.phase = phase;
    }

    async fn notify(&self, kind: EventKind, subjects: Vec<SubjectId>) {
        self.sink
            .send(&Notification::now(kind, subjects))
            .await;
    }

    /// Restart after an unplanned exit. No remote queries happen here.
    async fn recover_from_crash(&mut self) -> TickOutcome {
        error!("server crashed outside the update path, restarting");
        self.notify(EventKind::Crashed, vec![self.server_subject.clone()])
            .await;

        self.set_phase(ControllerPhase::Restarting);
        match self.supervisor.start().await {
            Ok(()) => {
                info!("server recovered after crash");
                self.notify(EventKind::Recovered, vec![self.server_subject.clone()])
                    .await;
                TickOutcome::CrashRecovered
            }
            Err(e) => {
                error!(error = %e, "server failed to come back after crash");
                self.notify(EventKind::StartupTimeout, vec![self.server_subject.clone()])
                    .await;
                TickOutcome::StartupTimeout
            }
        }
    }

    async fn build_plan(&self) -> ActionPlan {
        let local = match self.store.all().await {
            Ok(records) => records,
            Err(e) => {
                // An unreadable store is treated as empty: re-applying is
                // idempotent, silently skipping a needed update is not.
                error!(error = %e, "could not read version store, assuming nothing installed");
                HashMap::new()
            }
        };

        let probed = self.probe.fetch(&self.subjects).await;
        for (subject, err) in &probed.failures {
            warn!(subject = %subject, error = %err, "subject skipped this tick");
        }

        reconciliation::plan(&self.subjects, &local, &probed.versions)
    }

    /// Empty-plan path: make sure the server is up, then report.
    async fn finish_quiet_tick(&mut self, state_before: SupervisorState) -> TickOutcome {
        if self.supervisor.state().is_running() {
            self.notify(EventKind::NoDrift, Vec::new()).await;
            return TickOutcome::NoDrift;
        }
        if self.options.dry_run {
            return TickOutcome::NoDrift;
        }

        // Bootstrap start, or retry after an earlier failed start.
        self.set_phase(ControllerPhase::Restarting);
        match self.supervisor.start().await {
            Ok(()) => {
                if state_before == SupervisorState::Crashed {
                    self.notify(EventKind::Recovered, vec![self.server_subject.clone()])
                        .await;
                } else {
                    self.notify(EventKind::NoDrift, Vec::new()).await;
                }
                TickOutcome::NoDrift
            }
            Err(e) => {
                error!(error = %e, "server failed to start");
                self.notify(EventKind::StartupTimeout, vec![self.server_subject.clone()])
                    .await;
                TickOutcome::StartupTimeout
            }
        }
    }

    /// Non-empty plan: stop, apply entries in order (fail-fast), restart.
    async fn apply_and_restart(&mut self, plan: &ActionPlan) -> TickOutcome {
        self.set_phase(ControllerPhase::Applying);

        if self.supervisor.state().is_running() {
            if let Err(e) = self.supervisor.stop().await {
                // Bounded stop should not fail, but if it does the update
                // cannot proceed safely this tick.
                error!(error = %e, "could not stop server for update, deferring plan");
                let first = plan.actions()[0].subject.id.clone();
                self.notify(EventKind::ApplyFailed, vec![first.clone()]).await;
                return TickOutcome::ApplyFailed {
                    applied: Vec::new(),
                    failed: first,
                    skipped: plan.actions()[1..]
                        .iter()
                        .map(|a| a.subject.id.clone())
                        .collect(),
                };
            }
        }

        let mut applied: Vec<SubjectId> = Vec::new();
        let mut failed: Option<SubjectId> = None;
        let mut skipped: Vec<SubjectId> = Vec::new();

        for (index, action) in plan.iter().enumerate() {
            match self.apply_action(action).await {
                Ok(()) => {
                    info!(
                        subject = %action.subject.id,
                        version = %action.to_version,
                        "applied"
                    );
                    applied.push(action.subject.id.clone());
                }
                Err(e) => {
                    error!(subject = %action.subject.id, error = %e, "apply failed, aborting remaining entries");
                    failed = Some(action.subject.id.clone());
                    skipped = plan.actions()[index + 1..]
                        .iter()
                        .map(|a| a.subject.id.clone())
                        .collect();
                    break;
                }
            }
        }

        // The server is restarted with whatever was successfully applied so
        // it is never left down.
        self.set_phase(ControllerPhase::Restarting);
        let start_result = self.supervisor.start().await;

        match &failed {
            None => self.notify(EventKind::Applied, applied.clone()).await,
            Some(subject) => {
                self.notify(EventKind::ApplyFailed, vec![subject.clone()])
                    .await
            }
        }

        if let Err(e) = start_result {
            error!(error = %e, "server did not come back after update");
            self.notify(EventKind::StartupTimeout, vec![self.server_subject.clone()])
                .await;
            return TickOutcome::StartupTimeout;
        }

        match failed {
            None => TickOutcome::Applied { subjects: applied },
            Some(failed) => TickOutcome::ApplyFailed {
                applied,
                failed,
                skipped,
            },
        }
    }

    /// Fetch one subject and record its new version. The recorded version
    /// advances only after both the fetch and the durable write succeed.
    async fn apply_action(&self, action: &Action) -> Result<()> {
        self.source.fetch(&action.subject).await?;
        self.store
            .set(&action.subject.id, &action.to_version)
            .await
            .map_err(|e| DomainError::ApplyFailure {
                subject: action.subject.id.clone(),
                message: format!("recording version after fetch failed: {}", e),
            })?;
        Ok(())
    }
}
