//! Process supervisor
//!
//! Owns the lifecycle of the supervised server process: start with a bounded
//! startup timeout, graceful stop with a force-kill fallback, and a
//! non-blocking liveness probe. The process handle is exclusively owned here
//! and invalidated on stop.

use crate::domain::ports::{ServerExecutor, ServerProcess, SpawnConfig};
use crate::domain::value_objects::SupervisorState;
use crate::domain::{DomainError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// How often liveness is probed while waiting for startup.
const STARTUP_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Timeout bounds for process lifecycle operations.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTimeouts {
    /// Bound for the first successful liveness probe after spawn.
    pub startup_timeout: Duration,
    /// How long a graceful stop may take before force-kill.
    pub graceful_stop_timeout: Duration,
    /// Additional bound for the force-kill itself.
    pub kill_margin: Duration,
}

impl Default for SupervisorTimeouts {
    fn default() -> Self {
        Self {
            startup_timeout: Duration::from_secs(30),
            graceful_stop_timeout: Duration::from_secs(10),
            kill_margin: Duration::from_secs(10),
        }
    }
}

/// Supervisor for the single server process.
///
/// Not re-entrant: callers drive it from one logical tick at a time, so no
/// internal locking is needed.
pub struct ProcessSupervisor {
    executor: Arc<dyn ServerExecutor>,
    spawn_config: SpawnConfig,
    timeouts: SupervisorTimeouts,
    state: SupervisorState,
    process: Option<Box<dyn ServerProcess>>,
}

impl ProcessSupervisor {
    pub fn new(
        executor: Arc<dyn ServerExecutor>,
        spawn_config: SpawnConfig,
        timeouts: SupervisorTimeouts,
    ) -> Self {
        Self {
            executor,
            spawn_config,
            timeouts,
            state: SupervisorState::Stopped,
            process: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn transition(&mut self, next: SupervisorState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "supervisor state transition");
        self.state = next;
        Ok(())
    }

    /// Start the server and wait for it to become live.
    ///
    /// Stopped/Crashed -> Starting -> Running on the first successful
    /// liveness probe within the startup timeout. A process that exits during
    /// startup, or never probes live in time, ends Crashed with a
    /// StartupTimeout error.
    pub async fn start(&mut self) -> Result<()> {
        self.transition(SupervisorState::Starting)?;

        let mut process = match self.executor.spawn(&self.spawn_config).await {
            Ok(p) => p,
            Err(e) => {
                warn!(command = %self.spawn_config.command, error = %e, "failed to spawn server");
                self.state = SupervisorState::Crashed;
                return Err(e);
            }
        };
        info!(pid = process.pid(), command = %self.spawn_config.command, "server spawned");

        let deadline = Instant::now() + self.timeouts.startup_timeout;
        loop {
            match process.poll_alive() {
                Ok(true) => break,
                Ok(false) => {
                    // Exited during startup; it can never become live.
                    warn!(pid = process.pid(), "server exited during startup");
                    self.state = SupervisorState::Crashed;
                    return Err(DomainError::StartupTimeout {
                        timeout_sec: self.timeouts.startup_timeout.as_secs(),
                    });
                }
                Err(e) => {
                    warn!(pid = process.pid(), error = %e, "startup liveness probe failed");
                }
            }
            if Instant::now() >= deadline {
                self.state = SupervisorState::Crashed;
                return Err(DomainError::StartupTimeout {
                    timeout_sec: self.timeouts.startup_timeout.as_secs(),
                });
            }
            sleep(STARTUP_PROBE_INTERVAL).await;
        }

        self.transition(SupervisorState::Running)?;
        self.process = Some(process);
        info!("server is live");
        Ok(())
    }

    /// Gracefully stop the server, force-killing if it does not comply.
    ///
    /// Always returns within `graceful_stop_timeout + kill_margin` and always
    /// ends Stopped; a failed kill is logged, never propagated, so the
    /// orchestrator can make progress.
    pub async fn stop(&mut self) -> Result<()> {
        if self.state == SupervisorState::Stopped {
            return Ok(());
        }
        self.transition(SupervisorState::Stopping)?;

        let mut process = match self.process.take() {
            Some(p) => p,
            None => {
                self.state = SupervisorState::Stopped;
                return Ok(());
            }
        };

        let pid = process.pid();
        info!(pid, "stopping server");
        if let Err(e) = process.signal_stop() {
            // The process may already be gone; the wait below resolves it.
            warn!(pid, error = %e, "failed to send graceful stop signal");
        }

        match timeout(self.timeouts.graceful_stop_timeout, process.wait_exit()).await {
            Ok(Ok(code)) => {
                info!(pid, exit_code = ?code, "server stopped gracefully");
            }
            Ok(Err(e)) => {
                warn!(pid, error = %e, "error waiting for server exit");
            }
            Err(_) => {
                warn!(
                    pid,
                    timeout_sec = self.timeouts.graceful_stop_timeout.as_secs(),
                    "graceful stop timed out, force-killing"
                );
                match timeout(self.timeouts.kill_margin, process.force_kill()).await {
                    Ok(Ok(())) => info!(pid, "server force-killed"),
                    Ok(Err(e)) => warn!(pid, error = %e, "force-kill failed, giving up"),
                    Err(_) => warn!(pid, "server still running after force-kill, giving up"),
                }
            }
        }

        self.transition(SupervisorState::Stopped)?;
        Ok(())
    }

    /// Non-blocking liveness probe.
    ///
    /// A probe error does not imply the process exited; it is logged and the
    /// process is assumed alive rather than silently treated as stopped.
    pub fn is_alive(&mut self) -> bool {
        match self.process.as_mut() {
            None => false,
            Some(process) => match process.poll_alive() {
                Ok(alive) => alive,
                Err(e) => {
                    warn!(pid = process.pid(), error = %e, "liveness probe failed");
                    true
                }
            },
        }
    }

    /// Reclassify a Running process that was observed dead.
    ///
    /// "Crashed" is a judgment about intent vs. observation, so it is made by
    /// the caller, not inside the liveness probe. Drops the (already reaped)
    /// handle.
    pub fn mark_crashed(&mut self) {
        warn!(state = %self.state, "server process found dead, marking crashed");
        self.process = None;
        self.state = SupervisorState::Crashed;
    }
}
