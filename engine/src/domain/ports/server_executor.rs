//! ServerExecutor port
//! Interface for spawning and controlling the supervised server process

use crate::domain::DomainError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Configuration for spawning the supervised server.
#[derive(Debug, Clone)]
pub struct SpawnConfig {
    pub command: String,
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    pub env: HashMap<String, String>,
    pub stdout: String, // "inherit" or "null"
    pub stderr: String,
}

impl SpawnConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            stdout: "inherit".to_string(),
            stderr: "inherit".to_string(),
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

/// Handle to a spawned server process.
///
/// Exclusively owned by the process supervisor and dropped (invalidated) on
/// stop. Not cloneable; there is never more than one live handle.
#[async_trait]
pub trait ServerProcess: Send {
    /// OS process id, for logging.
    fn pid(&self) -> u32;

    /// Non-blocking liveness probe. `Ok(false)` means the process has
    /// exited and been reaped. A probe error does not imply exit.
    fn poll_alive(&mut self) -> Result<bool, DomainError>;

    /// Request graceful termination (SIGTERM or platform equivalent).
    fn signal_stop(&mut self) -> Result<(), DomainError>;

    /// Wait for the process to exit; returns the exit code when available.
    async fn wait_exit(&mut self) -> Result<Option<i32>, DomainError>;

    /// Forcefully terminate the process and wait for it to be reaped.
    async fn force_kill(&mut self) -> Result<(), DomainError>;
}

/// Port for launching the supervised server.
#[async_trait]
pub trait ServerExecutor: Send + Sync {
    async fn spawn(&self, config: &SpawnConfig) -> Result<Box<dyn ServerProcess>, DomainError>;
}
