//! Tokio-based server executor
//! Spawns and controls the real server process.

use crate::domain::ports::{ServerExecutor, ServerProcess, SpawnConfig};
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, info};

pub struct TokioServerExecutor;

impl TokioServerExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TokioServerExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerExecutor for TokioServerExecutor {
    async fn spawn(&self, config: &SpawnConfig) -> Result<Box<dyn ServerProcess>> {
        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args);
        for (k, v) in &config.env {
            cmd.env(k, v);
        }
        if let Some(ref dir) = config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdout(stdio_from_str(&config.stdout));
        cmd.stderr(stdio_from_str(&config.stderr));
        cmd.stdin(Stdio::null());

        debug!(command = %config.command, args = ?config.args, "spawning server process");
        let child = cmd.spawn().map_err(|e| {
            DomainError::SupervisorIo(format!("failed to spawn {}: {}", config.command, e))
        })?;
        let pid = child.id().unwrap_or(0);
        info!(pid, command = %config.command, "server process spawned");

        Ok(Box::new(TokioServerProcess { pid, child }))
    }
}

fn stdio_from_str(s: &str) -> Stdio {
    match s {
        "null" => Stdio::null(),
        _ => Stdio::inherit(),
    }
}

struct TokioServerProcess {
    pid: u32,
    child: Child,
}

#[async_trait]
impl ServerProcess for TokioServerProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn poll_alive(&mut self) -> Result<bool> {
        match self.child.try_wait() {
            Ok(None) => Ok(true),
            Ok(Some(status)) => {
                debug!(pid = self.pid, %status, "server process exited");
                Ok(false)
            }
            Err(e) => Err(DomainError::SupervisorIo(format!(
                "liveness probe for pid {} failed: {}",
                self.pid, e
            ))),
        }
    }

    #[cfg(unix)]
    fn signal_stop(&mut self) -> Result<()> {
        // SAFETY: plain kill(2) call on a pid we spawned.
        let rc = unsafe { libc::kill(self.pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            let errno = std::io::Error::last_os_error();
            return Err(DomainError::SupervisorIo(format!(
                "cannot send SIGTERM to pid {}: {}",
                self.pid, errno
            )));
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn signal_stop(&mut self) -> Result<()> {
        // No graceful signal available; the kill path takes over.
        self.child.start_kill().map_err(|e| {
            DomainError::SupervisorIo(format!("cannot terminate pid {}: {}", self.pid, e))
        })
    }

    async fn wait_exit(&mut self) -> Result<Option<i32>> {
        let status = self.child.wait().await.map_err(|e| {
            DomainError::SupervisorIo(format!("wait for pid {} failed: {}", self.pid, e))
        })?;
        Ok(status.code())
    }

    async fn force_kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(|e| {
            DomainError::SupervisorIo(format!("cannot kill pid {}: {}", self.pid, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn quiet(mut config: SpawnConfig) -> SpawnConfig {
        config.stdout = "null".to_string();
        config.stderr = "null".to_string();
        config
    }

    #[tokio::test]
    #[serial]
    async fn test_spawn_and_poll() {
        let executor = TokioServerExecutor::new();
        let config = quiet(SpawnConfig::new("/bin/sleep").args(vec!["60".to_string()]));
        let mut process = executor.spawn(&config).await.unwrap();

        assert!(process.pid() > 0);
        assert!(process.poll_alive().unwrap());

        process.force_kill().await.unwrap();
        assert!(!process.poll_alive().unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn test_spawn_nonexistent_binary_fails() {
        let executor = TokioServerExecutor::new();
        let config = quiet(SpawnConfig::new("/nonexistent/binary"));
        assert!(executor.spawn(&config).await.is_err());
    }

    #[tokio::test]
    #[serial]
    async fn test_graceful_signal_terminates() {
        let executor = TokioServerExecutor::new();
        let config = quiet(SpawnConfig::new("/bin/sleep").args(vec!["60".to_string()]));
        let mut process = executor.spawn(&config).await.unwrap();

        process.signal_stop().unwrap();
        let code = process.wait_exit().await.unwrap();
        // Killed by signal: no exit code.
        assert_eq!(code, None);
        assert!(!process.poll_alive().unwrap());
    }

    #[tokio::test]
    #[serial]
    async fn test_exit_code_observed() {
        let executor = TokioServerExecutor::new();
        let config = quiet(
            SpawnConfig::new("/bin/sh").args(vec!["-c".to_string(), "exit 7".to_string()]),
        );
        let mut process = executor.spawn(&config).await.unwrap();
        assert_eq!(process.wait_exit().await.unwrap(), Some(7));
    }

    #[tokio::test]
    #[serial]
    async fn test_env_is_passed_through() {
        let executor = TokioServerExecutor::new();
        let mut config = quiet(SpawnConfig::new("/bin/sh").args(vec![
            "-c".to_string(),
            "exit $GSM_TEST_CODE".to_string(),
        ]));
        config
            .env
            .insert("GSM_TEST_CODE".to_string(), "42".to_string());
        let mut process = executor.spawn(&config).await.unwrap();
        assert_eq!(process.wait_exit().await.unwrap(), Some(42));
    }
}
