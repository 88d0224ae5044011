//! Configuration loading from a YAML file
//!
//! One document describes the supervised server, the watched subjects, the
//! remote source, and notification delivery. The orchestrator core receives
//! everything as explicit values; nothing in the engine reads this file (or
//! any global) on its own.

use crate::domain::ports::SpawnConfig;
use crate::domain::services::{RetryPolicy, SupervisorTimeouts};
use crate::domain::value_objects::{RestartPolicyHint, Subject};
use crate::domain::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

fn default_poll_interval_sec() -> u64 {
    600
}

fn default_inherit() -> String {
    "inherit".to_string()
}

fn default_startup_timeout_sec() -> u64 {
    30
}

fn default_stop_timeout_sec() -> u64 {
    10
}

fn default_kill_margin_sec() -> u64 {
    10
}

fn default_steam_user() -> String {
    "anonymous".to_string()
}

fn default_request_timeout_sec() -> u64 {
    15
}

fn default_steamcmd_timeout_sec() -> u64 {
    300
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_notify_title() -> String {
    "Server Manager".to_string()
}

fn default_notify_retry_attempts() -> u32 {
    2
}

/// Top-level configuration document.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Where the applied-version record lives.
    pub state_file: String,

    #[serde(default = "default_poll_interval_sec")]
    pub poll_interval_sec: u64,

    #[serde(default)]
    pub dry_run: bool,

    /// Declared to the host's service supervisor; systemd-style values.
    #[serde(default)]
    pub restart_policy_hint: Option<String>,

    pub server: ServerConfig,

    /// Workshop item ids to keep in sync.
    #[serde(default)]
    pub packages: Vec<String>,

    pub remote: RemoteConfig,

    #[serde(default)]
    pub notify: NotifyConfig,
}

/// The supervised server process.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    /// Subject id the server build is tracked under.
    pub subject_id: String,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub working_dir: Option<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    #[serde(default = "default_inherit")]
    pub stdout: String,

    #[serde(default = "default_inherit")]
    pub stderr: String,

    #[serde(default = "default_startup_timeout_sec")]
    pub startup_timeout_sec: u64,

    #[serde(default = "default_stop_timeout_sec")]
    pub graceful_stop_timeout_sec: u64,

    #[serde(default = "default_kill_margin_sec")]
    pub kill_margin_sec: u64,
}

/// The Steam-backed remote content source.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemoteConfig {
    pub steamcmd_dir: String,
    pub app_id: String,
    pub workshop_app_id: String,
    pub install_dir: String,
    pub mods_dir: String,

    #[serde(default = "default_steam_user")]
    pub steam_user: String,

    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,

    #[serde(default = "default_steamcmd_timeout_sec")]
    pub steamcmd_timeout_sec: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

/// Outbound notification delivery.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotifyConfig {
    /// No webhook configured means log-only reporting.
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default = "default_notify_title")]
    pub title: String,

    #[serde(default = "default_notify_retry_attempts")]
    pub retry_attempts: u32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            title: default_notify_title(),
            retry_attempts: default_notify_retry_attempts(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|e| DomainError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.server.subject_id.trim().is_empty() {
            return Err(DomainError::Config(
                "server.subject_id must not be empty".to_string(),
            ));
        }
        if self.server.command.trim().is_empty() {
            return Err(DomainError::Config(
                "server.command must not be empty".to_string(),
            ));
        }
        if let Some(ref hint) = self.restart_policy_hint {
            if RestartPolicyHint::parse(hint).is_none() {
                return Err(DomainError::Config(format!(
                    "unknown restart_policy_hint: {}",
                    hint
                )));
            }
        }
        Ok(())
    }

    /// The full watch list: the server build plus every package.
    pub fn subjects(&self) -> Vec<Subject> {
        let mut subjects = vec![Subject::server_build(self.server.subject_id.as_str())];
        subjects.extend(self.packages.iter().map(|id| Subject::package(id.as_str())));
        subjects
    }

    pub fn spawn_config(&self) -> SpawnConfig {
        let mut spawn = SpawnConfig::new(&self.server.command).args(self.server.args.clone());
        spawn.working_dir = self.server.working_dir.clone();
        spawn.env = self.server.env.clone();
        spawn.stdout = self.server.stdout.clone();
        spawn.stderr = self.server.stderr.clone();
        spawn
    }

    pub fn supervisor_timeouts(&self) -> SupervisorTimeouts {
        SupervisorTimeouts {
            startup_timeout: Duration::from_secs(self.server.startup_timeout_sec),
            graceful_stop_timeout: Duration::from_secs(self.server.graceful_stop_timeout_sec),
            kill_margin: Duration::from_secs(self.server.kill_margin_sec),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.remote.retry_attempts,
            initial_backoff: Duration::from_millis(self.remote.retry_backoff_ms),
            request_timeout: Duration::from_secs(self.remote.request_timeout_sec),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_sec)
    }

    pub fn restart_policy(&self) -> RestartPolicyHint {
        self.restart_policy_hint
            .as_deref()
            .and_then(RestartPolicyHint::parse)
            .unwrap_or_default()
    }
}
