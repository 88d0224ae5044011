//! Shared fakes and builders for end-to-end tests
//!
//! The supervised "server" in these tests is a real child process
//! (`/bin/sleep` behind a small shell wrapper), while the remote content
//! source and notification sink are scripted in-memory fakes.

use async_trait::async_trait;
use gsm_engine::domain::ports::{
    NotificationSink, RemoteContentSource, SpawnConfig, VersionStore,
};
use gsm_engine::infrastructure::TokioServerExecutor;
use gsm_engine::{
    DomainError, EventKind, Notification, ProcessSupervisor, RecoveryController,
    RemoteStateProbe, Result, RetryPolicy, Subject, SupervisorTimeouts, TickOptions,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Remote source with preprogrammed versions, optional fetch failures, and
/// call accounting.
pub struct ScriptedRemoteSource {
    versions: Mutex<HashMap<String, String>>,
    failing_fetches: Mutex<HashSet<String>>,
    pub query_count: AtomicU32,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedRemoteSource {
    pub fn new(versions: &[(&str, &str)]) -> Self {
        Self {
            versions: Mutex::new(
                versions
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            failing_fetches: Mutex::new(HashSet::new()),
            query_count: AtomicU32::new(0),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn set_version(&self, subject: &str, version: &str) {
        self.versions
            .lock()
            .unwrap()
            .insert(subject.to_string(), version.to_string());
    }

    pub fn fail_fetch(&self, subject: &str) {
        self.failing_fetches
            .lock()
            .unwrap()
            .insert(subject.to_string());
    }

    pub fn allow_fetch(&self, subject: &str) {
        self.failing_fetches.lock().unwrap().remove(subject);
    }

    /// Subject ids fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn queries(&self) -> u32 {
        self.query_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteContentSource for ScriptedRemoteSource {
    async fn query_version(&self, subject: &Subject) -> Result<String> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        self.versions
            .lock()
            .unwrap()
            .get(subject.id.as_str())
            .cloned()
            .ok_or_else(|| DomainError::TransientRemote {
                subject: subject.id.clone(),
                message: "unknown subject".to_string(),
            })
    }

    async fn fetch(&self, subject: &Subject) -> Result<()> {
        self.fetched
            .lock()
            .unwrap()
            .push(subject.id.as_str().to_string());
        if self
            .failing_fetches
            .lock()
            .unwrap()
            .contains(subject.id.as_str())
        {
            return Err(DomainError::ApplyFailure {
                subject: subject.id.clone(),
                message: "scripted fetch failure".to_string(),
            });
        }
        Ok(())
    }
}

/// Sink that records every notification.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<Notification>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.event_kind)
            .collect()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for CollectingSink {
    async fn send(&self, notification: &Notification) {
        self.events.lock().unwrap().push(notification.clone());
    }
}

/// A long-sleeping stand-in for the game server.
pub fn sleep_server() -> SpawnConfig {
    let mut config = SpawnConfig::new("/bin/sleep").args(vec!["60".to_string()]);
    config.stdout = "null".to_string();
    config.stderr = "null".to_string();
    config
}

/// A server that records its pid so tests can kill it externally.
pub fn pid_reporting_server(pidfile: &std::path::Path) -> SpawnConfig {
    let script = format!("echo $$ > {} && exec sleep 60", pidfile.display());
    let mut config = SpawnConfig::new("/bin/sh").args(vec!["-c".to_string(), script]);
    config.stdout = "null".to_string();
    config.stderr = "null".to_string();
    config
}

pub fn fast_timeouts() -> SupervisorTimeouts {
    SupervisorTimeouts {
        startup_timeout: Duration::from_secs(5),
        graceful_stop_timeout: Duration::from_secs(2),
        kill_margin: Duration::from_secs(5),
    }
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        attempts: 2,
        initial_backoff: Duration::from_millis(10),
        request_timeout: Duration::from_secs(2),
    }
}

pub fn build_controller(
    subjects: Vec<Subject>,
    spawn: SpawnConfig,
    source: Arc<ScriptedRemoteSource>,
    store: Arc<dyn VersionStore>,
    sink: Arc<CollectingSink>,
    dry_run: bool,
) -> RecoveryController {
    let supervisor = ProcessSupervisor::new(
        Arc::new(TokioServerExecutor::new()),
        spawn,
        fast_timeouts(),
    );
    let probe = RemoteStateProbe::new(source.clone(), fast_retry());
    RecoveryController::new(
        subjects,
        store,
        probe,
        source,
        supervisor,
        sink,
        TickOptions { dry_run },
    )
    .expect("controller construction")
}

/// Drive the controller through its shutdown path so the supervised child is
/// stopped; returns the controller for post-mortem assertions.
pub async fn shut_down(mut controller: RecoveryController) -> RecoveryController {
    let token = CancellationToken::new();
    token.cancel();
    controller.run(Duration::from_millis(10), token).await;
    controller
}
