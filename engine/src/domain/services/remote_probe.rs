//! Remote state probe
//!
//! Queries the remote content source for every watched subject with
//! per-subject failure isolation: one subject failing, even after retries,
//! never hides the versions of the others.

use crate::domain::ports::RemoteContentSource;
use crate::domain::value_objects::{RemoteVersion, Subject};
use crate::domain::{DomainError, SubjectId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Retry behavior for remote version lookups.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per subject, including the first one.
    pub attempts: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub initial_backoff: Duration,
    /// Upper bound for a single lookup attempt.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Result of probing all watched subjects for one tick.
///
/// A subject appears in exactly one of the two maps, or in neither if it was
/// not probed. Absence from `versions` is "unknown this tick", never
/// "removed remotely".
#[derive(Debug, Default)]
pub struct ProbeOutcome {
    pub versions: HashMap<SubjectId, RemoteVersion>,
    pub failures: HashMap<SubjectId, DomainError>,
}

/// Probes the remote content source for current authoritative versions.
/// Pure read; retries and timeouts are internal and invisible to the caller.
pub struct RemoteStateProbe {
    source: Arc<dyn RemoteContentSource>,
    retry: RetryPolicy,
}

impl RemoteStateProbe {
    pub fn new(source: Arc<dyn RemoteContentSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Look up current remote versions for all `subjects` concurrently.
    /// Always returns; a subject whose lookup keeps failing ends up in
    /// `failures` with an explicit per-subject error.
    pub async fn fetch(&self, subjects: &[Subject]) -> ProbeOutcome {
        let mut tasks: JoinSet<(SubjectId, Result<String, DomainError>)> = JoinSet::new();
        for subject in subjects {
            let source = self.source.clone();
            let retry = self.retry;
            let subject = subject.clone();
            tasks.spawn(async move {
                let id = subject.id.clone();
                let result = query_with_retry(source.as_ref(), &subject, retry).await;
                (id, result)
            });
        }

        let mut outcome = ProbeOutcome::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(version))) => {
                    debug!(subject = %id, version = %version, "remote version");
                    outcome
                        .versions
                        .insert(id.clone(), RemoteVersion::new(id, version));
                }
                Ok((id, Err(err))) => {
                    warn!(subject = %id, error = %err, "remote lookup failed, skipping subject this tick");
                    outcome.failures.insert(id, err);
                }
                Err(join_err) => {
                    // A panicked lookup task loses one subject for one tick.
                    warn!(error = %join_err, "remote lookup task failed");
                }
            }
        }
        outcome
    }
}

async fn query_with_retry(
    source: &dyn RemoteContentSource,
    subject: &Subject,
    retry: RetryPolicy,
) -> Result<String, DomainError> {
    let attempts = retry.attempts.max(1);
    let mut backoff = retry.initial_backoff;
    let mut last_message = String::new();

    for attempt in 1..=attempts {
        let result = timeout(retry.request_timeout, source.query_version(subject)).await;
        match result {
            Ok(Ok(version)) => return Ok(version),
            Ok(Err(err)) => {
                last_message = err.to_string();
                debug!(
                    subject = %subject.id,
                    attempt,
                    error = %err,
                    "remote version lookup failed"
                );
            }
            Err(_) => {
                last_message = format!(
                    "lookup timed out after {}s",
                    retry.request_timeout.as_secs()
                );
                debug!(subject = %subject.id, attempt, "remote version lookup timed out");
            }
        }
        if attempt < attempts {
            sleep(backoff).await;
            backoff *= 2;
        }
    }

    Err(DomainError::PersistentRemote {
        subject: subject.id.clone(),
        message: format!("{} attempts exhausted: {}", attempts, last_message),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted source: per-subject version strings, with an optional number
    /// of leading failures per subject.
    struct ScriptedSource {
        versions: HashMap<String, String>,
        failures_before_success: Mutex<HashMap<String, u32>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(versions: &[(&str, &str)]) -> Self {
            Self {
                versions: versions
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                failures_before_success: Mutex::new(HashMap::new()),
                calls: AtomicU32::new(0),
            }
        }

        fn fail_first(self, subject: &str, times: u32) -> Self {
            self.failures_before_success
                .lock()
                .unwrap()
                .insert(subject.to_string(), times);
            self
        }
    }

    #[async_trait]
    impl RemoteContentSource for ScriptedSource {
        async fn query_version(&self, subject: &Subject) -> Result<String, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.failures_before_success.lock().unwrap();
            if let Some(remaining) = failures.get_mut(subject.id.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DomainError::TransientRemote {
                        subject: subject.id.clone(),
                        message: "scripted failure".to_string(),
                    });
                }
            }
            self.versions
                .get(subject.id.as_str())
                .cloned()
                .ok_or_else(|| DomainError::TransientRemote {
                    subject: subject.id.clone(),
                    message: "unknown subject".to_string(),
                })
        }

        async fn fetch(&self, _subject: &Subject) -> Result<(), DomainError> {
            Ok(())
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            attempts: 3,
            initial_backoff: Duration::from_millis(10),
            request_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_subjects_resolve() {
        let source = Arc::new(ScriptedSource::new(&[("serverA", "101"), ("modX", "v3")]));
        let probe = RemoteStateProbe::new(source, fast_retry());

        let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];
        let outcome = probe.fetch(&subjects).await;

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.versions.len(), 2);
        assert_eq!(
            outcome.versions[&SubjectId::new("serverA")].remote_version,
            "101"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_to_success() {
        let source =
            Arc::new(ScriptedSource::new(&[("modX", "v3")]).fail_first("modX", 2));
        let probe = RemoteStateProbe::new(source.clone(), fast_retry());

        let outcome = probe.fetch(&[Subject::package("modX")]).await;

        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.versions[&SubjectId::new("modX")].remote_version, "v3");
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_isolated_per_subject() {
        // modX keeps failing; serverA must still resolve.
        let source = Arc::new(
            ScriptedSource::new(&[("serverA", "101"), ("modX", "v3")]).fail_first("modX", 99),
        );
        let probe = RemoteStateProbe::new(source, fast_retry());

        let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];
        let outcome = probe.fetch(&subjects).await;

        assert_eq!(outcome.versions.len(), 1);
        assert!(outcome.versions.contains_key(&SubjectId::new("serverA")));
        let err = &outcome.failures[&SubjectId::new("modX")];
        assert!(matches!(err, DomainError::PersistentRemote { .. }));
    }
}
