//! Version store seeding
//!
//! Records every subject's current remote version as already applied. Used
//! when adopting an existing installation, so the first real tick does not
//! reinstall content that is already on disk.

use crate::domain::ports::VersionStore;
use crate::domain::services::remote_probe::RemoteStateProbe;
use crate::domain::value_objects::Subject;
use crate::domain::{Result, SubjectId};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub recorded: Vec<SubjectId>,
    pub failed: Vec<SubjectId>,
}

/// Probe all subjects and record the reported versions as applied.
///
/// Subjects whose lookup fails are skipped and listed in the summary; the
/// store keeps whatever it already had for them.
pub async fn seed_store(
    store: &dyn VersionStore,
    probe: &RemoteStateProbe,
    subjects: &[Subject],
) -> Result<SeedSummary> {
    let outcome = probe.fetch(subjects).await;
    let mut summary = SeedSummary::default();

    for subject in subjects {
        match outcome.versions.get(&subject.id) {
            Some(remote) => {
                store.set(&subject.id, &remote.remote_version).await?;
                info!(subject = %subject.id, version = %remote.remote_version, "seeded");
                summary.recorded.push(subject.id.clone());
            }
            None => {
                warn!(subject = %subject.id, "could not resolve remote version, not seeded");
                summary.failed.push(subject.id.clone());
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::RemoteContentSource;
    use crate::domain::services::remote_probe::RetryPolicy;
    use crate::domain::DomainError;
    use crate::infrastructure::InMemoryVersionStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    struct OneKnownSubject;

    #[async_trait]
    impl RemoteContentSource for OneKnownSubject {
        async fn query_version(&self, subject: &Subject) -> Result<String> {
            if subject.id.as_str() == "serverA" {
                Ok("101".to_string())
            } else {
                Err(DomainError::TransientRemote {
                    subject: subject.id.clone(),
                    message: "unknown".to_string(),
                })
            }
        }

        async fn fetch(&self, _subject: &Subject) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_seed_records_reachable_subjects_only() {
        let store = InMemoryVersionStore::new();
        let probe = RemoteStateProbe::new(
            Arc::new(OneKnownSubject),
            RetryPolicy {
                attempts: 2,
                initial_backoff: Duration::from_millis(10),
                request_timeout: Duration::from_secs(1),
            },
        );
        let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];

        let summary = seed_store(&store, &probe, &subjects).await.unwrap();

        assert_eq!(summary.recorded, vec![SubjectId::new("serverA")]);
        assert_eq!(summary.failed, vec![SubjectId::new("modX")]);
        let record = store.get(&SubjectId::new("serverA")).await.unwrap().unwrap();
        assert_eq!(record.applied_version, "101");
        assert!(store.get(&SubjectId::new("modX")).await.unwrap().is_none());
    }
}
