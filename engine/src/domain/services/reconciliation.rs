//! Reconciliation engine
//!
//! Diffs the locally recorded applied versions against the remotely reported
//! ones and produces the ordered plan that eliminates the drift.

use crate::domain::value_objects::{
    Action, ActionKind, ActionPlan, RemoteVersion, Subject, SubjectKind, VersionRecord,
};
use crate::domain::SubjectId;
use std::collections::HashMap;
use tracing::debug;

/// Compute the action plan for one tick.
///
/// Versions are compared as opaque strings: any difference counts as drift.
/// A subject missing from `remote` is treated as "unknown this tick" and
/// produces no action; absence never means removal. A subject missing from
/// `local` was never installed and always produces an action with no
/// `from_version`.
///
/// Ordering: the server-build action (if any) comes first, because packages
/// carry no compatibility guarantee across server builds; package actions
/// follow in lexicographic subject-id order so plans are reproducible.
pub fn plan(
    subjects: &[Subject],
    local: &HashMap<SubjectId, VersionRecord>,
    remote: &HashMap<SubjectId, RemoteVersion>,
) -> ActionPlan {
    let mut actions: Vec<Action> = Vec::new();

    for subject in subjects {
        let Some(reported) = remote.get(&subject.id) else {
            debug!(subject = %subject.id, "no remote version this tick, assuming no drift");
            continue;
        };

        let from_version = local.get(&subject.id).map(|r| r.applied_version.clone());
        if from_version.as_deref() == Some(reported.remote_version.as_str()) {
            continue; // Noop, filtered from the plan
        }

        let kind = match subject.kind {
            SubjectKind::ServerBuild => ActionKind::InstallServer,
            SubjectKind::Package => ActionKind::InstallPackage,
        };
        actions.push(Action {
            subject: subject.clone(),
            from_version,
            to_version: reported.remote_version.clone(),
            kind,
        });
    }

    actions.sort_by(|a, b| {
        let a_pkg = a.subject.kind != SubjectKind::ServerBuild;
        let b_pkg = b.subject.kind != SubjectKind::ServerBuild;
        a_pkg.cmp(&b_pkg).then_with(|| a.subject.id.cmp(&b.subject.id))
    });

    ActionPlan::new(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_map(entries: &[(&str, &str)]) -> HashMap<SubjectId, VersionRecord> {
        entries
            .iter()
            .map(|(id, v)| {
                let sid = SubjectId::new(*id);
                (sid.clone(), VersionRecord::new(sid, *v))
            })
            .collect()
    }

    fn remote_map(entries: &[(&str, &str)]) -> HashMap<SubjectId, RemoteVersion> {
        entries
            .iter()
            .map(|(id, v)| {
                let sid = SubjectId::new(*id);
                (sid.clone(), RemoteVersion::new(sid, *v))
            })
            .collect()
    }

    #[test]
    fn test_no_drift_produces_empty_plan() {
        let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];
        let local = local_map(&[("serverA", "100"), ("modX", "v3")]);
        let remote = remote_map(&[("serverA", "100"), ("modX", "v3")]);

        assert!(plan(&subjects, &local, &remote).is_empty());
    }

    #[test]
    fn test_server_update_and_fresh_package_install() {
        // serverA drifts 100 -> 101 and modX has never been installed.
        let subjects = vec![Subject::package("modX"), Subject::server_build("serverA")];
        let local = local_map(&[("serverA", "100")]);
        let remote = remote_map(&[("serverA", "101"), ("modX", "v3")]);

        let plan = plan(&subjects, &local, &remote);
        let actions = plan.actions();
        assert_eq!(actions.len(), 2);

        assert_eq!(actions[0].kind, ActionKind::InstallServer);
        assert_eq!(actions[0].from_version.as_deref(), Some("100"));
        assert_eq!(actions[0].to_version, "101");

        assert_eq!(actions[1].kind, ActionKind::InstallPackage);
        assert_eq!(actions[1].subject.id.as_str(), "modX");
        assert_eq!(actions[1].from_version, None);
        assert_eq!(actions[1].to_version, "v3");
    }

    #[test]
    fn test_server_action_ordered_first_regardless_of_input_order() {
        for subjects in [
            vec![
                Subject::package("aaa"),
                Subject::server_build("zzz-server"),
                Subject::package("bbb"),
            ],
            vec![
                Subject::server_build("zzz-server"),
                Subject::package("bbb"),
                Subject::package("aaa"),
            ],
        ] {
            let local = HashMap::new();
            let remote = remote_map(&[("zzz-server", "2"), ("aaa", "1"), ("bbb", "1")]);
            let plan = plan(&subjects, &local, &remote);
            let ids: Vec<_> = plan.iter().map(|a| a.subject.id.as_str()).collect();
            assert_eq!(ids, vec!["zzz-server", "aaa", "bbb"]);
        }
    }

    #[test]
    fn test_packages_sorted_lexicographically() {
        let subjects = vec![
            Subject::package("charlie"),
            Subject::package("alpha"),
            Subject::package("bravo"),
        ];
        let local = HashMap::new();
        let remote = remote_map(&[("charlie", "1"), ("alpha", "1"), ("bravo", "1")]);

        let plan = plan(&subjects, &local, &remote);
        let ids: Vec<_> = plan.iter().map(|a| a.subject.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_missing_remote_entry_means_no_action() {
        // A locally installed package the remote said nothing about must not
        // be reinstalled or removed.
        let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];
        let local = local_map(&[("serverA", "100"), ("modX", "v3")]);
        let remote = remote_map(&[("serverA", "100")]);

        assert!(plan(&subjects, &local, &remote).is_empty());
    }

    #[test]
    fn test_idempotent_after_apply() {
        let subjects = vec![Subject::server_build("serverA"), Subject::package("modX")];
        let remote = remote_map(&[("serverA", "101"), ("modX", "v3")]);

        let first = plan(&subjects, &local_map(&[("serverA", "100")]), &remote);
        assert_eq!(first.len(), 2);

        // Simulate a successful apply of everything the first plan contained.
        let converged = local_map(&[("serverA", "101"), ("modX", "v3")]);
        let second = plan(&subjects, &converged, &remote);
        assert!(second.is_empty());
    }

    #[test]
    fn test_opaque_comparison_not_numeric() {
        // "0100" != "100" even though numerically equal.
        let subjects = vec![Subject::server_build("serverA")];
        let local = local_map(&[("serverA", "100")]);
        let remote = remote_map(&[("serverA", "0100")]);

        assert_eq!(plan(&subjects, &local, &remote).len(), 1);
    }
}
