// src/watch/event_handler.rs

//! Turns changed paths into task triggers.

use std::collections::BTreeSet;
use std::path::Path;

use notify::EventKind;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{RuntimeEvent, TriggerReason};
use crate::tasks::sources::relative_str;
use crate::types::TaskId;
use crate::watch::patterns::WatchProfile;

/// Creations, modifications and removals; access events are noise.
pub fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Rebuild tasks whose globs match `path`.
pub fn tasks_for_path(root: &Path, path: &Path, profiles: &[WatchProfile]) -> BTreeSet<TaskId> {
    let Some(rel) = relative_str(root, path) else {
        warn!(?path, ?root, "could not relativize path against root");
        return BTreeSet::new();
    };

    profiles
        .iter()
        .filter(|p| p.matches(&rel))
        .map(WatchProfile::task)
        .collect()
}

/// Send a `FileWatch` trigger for every task matching `path`.
///
/// Returns `false` once the runtime channel is closed.
pub async fn process_file_change(
    root: &Path,
    path: &Path,
    profiles: &[WatchProfile],
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) -> bool {
    for task in tasks_for_path(root, path, profiles) {
        debug!(task = %task, ?path, "watch match -> triggering task");
        let event = RuntimeEvent::TaskTriggered {
            task,
            reason: TriggerReason::FileWatch,
        };
        if let Err(err) = runtime_tx.send(event).await {
            warn!("failed to send RuntimeEvent::TaskTriggered: {err}");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    use super::*;
    use crate::config::SiteConfig;
    use crate::watch::patterns::build_profiles;

    #[test]
    fn only_content_changes_count() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Any)));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
    }

    #[test]
    fn script_change_triggers_js_only() {
        let profiles = build_profiles(&SiteConfig::default()).unwrap();
        let root = Path::new("/site");
        let tasks = tasks_for_path(root, Path::new("/site/src/js/app.js"), &profiles);
        assert_eq!(tasks.into_iter().collect::<Vec<_>>(), vec![TaskId::Js]);

        assert!(tasks_for_path(root, Path::new("/site/dist/js/app.js"), &profiles).is_empty());
        assert!(tasks_for_path(root, Path::new("/elsewhere/app.js"), &profiles).is_empty());
    }

    #[tokio::test]
    async fn matching_change_is_sent_as_file_watch_trigger() {
        let profiles = build_profiles(&SiteConfig::default()).unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let open = process_file_change(
            Path::new("/site"),
            Path::new("/site/src/scss/_vars.scss"),
            &profiles,
            &tx,
        )
        .await;

        assert!(open);
        match rx.try_recv().unwrap() {
            RuntimeEvent::TaskTriggered { task, reason } => {
                assert_eq!(task, TaskId::Scss);
                assert_eq!(reason, TriggerReason::FileWatch);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
