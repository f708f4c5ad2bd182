// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::watch::event_handler::{is_relevant, process_file_change};
use crate::watch::patterns::{WatchProfile, watch_dirs};

/// Keeps the underlying `RecommendedWatcher` alive. Dropping the handle
/// stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the source directories below `root` and send
/// `RuntimeEvent::TaskTriggered` for tasks whose globs match a changed file.
///
/// Source directories that do not exist yet are skipped with a warning.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    profiles: Vec<WatchProfile>,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // notify reports canonical paths.
    let root = root.canonicalize().unwrap_or(root);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("sitepipe: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("sitepipe: file watch error: {err}"),
        },
        Config::default(),
    )?;

    for dir in watch_dirs(&root, &profiles) {
        if !dir.is_dir() {
            warn!(?dir, "source directory missing; not watching it");
            continue;
        }
        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .with_context(|| format!("watching {dir:?}"))?;
        info!(?dir, "watching for changes");
    }

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !is_relevant(&event.kind) {
                continue;
            }
            debug!(?event, "received notify event");

            for path in &event.paths {
                if !process_file_change(&root, path, &profiles, &runtime_tx).await {
                    debug!("runtime gone; watcher event loop stopping");
                    return;
                }
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
