// src/watch/patterns.rs

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::SiteConfig;
use crate::tasks::sources::glob_base;
use crate::types::{AssetCategory, TaskId};

/// Compiled source globs for one rebuild task.
///
/// Patterns are relative to the project root; [`WatchProfile::matches`]
/// expects root-relative, forward-slash paths such as `src/js/app.js`.
#[derive(Clone)]
pub struct WatchProfile {
    task: TaskId,
    patterns: Vec<String>,
    set: GlobSet,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("task", &self.task)
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl WatchProfile {
    pub fn task(&self) -> TaskId {
        self.task
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// One profile per rebuild task, from the configured path table.
///
/// Markup and partials both rebuild pages, so they share a profile.
pub fn build_profiles(config: &SiteConfig) -> Result<Vec<WatchProfile>> {
    let mut by_task: BTreeMap<TaskId, Vec<String>> = BTreeMap::new();
    for category in AssetCategory::ALL {
        let source = &config.paths().entry(category).source;
        by_task
            .entry(category.rebuild_task())
            .or_default()
            .push(source.clone());
    }

    by_task
        .into_iter()
        .map(|(task, patterns)| {
            let set = build_globset(&patterns)
                .with_context(|| format!("building watch globset for task {task}"))?;
            Ok(WatchProfile {
                task,
                patterns,
                set,
            })
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Directories to watch recursively: the glob bases, minus any nested in
/// another one.
pub fn watch_dirs(root: &Path, profiles: &[WatchProfile]) -> Vec<PathBuf> {
    let mut bases: Vec<PathBuf> = profiles
        .iter()
        .flat_map(|p| p.patterns.iter())
        .map(|pat| root.join(glob_base(pat)))
        .collect();
    bases.sort();
    bases.dedup();

    let mut dirs: Vec<PathBuf> = Vec::new();
    for base in bases {
        if !dirs.iter().any(|d| base.starts_with(d)) {
            dirs.push(base);
        }
    }
    dirs
}
