// src/context.rs

//! Per-process build context handed to every task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Datelike;

use crate::config::SiteConfig;
use crate::fs::FileSystem;
use crate::intercept::{ErrorInterceptor, Notifier};
use crate::serve::ReloadHub;
use crate::types::{AssetCategory, BuildMode};

/// Everything a task needs besides its own inputs.
///
/// Built once at start-up; tasks only ever see it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct BuildContext {
    mode: BuildMode,
    config: SiteConfig,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    reload: ReloadHub,
    notifier: Arc<dyn Notifier>,
    year: i32,
}

impl BuildContext {
    /// `root` is the project root every configured path is relative to.
    pub fn new(
        mode: BuildMode,
        config: SiteConfig,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            mode,
            config,
            root: root.into(),
            fs,
            reload: ReloadHub::new(),
            notifier,
            year: chrono::Local::now().year(),
        }
    }

    /// Pin the calendar year used by templates.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    pub fn reload(&self) -> &ReloadHub {
        &self.reload
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Absolute (or root-relative) build root.
    pub fn out_dir(&self) -> PathBuf {
        self.root.join(self.config.build_dir())
    }

    /// Output directory for a category.
    pub fn output_dir(&self, category: AssetCategory) -> PathBuf {
        let entry = self.config.paths().entry(category);
        if entry.output.as_os_str().is_empty() {
            self.out_dir()
        } else {
            self.out_dir().join(&entry.output)
        }
    }

    pub fn partials_dir(&self) -> PathBuf {
        self.root.join(self.config.partials_dir())
    }

    pub fn interceptor<'a>(&'a self, label: &'a str) -> ErrorInterceptor<'a> {
        ErrorInterceptor::new(label, self.mode, self.notifier.as_ref())
    }
}
