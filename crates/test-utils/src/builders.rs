use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use sitepipe::config::{RawSiteConfig, SiteConfig};
use sitepipe::context::BuildContext;
use sitepipe::fs::{FileSystem, RealFileSystem};
use sitepipe::intercept::Notifier;
use sitepipe::types::BuildMode;

use crate::notifier::RecordingNotifier;

/// Builder for `SiteConfig` with `[markup.context]` overrides.
pub struct SiteConfigBuilder {
    config: RawSiteConfig,
}

impl SiteConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RawSiteConfig::default(),
        }
    }

    pub fn context(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.markup.context.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> SiteConfig {
        SiteConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for SiteConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `BuildContext`, defaulting to the real filesystem, a
/// recording notifier and a fixed year.
pub struct ContextBuilder {
    mode: BuildMode,
    config: SiteConfig,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    notifier: Arc<dyn Notifier>,
    year: i32,
}

impl ContextBuilder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            mode: BuildMode::Production,
            config: SiteConfig::default(),
            root: root.as_ref().to_path_buf(),
            fs: Arc::new(RealFileSystem),
            notifier: Arc::new(RecordingNotifier::new()),
            year: 2024,
        }
    }

    pub fn mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn config(mut self, config: SiteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn build(self) -> BuildContext {
        BuildContext::new(self.mode, self.config, self.root, self.fs, self.notifier)
            .with_year(self.year)
    }
}
