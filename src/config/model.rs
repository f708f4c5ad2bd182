// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::types::{AssetCategory, TriggerWhileRunningBehaviour};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [build]
/// dir = "dist"
///
/// [paths.scripts]
/// source = "src/js/*.js"
/// output = "js"
///
/// [markup]
/// partials = "src/partials"
///
/// [markup.context]
/// title = "Landing"
///
/// [styles]
/// browsers = ["last 2 versions"]
/// max_line_len = 80
///
/// [server]
/// port = 3050
/// ```
///
/// Every section is optional; a missing section keeps the built-in value.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawSiteConfig {
    #[serde(default)]
    pub build: BuildSection,

    /// Per-category overrides keyed by category name (`[paths.<category>]`).
    #[serde(default)]
    pub paths: BTreeMap<String, PathOverride>,

    #[serde(default)]
    pub markup: MarkupSection,

    #[serde(default)]
    pub styles: StylesSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    /// Build root every output subdirectory is relative to.
    #[serde(default = "default_build_dir")]
    pub dir: String,
}

fn default_build_dir() -> String {
    "dist".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            dir: default_build_dir(),
        }
    }
}

/// `[paths.<category>]` section. Unset fields keep the built-in entry.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathOverride {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

/// `[markup]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkupSection {
    /// Directory `@@include` paths are resolved against.
    #[serde(default = "default_partials_dir")]
    pub partials: String,

    /// Extra or overriding substitution variables.
    #[serde(default)]
    pub context: BTreeMap<String, Value>,
}

fn default_partials_dir() -> String {
    "src/partials".to_string()
}

impl Default for MarkupSection {
    fn default() -> Self {
        Self {
            partials: default_partials_dir(),
            context: BTreeMap::new(),
        }
    }
}

/// `[styles]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StylesSection {
    /// Browserslist queries used for vendor prefixing.
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,

    /// Maximum line length of minified stylesheets.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Extra load paths for `@use` / `@import`.
    #[serde(default = "default_include_paths")]
    pub include_paths: Vec<String>,
}

fn default_browsers() -> Vec<String> {
    vec!["last 2 versions".to_string()]
}

fn default_max_line_len() -> usize {
    80
}

fn default_include_paths() -> Vec<String> {
    vec!["node_modules".to_string()]
}

impl Default for StylesSection {
    fn default() -> Self {
        Self {
            browsers: default_browsers(),
            max_line_len: default_max_line_len(),
            include_paths: default_include_paths(),
        }
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log the server URL once it is listening.
    #[serde(default)]
    pub open: bool,
}

fn default_port() -> u16 {
    3050
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            open: false,
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// `"queue"` or `"cancel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,

    /// Maximum number of queued re-run batches to remember.
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,
}

fn default_queue_length() -> usize {
    1
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
            queue_length: default_queue_length(),
        }
    }
}

/// One row of the path table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub category: AssetCategory,
    /// Source glob, relative to the project root.
    pub source: String,
    /// Output subdirectory, relative to the build root. Empty means the
    /// build root itself.
    pub output: PathBuf,
}

impl PathEntry {
    fn new(category: AssetCategory, source: &str, output: &str) -> Self {
        Self {
            category,
            source: source.to_string(),
            output: PathBuf::from(output),
        }
    }
}

/// Mapping from every asset category to its source glob and output directory.
///
/// Holds exactly one entry per [`AssetCategory`], indexed by the category's
/// position in [`AssetCategory::ALL`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTable {
    entries: [PathEntry; 8],
}

impl Default for PathTable {
    fn default() -> Self {
        Self {
            entries: [
                PathEntry::new(AssetCategory::Markup, "src/*.html", ""),
                // Partials are inlined into pages and never written on their own.
                PathEntry::new(AssetCategory::Partials, "src/partials/**/*.htm", ""),
                PathEntry::new(AssetCategory::Vendor, "src/vendor/**/*.*", "vendor"),
                PathEntry::new(AssetCategory::Fonts, "src/fonts/**/*.*", "fonts"),
                PathEntry::new(AssetCategory::Scripts, "src/js/*.js", "js"),
                PathEntry::new(AssetCategory::Stylesheets, "src/scss/**/*.scss", "css"),
                PathEntry::new(
                    AssetCategory::Images,
                    "src/images/**/*.{png,jpg,gif,svg,pdf}",
                    "images",
                ),
                PathEntry::new(AssetCategory::Others, "src/*.{php,ico,png}", ""),
            ],
        }
    }
}

impl PathTable {
    pub fn entry(&self, category: AssetCategory) -> &PathEntry {
        &self.entries[category as usize]
    }

    pub(crate) fn entry_mut(&mut self, category: AssetCategory) -> &mut PathEntry {
        &mut self.entries[category as usize]
    }

    pub fn entries(&self) -> impl Iterator<Item = &PathEntry> {
        self.entries.iter()
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawSiteConfig>` (see `validate.rs`) or
/// [`SiteConfig::default`], so every field has already been checked.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    build_dir: PathBuf,
    paths: PathTable,
    partials_dir: PathBuf,
    context: BTreeMap<String, Value>,
    styles: StylesSection,
    server: ServerSection,
    watch: WatchSection,
}

impl SiteConfig {
    pub(crate) fn new_unchecked(
        build_dir: PathBuf,
        paths: PathTable,
        partials_dir: PathBuf,
        context: BTreeMap<String, Value>,
        styles: StylesSection,
        server: ServerSection,
        watch: WatchSection,
    ) -> Self {
        Self {
            build_dir,
            paths,
            partials_dir,
            context,
            styles,
            server,
            watch,
        }
    }

    /// Build root, relative to the project root.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn paths(&self) -> &PathTable {
        &self.paths
    }

    pub fn partials_dir(&self) -> &Path {
        &self.partials_dir
    }

    /// Substitution variables configured on top of the built-in ones.
    pub fn context_overrides(&self) -> &BTreeMap<String, Value> {
        &self.context
    }

    pub fn styles(&self) -> &StylesSection {
        &self.styles
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new_unchecked(
            PathBuf::from(default_build_dir()),
            PathTable::default(),
            PathBuf::from(default_partials_dir()),
            BTreeMap::new(),
            StylesSection::default(),
            ServerSection::default(),
            WatchSection::default(),
        )
    }
}
