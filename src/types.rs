use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Whether the process runs an unattended production build or an interactive
/// development session.
///
/// Decided once at start-up (see [`crate::config::environment`]) and carried
/// into every task through the build context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Production,
    Development,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}

/// Logical asset categories of the source tree.
///
/// Each category owns exactly one entry in the path table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Markup,
    Partials,
    Vendor,
    Fonts,
    Scripts,
    Stylesheets,
    Images,
    Others,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 8] = [
        AssetCategory::Markup,
        AssetCategory::Partials,
        AssetCategory::Vendor,
        AssetCategory::Fonts,
        AssetCategory::Scripts,
        AssetCategory::Stylesheets,
        AssetCategory::Images,
        AssetCategory::Others,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetCategory::Markup => "markup",
            AssetCategory::Partials => "partials",
            AssetCategory::Vendor => "vendor",
            AssetCategory::Fonts => "fonts",
            AssetCategory::Scripts => "scripts",
            AssetCategory::Stylesheets => "stylesheets",
            AssetCategory::Images => "images",
            AssetCategory::Others => "others",
        }
    }

    /// The transform task a change in this category re-runs while watching.
    pub fn rebuild_task(self) -> TaskId {
        match self {
            AssetCategory::Markup | AssetCategory::Partials => TaskId::Html,
            AssetCategory::Vendor => TaskId::Vendor,
            AssetCategory::Fonts => TaskId::Fonts,
            AssetCategory::Scripts => TaskId::Js,
            AssetCategory::Stylesheets => TaskId::Scss,
            AssetCategory::Images => TaskId::Images,
            AssetCategory::Others => TaskId::Others,
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a node in the task graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskId {
    Clean,
    Html,
    /// Expanded stylesheets (development variant).
    Scss,
    /// Minified stylesheets (production variant).
    ScssMin,
    Js,
    Images,
    Vendor,
    Fonts,
    Others,
    Watch,
    Serve,
}

impl TaskId {
    pub const ALL: [TaskId; 11] = [
        TaskId::Clean,
        TaskId::Html,
        TaskId::Scss,
        TaskId::ScssMin,
        TaskId::Js,
        TaskId::Images,
        TaskId::Vendor,
        TaskId::Fonts,
        TaskId::Others,
        TaskId::Watch,
        TaskId::Serve,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::Html => "html",
            TaskId::Scss => "scss",
            TaskId::ScssMin => "scss-min",
            TaskId::Js => "js",
            TaskId::Images => "images",
            TaskId::Vendor => "vendor",
            TaskId::Fonts => "fonts",
            TaskId::Others => "others",
            TaskId::Watch => "watch",
            TaskId::Serve => "serve",
        }
    }

    /// Tasks that keep running after they report progress (never "complete").
    pub fn is_long_lived(self) -> bool {
        matches!(self, TaskId::Watch | TaskId::Serve)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        TaskId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| format!("unknown task: {s}"))
    }
}

/// Behaviour when a task is re-triggered while it is already part of the
/// active run.
///
/// - `Queue`: remember the trigger and re-run once the current run finishes
///   (default behaviour).
/// - `Cancel`: drop any previously queued triggers and keep only the latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    #[default]
    Queue,
    Cancel,
}

impl FromStr for TriggerWhileRunningBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "queue" => Ok(TriggerWhileRunningBehaviour::Queue),
            "cancel" => Ok(TriggerWhileRunningBehaviour::Cancel),
            other => Err(format!(
                "invalid triggered_while_running_behaviour: {other} (expected \"queue\" or \"cancel\")"
            )),
        }
    }
}
