// src/tasks/mod.rs

//! Asset tasks.
//!
//! Each transform task reads the sources of one category, converts every
//! file in memory and writes the results below the build root. Failures are
//! reported through the task's [`crate::intercept::ErrorInterceptor`]; a file
//! whose conversion failed is never written.
//!
//! - [`clean`] empties the build root.
//! - [`markup`] renders pages with partials and variables.
//! - [`styles`] compiles, prefixes and optionally minifies stylesheets.
//! - [`scripts`] minifies scripts.
//! - [`copy`] passes images, vendor files, fonts and other files through.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

use crate::context::BuildContext;
use crate::engine::TaskOutcome;
use crate::intercept::Verdict;
use crate::types::{AssetCategory, TaskId};

pub mod clean;
pub mod copy;
pub mod markup;
pub mod scripts;
pub mod sources;
pub mod styles;

pub use sources::SourceFile;

/// What went wrong with an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetErrorKind {
    /// Missing partial, malformed include, include cycle.
    Include,
    /// Unresolved substitution variable.
    Template,
    Stylesheet,
    Script,
    Io,
}

impl fmt::Display for AssetErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetErrorKind::Include => "include",
            AssetErrorKind::Template => "template",
            AssetErrorKind::Stylesheet => "stylesheet",
            AssetErrorKind::Script => "script",
            AssetErrorKind::Io => "io",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .path.display())]
pub struct AssetError {
    pub kind: AssetErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl AssetError {
    pub fn new(kind: AssetErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self::new(AssetErrorKind::Io, path, format!("{err:#}"))
    }
}

/// A file produced by a transform, relative to the category's output
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emitted {
    pub rel: PathBuf,
    pub contents: Vec<u8>,
}

impl Emitted {
    pub fn new(rel: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            rel: rel.into(),
            contents: contents.into(),
        }
    }
}

/// Summary of one task execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub written: usize,
    pub errors: usize,
}

/// The task stopped at an error (production mode).
#[derive(Debug, Clone, Error)]
#[error("[{label}] {error}")]
pub struct TaskAbort {
    pub label: String,
    pub error: AssetError,
}

/// A per-file conversion from one category into the output tree.
pub trait Transform: Send + Sync {
    fn id(&self) -> TaskId;
    fn category(&self) -> AssetCategory;
    /// Interceptor label, e.g. `Error Running Sass`.
    fn label(&self) -> &str;

    /// Whether a matched source is emitted at all.
    fn accepts(&self, _source: &SourceFile) -> bool {
        true
    }

    fn transform(&self, ctx: &BuildContext, source: &SourceFile) -> Result<Vec<Emitted>, AssetError>;
}

/// Run a transform over every source of its category.
pub fn run_transform(t: &dyn Transform, ctx: &BuildContext) -> Result<TaskReport, TaskAbort> {
    let interceptor = ctx.interceptor(t.label());
    let mut report = TaskReport::default();

    let fail = |report: &mut TaskReport, error: AssetError| -> Result<(), TaskAbort> {
        report.errors += 1;
        match interceptor.intercept(&error.to_string()) {
            Verdict::Continue => Ok(()),
            Verdict::Abort => Err(TaskAbort {
                label: t.label().to_string(),
                error,
            }),
        }
    };

    let pattern = &ctx.config().paths().entry(t.category()).source;
    let sources = match sources::collect(ctx.fs(), ctx.root(), pattern) {
        Ok(s) => s,
        Err(err) => {
            fail(&mut report, AssetError::io(ctx.root().join(pattern), &err))?;
            return Ok(report);
        }
    };

    let out_dir = ctx.output_dir(t.category());
    for source in sources.iter().filter(|s| t.accepts(s)) {
        debug!(task = %t.id(), path = ?source.path, "transforming");
        let emitted = match t.transform(ctx, source) {
            Ok(files) => files,
            Err(error) => {
                fail(&mut report, error)?;
                continue;
            }
        };

        for file in emitted {
            let dest = out_dir.join(&file.rel);
            match ctx.fs().write(&dest, &file.contents) {
                Ok(()) => report.written += 1,
                Err(err) => fail(&mut report, AssetError::io(&dest, &err))?,
            }
        }
    }

    if report.written > 0 {
        ctx.reload().notify(t.id());
    }

    info!(
        task = %t.id(),
        written = report.written,
        errors = report.errors,
        "task finished"
    );
    Ok(report)
}

/// The transform behind a task id, if it has one.
pub fn transform_for(id: TaskId) -> Option<Box<dyn Transform>> {
    match id {
        TaskId::Html => Some(Box::new(markup::Markup)),
        TaskId::Scss => Some(Box::new(styles::Styles::expanded())),
        TaskId::ScssMin => Some(Box::new(styles::Styles::minified())),
        TaskId::Js => Some(Box::new(scripts::Scripts)),
        TaskId::Images | TaskId::Vendor | TaskId::Fonts | TaskId::Others => {
            copy::Copy::for_task(id).map(|c| Box::new(c) as Box<dyn Transform>)
        }
        TaskId::Clean | TaskId::Watch | TaskId::Serve => None,
    }
}

/// Run a finite task to completion.
pub fn execute(id: TaskId, ctx: &BuildContext) -> TaskOutcome {
    if id == TaskId::Clean {
        return match clean::run(ctx) {
            Ok(()) => TaskOutcome::Success,
            Err(err) => TaskOutcome::Failed(format!("{err:#}")),
        };
    }

    let Some(transform) = transform_for(id) else {
        return TaskOutcome::Failed(format!("task '{id}' does not run to completion"));
    };

    match run_transform(transform.as_ref(), ctx) {
        Ok(TaskReport { errors: 0, .. }) => TaskOutcome::Success,
        Ok(TaskReport { errors, .. }) => TaskOutcome::Recovered { errors },
        Err(abort) => TaskOutcome::Failed(abort.to_string()),
    }
}
