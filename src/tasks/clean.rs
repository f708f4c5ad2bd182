// src/tasks/clean.rs

//! Empty the build root.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::context::BuildContext;

/// Remove everything inside the build root, keeping the directory itself.
///
/// A missing build root is fine. Any removal failure is returned as is; it
/// never goes through the error interceptor.
pub fn run(ctx: &BuildContext) -> Result<()> {
    let dir = ctx.out_dir();
    let fs = ctx.fs();

    if !fs.exists(&dir) {
        debug!(dir = ?dir, "build root absent; nothing to clean");
        return Ok(());
    }
    if !fs.is_dir(&dir) {
        anyhow::bail!("build root {:?} exists but is not a directory", dir);
    }

    let entries = fs.read_dir(&dir)?;
    let count = entries.len();
    for entry in entries {
        fs.remove(&entry)
            .with_context(|| format!("cleaning build root {:?}", dir))?;
    }

    info!(dir = ?dir, removed = count, "build root cleaned");
    Ok(())
}
