// src/config/validate.rs

use std::path::{Component, Path, PathBuf};

use globset::GlobBuilder;

use crate::config::model::{PathTable, RawSiteConfig, SiteConfig};
use crate::errors::{Result, SitepipeError};
use crate::fs::normalize;
use crate::tasks::sources::glob_base;
use crate::types::AssetCategory;

impl TryFrom<RawSiteConfig> for SiteConfig {
    type Error = SitepipeError;

    fn try_from(raw: RawSiteConfig) -> std::result::Result<Self, Self::Error> {
        let paths = resolve_path_table(&raw)?;
        validate_build_dir(&raw, &paths)?;
        validate_styles(&raw)?;
        validate_server(&raw)?;
        validate_watch(&raw)?;

        Ok(SiteConfig::new_unchecked(
            PathBuf::from(&raw.build.dir),
            paths,
            PathBuf::from(&raw.markup.partials),
            raw.markup.context,
            raw.styles,
            raw.server,
            raw.watch,
        ))
    }
}

/// Apply `[paths.<category>]` overrides on top of the built-in table and
/// check every resulting entry.
fn resolve_path_table(cfg: &RawSiteConfig) -> Result<PathTable> {
    let mut table = PathTable::default();

    for (name, over) in cfg.paths.iter() {
        let category = AssetCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == name.as_str())
            .ok_or_else(|| {
                SitepipeError::ConfigError(format!("unknown asset category '[paths.{name}]'"))
            })?;

        let entry = table.entry_mut(category);
        if let Some(source) = &over.source {
            entry.source = source.clone();
        }
        if let Some(output) = &over.output {
            entry.output = PathBuf::from(output);
        }
    }

    for entry in table.entries() {
        GlobBuilder::new(&entry.source)
            .literal_separator(true)
            .build()
            .map_err(|e| {
                SitepipeError::ConfigError(format!(
                    "invalid source glob for '{}': {e}",
                    entry.category
                ))
            })?;

        if !is_plain_relative(&entry.output) {
            return Err(SitepipeError::ConfigError(format!(
                "output directory for '{}' must be relative to the build root without '..' (got {:?})",
                entry.category, entry.output
            )));
        }
    }

    Ok(table)
}

/// The build root is emptied by `clean`, so it must be a real subdirectory
/// that shares nothing with the sources.
fn validate_build_dir(cfg: &RawSiteConfig, paths: &PathTable) -> Result<()> {
    let dir = &cfg.build.dir;
    let build = normalize(Path::new(dir));
    if build.as_os_str().is_empty() || !is_plain_relative(Path::new(dir)) {
        return Err(SitepipeError::ConfigError(format!(
            "[build].dir must be a relative subdirectory without '..' (got {dir:?})"
        )));
    }

    let partials = normalize(Path::new(&cfg.markup.partials));
    let sources = paths
        .entries()
        .map(|entry| (entry.category.as_str(), normalize(&glob_base(&entry.source))))
        .chain(std::iter::once(("partials directory", partials)));

    for (what, base) in sources {
        let inside_base = !base.as_os_str().is_empty() && build.starts_with(&base);
        if base.starts_with(&build) || inside_base {
            return Err(SitepipeError::ConfigError(format!(
                "[build].dir {dir:?} overlaps the {what} sources at {base:?}"
            )));
        }
    }
    Ok(())
}

fn validate_styles(cfg: &RawSiteConfig) -> Result<()> {
    if cfg.styles.max_line_len == 0 {
        return Err(SitepipeError::ConfigError(
            "[styles].max_line_len must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(cfg: &RawSiteConfig) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(SitepipeError::ConfigError(
            "[server].port must be non-zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawSiteConfig) -> Result<()> {
    if cfg.watch.queue_length == 0 {
        return Err(SitepipeError::ConfigError(
            "[watch].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

/// Relative, and never climbs out of its base.
fn is_plain_relative(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
