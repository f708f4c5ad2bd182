// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawSiteConfig, SiteConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawSiteConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSiteConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawSiteConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it into a `SiteConfig`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SiteConfig> {
    let raw_config = load_from_path(&path)?;
    let config = SiteConfig::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for this process.
///
/// - An explicit path must exist and be valid.
/// - Without one, `Sitepipe.toml` under `root` is used when present, and the
///   built-in path table otherwise.
pub fn resolve_config(explicit: Option<&Path>, root: &Path) -> Result<SiteConfig> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let default_path = root.join(default_config_path());
    if default_path.is_file() {
        debug!(path = ?default_path, "loading default config file");
        load_and_validate(&default_path)
    } else {
        debug!("no config file found; using built-in path table");
        Ok(SiteConfig::default())
    }
}

/// Default config file name, looked up in the project root.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitepipe.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SitepipeError;
    use tempfile::tempdir;

    #[test]
    fn missing_default_file_falls_back_to_built_in_table() {
        let dir = tempdir().unwrap();
        let config = resolve_config(None, dir.path()).unwrap();
        assert_eq!(config.build_dir(), Path::new("dist"));
        assert_eq!(config.server().port, 3050);
    }

    #[test]
    fn default_file_in_root_is_picked_up() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Sitepipe.toml"),
            "[build]\ndir = \"public\"\n\n[server]\nport = 8080\n",
        )
        .unwrap();

        let config = resolve_config(None, dir.path()).unwrap();
        assert_eq!(config.build_dir(), Path::new("public"));
        assert_eq!(config.server().port, 8080);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = resolve_config(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, SitepipeError::IoError(_)));
    }

    #[test]
    fn malformed_toml_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Sitepipe.toml");
        fs::write(&path, "[server\nport = ").unwrap();
        assert!(matches!(
            load_from_path(&path),
            Err(SitepipeError::TomlError(_))
        ));
    }
}
