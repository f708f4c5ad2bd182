// src/config/environment.rs

//! Decides between production and development behaviour from the process
//! environment.

use crate::types::BuildMode;

/// Build-mode variable; production when it equals [`PRODUCTION_VALUE`].
pub const BUILD_MODE_VAR: &str = "NODE_ENV";
/// Set by the hosting platform on its build machines.
pub const PLATFORM_VAR: &str = "VERCEL";
/// Set by most continuous-integration services.
pub const CI_VAR: &str = "CI";

pub const PRODUCTION_VALUE: &str = "production";

/// Classify using an arbitrary variable lookup.
///
/// Production when the build-mode variable is `production`, or when the
/// platform or CI variable is set to anything non-empty.
pub fn classify<F>(lookup: F) -> BuildMode
where
    F: Fn(&str) -> Option<String>,
{
    let is_set = |name: &str| lookup(name).is_some_and(|v| !v.is_empty());

    let production = lookup(BUILD_MODE_VAR).as_deref() == Some(PRODUCTION_VALUE)
        || is_set(PLATFORM_VAR)
        || is_set(CI_VAR);

    if production {
        BuildMode::Production
    } else {
        BuildMode::Development
    }
}

/// Classify the current process environment.
pub fn from_process_env() -> BuildMode {
    classify(|name| std::env::var(name).ok())
}
