// src/config/mod.rs

//! Configuration for sitepipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the path table (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate overrides into a `SiteConfig` (`validate.rs`).
//! - Classify the process environment (`environment.rs`).

pub mod environment;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config};
pub use model::{
    BuildSection, MarkupSection, PathEntry, PathOverride, PathTable, RawSiteConfig,
    ServerSection, SiteConfig, StylesSection, WatchSection,
};
