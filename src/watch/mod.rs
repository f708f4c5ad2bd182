// src/watch/mod.rs

//! File watching for development builds.
//!
//! Turns filesystem changes below the source globs into rebuild triggers
//! for the matching transform task. It knows nothing about the task graph;
//! the scheduler decides what a trigger runs.

pub mod event_handler;
pub mod patterns;
pub mod watcher;

pub use patterns::{WatchProfile, build_profiles, watch_dirs};
pub use watcher::{WatcherHandle, spawn_watcher};
