// src/serve/mod.rs

//! Development server and the reload hub feeding it.

pub mod reload;
pub mod server;

pub use reload::{ReloadHub, ReloadSignal};
pub use server::DevServer;
