//! Configuration objects for the engine.
//!
//! This module contains re-exported configurations that are needed by the engine.

// Re-exports.
pub use dimhist_config::shared::*;
