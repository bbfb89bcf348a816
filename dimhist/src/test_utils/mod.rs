//! Test helpers for exercising the engine.
//!
//! Everything here is compiled only for tests or behind the `test-utils`
//! feature; nothing is part of the production API.

#[cfg(feature = "failpoints")]
pub mod failpoints;
pub mod fault_store;
pub mod pipeline;
pub mod schema;
pub mod tracing;
