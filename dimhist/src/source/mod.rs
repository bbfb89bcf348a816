//! Input record source abstractions.
//!
//! A record source feeds raw records into a pipeline run. The engine does not
//! care whether the origin is a flat file, message stream, or table scan.

mod base;
pub mod memory;

pub use base::{RecordSource, RecordStream};
