//! Shared configuration types for the dimhist engine.
//!
//! Configuration is always passed as explicit structs at construction time;
//! nothing in this crate reads the process environment.

pub mod shared;
