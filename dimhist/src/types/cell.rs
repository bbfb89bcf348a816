use std::fmt;

use chrono::{DateTime, Utc};

/// A single typed value in a canonical record.
///
/// Equality is value-level and null-aware: `Cell::Null == Cell::Null`, so two
/// records whose attribute is absent in both compare as unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// Returns whether this cell is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Bool(value) => write!(f, "{value}"),
            Cell::I64(value) => write!(f, "{value}"),
            Cell::F64(value) => write!(f, "{value}"),
            Cell::String(value) => write!(f, "{value}"),
            Cell::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
        }
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::I64(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::F64(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::String(value)
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(value: DateTime<Utc>) -> Self {
        Cell::Timestamp(value)
    }
}

impl<T> From<Option<T>> for Cell
where
    T: Into<Cell>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}
