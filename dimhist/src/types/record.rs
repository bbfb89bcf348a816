use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::types::Cell;

/// A raw input record as produced by a record source: source field name to
/// raw text value. The origin (flat file, message stream, table scan) is
/// irrelevant to the engine.
pub type RawRecord = HashMap<String, String>;

/// A normalized record whose cells are ordered to match the record schema's
/// target column layout.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    values: Vec<Cell>,
}

impl CanonicalRecord {
    /// Creates a new canonical record from cells in schema column order.
    pub fn new(values: Vec<Cell>) -> Self {
        Self { values }
    }

    /// Returns the cells in schema column order.
    pub fn values(&self) -> &[Cell] {
        &self.values
    }

    /// Consumes the record and returns its cells.
    pub fn into_values(self) -> Vec<Cell> {
        self.values
    }
}

/// The business-key cells of one record, extracted in schema key order.
///
/// Usable as a hash-map key: floats compare and hash by bit pattern. A valid
/// key never contains nulls, since missing key fields fail at normalization.
#[derive(Debug, Clone)]
pub struct BusinessKey(Vec<Cell>);

impl BusinessKey {
    /// Creates a business key from extracted key cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells)
    }

    /// Returns the key cells in schema key order.
    pub fn cells(&self) -> &[Cell] {
        &self.0
    }
}

impl PartialEq for BusinessKey {
    fn eq(&self, other: &BusinessKey) -> bool {
        if self.0.len() != other.0.len() {
            return false;
        }

        self.0.iter().zip(other.0.iter()).all(|(a, b)| match (a, b) {
            (Cell::F64(a), Cell::F64(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        })
    }
}

impl Eq for BusinessKey {}

impl Hash for BusinessKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for cell in &self.0 {
            std::mem::discriminant(cell).hash(state);
            match cell {
                Cell::Null => {}
                Cell::Bool(value) => value.hash(state),
                Cell::I64(value) => value.hash(state),
                Cell::F64(value) => value.to_bits().hash(state),
                Cell::String(value) => value.hash(state),
                Cell::Timestamp(value) => value.hash(state),
            }
        }
    }
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, cell) in self.0.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{cell}")?;
        }

        Ok(())
    }
}
