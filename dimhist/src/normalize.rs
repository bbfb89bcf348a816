//! Normalization of raw source records into canonical records.

use crate::bail;
use crate::conversions::parse_cell;
use crate::error::{DimhistResult, ErrorKind};
use crate::schema::RecordSchema;
use crate::types::{CanonicalRecord, RawRecord};

/// Maps one raw record into the canonical layout described by `schema`.
///
/// Source fields without a mapping are dropped. A mapped field that is absent
/// or empty becomes null, unless its target column is part of the business
/// key, in which case the record fails with [`ErrorKind::MissingField`]. Raw
/// values are coerced to the column's declared type.
///
/// Pure per-record function: no side effects, no ordering dependency between
/// records. Policy for missing-field failures (abort vs skip) belongs to the
/// driver.
pub fn normalize(raw: &RawRecord, schema: &RecordSchema) -> DimhistResult<CanonicalRecord> {
    let mut values = Vec::with_capacity(schema.columns().len());

    for (index, column) in schema.columns().iter().enumerate() {
        let raw_value = raw
            .get(&column.source_field)
            .map(String::as_str)
            .unwrap_or("");
        let cell = parse_cell(raw_value, column.column_type)?;

        if cell.is_null() && schema.is_business_key_column(index) {
            bail!(
                ErrorKind::MissingField,
                "Business key field missing from source record",
                format!(
                    "source field '{}' (target column '{}') is absent or empty",
                    column.source_field, column.target_column
                )
            );
        }

        values.push(cell);
    }

    Ok(CanonicalRecord::new(values))
}
