use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use dimhist_config::shared::ColumnType;

use crate::bail;
use crate::conversions::parse_bool;
use crate::error::{DimhistResult, ErrorKind};
use crate::types::Cell;

/// Coerces one raw text value into a typed cell for the declared column type.
///
/// Empty text is treated as null for every column type; whether a null is
/// acceptable is decided by the caller, not here.
pub fn parse_cell(raw: &str, column_type: ColumnType) -> DimhistResult<Cell> {
    if raw.is_empty() {
        return Ok(Cell::Null);
    }

    match column_type {
        ColumnType::String => Ok(Cell::String(raw.to_string())),
        ColumnType::Bool => parse_bool(raw).map(Cell::Bool),
        ColumnType::Integer => match raw.parse::<i64>() {
            Ok(value) => Ok(Cell::I64(value)),
            Err(err) => bail!(
                ErrorKind::ConversionError,
                "Invalid integer value",
                format!("'{raw}' does not parse as an integer: {err}")
            ),
        },
        ColumnType::Float => match raw.parse::<f64>() {
            Ok(value) => Ok(Cell::F64(value)),
            Err(err) => bail!(
                ErrorKind::ConversionError,
                "Invalid float value",
                format!("'{raw}' does not parse as a float: {err}")
            ),
        },
        ColumnType::Timestamp => parse_timestamp(raw),
    }
}

/// Parses a raw timestamp value.
///
/// Tries RFC 3339 first, then a date-time without offset (taken as UTC), then
/// a bare date (taken as UTC midnight).
pub fn parse_timestamp(raw: &str) -> DimhistResult<Cell> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Cell::Timestamp(value.with_timezone(&Utc)));
    }

    if let Ok(value) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Cell::Timestamp(value.and_utc()));
    }

    if let Ok(value) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Cell::Timestamp(value.and_time(NaiveTime::MIN).and_utc()));
    }

    bail!(
        ErrorKind::ConversionError,
        "Invalid timestamp value",
        format!("'{raw}' is not RFC 3339, 'YYYY-MM-DD HH:MM:SS', or 'YYYY-MM-DD'")
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_text_is_null_for_every_type() {
        for column_type in [
            ColumnType::String,
            ColumnType::Bool,
            ColumnType::Integer,
            ColumnType::Float,
            ColumnType::Timestamp,
        ] {
            assert_eq!(parse_cell("", column_type).unwrap(), Cell::Null);
        }
    }

    #[test]
    fn coerces_to_declared_types() {
        assert_eq!(
            parse_cell("42", ColumnType::Integer).unwrap(),
            Cell::I64(42)
        );
        assert_eq!(
            parse_cell("1.25", ColumnType::Float).unwrap(),
            Cell::F64(1.25)
        );
        assert_eq!(
            parse_cell("t", ColumnType::Bool).unwrap(),
            Cell::Bool(true)
        );
        assert_eq!(
            parse_cell("42", ColumnType::String).unwrap(),
            Cell::String("42".to_string())
        );
    }

    #[test]
    fn parses_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(
            parse_cell("2024-03-01T12:30:00Z", ColumnType::Timestamp).unwrap(),
            Cell::Timestamp(expected)
        );
        assert_eq!(
            parse_cell("2024-03-01 12:30:00", ColumnType::Timestamp).unwrap(),
            Cell::Timestamp(expected)
        );

        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            parse_cell("2024-03-01", ColumnType::Timestamp).unwrap(),
            Cell::Timestamp(midnight)
        );
    }

    #[test]
    fn malformed_values_fail_with_conversion_error() {
        for (raw, column_type) in [
            ("abc", ColumnType::Integer),
            ("abc", ColumnType::Float),
            ("maybe", ColumnType::Bool),
            ("yesterday", ColumnType::Timestamp),
        ] {
            let err = parse_cell(raw, column_type).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ConversionError);
        }
    }
}
