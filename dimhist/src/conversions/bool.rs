use crate::bail;
use crate::error::{DimhistResult, ErrorKind};

/// Parses a raw boolean value.
///
/// Accepts the common flat-file spellings in either case: `t`/`f`,
/// `true`/`false`, and `1`/`0`.
pub fn parse_bool(s: &str) -> DimhistResult<bool> {
    match s.to_ascii_lowercase().as_str() {
        "t" | "true" | "1" => Ok(true),
        "f" | "false" | "0" => Ok(false),
        _ => bail!(
            ErrorKind::ConversionError,
            "Invalid boolean value",
            format!("Boolean value must be t/f, true/false, or 1/0 (received: {s})")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_spellings() {
        assert!(parse_bool("t").unwrap());
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("f").unwrap());
        assert!(!parse_bool("false").unwrap());
        assert!(!parse_bool("0").unwrap());
    }

    #[test]
    fn rejects_everything_else() {
        let err = parse_bool("yes").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionError);
    }
}
