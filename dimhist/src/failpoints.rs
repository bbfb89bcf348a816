//! Named failpoints for fault-injection tests.
//!
//! The failpoints compile to no-ops unless the `failpoints` feature is
//! enabled, so the store can evaluate them unconditionally.

use fail::fail_point;

use crate::bail;
use crate::error::{DimhistResult, ErrorKind};

pub const HISTORY_STORE__READ_CURRENT: &str = "history_store.read_current";
pub const HISTORY_STORE__APPLY_CLOSE: &str = "history_store.apply_close";
pub const HISTORY_STORE__APPLY_OPEN: &str = "history_store.apply_open";

/// Evaluates the named failpoint, turning an injected failure into a
/// retryable I/O error.
///
/// The failpoint parameter picks the failing side: `source` for
/// [`ErrorKind::SourceIoError`], anything else (or no parameter) for
/// [`ErrorKind::DestinationIoError`].
pub fn dimhist_fail_point(name: &str) -> DimhistResult<()> {
    fail_point!(name, |parameter| {
        let error_kind = match parameter.as_deref() {
            Some("source") => ErrorKind::SourceIoError,
            _ => ErrorKind::DestinationIoError,
        };

        bail!(
            error_kind,
            "An error occurred in a fail point",
            format!("The failpoint '{name}' returned an error")
        );
    });

    Ok(())
}
