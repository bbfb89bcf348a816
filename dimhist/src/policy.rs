//! Retry classification of engine errors.

use crate::error::{DimhistError, ErrorKind};

/// Retry behavior for a classified error.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RetryDirective {
    /// The operation can be retried automatically after a delay.
    Timed,
    /// The operation must not be retried.
    NoRetry,
}

/// Policy describing how a [`DimhistError`] should be handled by the driver.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ErrorHandlingPolicy {
    retry_directive: RetryDirective,
    solution: Option<&'static str>,
}

impl ErrorHandlingPolicy {
    const fn new(retry_directive: RetryDirective, solution: Option<&'static str>) -> Self {
        Self {
            retry_directive,
            solution,
        }
    }

    /// Returns the retry directive for this policy.
    pub fn retry_directive(&self) -> RetryDirective {
        self.retry_directive
    }

    /// Returns an optional operator-facing solution message.
    pub fn solution(&self) -> Option<&'static str> {
        self.solution
    }
}

/// Builds an [`ErrorHandlingPolicy`] from an error, so every stage handles
/// failures the same way.
///
/// Only transient collaborator I/O failures retry. Pure computation never
/// does: normalization, detection, and merging are deterministic, so retrying
/// them would reproduce the same error.
pub fn build_error_handling_policy(error: &DimhistError) -> ErrorHandlingPolicy {
    match error.kind() {
        // Transient collaborator failures expected to recover on their own.
        ErrorKind::SourceIoError | ErrorKind::DestinationIoError | ErrorKind::IoError => {
            ErrorHandlingPolicy::new(RetryDirective::Timed, None)
        }

        ErrorKind::ConfigError => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Fix the mapping configuration before rerunning the pipeline."),
        ),
        ErrorKind::MissingField => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some(
                "Supply the missing business key field in the source data, or configure the skip-and-log policy.",
            ),
        ),
        ErrorKind::ConversionError => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Fix the malformed value in the source data or correct the declared column type."),
        ),
        ErrorKind::DuplicateBusinessKey => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Deduplicate the input batch; the engine never picks a winner among duplicates."),
        ),
        ErrorKind::DuplicateCurrentVersion => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Repair the history table so each business key has at most one current row."),
        ),
        ErrorKind::StaleSnapshot => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("Another writer touched the same keys; rerun the batch to re-read the snapshot."),
        ),

        // Everything else requires investigation before a rerun.
        _ => ErrorHandlingPolicy::new(
            RetryDirective::NoRetry,
            Some("There is no single prescribed solution for this error; inspect the failure detail before rerunning."),
        ),
    }
}
