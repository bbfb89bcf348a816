//! Error types and result definitions for the history merge engine.
//!
//! Provides a single error type with kind classification, captured callsite
//! metadata, and aggregation. [`DimhistError`] covers everything from mapping
//! configuration problems to collaborator I/O failures; the [`ErrorKind`]
//! taxonomy is what retry policy and failure reporting key off.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for engine operations using [`DimhistError`].
pub type DimhistResult<T> = Result<T, DimhistError>;

/// Detailed payload stored for single [`DimhistError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for engine operations.
#[derive(Debug, Clone)]
pub struct DimhistError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
///
/// The `Many` variant captures several concurrent per-key write failures as
/// one error without losing any of them.
#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    Many {
        errors: Vec<DimhistError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors that can occur while tracking and merging history.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration errors, fatal before any I/O.
    ConfigError,

    // Normalization errors.
    MissingField,
    ConversionError,

    // Data-integrity violations, always fatal.
    DuplicateBusinessKey,
    DuplicateCurrentVersion,

    // Collaborator I/O failures, retryable.
    SourceIoError,
    DestinationIoError,
    IoError,

    // Write-time consistency: the snapshot went stale under us.
    StaleSnapshot,

    // State & data errors.
    InvalidState,
    InvalidData,
    Cancelled,

    // Unknown / uncategorized.
    Unknown,
}

impl DimhistError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or
    /// [`ErrorKind::Unknown`] if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattened.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] and returns the modified
    /// instance. Has no effect on aggregated errors, which forward the first
    /// contained error as their source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`DimhistError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        let location = Location::caller();
        let backtrace = Arc::new(Backtrace::capture());

        DimhistError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location,
                backtrace,
            }),
        }
    }
}

impl PartialEq for DimhistError {
    fn eq(&self, other: &DimhistError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl Hash for DimhistError {
    /// Hashes only the stable identifying components (kind and static
    /// description), excluding location, detail, source, and backtrace, so
    /// errors of the same category group together.
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                std::mem::discriminant(&self.repr).hash(state);
                payload.kind.hash(state);
                payload.description.hash(state);
            }
            ErrorRepr::Many { errors, .. } => {
                std::mem::discriminant(&self.repr).hash(state);
                errors.len().hash(state);
                for error in errors {
                    error.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for DimhistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if let Some(detail) = payload.detail.as_deref() {
                    write!(f, "\n  Detail: {detail}")?;
                }

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    for (line_index, line) in rendered.lines().enumerate() {
                        if line_index == 0 {
                            write!(f, "\n  {}. {}", index + 1, line)?;
                        } else {
                            write!(f, "\n     {line}")?;
                        }
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for DimhistError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            // Aggregated errors forward the first contained error.
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Creates a [`DimhistError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for DimhistError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> DimhistError {
        DimhistError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`DimhistError`] from an error kind, static description, and
/// dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for DimhistError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> DimhistError {
        DimhistError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates a vector of errors into one.
///
/// A vector with exactly one error is returned directly without wrapping.
impl<E> From<Vec<E>> for DimhistError
where
    E: Into<DimhistError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> DimhistError {
        let location = Location::caller();

        let mut errors: Vec<DimhistError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1 {
            return errors.pop().expect("just checked length is 1");
        }

        DimhistError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for DimhistError {
    #[track_caller]
    fn from(err: std::io::Error) -> DimhistError {
        let detail = err.to_string();
        let source = Arc::new(err);
        DimhistError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] with the appropriate error kind.
impl From<serde_json::Error> for DimhistError {
    #[track_caller]
    fn from(err: serde_json::Error) -> DimhistError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            _ => (ErrorKind::ConfigError, "JSON deserialization failed"),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        DimhistError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`chrono::ParseError`] with [`ErrorKind::ConversionError`].
impl From<chrono::ParseError> for DimhistError {
    #[track_caller]
    fn from(err: chrono::ParseError) -> DimhistError {
        let detail = err.to_string();
        let source = Arc::new(err);
        DimhistError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("Datetime parsing failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
