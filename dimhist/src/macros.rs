//! Macros for engine error handling.
//!
//! Convenience macros for creating and returning [`crate::error::DimhistError`]
//! instances with reduced boilerplate.

/// Creates a [`crate::error::DimhistError`] from an error kind and static
/// description, with optional dynamic detail and source error.
#[macro_export]
macro_rules! dimhist_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::DimhistError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::DimhistError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::DimhistError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::DimhistError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Creates and returns a [`crate::error::DimhistError`] from the current
/// function. Supports the same optional detail and source arguments as
/// [`dimhist_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::dimhist_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::dimhist_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::dimhist_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::dimhist_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
