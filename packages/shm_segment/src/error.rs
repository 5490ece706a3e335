//! Segment errors.

use std::io;

use thiserror::Error;

/// Errors that can occur when creating, opening or removing segments.
///
/// Every variant carries the portable segment name it concerns; OS-level
/// failures additionally carry the failing operation and the underlying
/// [`io::Error`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The name does not match the portable format: a leading `/` followed
    /// by one or more bytes, none of which is `/` or NUL.
    #[error("invalid segment name '{name}': {problem}")]
    InvalidName {
        /// The offending name, as given.
        name: String,

        /// What is wrong with it.
        problem: &'static str,
    },

    /// A constructor argument other than the name was unusable.
    #[error("invalid argument for segment '{name}': {problem}")]
    InvalidArgument {
        /// The segment the request concerned.
        name: String,

        /// What is wrong with the request.
        problem: &'static str,
    },

    /// Create-only mode found the name already in use.
    #[error("segment '{name}' already exists")]
    AlreadyExists {
        /// The segment name that is taken.
        name: String,
    },

    /// Open-only mode found no segment under the name.
    #[error("segment '{name}' does not exist")]
    NotFound {
        /// The segment name that was absent.
        name: String,
    },

    /// The existing segment is smaller than the requested size.
    ///
    /// The opposite direction is fine: opening with a smaller request
    /// adopts the existing (larger) size.
    #[error(
        "segment '{name}' holds {existing} bytes but {requested} bytes were requested"
    )]
    SizeConflict {
        /// The segment name.
        name: String,

        /// Size the existing segment actually has.
        existing: usize,

        /// Size the caller asked for.
        requested: usize,
    },

    /// The segment existed but never became non-zero-sized within the
    /// bounded polling window; the creating peer may have died between
    /// creating and sizing it.
    #[error("segment '{name}' never became sized within the polling window")]
    SizeUnavailable {
        /// The segment name.
        name: String,
    },

    /// An OS call failed.
    #[error("{operation} failed for segment '{name}': {source}")]
    OsFailure {
        /// The OS-level operation that failed.
        operation: &'static str,

        /// The segment name the operation concerned.
        name: String,

        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// A specialized `Result` type for segment operations, returning the
/// crate's [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn os_failure_preserves_the_source() {
        let error = Error::OsFailure {
            operation: "shm_open",
            name: "/probe".to_string(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        };

        let message = error.to_string();
        assert!(message.contains("shm_open"));
        assert!(message.contains("/probe"));

        let source = std::error::Error::source(&error).expect("source must be attached");
        assert!(source.to_string().contains("permission"));
    }

    #[test]
    fn size_conflict_names_both_sizes() {
        let error = Error::SizeConflict {
            name: "/probe".to_string(),
            existing: 4096,
            requested: 8192,
        };

        let message = error.to_string();
        assert!(message.contains("4096"));
        assert!(message.contains("8192"));
    }
}
