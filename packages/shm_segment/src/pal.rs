//! Platform abstraction for named shared-memory objects.
//!
//! Each platform module provides the same surface:
//!
//! * `RawMapping` — an owned, mapped view (base, size, OS handle) that
//!   unmaps and closes on drop, swallowing errors;
//! * `create_exclusive(name, size, namespace)` — create the named object,
//!   size it, map it read-write, with the region zeroed;
//! * `open_existing(name, namespace)` — open and map an existing object,
//!   reporting the size the OS actually exposes;
//! * `remove(name)` — unlink the name where the platform has such a notion.

use std::io;

#[cfg(unix)]
#[path = "pal/unix.rs"]
mod platform;

#[cfg(windows)]
#[path = "pal/windows.rs"]
mod platform;

pub(crate) use platform::{RawMapping, create_exclusive, open_existing, remove};

/// Platform-level failure, not yet decorated with the segment name.
#[derive(Debug)]
pub(crate) enum PalError {
    /// Exclusive creation found the name in use.
    AlreadyExists,

    /// No object exists under the name.
    NotFound,

    /// The object exists but never became non-zero-sized within the
    /// polling window.
    SizeUnavailable,

    /// Any other OS failure.
    Os {
        /// The OS call that failed.
        operation: &'static str,

        /// The error it reported.
        source: io::Error,
    },
}

impl PalError {
    pub(crate) fn os(operation: &'static str) -> Self {
        Self::Os {
            operation,
            source: io::Error::last_os_error(),
        }
    }
}
