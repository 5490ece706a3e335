#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Named shared-memory segments, mappable by multiple processes.
//!
//! A [`Segment`] is a thin wrapper over the operating system's named
//! shared-memory facility: POSIX `shm_open`/`mmap` on Unix-likes, named
//! file-mapping objects on Windows. Its job is deliberately small — create
//! or open a region by portable name, expose the mapped base and size, and
//! [bind][Segment::bind] that base to an [`offset_ptr`] segment tag so that
//! offset pointers stored inside the region decode against this process's
//! mapping.
//!
//! # Names
//!
//! The portable form is a leading `/` followed by one or more bytes, none
//! of which is `/` or NUL: `/my_segment`. Unix passes the name through to
//! the OS; Windows translates the body to a UTF-16 object name in a
//! session-local (by default) namespace.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use offset_ptr::segment_tag;
//! use shm_segment::Segment;
//!
//! segment_tag!(struct CacheTag;);
//!
//! # fn main() -> Result<(), shm_segment::Error> {
//! // Producer.
//! let segment = Segment::create("/demo_cache", 64 * 1024 * 1024)?;
//! segment.bind::<CacheTag>();
//! // ... build structures in segment bytes via a linear arena ...
//!
//! // Consumer (typically another process).
//! let view = Segment::open("/demo_cache")?;
//! view.bind::<CacheTag>();
//! // ... offset pointers in the region now decode into `view` ...
//!
//! Segment::remove("/demo_cache")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Lifecycle
//!
//! Dropping a `Segment` unmaps the view and closes the handle; it never
//! unlinks the name. [`Segment::remove`] is the separate, idempotent
//! unlink (a no-op on Windows, where a named section vanishes with its
//! last handle).

mod error;
mod name;
mod pal;
mod segment;

pub use error::Error;
pub use segment::{ObjectNamespace, OpenMode, Segment, SegmentBuilder};
