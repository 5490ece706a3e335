//! Process-wide base bindings for segment tags.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

/// A compile-time label identifying one logical shared-memory segment.
///
/// A tag's only runtime artifact is a process-wide cell holding the base
/// address at which the tagged segment is currently mapped in this process.
/// Every [`SegmentAnchor`][crate::SegmentAnchor]ed pointer resolves against
/// that cell, so rebinding the tag (for example after re-mapping the segment
/// elsewhere) retargets every such pointer at once.
///
/// Declare tags with [`segment_tag!`](crate::segment_tag); the macro
/// generates the type together with its cell. Tags are a labeling device
/// local to each process: two processes may bind the same underlying segment
/// to differently named tags.
pub trait SegmentTag: 'static {
    /// The cell holding the current base address for this tag.
    ///
    /// Zero means "not bound yet". The cell is atomic with relaxed ordering
    /// so that a rebind racing with decodes is an observable stale read, not
    /// undefined behavior; ordering between a bind and decodes on other
    /// threads is the caller's responsibility.
    fn base_cell() -> &'static AtomicUsize;
}

/// Registers `base` as the current mapping address for `Tag` in this process.
///
/// Must happen before any decode through the tag on the same thread. In
/// steady state the cell is written once per process; rebinding while other
/// threads are decoding yields stale-or-new reads per decode.
#[inline]
pub fn bind<Tag: SegmentTag>(base: *mut u8) {
    Tag::base_cell().store(base as usize, Ordering::Relaxed);
}

/// Returns the base currently bound for `Tag`, or null if unbound.
#[inline]
#[must_use]
pub fn bound_base<Tag: SegmentTag>() -> *mut u8 {
    Tag::base_cell().load(Ordering::Relaxed) as *mut u8
}

/// Declares one or more segment tag types.
///
/// Each declaration produces a unit struct implementing
/// [`SegmentTag`] with its own process-wide base cell.
///
/// ```rust
/// use offset_ptr::segment_tag;
///
/// segment_tag! {
///     /// Tag for the telemetry ring segment.
///     pub struct TelemetryTag;
///     struct PrivateTag;
/// }
/// ```
#[macro_export]
macro_rules! segment_tag {
    () => {};
    ($(#[$meta:meta])* $vis:vis struct $name:ident; $($rest:tt)*) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug)]
        $vis struct $name;

        impl $crate::SegmentTag for $name {
            #[inline]
            fn base_cell() -> &'static ::std::sync::atomic::AtomicUsize {
                static CELL: ::std::sync::atomic::AtomicUsize =
                    ::std::sync::atomic::AtomicUsize::new(0);
                &CELL
            }
        }

        $crate::segment_tag!($($rest)*);
    };
}
