#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Pointers that survive being mapped at a different address.
//!
//! Data structures placed in shared memory are seen by every attached process
//! at a different virtual address, so ordinary pointers stored inside them are
//! meaningless to everyone except the process that wrote them. This package
//! provides [`OffsetPtr`], a pointer-shaped value that stores a narrow integer
//! *offset* instead of an absolute address. The offset is resolved against a
//! *base* supplied by an [`Anchor`] chosen at the type level, so resolution
//! compiles down to one addition and a null check.
//!
//! # Anchoring strategies
//!
//! * [`SelfAnchor`] — the base is the address of the pointer value itself.
//!   The stored offset is only meaningful at the address where it was
//!   encoded, so this pointer cannot be copied bitwise; it is written and
//!   rewritten in place via [`OffsetPtr::set`] and [`OffsetPtr::assign`].
//! * [`SelfRelocAnchor`] — same base rule, but the type records the caller's
//!   promise that pointer and referent always travel together as one byte
//!   block (for example a node whose link targets a sibling in the same
//!   block). Under that promise a bitwise copy of the whole block is valid,
//!   so the pointer is `Copy`.
//! * [`SegmentAnchor`] — the base is a process-wide cell registered for a
//!   [`SegmentTag`]. The stored offset is independent of where the pointer
//!   itself lives, so the pointer is `Copy` and may be relocated freely
//!   within any mapping of the tagged segment.
//!
//! # Quick start
//!
//! ```rust
//! use offset_ptr::{SegmentPtr, segment_tag};
//!
//! segment_tag!(struct DemoTag;);
//!
//! let mut region = [0_u64; 32];
//! offset_ptr::bind::<DemoTag>(region.as_mut_ptr().cast());
//!
//! let target: *mut u64 = &mut region[5];
//! let p: SegmentPtr<u64, DemoTag> = SegmentPtr::new(target);
//!
//! assert!(!p.is_null());
//! assert_eq!(p.get(), target);
//! ```
//!
//! # Encoding
//!
//! The single stored field is an integer of a width chosen via [`OffsetRepr`]
//! (32 bits by default). Zero means null; any other value `s` names the
//! address `base + (s - 1)`. An unsigned 32-bit offset addresses up to
//! ~4 GiB above the base; a signed 32-bit offset addresses ±2 GiB around it.
//! Encodings that do not fit the chosen width are a usage error: they are
//! caught by `debug_assertions` builds and silently truncated in release
//! builds, which is the deliberate compactness trade of this design.

mod anchor;
mod ptr;
mod repr;
mod tag;

pub use anchor::{Anchor, SegmentAnchor, SelfAnchor, SelfRelocAnchor, TrivialAnchor};
pub use ptr::{OffsetPtr, SegmentPtr, SelfRelocPtr};
pub use repr::OffsetRepr;
pub use tag::{SegmentTag, bind, bound_base};
