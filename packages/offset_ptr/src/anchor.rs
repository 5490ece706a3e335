//! Anchoring strategies: where an offset pointer's base address comes from.

use std::marker::PhantomData;
use std::sync::atomic::Ordering;

use crate::SegmentTag;

/// Supplies the base address an [`OffsetPtr`][crate::OffsetPtr] resolves
/// against.
///
/// Anchors are selected at the type level and dispatched statically: there
/// is no vtable and no per-dereference branch beyond the null check.
pub trait Anchor {
    /// Whether the base depends on the address of the pointer value itself.
    ///
    /// When true, the stored offset is only meaningful at the location where
    /// it was encoded, and assignment between differently placed pointers
    /// must re-encode (see [`OffsetPtr::assign`][crate::OffsetPtr::assign]).
    const SELF_RELATIVE: bool;

    /// Computes the base address, given the address of the pointer value.
    fn base(self_addr: usize) -> usize;
}

/// Marker for anchors under which the stored offset survives a bitwise copy
/// of the pointer, making the pointer `Copy`.
///
/// [`SegmentAnchor`] qualifies because its base ignores the pointer's own
/// address. [`SelfRelocAnchor`] qualifies by caller contract: pointer and
/// referent are only ever relocated together as one byte block, so their
/// relative distance is preserved. [`SelfAnchor`] does not qualify.
pub trait TrivialAnchor: Anchor {}

/// Base = the address of the pointer value itself.
///
/// The most compact strategy for intra-block links, but the resulting
/// pointer is tied to its own location: it cannot be copied bitwise, and a
/// buffer containing one must not be relocated piecemeal.
#[derive(Debug)]
pub struct SelfAnchor;

impl Anchor for SelfAnchor {
    const SELF_RELATIVE: bool = true;

    #[inline]
    fn base(self_addr: usize) -> usize {
        self_addr
    }
}

/// Base = the address of the pointer value itself, with a block-relocation
/// contract.
///
/// Same base rule as [`SelfAnchor`], but the type asserts that the pointer
/// and its referent always move as one byte block (`memcpy` of the whole
/// block, re-mapping of the whole region). Under that contract the decoded
/// referent is unchanged by relocation, so bitwise copies are permitted and
/// the pointer is `Copy`.
#[derive(Debug)]
pub struct SelfRelocAnchor;

impl Anchor for SelfRelocAnchor {
    const SELF_RELATIVE: bool = true;

    #[inline]
    fn base(self_addr: usize) -> usize {
        self_addr
    }
}

impl TrivialAnchor for SelfRelocAnchor {}

/// Base = the process-wide cell bound for `Tag`.
///
/// The stored offset measures from the segment base, independent of the
/// pointer's own location, so the pointer may be copied or relocated
/// anywhere within a segment bound to the same tag. Decoding before
/// [`bind`][crate::bind] has registered a base is a usage error, caught by
/// `debug_assertions` builds.
#[derive(Debug)]
pub struct SegmentAnchor<Tag> {
    _tag: PhantomData<Tag>,
}

impl<Tag: SegmentTag> Anchor for SegmentAnchor<Tag> {
    const SELF_RELATIVE: bool = false;

    #[inline]
    fn base(_self_addr: usize) -> usize {
        let base = Tag::base_cell().load(Ordering::Relaxed);

        debug_assert!(
            base != 0,
            "segment tag must be bound (offset_ptr::bind) before encoding or decoding"
        );

        base
    }
}

impl<Tag: SegmentTag> TrivialAnchor for SegmentAnchor<Tag> {}
