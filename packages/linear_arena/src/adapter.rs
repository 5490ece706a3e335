//! The allocation adapter handed to containers.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use offset_ptr::{OffsetRepr, SegmentPtr, SegmentTag};
use thiserror::Error;

use crate::LinearArena;

/// The arena could not satisfy an allocation request.
///
/// Allocation failure is in-band for the arena; containers that promise
/// infallible growth escalate through [`std::alloc::handle_alloc_error`].
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("arena out of capacity")]
pub struct AllocError;

/// A copyable allocation handle to a [`LinearArena`], for use inside
/// containers.
///
/// This is the minimal interface a dynamically sized container needs:
/// [`allocate`][Self::allocate] returning the container's pointer type,
/// [`deallocate`][Self::deallocate] (a no-op — the arena is bump-only), and
/// equality meaning "same arena". The crucial property is the pointer type:
/// allocations come back as segment-anchored [`SegmentPtr`]s, so a container
/// storing its buffer pointer through this adapter can be bit-copied to a
/// peer mapping of the segment and still find its data.
///
/// The handle itself stores a process-local arena address (not an offset):
/// it is only usable for *allocating* in the process that created the arena.
/// A peer that merely reads a container through a relocated mapping never
/// touches it.
pub struct ArenaRef<'arena, Tag: SegmentTag, O: OffsetRepr = u32> {
    arena: NonNull<LinearArena<Tag, O>>,
    _lifetime: PhantomData<&'arena LinearArena<Tag, O>>,
}

impl<'arena, Tag: SegmentTag, O: OffsetRepr> ArenaRef<'arena, Tag, O> {
    /// Creates an allocation handle borrowing `arena`.
    #[must_use]
    pub fn new(arena: &'arena LinearArena<Tag, O>) -> Self {
        Self {
            arena: NonNull::from(arena),
            _lifetime: PhantomData,
        }
    }

    /// The arena this handle allocates from.
    #[must_use]
    pub fn arena(&self) -> &'arena LinearArena<Tag, O> {
        // SAFETY: constructed from a reference that lives for 'arena.
        unsafe { self.arena.as_ref() }
    }

    /// Reserves space for `count` values of `T`.
    ///
    /// The memory is uninitialized. Fails in-band with [`AllocError`] on
    /// exhaustion or byte-count overflow.
    pub fn allocate<T>(&self, count: usize) -> Result<SegmentPtr<T, Tag, O>, AllocError> {
        let ptr = self.arena().alloc_array::<T>(count).ok_or(AllocError)?;

        Ok(SegmentPtr::new(ptr.as_ptr()))
    }

    /// Returns a buffer to the arena: a no-op.
    ///
    /// The arena reclaims nothing before a reset; the bytes are abandoned.
    /// Present so container code can pair every `allocate` with a
    /// `deallocate` and remain oblivious to the bump-only model.
    pub fn deallocate<T>(&self, _ptr: SegmentPtr<T, Tag, O>, _count: usize) {}
}

impl<Tag: SegmentTag, O: OffsetRepr> Clone for ArenaRef<'_, Tag, O> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<Tag: SegmentTag, O: OffsetRepr> Copy for ArenaRef<'_, Tag, O> {}

/// Two handles are equal iff they allocate from the same arena.
impl<Tag: SegmentTag, O: OffsetRepr> PartialEq for ArenaRef<'_, Tag, O> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.arena == other.arena
    }
}

impl<Tag: SegmentTag, O: OffsetRepr> Eq for ArenaRef<'_, Tag, O> {}

impl<Tag: SegmentTag, O: OffsetRepr> fmt::Debug for ArenaRef<'_, Tag, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaRef").field("arena", &self.arena).finish()
    }
}
