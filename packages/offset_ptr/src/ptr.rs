//! The offset pointer type.

use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use crate::{Anchor, OffsetRepr, SegmentAnchor, SegmentTag, SelfAnchor, SelfRelocAnchor, TrivialAnchor};

/// A pointer-shaped value that stores a relocatable integer offset instead of
/// an absolute address.
///
/// The single stored field is an integer of width `O` encoding
/// null-or-`(offset + 1)`; the referent address is reconstructed on demand as
/// `base + (stored - 1)`, where the base comes from the anchor `A` (see the
/// [crate docs](crate) for the three strategies). The layout is
/// `#[repr(transparent)]` over `O`: no padding, no metadata, byte-for-byte
/// stable inside shared memory.
///
/// `T` must be a sized object type; thin pointers only.
///
/// # Copying
///
/// `Copy`/`Clone` are available exactly when the anchor is a
/// [`TrivialAnchor`]. A [`SelfAnchor`]ed pointer is deliberately neither:
/// its stored offset changes meaning with the pointer's own address, so it
/// is written in place with [`set`](Self::set) and propagated with
/// [`assign`](Self::assign), which re-encodes through the destination.
///
/// # Nullness
///
/// A null pointer is stored as zero and decodes to a null raw pointer.
/// Dereferencing is never checked here; gate on [`is_null`](Self::is_null)
/// before using the decoded address.
#[repr(transparent)]
pub struct OffsetPtr<T, A: Anchor = SelfAnchor, O: OffsetRepr = i32> {
    storage: O,
    _marker: PhantomData<(*mut T, fn() -> A)>,
}

/// A segment-anchored offset pointer: relocatable anywhere within a segment
/// bound to `Tag`.
///
/// The default unsigned 32-bit offset addresses up to ~4 GiB above the
/// segment base.
pub type SegmentPtr<T, Tag, O = u32> = OffsetPtr<T, SegmentAnchor<Tag>, O>;

/// A self-relative offset pointer carrying the block-relocation contract of
/// [`SelfRelocAnchor`].
///
/// The default signed 32-bit offset addresses ±2 GiB around the pointer's
/// own location.
pub type SelfRelocPtr<T, O = i32> = OffsetPtr<T, SelfRelocAnchor, O>;

impl<T, A: Anchor, O: OffsetRepr> OffsetPtr<T, A, O> {
    /// Creates a null pointer.
    #[inline]
    #[must_use]
    pub const fn null() -> Self {
        Self {
            storage: O::NULL,
            _marker: PhantomData,
        }
    }

    /// Whether this pointer is null.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.storage.is_null()
    }

    /// The stored integer, for diagnostics.
    ///
    /// The value is an encoding relative to this pointer's anchor (and, for
    /// self-relative anchors, its current address); it must not be used to
    /// reconstruct a pointer elsewhere.
    #[inline]
    #[must_use]
    pub fn raw_storage(&self) -> O {
        self.storage
    }

    /// Decodes the referent address; null-preserving.
    #[inline]
    #[must_use]
    pub fn get(&self) -> *mut T {
        let stored = self.storage;

        if stored.is_null() {
            return ptr::null_mut();
        }

        let base = A::base(ptr::from_ref(self) as usize);

        base.wrapping_add(stored.delta()) as *mut T
    }

    /// Re-encodes this pointer, in place, to name `target`.
    ///
    /// This is the only way to make a self-relative pointer non-null: the
    /// encoding depends on the address of `self`, so a by-value constructor
    /// would encode against a temporary location and break on the move out.
    #[inline]
    pub fn set(&mut self, target: *mut T) {
        if target.is_null() {
            self.storage = O::NULL;
            return;
        }

        let base = A::base(ptr::from_mut(self) as usize);
        let diff = (target as usize as isize).wrapping_sub(base as isize);

        self.storage = O::encode(diff);
    }

    /// Assigns `source` to `self` by re-encoding: reads the referent through
    /// the source and stores it through the destination.
    ///
    /// For self-relative anchors this is the required assignment form — a
    /// bitwise copy of the stored integer between differently placed
    /// pointers would silently retarget it. For trivially copyable anchors
    /// it is equivalent to plain assignment.
    #[inline]
    pub fn assign(&mut self, source: &Self) {
        self.set(source.get());
    }

    /// Resets this pointer to null.
    #[inline]
    pub fn clear(&mut self) {
        self.storage = O::NULL;
    }

    /// Decodes to a shared reference, or `None` for null.
    ///
    /// # Safety
    ///
    /// The decoded address must point to a live, properly initialized `T`
    /// that is not mutated for the duration of the returned borrow, and the
    /// anchor's base must be the one the pointer was encoded against (for
    /// segment anchors: the tag is bound to the mapping containing the
    /// referent).
    #[inline]
    #[must_use]
    pub unsafe fn as_ref<'a>(&self) -> Option<&'a T> {
        // SAFETY: validity of the decoded address is the caller's contract.
        unsafe { self.get().as_ref() }
    }

    /// Decodes to an exclusive reference, or `None` for null.
    ///
    /// # Safety
    ///
    /// As for [`as_ref`](Self::as_ref), and additionally no other reference
    /// to the referent may exist for the duration of the borrow.
    #[inline]
    #[must_use]
    pub unsafe fn as_mut<'a>(&mut self) -> Option<&'a mut T> {
        // SAFETY: validity and exclusivity are the caller's contract.
        unsafe { self.get().as_mut() }
    }

    /// Decodes the address of the `count`-th element past the referent.
    ///
    /// The arithmetic is performed on the decoded address; the stored offset
    /// is not modified.
    ///
    /// # Safety
    ///
    /// The pointer must be non-null and the resulting address must stay
    /// within the same allocated region as the referent.
    #[inline]
    #[must_use]
    pub unsafe fn add(&self, count: usize) -> *mut T {
        debug_assert!(!self.is_null(), "pointer arithmetic on a null pointer");

        // SAFETY: in-bounds arithmetic is the caller's contract.
        unsafe { self.get().add(count) }
    }
}

impl<T, A: TrivialAnchor, O: OffsetRepr> OffsetPtr<T, A, O> {
    /// Reinterprets the referent type at zero cost.
    ///
    /// The decoded address is unchanged, so the stored offset carries over
    /// verbatim. This is the conversion surface of this pointer type — the
    /// analog of `NonNull::cast` — covering layout-compatible views such as
    /// a `#[repr(C)]` struct to its first field, or any referent to its byte
    /// representation.
    #[inline]
    #[must_use]
    pub fn cast<U>(self) -> OffsetPtr<U, A, O> {
        OffsetPtr {
            storage: self.storage,
            _marker: PhantomData,
        }
    }
}

impl<T, Tag: SegmentTag, O: OffsetRepr> OffsetPtr<T, SegmentAnchor<Tag>, O> {
    /// Encodes `target` against the segment base bound for `Tag`.
    ///
    /// Only the segment anchor offers by-value construction: its encoding
    /// ignores where the pointer value itself lives, so the result may be
    /// moved and copied freely afterwards. Passing null yields a null
    /// pointer.
    #[inline]
    #[must_use]
    pub fn new(target: *mut T) -> Self {
        let mut this = Self::null();
        this.set(target);
        this
    }
}

impl<T, A: Anchor, O: OffsetRepr> Default for OffsetPtr<T, A, O> {
    #[inline]
    fn default() -> Self {
        Self::null()
    }
}

impl<T, A: TrivialAnchor, O: OffsetRepr> Clone for OffsetPtr<T, A, O> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A: TrivialAnchor, O: OffsetRepr> Copy for OffsetPtr<T, A, O> {}

/// Pointers compare by decoded address, across anchors and offset widths:
/// two pointers with different stored integers that name the same referent
/// compare equal.
impl<T, A1, O1, A2, O2> PartialEq<OffsetPtr<T, A2, O2>> for OffsetPtr<T, A1, O1>
where
    A1: Anchor,
    O1: OffsetRepr,
    A2: Anchor,
    O2: OffsetRepr,
{
    #[inline]
    fn eq(&self, other: &OffsetPtr<T, A2, O2>) -> bool {
        self.get() == other.get()
    }
}

impl<T, A: Anchor, O: OffsetRepr> Eq for OffsetPtr<T, A, O> {}

impl<T, A: Anchor, O: OffsetRepr> fmt::Debug for OffsetPtr<T, A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Decoding here could trip the unbound-tag assertion, so show only
        // the stored form.
        f.debug_struct("OffsetPtr")
            .field("storage", &self.storage)
            .finish()
    }
}
