//! Integer representations for the stored offset.

use std::fmt::Debug;

mod sealed {
    pub trait Sealed {}
}

/// An integer type usable as the stored form of an [`OffsetPtr`][crate::OffsetPtr].
///
/// The encoding reserves zero for null and stores `diff + 1` for a referent
/// at signed displacement `diff` from the base. Signed representations can
/// address referents below the base (except displacement `-1`, which would
/// collide with the null sentinel); unsigned representations require the
/// referent at or above the base.
///
/// Implemented for the built-in integers no wider than a native pointer.
/// The trait is sealed: the decode arithmetic relies on the exact two's
/// complement behavior of these types.
pub trait OffsetRepr: Copy + Eq + Debug + Send + Sync + sealed::Sealed + 'static {
    /// The stored value that encodes a null pointer.
    const NULL: Self;

    /// Whether displacements below the base are representable.
    const SIGNED: bool;

    /// Encodes a signed displacement from the base.
    ///
    /// Out-of-range displacements (and the sentinel-colliding `-1`) are a
    /// usage error: debug builds assert, release builds truncate silently.
    fn encode(diff: isize) -> Self;

    /// Whether this stored value is the null sentinel.
    fn is_null(self) -> bool;

    /// The wrapping byte displacement from the base for a non-null value.
    ///
    /// Adding the result to the base address with wrapping arithmetic
    /// reconstructs the referent address, for signed and unsigned
    /// representations alike.
    fn delta(self) -> usize;
}

macro_rules! signed_offset_repr {
    ($($int:ty),* $(,)?) => {$(
        impl sealed::Sealed for $int {}

        impl OffsetRepr for $int {
            const NULL: Self = 0;
            const SIGNED: bool = true;

            #[inline]
            fn encode(diff: isize) -> Self {
                debug_assert!(
                    diff != -1,
                    "displacement -1 would encode to the null sentinel"
                );

                let stored = diff.wrapping_add(1);

                debug_assert!(
                    stored >= <$int>::MIN as isize && stored <= <$int>::MAX as isize,
                    "displacement {diff} does not fit a {} offset",
                    stringify!($int),
                );

                stored as $int
            }

            #[inline]
            fn is_null(self) -> bool {
                self == 0
            }

            #[inline]
            fn delta(self) -> usize {
                // Sign-extend first so that negative displacements wrap
                // correctly when added to the base.
                (self as isize).wrapping_sub(1) as usize
            }
        }
    )*};
}

macro_rules! unsigned_offset_repr {
    ($($int:ty),* $(,)?) => {$(
        impl sealed::Sealed for $int {}

        impl OffsetRepr for $int {
            const NULL: Self = 0;
            const SIGNED: bool = false;

            #[inline]
            fn encode(diff: isize) -> Self {
                debug_assert!(
                    diff >= 0,
                    "an unsigned offset cannot name a referent below the base (displacement {diff})"
                );

                let stored = (diff as usize).wrapping_add(1);

                debug_assert!(
                    stored <= <$int>::MAX as usize,
                    "displacement {diff} does not fit a {} offset",
                    stringify!($int),
                );

                stored as $int
            }

            #[inline]
            fn is_null(self) -> bool {
                self == 0
            }

            #[inline]
            fn delta(self) -> usize {
                (self as usize).wrapping_sub(1)
            }
        }
    )*};
}

signed_offset_repr!(i8, i16, i32, isize);
unsigned_offset_repr!(u8, u16, u32, usize);

#[cfg(target_pointer_width = "64")]
signed_offset_repr!(i64);

#[cfg(target_pointer_width = "64")]
unsigned_offset_repr!(u64);

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn null_sentinel_is_zero() {
        assert_eq!(<i32 as OffsetRepr>::NULL, 0);
        assert_eq!(<u32 as OffsetRepr>::NULL, 0);
        assert!(<i32 as OffsetRepr>::NULL.is_null());
        assert!(!1_i32.is_null());
    }

    #[test]
    fn signed_roundtrip_positive_and_negative() {
        for diff in [0_isize, 1, 7, 4095, -2, -4096] {
            let stored = <i32 as OffsetRepr>::encode(diff);
            assert!(!stored.is_null());
            assert_eq!(stored.delta(), diff as usize);
        }
    }

    #[test]
    fn unsigned_roundtrip() {
        for diff in [0_isize, 1, 255, 65_534] {
            let stored = <u16 as OffsetRepr>::encode(diff);
            assert!(!stored.is_null());
            assert_eq!(stored.delta(), diff as usize);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "null sentinel")]
    fn signed_minus_one_collides_with_null() {
        let _ = <i32 as OffsetRepr>::encode(-1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "below the base")]
    fn unsigned_rejects_negative_displacement() {
        let _ = <u32 as OffsetRepr>::encode(-2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "does not fit")]
    fn narrow_width_overflow_is_detected() {
        let _ = <i8 as OffsetRepr>::encode(1000);
    }
}
