//! Cell ID types.
//!
//! A pool's cell-ID width is selected at compile time through the
//! [`CellId`] trait, implemented for the unsigned integer widths a pool is
//! allowed to key its cells with, and used as a generic parameter on
//! [`crate::Pool`].

use std::fmt::Debug;
use std::hash::Hash;

/// A small unsigned integer usable as a pool's cell identifier.
///
/// `NONE` is the all-ones bit pattern of the width, a convenient sentinel
/// for "no cell" that client code can store alongside live cell IDs.
pub trait CellId: Copy + Clone + Debug + Eq + Hash + Ord + Send + Sync + 'static {
    /// The sentinel meaning "no cell" / allocation failure.
    const NONE: Self;

    /// Convert to a `usize` index. Never called with `Self::NONE`.
    fn to_usize(self) -> usize;

    /// Build an ID from a `usize` index.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not fit in the ID width. The pool never
    /// constructs an ID past `count`, and `count` is bounded by the
    /// backing buffer size, so this is unreachable in practice for any
    /// buffer a real allocator will hand back.
    fn from_usize(value: usize) -> Self;
}

macro_rules! impl_cell_id {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl CellId for $ty {
                const NONE: Self = <$ty>::MAX;

                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }

                #[inline]
                fn from_usize(value: usize) -> Self {
                    <$ty>::try_from(value).expect("cell id out of range for configured width")
                }
            }
        )+
    };
}

impl_cell_id!(u16, u32, u64);
