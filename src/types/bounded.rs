use core::fmt::Debug;
use num_traits::AsPrimitive;

pub(super) mod traits {
    pub trait Sealed {}
}

/// A trait for unsigned integer types that custom indexed pixel formats use as palette indices.
pub trait BoundedIndex: AsPrimitive<u32> + Copy + Send + Sync + Debug + traits::Sealed + 'static {
    /// The number of bits of this index type.
    const BITS: u32;

    /// Convert from a `u32` index known to fit into this type.
    fn from_u32(index: u32) -> Self;
}

impl traits::Sealed for u8 {}

impl BoundedIndex for u8 {
    const BITS: u32 = u8::BITS;

    #[inline]
    fn from_u32(index: u32) -> Self {
        index.as_()
    }
}

impl traits::Sealed for u16 {}

impl BoundedIndex for u16 {
    const BITS: u32 = u16::BITS;

    #[inline]
    fn from_u32(index: u32) -> Self {
        index.as_()
    }
}

impl traits::Sealed for u32 {}

impl BoundedIndex for u32 {
    const BITS: u32 = u32::BITS;

    #[inline]
    fn from_u32(index: u32) -> Self {
        index
    }
}
