use core::{
    error::Error,
    fmt,
    num::{NonZeroU16, NonZeroU32},
};

/// The error returned when attempting to convert an out of range integer into a [`PaletteSize`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PaletteSizeFromIntError(());

impl fmt::Display for PaletteSizeFromIntError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("out of range conversion from integer to palette size")
    }
}

impl Error for PaletteSizeFromIntError {}

/// This type is used to specify the number of colors in a palette.
///
/// This is a simple new type wrapper around `u32` with the invariant that it must be
/// in the range `1..=65536` specified by [`PaletteSize::MIN`] and [`PaletteSize::MAX`].
///
/// # Examples
///
/// ```
/// # use pixquant::{PaletteSize, PaletteSizeFromIntError};
/// # fn main() -> Result<(), PaletteSizeFromIntError> {
/// let size: PaletteSize = 64u16.try_into()?;
/// assert_eq!(size, 64u32);
/// assert_eq!(PaletteSize::try_from(16usize)?, 16usize);
/// assert_eq!(PaletteSize::try_from_u32(65536), Some(PaletteSize::MAX));
/// assert_eq!(PaletteSize::try_from_u32(65537), None);
/// assert_eq!(PaletteSize::from_usize_clamped(100_000), PaletteSize::MAX);
/// assert_eq!(PaletteSize::from_usize_clamped(0), PaletteSize::MIN);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PaletteSize(NonZeroU32);

impl PaletteSize {
    /// The smallest possible palette size, which is `1`.
    pub const MIN: Self = Self(NonZeroU32::MIN);

    /// The largest possible palette size, which is `65536`.
    pub const MAX: Self = Self(NonZeroU32::new(u16::MAX as u32 + 1).unwrap());

    /// The default size for generated palettes, which is `256`.
    pub const DEFAULT: Self = Self(NonZeroU32::new(256).unwrap());

    /// Returns a [`PaletteSize`] as a [`NonZeroU32`].
    #[inline]
    pub const fn as_nz_u32(&self) -> NonZeroU32 {
        self.0
    }

    /// Returns a [`PaletteSize`] as a `u32`.
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.as_nz_u32().get()
    }

    /// Returns a [`PaletteSize`] as a `usize`.
    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.as_u32() as usize
    }

    /// Create a [`PaletteSize`] directly from the given [`NonZeroU32`]
    /// without ensuring that it is less than or equal to [`PaletteSize::MAX`].
    #[inline]
    const fn new_unchecked(value: NonZeroU32) -> Self {
        debug_assert!(value.get() <= Self::MAX.as_u32());
        Self(value)
    }

    /// Create a [`PaletteSize`] from a `u32`, returning `None` if the provided `value`
    /// is less than [`PaletteSize::MIN`] or greater than [`PaletteSize::MAX`].
    #[must_use]
    #[inline]
    pub const fn try_from_u32(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(len) if len.get() <= Self::MAX.as_u32() => Some(Self::new_unchecked(len)),
            _ => None,
        }
    }

    /// Create a [`PaletteSize`] from a `usize`, returning `None` if the provided `value`
    /// is less than [`PaletteSize::MIN`] or greater than [`PaletteSize::MAX`].
    #[must_use]
    #[inline]
    pub const fn try_from_usize(value: usize) -> Option<Self> {
        if value <= Self::MAX.as_usize() {
            #[allow(clippy::cast_possible_truncation)]
            Self::try_from_u32(value as u32)
        } else {
            None
        }
    }

    /// Create a [`PaletteSize`] from a [`NonZeroU16`]. Every nonzero `u16` is in range.
    #[must_use]
    #[inline]
    pub const fn from_nz_u16(value: NonZeroU16) -> Self {
        Self::new_unchecked(NonZeroU32::new(value.get() as u32).unwrap())
    }

    /// Create a [`PaletteSize`] from a `usize`, clamping the provided `value` to
    /// the range specified by [`PaletteSize::MIN`] and [`PaletteSize::MAX`].
    #[must_use]
    #[inline]
    pub const fn from_usize_clamped(value: usize) -> Self {
        if value > Self::MAX.as_usize() {
            Self::MAX
        } else if let Some(size) = Self::try_from_usize(value) {
            size
        } else {
            Self::MIN
        }
    }
}

impl Default for PaletteSize {
    #[inline]
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<PaletteSize> for u32 {
    #[inline]
    fn from(size: PaletteSize) -> Self {
        size.as_u32()
    }
}

impl From<PaletteSize> for usize {
    #[inline]
    fn from(size: PaletteSize) -> Self {
        size.as_usize()
    }
}

impl From<NonZeroU16> for PaletteSize {
    #[inline]
    fn from(value: NonZeroU16) -> Self {
        Self::from_nz_u16(value)
    }
}

impl TryFrom<u16> for PaletteSize {
    type Error = PaletteSizeFromIntError;

    #[inline]
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::try_from_u32(value.into()).ok_or(PaletteSizeFromIntError(()))
    }
}

impl TryFrom<u32> for PaletteSize {
    type Error = PaletteSizeFromIntError;

    #[inline]
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::try_from_u32(value).ok_or(PaletteSizeFromIntError(()))
    }
}

impl TryFrom<usize> for PaletteSize {
    type Error = PaletteSizeFromIntError;

    #[inline]
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::try_from_usize(value).ok_or(PaletteSizeFromIntError(()))
    }
}

impl PartialEq<u32> for PaletteSize {
    #[inline]
    fn eq(&self, other: &u32) -> bool {
        self.as_u32() == *other
    }
}

impl PartialEq<PaletteSize> for u32 {
    #[inline]
    fn eq(&self, other: &PaletteSize) -> bool {
        *self == other.as_u32()
    }
}

impl PartialEq<usize> for PaletteSize {
    #[inline]
    fn eq(&self, other: &usize) -> bool {
        self.as_usize() == *other
    }
}

impl PartialEq<PaletteSize> for usize {
    #[inline]
    fn eq(&self, other: &PaletteSize) -> bool {
        *self == other.as_usize()
    }
}

impl fmt::Display for PaletteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self(size) = *self;
        write!(f, "{size}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        assert_eq!(PaletteSize::MIN, 1u32);
        assert_eq!(PaletteSize::MAX, 65536u32);
        assert!(PaletteSize::try_from(0u32).is_err());
        assert!(PaletteSize::try_from(65537usize).is_err());
        assert_eq!(PaletteSize::try_from(u16::MAX), Ok(PaletteSize::try_from_u32(65535).unwrap()));
    }

    #[test]
    fn clamping() {
        assert_eq!(PaletteSize::from_usize_clamped(0), PaletteSize::MIN);
        assert_eq!(PaletteSize::from_usize_clamped(300), 300usize);
        assert_eq!(PaletteSize::from_usize_clamped(usize::MAX), PaletteSize::MAX);
    }
}
