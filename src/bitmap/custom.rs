use super::{RawRow, codec::EncodeContext, codec::Native};
use crate::{BitmapError, BoundedIndex, Color32, Color64, ColorF, PixelColor, PixelFormatInfo};
use alloc::boxed::Box;
use core::fmt;

type Getter<T> = Box<dyn Fn(RawRow<'_>, u32) -> T + Send + Sync>;
type Setter<T> = Box<dyn Fn(RawRow<'_>, u32, T) + Send + Sync>;

enum Accessors {
    Color32(Getter<Color32>, Setter<Color32>),
    Color64(Getter<Color64>, Setter<Color64>),
    ColorF(Getter<ColorF>, Setter<ColorF>),
    Indexed(Getter<u32>, Setter<u32>),
}

/// A pixel format defined by caller supplied accessor functions.
///
/// The functions receive the raw memory of a whole backing row and the horizontal pixel
/// position within it. Clipped views translate their coordinates, so `x` is always within the
/// width of the backing bitmap. The functions should be pure: they may be called from several
/// threads at once and in any order.
///
/// Colors passed to setters of formats without alpha are already blended with the back color,
/// and setters of formats with single bit alpha receive either opaque or fully transparent
/// colors.
///
/// # Examples
///
/// A 3 bits per pixel format storing one bit per channel:
///
/// ```
/// use pixquant::{BitmapData, Color32, CustomPixelFormat, PixelFormatInfo};
///
/// # fn main() -> Result<(), pixquant::BitmapError> {
/// let info = PixelFormatInfo::new(3).expect("valid bit width");
/// let format = CustomPixelFormat::color32(
///     info,
///     |row, x| {
///         let bits = row.read_bits(x as usize * 3, 3) as u8;
///         let c = |bit: u8| if bits & bit == 0 { 0 } else { 255 };
///         Color32::from_rgb(c(4), c(2), c(1))
///     },
///     |row, x, color| {
///         let bit = |v: u8, b: u128| if v >= 128 { b } else { 0 };
///         row.write_bits(x as usize * 3, 3, bit(color.r, 4) | bit(color.g, 2) | bit(color.b, 1));
///     },
/// )?;
///
/// let bitmap = BitmapData::new(5, 2, format)?;
/// bitmap.set_color32(4, 1, Color32::from_rgb(255, 0, 200));
/// assert_eq!(bitmap.get_color32(4, 1), Color32::from_rgb(255, 0, 255));
/// # Ok(())
/// # }
/// ```
pub struct CustomPixelFormat {
    info: PixelFormatInfo,
    accessors: Accessors,
}

impl CustomPixelFormat {
    fn direct(info: PixelFormatInfo, accessors: Accessors) -> Result<Self, BitmapError> {
        if info.is_indexed() {
            Err(BitmapError::FormatMismatch)
        } else {
            Ok(Self { info, accessors })
        }
    }

    /// A non-indexed format accessed through [`Color32`] values.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::FormatMismatch`] if `info` is indexed.
    pub fn color32(
        info: PixelFormatInfo,
        get: impl Fn(RawRow<'_>, u32) -> Color32 + Send + Sync + 'static,
        set: impl Fn(RawRow<'_>, u32, Color32) + Send + Sync + 'static,
    ) -> Result<Self, BitmapError> {
        Self::direct(info, Accessors::Color32(Box::new(get), Box::new(set)))
    }

    /// A non-indexed format accessed through [`Color64`] values.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::FormatMismatch`] if `info` is indexed.
    pub fn color64(
        info: PixelFormatInfo,
        get: impl Fn(RawRow<'_>, u32) -> Color64 + Send + Sync + 'static,
        set: impl Fn(RawRow<'_>, u32, Color64) + Send + Sync + 'static,
    ) -> Result<Self, BitmapError> {
        Self::direct(info, Accessors::Color64(Box::new(get), Box::new(set)))
    }

    /// A non-indexed format accessed through linear [`ColorF`] values.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::FormatMismatch`] if `info` is indexed.
    pub fn color_f(
        info: PixelFormatInfo,
        get: impl Fn(RawRow<'_>, u32) -> ColorF + Send + Sync + 'static,
        set: impl Fn(RawRow<'_>, u32, ColorF) + Send + Sync + 'static,
    ) -> Result<Self, BitmapError> {
        Self::direct(info, Accessors::ColorF(Box::new(get), Box::new(set)))
    }

    /// An indexed format accessed through palette indices of type `I`.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::FormatMismatch`] if `info` is not indexed, or
    /// [`BitmapError::IndexTypeTooSmall`] if `I` cannot hold every index of the format.
    pub fn indexed<I: BoundedIndex>(
        info: PixelFormatInfo,
        get: impl Fn(RawRow<'_>, u32) -> I + Send + Sync + 'static,
        set: impl Fn(RawRow<'_>, u32, I) + Send + Sync + 'static,
    ) -> Result<Self, BitmapError> {
        if !info.is_indexed() {
            return Err(BitmapError::FormatMismatch);
        }
        if u32::from(info.bits_per_pixel()) > I::BITS {
            return Err(BitmapError::IndexTypeTooSmall {
                bits_per_pixel: info.bits_per_pixel(),
                index_bits: I::BITS,
            });
        }
        Ok(Self {
            info,
            accessors: Accessors::Indexed(
                Box::new(move |row, x| get(row, x).as_()),
                Box::new(move |row, x, index| set(row, x, I::from_u32(index))),
            ),
        })
    }

    /// The format descriptor.
    #[must_use]
    #[inline]
    pub fn info(&self) -> PixelFormatInfo {
        self.info
    }

    /// Read pixel `x` of a backing row.
    pub(crate) fn decode(&self, row: RawRow<'_>, x: u32, ctx: &EncodeContext<'_>) -> Native {
        match &self.accessors {
            Accessors::Color32(get, _) => Native::Color32(get(row, x)),
            Accessors::Color64(get, _) => Native::Color64(get(row, x)),
            Accessors::ColorF(get, _) => Native::ColorF(get(row, x)),
            Accessors::Indexed(get, _) => {
                Native::Color32(super::codec::palette_entry(ctx.palette, get(row, x).into()))
            }
        }
    }

    /// Write pixel `x` of a backing row, applying the alpha policy of the format first.
    pub(crate) fn encode<C: PixelColor>(
        &self,
        row: RawRow<'_>,
        x: u32,
        color: C,
        ctx: &EncodeContext<'_>,
    ) {
        let has_alpha = self.info.has_alpha();
        let single_bit = self.info.has_single_bit_alpha();
        match &self.accessors {
            Accessors::Color32(_, set) => {
                let c: Color32 = color.into();
                let c = if single_bit {
                    ctx.binarize(c)
                } else if has_alpha {
                    c
                } else {
                    ctx.flatten32(c)
                };
                set(row, x, c);
            }
            Accessors::Color64(_, set) => {
                let c: Color64 = color.into();
                let c = if single_bit {
                    ctx.binarize(c.into()).into()
                } else if has_alpha {
                    c
                } else {
                    ctx.flatten64(c)
                };
                set(row, x, c);
            }
            Accessors::ColorF(_, set) => {
                let c: ColorF = color.into();
                let c = if single_bit {
                    ctx.binarize(c.into()).into()
                } else if has_alpha {
                    c
                } else {
                    ctx.flatten_f(c)
                };
                set(row, x, c);
            }
            Accessors::Indexed(_, set) => set(row, x, ctx.palette_index(color.into())),
        }
    }

    /// Read the palette index of pixel `x`, if the format is indexed.
    pub(crate) fn get_index(&self, row: RawRow<'_>, x: u32) -> Option<u32> {
        match &self.accessors {
            Accessors::Indexed(get, _) => Some(get(row, x)),
            _ => None,
        }
    }

    /// Write the palette index of pixel `x`, returning `false` if the format is not indexed.
    pub(crate) fn set_index(&self, row: RawRow<'_>, x: u32, index: u32) -> bool {
        match &self.accessors {
            Accessors::Indexed(_, set) => {
                set(row, x, index);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for CustomPixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = match self.accessors {
            Accessors::Color32(..) => "Color32",
            Accessors::Color64(..) => "Color64",
            Accessors::ColorF(..) => "ColorF",
            Accessors::Indexed(..) => "Indexed",
        };
        f.debug_struct("CustomPixelFormat")
            .field("info", &self.info)
            .field("accessors", &precision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_format<I: BoundedIndex>(bits: u8) -> Result<CustomPixelFormat, BitmapError> {
        let info = PixelFormatInfo::indexed(bits).unwrap();
        CustomPixelFormat::indexed::<I>(
            info,
            move |row, x| {
                let raw = row.read_bits(x as usize * usize::from(bits), u32::from(bits));
                #[allow(clippy::cast_possible_truncation)]
                I::from_u32(raw as u32)
            },
            move |row, x, i| {
                row.write_bits(x as usize * usize::from(bits), u32::from(bits), i.as_().into());
            },
        )
    }

    #[test]
    fn index_type_must_cover_bit_width() {
        assert!(index_format::<u8>(8).is_ok());
        assert_eq!(
            index_format::<u8>(9).err(),
            Some(BitmapError::IndexTypeTooSmall { bits_per_pixel: 9, index_bits: 8 })
        );
        assert!(index_format::<u16>(9).is_ok());
        assert!(index_format::<u32>(16).is_ok());
    }

    #[test]
    fn accessor_kind_must_match_format() {
        let indexed = PixelFormatInfo::indexed(4).unwrap();
        let direct = CustomPixelFormat::color32(indexed, |_, _| Color32::BLACK, |_, _, _| {});
        assert_eq!(direct.err(), Some(BitmapError::FormatMismatch));

        let info = PixelFormatInfo::new(4).unwrap();
        let result = CustomPixelFormat::indexed::<u8>(info, |_, _| 0, |_, _, _| {});
        assert_eq!(result.err(), Some(BitmapError::FormatMismatch));
    }
}
