use super::{BitmapData, PixelLayout, RawRow, codec};
use crate::PixelColor;
use bytemuck::Pod;
use core::fmt;

/// One row of a [`BitmapData`].
///
/// Coordinates are relative to the row's bitmap, which may be a clipped view.
#[derive(Clone, Copy)]
pub struct BitmapDataRow<'a> {
    bitmap: &'a BitmapData,
    y: u32,
    backing: RawRow<'a>,
}

impl<'a> BitmapDataRow<'a> {
    #[inline]
    pub(crate) fn new(bitmap: &'a BitmapData, y: u32) -> Self {
        Self { bitmap, y, backing: bitmap.backing_row(y) }
    }

    /// The index of this row within its bitmap.
    #[must_use]
    #[inline]
    pub fn index(&self) -> u32 {
        self.y
    }

    /// The width of the row in pixels.
    #[must_use]
    #[inline]
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// The bitmap this row belongs to.
    #[must_use]
    #[inline]
    pub fn bitmap(&self) -> &'a BitmapData {
        self.bitmap
    }

    #[inline]
    fn backing_x(&self, x: u32) -> u32 {
        let width = self.bitmap.width();
        assert!(x < width, "pixel {x} is out of range for width {width}");
        self.bitmap.left + x
    }

    /// Read the color at `x` as any color type.
    #[must_use]
    #[inline]
    pub fn get_color<C: PixelColor>(&self, x: u32) -> C {
        self.bitmap.decode_at(self.backing, self.backing_x(x)).into_color()
    }

    /// Write the color at `x` from any color type.
    #[inline]
    pub fn set_color<C: PixelColor>(&self, x: u32, color: C) {
        self.bitmap.encode_at(self.backing, self.backing_x(x), color);
    }

    /// Read the palette index at `x`.
    ///
    /// # Panics
    ///
    /// Panics if the format is not indexed.
    #[must_use]
    pub fn get_color_index(&self, x: u32) -> u32 {
        let x = self.backing_x(x);
        let index = match &self.bitmap.layout {
            PixelLayout::Known(format) if format.info().is_indexed() => {
                #[allow(clippy::cast_possible_truncation)]
                let index =
                    codec::read_raw(self.backing, x as usize, format.bits_per_pixel()) as u32;
                Some(index)
            }
            PixelLayout::Known(_) => None,
            PixelLayout::Custom(format) => format.get_index(self.backing, x),
        };
        index.unwrap_or_else(|| panic!("palette indices require an indexed pixel format"))
    }

    /// Write the palette index at `x`. The index is not checked against the palette length.
    ///
    /// # Panics
    ///
    /// Panics if the format is not indexed.
    pub fn set_color_index(&self, x: u32, index: u32) {
        let x = self.backing_x(x);
        let written = match &self.bitmap.layout {
            PixelLayout::Known(format) if format.info().is_indexed() => {
                let bits = format.bits_per_pixel();
                let mask = (1u128 << bits) - 1;
                codec::write_raw(self.backing, x as usize, bits, u128::from(index) & mask);
                true
            }
            PixelLayout::Known(_) => false,
            PixelLayout::Custom(format) => format.set_index(self.backing, x, index),
        };
        assert!(written, "palette indices require an indexed pixel format");
    }

    /// The raw bytes of the row, [`BitmapData::row_size`] long.
    ///
    /// For clipped views the bytes start at the left edge of the view. If that edge is not on a
    /// byte boundary the row is empty.
    #[must_use]
    pub fn raw(&self) -> RawRow<'a> {
        let size = self.bitmap.row_size();
        if size == 0 {
            return self.backing.slice(0, 0);
        }
        let bits = usize::from(self.bitmap.info.bits_per_pixel());
        let start = self.bitmap.left as usize * bits / 8;
        self.backing.slice(start, size)
    }

    /// Read the `index`-th element of type `T` of the [raw row](Self::raw).
    ///
    /// # Panics
    ///
    /// Panics if the element is not within the raw row.
    #[must_use]
    #[inline]
    pub fn read_raw<T: Pod>(&self, index: usize) -> T {
        self.raw().read(index)
    }

    /// Write the `index`-th element of type `T` of the [raw row](Self::raw).
    ///
    /// # Panics
    ///
    /// Panics if the element is not within the raw row.
    #[inline]
    pub fn write_raw<T: Pod>(&self, index: usize, value: T) {
        self.raw().write(index, value);
    }
}

impl fmt::Debug for BitmapDataRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapDataRow")
            .field("index", &self.y)
            .field("width", &self.width())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::{BitmapData, Color32, KnownPixelFormat, Rect};

    #[test]
    fn raw_access_of_clipped_rows() {
        let bitmap = BitmapData::new(6, 2, KnownPixelFormat::Format32bppArgb).unwrap();
        let clip = bitmap.clip(Rect::new(2, 1, 3, 1)).unwrap();
        let row = clip.row(0);
        assert_eq!(row.raw().len(), 12);
        row.write_raw::<u32>(1, 0xFF10_2030);
        assert_eq!(bitmap.get_color32(3, 1), Color32::new(0xFF, 0x10, 0x20, 0x30));
        assert_eq!(row.read_raw::<u32>(1), 0xFF10_2030);
        assert_eq!(row.get_color32(1), Color32::new(0xFF, 0x10, 0x20, 0x30));
    }

    #[test]
    fn misaligned_clips_have_no_raw_bytes() {
        let bitmap = BitmapData::new(16, 1, KnownPixelFormat::Format4bppIndexed).unwrap();
        let clip = bitmap.clip(Rect::new(1, 0, 4, 1)).unwrap();
        assert!(clip.row(0).raw().is_empty());
        clip.row(0).set_color_index(0, 0xF);
        assert_eq!(bitmap.row(0).raw().read_u8(0), 0x0F);
    }

    #[test]
    fn row_iteration() {
        let bitmap = crate::tests::gradient(5, 4, KnownPixelFormat::Format24bppRgb);
        let rows = bitmap.rows();
        assert_eq!(rows.len(), 4);
        for row in rows {
            assert_eq!(row.get_color32(4), bitmap.get_color32(4, row.index()));
        }
    }

    #[test]
    #[should_panic(expected = "indexed pixel format")]
    fn indices_require_indexed_format() {
        let bitmap = BitmapData::new(2, 2, KnownPixelFormat::Format24bppRgb).unwrap();
        let _ = bitmap.get_color_index(0, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn pixels_are_bounds_checked() {
        let bitmap = BitmapData::new(4, 4, KnownPixelFormat::Format24bppRgb).unwrap();
        let clip = bitmap.clip(Rect::new(0, 0, 2, 2)).unwrap();
        clip.set_color32(2, 0, Color32::WHITE);
    }
}
