//! Pixel access over bitmap memory.

pub(crate) mod codec;
mod custom;
mod ops;
mod persist;
mod raw;
mod row;
mod storage;

pub use custom::CustomPixelFormat;
pub use raw::RawRow;
pub use row::BitmapDataRow;

use crate::{
    BitmapError, Color32, DEFAULT_ALPHA_THRESHOLD, KnownPixelFormat, Palette, PixelColor,
    PixelFormatInfo, WorkingColorSpace,
};
use alloc::{boxed::Box, sync::Arc, vec, vec::Vec};
use bytemuck::Pod;
use codec::{EncodeContext, Native};
use core::{fmt, ptr::NonNull};
use storage::Storage;

/// The layout of the pixels of a [`BitmapData`].
#[derive(Debug, Clone)]
pub enum PixelLayout {
    /// One of the directly supported formats.
    Known(KnownPixelFormat),
    /// A format defined by caller supplied accessor functions.
    Custom(Arc<CustomPixelFormat>),
}

impl PixelLayout {
    /// The format descriptor.
    #[must_use]
    #[inline]
    pub fn info(&self) -> PixelFormatInfo {
        match self {
            Self::Known(format) => format.info(),
            Self::Custom(format) => format.info(),
        }
    }
}

impl From<KnownPixelFormat> for PixelLayout {
    #[inline]
    fn from(format: KnownPixelFormat) -> Self {
        Self::Known(format)
    }
}

impl From<CustomPixelFormat> for PixelLayout {
    #[inline]
    fn from(format: CustomPixelFormat) -> Self {
        Self::Custom(Arc::new(format))
    }
}

impl From<Arc<CustomPixelFormat>> for PixelLayout {
    #[inline]
    fn from(format: Arc<CustomPixelFormat>) -> Self {
        Self::Custom(format)
    }
}

/// A rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    #[must_use]
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// The palette used for new indexed bitmaps of the given bit width.
pub(crate) fn default_palette(bits_per_pixel: u8) -> Palette {
    match bits_per_pixel {
        1 => Palette::black_and_white(),
        2 => Palette::grayscale4(),
        #[allow(clippy::expect_used)]
        3 => Palette::from_colors(
            (0..8u8)
                .map(|i| {
                    let c = |bit: u8| if i & bit == 0 { 0 } else { 255 };
                    Color32::from_rgb(c(4), c(2), c(1))
                })
                .collect::<Vec<_>>(),
        )
        .expect("8 entries are a valid palette length"),
        4..=7 => Palette::system_default_4bpp(),
        _ => Palette::system_default_8bpp(),
    }
}

/// A view over bitmap memory in a known or custom pixel format.
///
/// Pixels are read and written with any of the six color types, e.g. [`BitmapData::get_color32`]
/// or the generic [`BitmapData::get_color`]. Colors that the format cannot represent are
/// converted on write: formats without alpha blend with the [back color](BitmapData::back_color)
/// in the [working color space](BitmapData::working_color_space), single bit alpha formats
/// compare alpha against the [alpha threshold](BitmapData::alpha_threshold), and indexed formats
/// store the index of the nearest [palette](BitmapData::palette) entry.
///
/// The memory is shared with clipped views created by [`BitmapData::clip`]. All accessors take
/// `&self`, and a bitmap can be read and written from several threads at once. Writes to the
/// same pixel from different threads have an unspecified result, but writes to different pixels
/// never interfere, even when they share a byte.
///
/// # Panics
///
/// Pixel accessors panic if the coordinates are outside the view.
pub struct BitmapData {
    storage: Arc<Storage>,
    /// Bytes between the starts of consecutive backing rows.
    stride: usize,
    /// Width of the backing bitmap.
    root_width: u32,
    /// Height of the backing bitmap.
    root_height: u32,
    /// Offset of this view within the backing bitmap.
    left: u32,
    top: u32,
    width: u32,
    height: u32,
    info: PixelFormatInfo,
    layout: PixelLayout,
    palette: Option<Arc<Palette>>,
    back_color: Color32,
    alpha_threshold: u8,
    working_color_space: WorkingColorSpace,
}

impl BitmapData {
    fn validate(
        width: u32,
        height: u32,
        stride: usize,
        element_size: usize,
        len: usize,
        info: PixelFormatInfo,
    ) -> Result<(), BitmapError> {
        if width == 0 || height == 0 {
            return Err(BitmapError::InvalidDimensions { width, height });
        }
        let min = info.row_bytes(width);
        if stride < min {
            return Err(BitmapError::StrideTooSmall { stride, min });
        }
        if element_size > 1 && stride % element_size != 0 {
            return Err(BitmapError::StrideNotMultipleOfElement { stride, element_size });
        }
        let required = (height as usize - 1)
            .checked_mul(stride)
            .and_then(|rows| rows.checked_add(min))
            .ok_or(BitmapError::InvalidDimensions { width, height })?;
        if len < required {
            return Err(BitmapError::BufferTooSmall { len, required });
        }
        Ok(())
    }

    fn from_storage(
        storage: Storage,
        width: u32,
        height: u32,
        stride: usize,
        layout: PixelLayout,
    ) -> Self {
        let info = layout.info();
        let palette = info.is_indexed().then(|| Arc::new(default_palette(info.bits_per_pixel())));
        log::debug!("created {width}x{height} bitmap ({info:?}, stride {stride})");
        Self {
            storage: Arc::new(storage),
            stride,
            root_width: width,
            root_height: height,
            left: 0,
            top: 0,
            width,
            height,
            info,
            layout,
            palette,
            back_color: Color32::BLACK,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            working_color_space: WorkingColorSpace::Default,
        }
    }

    /// Allocate a zeroed bitmap. Rows are padded to a multiple of 4 bytes.
    ///
    /// New indexed bitmaps get a default palette for their bit width: black and white for 1 bit,
    /// 4 grays for 2 bits, and the system default palettes for wider formats.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::InvalidDimensions`] if `width` or `height` is zero or the size
    /// overflows.
    pub fn new(
        width: u32,
        height: u32,
        format: impl Into<PixelLayout>,
    ) -> Result<Self, BitmapError> {
        let layout = format.into();
        let info = layout.info();
        if width == 0 || height == 0 {
            return Err(BitmapError::InvalidDimensions { width, height });
        }
        let stride = info.row_bytes(width).next_multiple_of(4);
        let len = stride
            .checked_mul(height as usize)
            .ok_or(BitmapError::InvalidDimensions { width, height })?;
        Ok(Self::from_storage(Storage::from_vec(vec![0u8; len]), width, height, stride, layout))
    }

    /// Take ownership of a linear buffer of pixel rows that are `stride` bytes apart.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero, `stride` is smaller than a row of pixels or
    /// not a multiple of the size of `T`, or `buffer` is too short for `height` rows.
    pub fn from_buffer<T: Pod + Send>(
        buffer: Vec<T>,
        width: u32,
        height: u32,
        stride: usize,
        format: impl Into<PixelLayout>,
    ) -> Result<Self, BitmapError> {
        let layout = format.into();
        let len = buffer.len() * size_of::<T>();
        Self::validate(width, height, stride, size_of::<T>(), len, layout.info())?;
        Ok(Self::from_storage(Storage::from_vec(buffer), width, height, stride, layout))
    }

    /// Take ownership of a rectangular buffer of rows with `row_len` elements each.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero, a row of `row_len` elements is too short for
    /// `width` pixels, or `buffer` holds fewer than `height` rows.
    pub fn from_rect_buffer<T: Pod + Send>(
        buffer: Vec<T>,
        row_len: usize,
        width: u32,
        height: u32,
        format: impl Into<PixelLayout>,
    ) -> Result<Self, BitmapError> {
        let stride = row_len * size_of::<T>();
        let rows = buffer.len().checked_div(row_len).unwrap_or_default();
        let layout = format.into();
        Self::validate(width, height, stride, size_of::<T>(), rows * stride, layout.info())?;
        Ok(Self::from_storage(Storage::from_vec(buffer), width, height, stride, layout))
    }

    /// Wrap caller owned memory. `release` runs exactly once, after the bitmap and all of its
    /// clipped views are gone.
    ///
    /// Dropping the last view without calling [`BitmapData::dispose`] still releases the memory,
    /// but logs a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the dimensions are zero, `stride` is smaller than a row of pixels, or
    /// `len` is too short for `height` rows. `release` is not called on error.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until `release` is called, and the
    /// memory must not be accessed by anything other than this bitmap until then.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw_parts(
        ptr: NonNull<u8>,
        len: usize,
        width: u32,
        height: u32,
        stride: usize,
        format: impl Into<PixelLayout>,
        release: impl FnOnce() + Send + 'static,
    ) -> Result<Self, BitmapError> {
        let layout = format.into();
        Self::validate(width, height, stride, 1, len, layout.info())?;
        // SAFETY: upheld by the caller.
        let storage = unsafe { Storage::from_raw_parts(ptr, len, Box::new(release)) };
        Ok(Self::from_storage(storage, width, height, stride, layout))
    }

    /// Sets the color partially transparent colors are blended with. Alpha is ignored.
    #[must_use]
    pub fn with_back_color(mut self, back_color: Color32) -> Self {
        self.back_color = back_color.opaque();
        self
    }

    /// Sets the alpha threshold of single bit alpha formats.
    #[must_use]
    pub fn with_alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        self
    }

    /// Sets the working color space of blending.
    #[must_use]
    pub fn with_working_color_space(mut self, space: WorkingColorSpace) -> Self {
        self.working_color_space = space;
        self
    }

    /// Replace the palette of an indexed bitmap.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::FormatMismatch`] if the format is not indexed, or
    /// [`BitmapError::OversizedPalette`] if the format cannot address every entry.
    pub fn with_palette(mut self, palette: Palette) -> Result<Self, BitmapError> {
        let max = self.info.max_palette_len().ok_or(BitmapError::FormatMismatch)?;
        if palette.len() > max {
            return Err(BitmapError::OversizedPalette { len: palette.len(), max });
        }
        self.palette = Some(Arc::new(palette));
        Ok(self)
    }

    /// Replace the palette of an indexed bitmap, returning `false` without changing anything if
    /// the format is not indexed or cannot address every entry.
    pub fn try_set_palette(&mut self, palette: Palette) -> bool {
        match self.info.max_palette_len() {
            Some(max) if palette.len() <= max => {
                self.palette = Some(Arc::new(palette));
                true
            }
            _ => false,
        }
    }

    /// Release this view. The memory is released once the last view sharing it is gone.
    pub fn dispose(self) {
        self.storage.mark_disposed();
    }

    /// The width of the view in pixels.
    #[must_use]
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height of the view in pixels.
    #[must_use]
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of bytes between the starts of consecutive rows.
    #[must_use]
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The format descriptor.
    #[must_use]
    #[inline]
    pub fn pixel_format(&self) -> PixelFormatInfo {
        self.info
    }

    /// The pixel layout.
    #[must_use]
    #[inline]
    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    /// The known pixel format, or `None` for custom formats.
    #[must_use]
    #[inline]
    pub fn known_pixel_format(&self) -> Option<KnownPixelFormat> {
        match self.layout {
            PixelLayout::Known(format) => Some(format),
            PixelLayout::Custom(_) => None,
        }
    }

    /// The palette of an indexed bitmap.
    #[must_use]
    #[inline]
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_deref()
    }

    /// The opaque color partially transparent colors are blended with.
    #[must_use]
    #[inline]
    pub fn back_color(&self) -> Color32 {
        self.back_color
    }

    /// The alpha threshold of single bit alpha formats.
    #[must_use]
    #[inline]
    pub fn alpha_threshold(&self) -> u8 {
        self.alpha_threshold
    }

    /// The working color space as configured, possibly [`WorkingColorSpace::Default`].
    #[must_use]
    #[inline]
    pub fn working_color_space(&self) -> WorkingColorSpace {
        self.working_color_space
    }

    /// The working color space with [`WorkingColorSpace::Default`] resolved for the format.
    #[must_use]
    #[inline]
    pub fn effective_color_space(&self) -> WorkingColorSpace {
        self.info.resolve_color_space(self.working_color_space)
    }

    /// The offset of this view within the backing bitmap.
    #[must_use]
    #[inline]
    pub fn offset(&self) -> (u32, u32) {
        (self.left, self.top)
    }

    /// Whether this view covers less than the backing bitmap.
    #[must_use]
    #[inline]
    pub fn is_clipped(&self) -> bool {
        self.left != 0
            || self.top != 0
            || self.width != self.root_width
            || self.height != self.root_height
    }

    /// The number of bytes of a row accessible through [`BitmapDataRow::raw`].
    ///
    /// Raw access to a clipped view is only possible if its left edge starts on a byte: either
    /// the format has a whole number of bytes per pixel or the view starts at the left edge of
    /// the backing bitmap. Otherwise the row size is zero. A last byte shared with pixels right
    /// of the view is excluded.
    #[must_use]
    pub fn row_size(&self) -> usize {
        let bpp = usize::from(self.info.bits_per_pixel());
        if bpp % 8 != 0 && self.left != 0 {
            return 0;
        }
        let bits = self.width as usize * bpp;
        if bits % 8 == 0 || self.left + self.width == self.root_width {
            bits.div_ceil(8)
        } else {
            bits / 8
        }
    }

    /// A view of the part of this bitmap inside `rect`, or `None` if they do not overlap.
    ///
    /// The view shares memory and palette with this bitmap. Clipping a clipped view intersects
    /// with the already clipped region, and `rect` is relative to this view.
    #[must_use]
    pub fn clip(&self, rect: Rect) -> Option<Self> {
        let x0 = rect.x.min(self.width);
        let y0 = rect.y.min(self.height);
        let x1 = rect.x.saturating_add(rect.width).min(self.width);
        let y1 = rect.y.saturating_add(rect.height).min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            storage: Arc::clone(&self.storage),
            stride: self.stride,
            root_width: self.root_width,
            root_height: self.root_height,
            left: self.left + x0,
            top: self.top + y0,
            width: x1 - x0,
            height: y1 - y0,
            info: self.info,
            layout: self.layout.clone(),
            palette: self.palette.clone(),
            back_color: self.back_color,
            alpha_threshold: self.alpha_threshold,
            working_color_space: self.working_color_space,
        })
    }

    /// Access row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is not less than the height.
    #[must_use]
    #[inline]
    pub fn row(&self, y: u32) -> BitmapDataRow<'_> {
        assert!(y < self.height, "row {y} is out of range for height {}", self.height);
        BitmapDataRow::new(self, y)
    }

    /// Iterate over all rows.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = BitmapDataRow<'_>> + '_ {
        (0..self.height).map(|y| BitmapDataRow::new(self, y))
    }

    /// The whole backing row of view row `y`.
    #[inline]
    pub(crate) fn backing_row(&self, y: u32) -> RawRow<'_> {
        let start = (self.top + y) as usize * self.stride;
        let len = self.info.row_bytes(self.root_width);
        RawRow::new(&self.storage.bytes()[start..start + len])
    }

    #[inline]
    pub(crate) fn encode_context(&self) -> EncodeContext<'_> {
        EncodeContext {
            back_color: self.back_color,
            alpha_threshold: self.alpha_threshold,
            color_space: self.effective_color_space(),
            palette: self.palette(),
        }
    }

    /// Decode pixel `x` of a backing row, where `x` is relative to the backing row.
    #[inline]
    pub(crate) fn decode_at(&self, row: RawRow<'_>, x: u32) -> Native {
        match &self.layout {
            PixelLayout::Known(format) => codec::decode(
                *format,
                codec::read_raw(row, x as usize, self.info.bits_per_pixel()),
                self.palette(),
            ),
            PixelLayout::Custom(format) => format.decode(row, x, &self.encode_context()),
        }
    }

    /// Encode pixel `x` of a backing row, where `x` is relative to the backing row.
    #[inline]
    pub(crate) fn encode_at<C: PixelColor>(&self, row: RawRow<'_>, x: u32, color: C) {
        let ctx = self.encode_context();
        match &self.layout {
            PixelLayout::Known(format) => codec::write_raw(
                row,
                x as usize,
                self.info.bits_per_pixel(),
                codec::encode(*format, color, &ctx),
            ),
            PixelLayout::Custom(format) => format.encode(row, x, color, &ctx),
        }
    }

    /// Read the color at `(x, y)` as any color type.
    #[must_use]
    #[inline]
    pub fn get_color<C: PixelColor>(&self, x: u32, y: u32) -> C {
        self.row(y).get_color(x)
    }

    /// Write the color at `(x, y)` from any color type.
    #[inline]
    pub fn set_color<C: PixelColor>(&self, x: u32, y: u32, color: C) {
        self.row(y).set_color(x, color);
    }

    /// Read the palette index at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the format is not indexed.
    #[must_use]
    #[inline]
    pub fn get_color_index(&self, x: u32, y: u32) -> u32 {
        self.row(y).get_color_index(x)
    }

    /// Write the palette index at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the format is not indexed.
    #[inline]
    pub fn set_color_index(&self, x: u32, y: u32, index: u32) {
        self.row(y).set_color_index(x, index);
    }
}

/// Generates the named getters and setters for each color type.
macro_rules! named_accessors {
    ($($get:ident, $set:ident => $color:ident;)*) => {
        impl BitmapData {
            $(
                #[doc = concat!("Read the color at `(x, y)` as [`", stringify!($color), "`](crate::", stringify!($color), ").")]
                #[must_use]
                #[inline]
                pub fn $get(&self, x: u32, y: u32) -> crate::$color {
                    self.get_color(x, y)
                }

                #[doc = concat!("Write the color at `(x, y)` from [`", stringify!($color), "`](crate::", stringify!($color), ").")]
                #[inline]
                pub fn $set(&self, x: u32, y: u32, color: crate::$color) {
                    self.set_color(x, y, color);
                }
            )*
        }

        impl BitmapDataRow<'_> {
            $(
                #[doc = concat!("Read the color at `x` as [`", stringify!($color), "`](crate::", stringify!($color), ").")]
                #[must_use]
                #[inline]
                pub fn $get(&self, x: u32) -> crate::$color {
                    self.get_color(x)
                }

                #[doc = concat!("Write the color at `x` from [`", stringify!($color), "`](crate::", stringify!($color), ").")]
                #[inline]
                pub fn $set(&self, x: u32, color: crate::$color) {
                    self.set_color(x, color);
                }
            )*
        }
    };
}

named_accessors! {
    get_color32, set_color32 => Color32;
    get_pcolor32, set_pcolor32 => PColor32;
    get_color64, set_color64 => Color64;
    get_pcolor64, set_pcolor64 => PColor64;
    get_color_f, set_color_f => ColorF;
    get_pcolor_f, set_pcolor_f => PColorF;
}

impl fmt::Debug for BitmapData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitmapData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("offset", &(self.left, self.top))
            .field("stride", &self.stride)
            .field("bytes", &self.storage.len())
            .field("layout", &self.layout)
            .field("back_color", &self.back_color)
            .field("alpha_threshold", &self.alpha_threshold)
            .field("working_color_space", &self.working_color_space)
            .finish_non_exhaustive()
    }
}
