//! Pixel format descriptors.

use crate::WorkingColorSpace;

/// Names one of the six color value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {
    /// [`Color32`](crate::Color32)
    Color32,
    /// [`PColor32`](crate::PColor32)
    PColor32,
    /// [`Color64`](crate::Color64)
    Color64,
    /// [`PColor64`](crate::PColor64)
    PColor64,
    /// [`ColorF`](crate::ColorF)
    ColorF,
    /// [`PColorF`](crate::PColorF)
    PColorF,
}

/// How a pixel format stores alpha, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaKind {
    /// No alpha. Partially transparent colors are blended with the back color.
    #[default]
    None,
    /// Straight alpha.
    Straight,
    /// Premultiplied alpha.
    Premultiplied,
    /// One alpha bit. Colors are opaque when their alpha reaches the alpha threshold.
    SingleBit,
}

/// The channel precision a pixel format is best accessed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    /// 8 bits per channel.
    #[default]
    Bits8,
    /// 16 bits per channel.
    Bits16,
    /// Floating point, linear channels.
    Float,
}

/// An immutable description of a pixel layout.
///
/// The bit width can be anything from 1 to 128, including widths that are not a power of
/// two. An indexed format of `n` bits can address a palette of at most `2^n` entries, so
/// indexed formats are limited to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormatInfo {
    /// Bits per pixel.
    bits_per_pixel: u8,
    /// Whether pixels are palette indices.
    indexed: bool,
    /// Whether pixels only store brightness.
    grayscale: bool,
    /// How alpha is stored.
    alpha: AlphaKind,
    /// The preferred access precision.
    precision: Precision,
}

impl PixelFormatInfo {
    /// The largest supported bit width.
    pub const MAX_BITS: u8 = 128;

    /// The largest supported bit width of an indexed format.
    pub const MAX_INDEXED_BITS: u8 = 16;

    /// Create an opaque, non-indexed, 8-bit precision format, returning `None` if `bits_per_pixel`
    /// is not in `1..=128`.
    #[must_use]
    #[inline]
    pub const fn new(bits_per_pixel: u8) -> Option<Self> {
        if bits_per_pixel == 0 || bits_per_pixel > Self::MAX_BITS {
            None
        } else {
            Some(Self {
                bits_per_pixel,
                indexed: false,
                grayscale: false,
                alpha: AlphaKind::None,
                precision: Precision::Bits8,
            })
        }
    }

    /// Create an indexed format, returning `None` if `bits_per_pixel` is not in `1..=16`.
    #[must_use]
    #[inline]
    pub const fn indexed(bits_per_pixel: u8) -> Option<Self> {
        if bits_per_pixel == 0 || bits_per_pixel > Self::MAX_INDEXED_BITS {
            None
        } else {
            Some(Self {
                bits_per_pixel,
                indexed: true,
                grayscale: false,
                alpha: AlphaKind::None,
                precision: Precision::Bits8,
            })
        }
    }

    /// Sets whether the format only stores brightness.
    #[must_use]
    #[inline]
    pub const fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    /// Sets how the format stores alpha.
    #[must_use]
    #[inline]
    pub const fn with_alpha(mut self, alpha: AlphaKind) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the preferred access precision.
    #[must_use]
    #[inline]
    pub const fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// The number of bits per pixel.
    #[must_use]
    #[inline]
    pub const fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    /// Whether pixels are palette indices.
    #[must_use]
    #[inline]
    pub const fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether pixels only store brightness.
    #[must_use]
    #[inline]
    pub const fn is_grayscale(&self) -> bool {
        self.grayscale
    }

    /// How the format stores alpha.
    #[must_use]
    #[inline]
    pub const fn alpha_kind(&self) -> AlphaKind {
        self.alpha
    }

    /// Whether the format stores any kind of alpha.
    #[must_use]
    #[inline]
    pub const fn has_alpha(&self) -> bool {
        !matches!(self.alpha, AlphaKind::None)
    }

    /// Whether the format stores premultiplied alpha.
    #[must_use]
    #[inline]
    pub const fn has_premultiplied_alpha(&self) -> bool {
        matches!(self.alpha, AlphaKind::Premultiplied)
    }

    /// Whether the format stores a single alpha bit.
    #[must_use]
    #[inline]
    pub const fn has_single_bit_alpha(&self) -> bool {
        matches!(self.alpha, AlphaKind::SingleBit)
    }

    /// The preferred access precision.
    #[must_use]
    #[inline]
    pub const fn precision(&self) -> Precision {
        self.precision
    }

    /// Whether the format prefers linear floating point colors.
    #[must_use]
    #[inline]
    pub const fn prefers_linear(&self) -> bool {
        matches!(self.precision, Precision::Float)
    }

    /// The color type that reads and writes this format without loss and with the least
    /// conversion work.
    #[must_use]
    pub const fn preferred_color_type(&self) -> ColorType {
        let premultiplied = self.has_premultiplied_alpha();
        match self.precision {
            Precision::Bits8 if premultiplied => ColorType::PColor32,
            Precision::Bits8 => ColorType::Color32,
            Precision::Bits16 if premultiplied => ColorType::PColor64,
            Precision::Bits16 => ColorType::Color64,
            Precision::Float if premultiplied => ColorType::PColorF,
            Precision::Float => ColorType::ColorF,
        }
    }

    /// Resolve [`WorkingColorSpace::Default`] for this format.
    #[must_use]
    #[inline]
    pub const fn resolve_color_space(&self, space: WorkingColorSpace) -> WorkingColorSpace {
        space.resolve(self.prefers_linear())
    }

    /// The maximum number of palette entries, or `None` if the format is not indexed.
    #[must_use]
    #[inline]
    pub const fn max_palette_len(&self) -> Option<usize> {
        if self.indexed { Some(1 << self.bits_per_pixel) } else { None }
    }

    /// The minimum number of bytes occupied by `width` pixels.
    #[must_use]
    #[inline]
    pub const fn row_bytes(&self, width: u32) -> usize {
        (width as usize * self.bits_per_pixel as usize).div_ceil(8)
    }
}

/// The directly supported pixel layouts.
///
/// Multi-byte pixels are little-endian. Integer formats store blue in the lowest position
/// (`BGRA` memory order), floating point formats store `RGBA` `f32` values in linear space.
/// Sub-byte pixels are packed starting at the most significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum KnownPixelFormat {
    /// 1 bit palette index.
    Format1bppIndexed,
    /// 2 bit palette index.
    Format2bppIndexed,
    /// 4 bit palette index.
    Format4bppIndexed,
    /// 8 bit palette index.
    Format8bppIndexed,
    /// 16 bit palette index.
    Format16bppIndexed,
    /// 8 bit brightness.
    Format8bppGrayScale,
    /// 16 bit brightness.
    Format16bppGrayScale,
    /// `f32` linear luminance.
    Format32bppGrayScale,
    /// 5 bits per color channel, top bit unused.
    Format16bppRgb555,
    /// 5 bits red and blue, 6 bits green.
    Format16bppRgb565,
    /// 5 bits per color channel and one alpha bit.
    Format16bppArgb1555,
    /// 8 bits per color channel.
    Format24bppRgb,
    /// 8 bits per color channel, top byte unused.
    Format32bppRgb,
    /// 8 bits per channel, straight alpha.
    Format32bppArgb,
    /// 8 bits per channel, premultiplied alpha.
    Format32bppPArgb,
    /// 16 bits per color channel.
    Format48bppRgb,
    /// 16 bits per channel, straight alpha.
    Format64bppArgb,
    /// 16 bits per channel, premultiplied alpha.
    Format64bppPArgb,
    /// `f32` linear color channels.
    Format96bppRgb,
    /// `f32` linear channels, straight alpha.
    Format128bppRgba,
    /// `f32` linear channels, premultiplied alpha.
    Format128bppPRgba,
}

impl KnownPixelFormat {
    /// Every known format.
    pub const ALL: [Self; 21] = [
        Self::Format1bppIndexed,
        Self::Format2bppIndexed,
        Self::Format4bppIndexed,
        Self::Format8bppIndexed,
        Self::Format16bppIndexed,
        Self::Format8bppGrayScale,
        Self::Format16bppGrayScale,
        Self::Format32bppGrayScale,
        Self::Format16bppRgb555,
        Self::Format16bppRgb565,
        Self::Format16bppArgb1555,
        Self::Format24bppRgb,
        Self::Format32bppRgb,
        Self::Format32bppArgb,
        Self::Format32bppPArgb,
        Self::Format48bppRgb,
        Self::Format64bppArgb,
        Self::Format64bppPArgb,
        Self::Format96bppRgb,
        Self::Format128bppRgba,
        Self::Format128bppPRgba,
    ];

    /// The descriptor of this format.
    #[allow(clippy::missing_panics_doc)]
    #[must_use]
    pub const fn info(self) -> PixelFormatInfo {
        const fn direct(bits: u8) -> PixelFormatInfo {
            match PixelFormatInfo::new(bits) {
                Some(info) => info,
                None => panic!("known bit widths are valid"),
            }
        }

        const fn indexed(bits: u8) -> PixelFormatInfo {
            match PixelFormatInfo::indexed(bits) {
                Some(info) => info,
                None => panic!("known bit widths are valid"),
            }
        }

        match self {
            Self::Format1bppIndexed => indexed(1),
            Self::Format2bppIndexed => indexed(2),
            Self::Format4bppIndexed => indexed(4),
            Self::Format8bppIndexed => indexed(8),
            Self::Format16bppIndexed => indexed(16),
            Self::Format8bppGrayScale => direct(8).with_grayscale(true),
            Self::Format16bppGrayScale => {
                direct(16).with_grayscale(true).with_precision(Precision::Bits16)
            }
            Self::Format32bppGrayScale => {
                direct(32).with_grayscale(true).with_precision(Precision::Float)
            }
            Self::Format16bppRgb555 | Self::Format16bppRgb565 => direct(16),
            Self::Format16bppArgb1555 => direct(16).with_alpha(AlphaKind::SingleBit),
            Self::Format24bppRgb => direct(24),
            Self::Format32bppRgb => direct(32),
            Self::Format32bppArgb => direct(32).with_alpha(AlphaKind::Straight),
            Self::Format32bppPArgb => direct(32).with_alpha(AlphaKind::Premultiplied),
            Self::Format48bppRgb => direct(48).with_precision(Precision::Bits16),
            Self::Format64bppArgb => {
                direct(64).with_alpha(AlphaKind::Straight).with_precision(Precision::Bits16)
            }
            Self::Format64bppPArgb => {
                direct(64).with_alpha(AlphaKind::Premultiplied).with_precision(Precision::Bits16)
            }
            Self::Format96bppRgb => direct(96).with_precision(Precision::Float),
            Self::Format128bppRgba => {
                direct(128).with_alpha(AlphaKind::Straight).with_precision(Precision::Float)
            }
            Self::Format128bppPRgba => {
                direct(128).with_alpha(AlphaKind::Premultiplied).with_precision(Precision::Float)
            }
        }
    }

    /// The number of bits per pixel.
    #[must_use]
    #[inline]
    pub const fn bits_per_pixel(self) -> u8 {
        self.info().bits_per_pixel()
    }

    /// The smallest indexed format able to address `len` palette entries.
    #[must_use]
    pub const fn smallest_indexed(len: usize) -> Option<Self> {
        match len {
            0 => None,
            1..=2 => Some(Self::Format1bppIndexed),
            3..=4 => Some(Self::Format2bppIndexed),
            5..=16 => Some(Self::Format4bppIndexed),
            17..=256 => Some(Self::Format8bppIndexed),
            257..=65536 => Some(Self::Format16bppIndexed),
            _ => None,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn to_id(self) -> u8 {
        Self::ALL.iter().position(|&f| f == self).unwrap_or_default() as u8
    }

    pub(crate) fn from_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }
}

impl From<KnownPixelFormat> for PixelFormatInfo {
    #[inline]
    fn from(format: KnownPixelFormat) -> Self {
        format.info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_widths_are_bounded() {
        assert!(PixelFormatInfo::new(0).is_none());
        assert!(PixelFormatInfo::new(129).is_none());
        assert_eq!(PixelFormatInfo::new(9).map(|f| f.bits_per_pixel()), Some(9));
        assert!(PixelFormatInfo::indexed(17).is_none());
    }

    #[test]
    fn indexed_width_bounds_palette() {
        for format in KnownPixelFormat::ALL {
            let info = format.info();
            assert_eq!(info.is_indexed(), info.max_palette_len().is_some());
            if let Some(max) = info.max_palette_len() {
                assert_eq!(max, 1 << info.bits_per_pixel());
            }
        }
        assert_eq!(PixelFormatInfo::indexed(3).and_then(|f| f.max_palette_len()), Some(8));
    }

    #[test]
    fn at_most_one_alpha_kind() {
        for format in KnownPixelFormat::ALL {
            let info = format.info();
            let kinds = [
                matches!(info.alpha_kind(), AlphaKind::Straight),
                info.has_premultiplied_alpha(),
                info.has_single_bit_alpha(),
            ];
            assert!(kinds.iter().filter(|&&k| k).count() <= 1);
        }
    }

    #[test]
    fn preferred_color_types() {
        assert_eq!(
            KnownPixelFormat::Format32bppPArgb.info().preferred_color_type(),
            ColorType::PColor32
        );
        assert_eq!(
            KnownPixelFormat::Format48bppRgb.info().preferred_color_type(),
            ColorType::Color64
        );
        assert_eq!(
            KnownPixelFormat::Format128bppPRgba.info().preferred_color_type(),
            ColorType::PColorF
        );
    }

    #[test]
    fn row_bytes_round_up() {
        let info = KnownPixelFormat::Format1bppIndexed.info();
        assert_eq!(info.row_bytes(127), 16);
        assert_eq!(info.row_bytes(8), 1);
        assert_eq!(KnownPixelFormat::Format24bppRgb.info().row_bytes(3), 9);
    }

    #[test]
    fn ids_round_trip() {
        for format in KnownPixelFormat::ALL {
            assert_eq!(KnownPixelFormat::from_id(format.to_id()), Some(format));
        }
        assert_eq!(KnownPixelFormat::from_id(200), None);
    }

    #[test]
    fn smallest_indexed_format() {
        assert_eq!(
            KnownPixelFormat::smallest_indexed(2),
            Some(KnownPixelFormat::Format1bppIndexed)
        );
        assert_eq!(
            KnownPixelFormat::smallest_indexed(17),
            Some(KnownPixelFormat::Format8bppIndexed)
        );
        assert_eq!(
            KnownPixelFormat::smallest_indexed(65536),
            Some(KnownPixelFormat::Format16bppIndexed)
        );
        assert_eq!(KnownPixelFormat::smallest_indexed(65537), None);
    }
}
