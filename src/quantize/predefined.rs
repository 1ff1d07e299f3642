use super::{Quantizer, QuantizingSession, resolve_alpha};
use crate::{
    BitmapData, Color32, DEFAULT_ALPHA_THRESHOLD, KnownPixelFormat, Palette, WorkingColorSpace,
    bitmap::{
        codec::{self, EncodeContext},
        default_palette,
    },
};
use alloc::sync::Arc;
use core::fmt;
use enough::{Stop, StopReason};

type QuantizingFn = dyn Fn(Color32) -> Color32 + Send + Sync;

#[derive(Clone)]
enum Colors {
    /// The entries of a palette.
    Palette(Palette),
    /// Every color a non-indexed format can store.
    Format(KnownPixelFormat),
    /// The results of a caller supplied function.
    Function(Arc<QuantizingFn>),
}

/// A quantizer to a fixed set of colors: a palette, the colors of a pixel format, or the results
/// of a custom function.
///
/// The source bitmap is never analyzed, so sessions are created instantly.
///
/// # Examples
///
/// ```
/// use pixquant::{Color32, Palette, Quantizer, QuantizingSession};
/// use pixquant::quantize::PredefinedColorsQuantizer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let quantizer = PredefinedColorsQuantizer::from_palette(Palette::system_default_4bpp());
/// let bitmap = pixquant::BitmapData::new(1, 1, pixquant::KnownPixelFormat::Format24bppRgb)?;
/// let session = quantizer.initialize(&bitmap, &enough::Unstoppable)?;
/// assert_eq!(session.get_quantized_color(Color32::from_rgb(250, 10, 10)), Color32::from_rgb(255, 0, 0));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PredefinedColorsQuantizer {
    colors: Colors,
    back_color: Color32,
    alpha_threshold: u8,
    working_color_space: WorkingColorSpace,
    hint: KnownPixelFormat,
}

impl PredefinedColorsQuantizer {
    fn format(format: KnownPixelFormat) -> Self {
        Self {
            colors: Colors::Format(format),
            back_color: Color32::BLACK,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            working_color_space: WorkingColorSpace::Default,
            hint: format,
        }
    }

    /// The 16.7 million colors of 24 bit RGB. Transparent input is blended with the back color.
    #[must_use]
    pub fn rgb888() -> Self {
        Self::format(KnownPixelFormat::Format24bppRgb)
    }

    /// The 65536 colors of the RGB565 format.
    #[must_use]
    pub fn rgb565() -> Self {
        Self::format(KnownPixelFormat::Format16bppRgb565)
    }

    /// The 32768 colors of the RGB555 format.
    #[must_use]
    pub fn rgb555() -> Self {
        Self::format(KnownPixelFormat::Format16bppRgb555)
    }

    /// The colors of the ARGB1555 format: 32768 opaque colors and transparent.
    #[must_use]
    pub fn argb1555() -> Self {
        Self::format(KnownPixelFormat::Format16bppArgb1555)
    }

    /// Every 32 bit color. Colors are kept unchanged, including their alpha.
    #[must_use]
    pub fn argb8888() -> Self {
        Self::format(KnownPixelFormat::Format32bppArgb)
    }

    /// The 256 shades of gray, by brightness.
    #[must_use]
    pub fn grayscale() -> Self {
        Self::from_palette(Palette::grayscale256())
    }

    /// Black and white. Colors with a brightness of at least `white_threshold` become white.
    #[must_use]
    pub fn black_and_white(white_threshold: u8) -> Self {
        let palette = Palette::black_and_white()
            .with_lookup(move |c| u32::from(c.brightness() >= white_threshold));
        Self::from_palette(palette)
    }

    /// The colors of `format`, or its default palette if it is indexed.
    #[must_use]
    pub fn from_pixel_format(format: KnownPixelFormat) -> Self {
        let info = format.info();
        if info.is_indexed() {
            let mut quantizer = Self::from_palette(default_palette(info.bits_per_pixel()));
            quantizer.hint = format;
            quantizer
        } else {
            Self::format(format)
        }
    }

    /// The entries of `palette`, using its back color, alpha threshold, and working color space.
    #[must_use]
    pub fn from_palette(palette: Palette) -> Self {
        let hint = KnownPixelFormat::smallest_indexed(palette.len())
            .unwrap_or(KnownPixelFormat::Format32bppArgb);
        Self {
            back_color: palette.back_color(),
            alpha_threshold: palette.alpha_threshold(),
            working_color_space: palette.working_color_space(),
            colors: Colors::Palette(palette),
            hint,
        }
    }

    /// The results of `quantize`, which receives colors with alpha already resolved: colors
    /// below the alpha threshold map to transparent without calling the function, and other
    /// partially transparent colors are blended with the back color.
    #[must_use]
    pub fn from_custom_function(
        quantize: impl Fn(Color32) -> Color32 + Send + Sync + 'static,
    ) -> Self {
        Self {
            colors: Colors::Function(Arc::new(quantize)),
            back_color: Color32::BLACK,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            working_color_space: WorkingColorSpace::Default,
            hint: KnownPixelFormat::Format32bppArgb,
        }
    }

    /// Sets the color partially transparent colors are blended with.
    #[must_use]
    pub fn back_color(mut self, back_color: Color32) -> Self {
        self.back_color = back_color.opaque();
        if let Colors::Palette(palette) = self.colors {
            self.colors = Colors::Palette(palette.with_back_color(back_color));
        }
        self
    }

    /// Sets the alpha threshold. Zero blends every color with the back color.
    #[must_use]
    pub fn alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        if let Colors::Palette(palette) = self.colors {
            self.colors = Colors::Palette(palette.with_alpha_threshold(alpha_threshold));
        }
        self
    }

    /// Sets the working color space of blending and distance computations.
    #[must_use]
    pub fn working_color_space(mut self, space: WorkingColorSpace) -> Self {
        self.working_color_space = space;
        if let Colors::Palette(palette) = self.colors {
            self.colors = Colors::Palette(palette.with_working_color_space(space));
        }
        self
    }
}

impl fmt::Debug for PredefinedColorsQuantizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PredefinedColorsQuantizer");
        match &self.colors {
            Colors::Palette(palette) => s.field("palette", palette),
            Colors::Format(format) => s.field("format", format),
            Colors::Function(_) => s.field("function", &"custom"),
        };
        s.field("back_color", &self.back_color)
            .field("alpha_threshold", &self.alpha_threshold)
            .field("working_color_space", &self.working_color_space)
            .finish()
    }
}

impl Quantizer for PredefinedColorsQuantizer {
    type Session = PredefinedColorsSession;

    fn initialize(
        &self,
        source: &BitmapData,
        stop: &dyn Stop,
    ) -> Result<Self::Session, StopReason> {
        stop.check()?;
        // integer precision formats blend in sRGB unless configured otherwise
        let working_color_space = match &self.colors {
            Colors::Format(format) => format.info().resolve_color_space(self.working_color_space),
            _ => self.working_color_space.resolve(false),
        };
        log::debug!(
            "predefined colors session for {}x{} source ({:?})",
            source.width(),
            source.height(),
            self.hint,
        );
        Ok(PredefinedColorsSession {
            colors: self.colors.clone(),
            back_color: self.back_color,
            alpha_threshold: self.alpha_threshold,
            working_color_space,
        })
    }

    fn pixel_format_hint(&self) -> KnownPixelFormat {
        self.hint
    }
}

/// The session of a [`PredefinedColorsQuantizer`].
#[derive(Clone)]
pub struct PredefinedColorsSession {
    colors: Colors,
    back_color: Color32,
    alpha_threshold: u8,
    working_color_space: WorkingColorSpace,
}

impl fmt::Debug for PredefinedColorsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredefinedColorsSession")
            .field("palette", &self.palette())
            .field("back_color", &self.back_color)
            .field("alpha_threshold", &self.alpha_threshold)
            .finish_non_exhaustive()
    }
}

impl QuantizingSession for PredefinedColorsSession {
    fn palette(&self) -> Option<&Palette> {
        match &self.colors {
            Colors::Palette(palette) => Some(palette),
            Colors::Format(_) | Colors::Function(_) => None,
        }
    }

    fn back_color(&self) -> Color32 {
        self.back_color
    }

    fn alpha_threshold(&self) -> u8 {
        self.alpha_threshold
    }

    fn working_color_space(&self) -> WorkingColorSpace {
        self.working_color_space
    }

    fn is_grayscale(&self) -> bool {
        match &self.colors {
            Colors::Palette(palette) => palette.is_grayscale(),
            Colors::Format(format) => format.info().is_grayscale(),
            Colors::Function(_) => false,
        }
    }

    fn get_quantized_color(&self, color: Color32) -> Color32 {
        match &self.colors {
            Colors::Palette(palette) => palette.nearest_color(color),
            Colors::Format(format) => {
                let ctx = EncodeContext {
                    back_color: self.back_color,
                    alpha_threshold: self.alpha_threshold,
                    color_space: self.working_color_space,
                    palette: None,
                };
                codec::decode(*format, codec::encode(*format, color, &ctx), None).into_color()
            }
            Colors::Function(quantize) => {
                let color = resolve_alpha(
                    color,
                    self.back_color,
                    self.alpha_threshold,
                    self.working_color_space,
                );
                if color.a == 0 { color } else { quantize(color) }
            }
        }
    }
}
