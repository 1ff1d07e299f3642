//! Quantizers reduce colors to a palette or another restricted set of colors.
//!
//! A [`Quantizer`] is a reusable configuration. [`Quantizer::initialize`] prepares a
//! [`QuantizingSession`] for one source bitmap, which maps any color to the nearest color the
//! quantizer can represent. Sessions of [`OptimizedPaletteQuantizer`]s own the palette generated
//! from the source, while [`PredefinedColorsQuantizer`]s never look at the source.
//!
//! Sessions are usually driven by [`BitmapData::quantize`](crate::BitmapData::quantize),
//! [`BitmapData::clone_quantized`](crate::BitmapData::clone_quantized), or one of the dithering
//! counterparts, but they can also be used directly:
//!
//! ```
//! use pixquant::{BitmapData, Color32, KnownPixelFormat, Quantizer, QuantizingSession};
//! use pixquant::quantize::PredefinedColorsQuantizer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bitmap = BitmapData::new(4, 4, KnownPixelFormat::Format32bppArgb)?;
//! let quantizer = PredefinedColorsQuantizer::rgb565();
//! let session = quantizer.initialize(&bitmap, &enough::Unstoppable)?;
//! assert_eq!(session.get_quantized_color(Color32::from_rgb(0, 0, 0xFF)), Color32::from_rgb(0, 0, 0xFF));
//! assert_eq!(session.get_quantized_color(Color32::from_rgb(0x03, 0, 0)), Color32::BLACK);
//! # Ok(())
//! # }
//! ```

mod median_cut;
mod octree;
mod optimized;
mod predefined;
mod wu;

pub use optimized::{OptimizedPaletteQuantizer, OptimizedPaletteSession, QuantizeAlgorithm};
pub use predefined::{PredefinedColorsQuantizer, PredefinedColorsSession};

use crate::{BitmapData, Color32, KnownPixelFormat, Palette, WorkingColorSpace};
use enough::{Stop, StopReason};

/// A color reduction strategy.
pub trait Quantizer {
    /// The session type created for each source bitmap.
    type Session: QuantizingSession;

    /// Prepare a session for `source`.
    ///
    /// # Errors
    ///
    /// Returns the reason if `stop` requests cancellation while the source is analyzed.
    fn initialize(&self, source: &BitmapData, stop: &dyn Stop) -> Result<Self::Session, StopReason>;

    /// The smallest known pixel format that can represent every color of the sessions.
    fn pixel_format_hint(&self) -> KnownPixelFormat;
}

/// A color mapping prepared by a [`Quantizer`] for one source bitmap.
pub trait QuantizingSession: Send + Sync {
    /// The palette of the representable colors, if the session has one.
    fn palette(&self) -> Option<&Palette>;

    /// The opaque color partially transparent colors are blended with.
    fn back_color(&self) -> Color32;

    /// Colors with alpha below this are quantized to transparent, if the session supports
    /// transparency. Zero means no color is transparent.
    fn alpha_threshold(&self) -> u8;

    /// The working color space of blending and distance computations.
    fn working_color_space(&self) -> WorkingColorSpace;

    /// Whether every quantized color is gray.
    fn is_grayscale(&self) -> bool {
        self.palette().is_some_and(Palette::is_grayscale)
    }

    /// The representable color nearest to `color`.
    fn get_quantized_color(&self, color: Color32) -> Color32;
}

/// Blend partially transparent colors with `back_color` unless they fall below the alpha
/// threshold, which yields transparent.
#[inline]
pub(crate) fn resolve_alpha(
    color: Color32,
    back_color: Color32,
    alpha_threshold: u8,
    space: WorkingColorSpace,
) -> Color32 {
    if color.a == 255 {
        color
    } else if color.a < alpha_threshold {
        Color32::TRANSPARENT
    } else {
        color.blend_with_background(back_color, space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_resolution() {
        let space = WorkingColorSpace::Srgb;
        let back = Color32::WHITE;
        let c = Color32::new(100, 0, 0, 0);
        assert_eq!(resolve_alpha(c, back, 128, space), Color32::TRANSPARENT);
        assert_eq!(resolve_alpha(c, back, 0, space), c.blend_with_background(back, space));
        assert_eq!(resolve_alpha(c.opaque(), back, 128, space), Color32::BLACK);
    }
}
