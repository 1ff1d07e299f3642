//! Dithering implementations.
//!
//! A [`Ditherer`] adjusts each color before a [`QuantizingSession`] maps it, spreading the
//! quantization error over neighboring pixels so that areas of the image keep their average
//! color. [`Ditherer::initialize`] creates a [`DitheringSession`] for one source bitmap and
//! quantizing session.
//!
//! Ordered dithering ([`OrderedDitherer`]) and interleaved gradient noise
//! ([`InterleavedGradientNoiseDitherer`]) only depend on the pixel position, so rows can be
//! processed in parallel. Error diffusion ([`ErrorDiffusionDitherer`]) and random noise
//! ([`RandomNoiseDitherer`]) depend on the pixels processed before, so their sessions are
//! sequential and must see the pixels in row-major order.
//!
//! Pixels with alpha below the alpha threshold of the quantizing session are quantized without
//! dithering, and the alpha of other pixels is kept.

mod error_diffusion;
mod noise;
mod ordered;

pub use error_diffusion::{ErrorDiffusionDitherer, ErrorDiffusionSession};
pub use noise::{
    InterleavedGradientNoiseDitherer, InterleavedGradientNoiseSession, RandomNoiseDitherer,
    RandomNoiseSession,
};
pub use ordered::{OrderedDitherer, OrderedSession};

use crate::{Color32, QuantizingSession, linear_to_srgb8, srgb8_to_linear};
use enough::{Stop, StopReason};

/// A dithering strategy.
pub trait Ditherer {
    /// The session type, which may borrow the ditherer, the source, and the quantizing session.
    type Session<'a>: DitheringSession
    where
        Self: 'a;

    /// Prepare a session for dithering `source` with `quantizer`.
    ///
    /// # Errors
    ///
    /// Returns the reason if `stop` requests cancellation during the preparation.
    fn initialize<'a>(
        &'a self,
        source: &'a crate::BitmapData,
        quantizer: &'a dyn QuantizingSession,
        stop: &dyn Stop,
    ) -> Result<Self::Session<'a>, StopReason>;
}

/// A dithering pass over one bitmap.
///
/// Parallel drivers give every thread a clone of the session.
pub trait DitheringSession: Clone + Send {
    /// Whether the pixels must be processed one by one in row-major order.
    fn is_sequential(&self) -> bool;

    /// The quantized color of the pixel at `(x, y)` whose original color is `color`.
    fn get_dithered_color(&mut self, x: u32, y: u32, color: Color32) -> Color32;

    /// Replace the original colors of row `y`, starting at `x = 0`, with their dithered colors.
    ///
    /// Sequential sessions that visit some rows in a different order override this.
    fn dither_row(&mut self, y: u32, colors: &mut [Color32]) {
        for (x, color) in (0..).zip(colors.iter_mut()) {
            *color = self.get_dithered_color(x, y, *color);
        }
    }
}

/// How the strength of ordered and noise dithering is chosen when it is not set explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AutoStrengthMode {
    /// One strength for the whole image, from the average distance of the quantized levels.
    #[default]
    Constant,
    /// A strength per pixel, from the distance of the quantized levels around its color.
    Interpolated,
}

/// Offset distances probed around a color to find the neighboring quantized levels.
const PROBES: [u8; 7] = [4, 8, 16, 32, 64, 128, 255];

/// The amplitude of the dithering offsets in 8 bit channel units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Amplitude {
    Constant(f32),
    Interpolated,
}

impl Amplitude {
    /// Resolve an explicit strength in `(0, 1]` or an automatic one.
    pub(crate) fn new(
        strength: f32,
        mode: AutoStrengthMode,
        quantizer: &dyn QuantizingSession,
    ) -> Self {
        if strength > 0.0 {
            Self::Constant(strength.min(1.0) * 255.0)
        } else {
            match mode {
                AutoStrengthMode::Constant => Self::Constant(constant_amplitude(quantizer)),
                AutoStrengthMode::Interpolated => Self::Interpolated,
            }
        }
    }

    /// The amplitude at `color`.
    #[inline]
    pub(crate) fn at(self, color: Color32, quantizer: &dyn QuantizingSession) -> f32 {
        match self {
            Self::Constant(amplitude) => amplitude,
            Self::Interpolated => interpolated_amplitude(color, quantizer),
        }
    }
}

/// The average distance between the levels a gray ramp is quantized to.
fn constant_amplitude(quantizer: &dyn QuantizingSession) -> f32 {
    let mut levels = 1u16;
    let mut last = quantizer.get_quantized_color(Color32::BLACK);
    for v in 1..=u8::MAX {
        let next = quantizer.get_quantized_color(Color32::from_rgb(v, v, v));
        if next != last {
            levels += 1;
            last = next;
        }
    }
    if levels < 2 { 0.0 } else { 255.0 / f32::from(levels - 1) }
}

/// The distance between the quantized levels below and above `color`.
fn interpolated_amplitude(color: Color32, quantizer: &dyn QuantizingSession) -> f32 {
    let base = quantizer.get_quantized_color(color);
    let probe = |sign: f32| {
        PROBES
            .into_iter()
            .find(|&d| {
                let offset = sign * f32::from(d);
                quantizer.get_quantized_color(offset_color(color, [offset; 3], false)) != base
            })
            .unwrap_or(u8::MAX)
    };
    (f32::from(probe(1.0)) + f32::from(probe(-1.0))).min(255.0)
}

/// The channel values of `color` in 8 bit units, linearized if `linear`.
#[inline]
pub(crate) fn channels(color: Color32, linear: bool) -> [f32; 3] {
    let [r, g, b] = [color.r, color.g, color.b];
    if linear {
        [r, g, b].map(|c| srgb8_to_linear(c) * 255.0)
    } else {
        [r, g, b].map(f32::from)
    }
}

/// The color of `values` in 8 bit units, with the alpha of `alpha`.
#[inline]
pub(crate) fn from_channels(values: [f32; 3], alpha: u8, linear: bool) -> Color32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let [r, g, b] = if linear {
        values.map(|v| linear_to_srgb8(v / 255.0))
    } else {
        values.map(|v| v.round().clamp(0.0, 255.0) as u8)
    };
    Color32::new(alpha, r, g, b)
}

/// Add `offsets` to the channels of `color`.
#[inline]
pub(crate) fn offset_color(color: Color32, offsets: [f32; 3], linear: bool) -> Color32 {
    let mut values = channels(color, linear);
    for (v, o) in values.iter_mut().zip(offsets) {
        *v += o;
    }
    from_channels(values, color.a, linear)
}

/// Whether `color` is quantized without dithering.
#[inline]
pub(crate) fn skips_dithering(color: Color32, quantizer: &dyn QuantizingSession) -> bool {
    color.a < quantizer.alpha_threshold()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KnownPixelFormat, Quantizer, quantize::PredefinedColorsQuantizer, tests::gradient};
    use enough::Unstoppable;

    #[test]
    fn offsets_saturate() {
        let c = Color32::new(7, 250, 3, 100);
        assert_eq!(offset_color(c, [10.0, -10.0, 0.4], false), Color32::new(7, 255, 0, 100));
        let linear = offset_color(Color32::from_rgb(128, 128, 128), [0.0; 3], true);
        assert_eq!(linear, Color32::from_rgb(128, 128, 128));
    }

    #[test]
    fn automatic_amplitude() {
        let source = gradient(2, 2, KnownPixelFormat::Format24bppRgb);
        let bw = PredefinedColorsQuantizer::black_and_white(128)
            .initialize(&source, &Unstoppable)
            .unwrap();
        let constant = AutoStrengthMode::Constant;
        assert_eq!(Amplitude::new(0.0, constant, &bw), Amplitude::Constant(255.0));
        assert_eq!(Amplitude::new(0.5, constant, &bw), Amplitude::Constant(127.5));

        let gray = PredefinedColorsQuantizer::from_palette(crate::Palette::grayscale16())
            .initialize(&source, &Unstoppable)
            .unwrap();
        assert_eq!(Amplitude::new(0.0, constant, &gray), Amplitude::Constant(17.0));

        let interpolated = Amplitude::new(0.0, AutoStrengthMode::Interpolated, &bw);
        assert_eq!(interpolated, Amplitude::Interpolated);
        let gray_amplitude = interpolated.at(Color32::from_rgb(120, 120, 120), &bw);
        assert!(gray_amplitude > 128.0);
    }
}
