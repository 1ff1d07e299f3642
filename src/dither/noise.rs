use super::{Amplitude, AutoStrengthMode, Ditherer, DitheringSession, offset_color, skips_dithering};
use crate::{BitmapData, Color32, QuantizingSession};
use core::hash::BuildHasher as _;
use enough::{Stop, StopReason};
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoroshiro128PlusPlus;
use std::hash::RandomState;

/// Dithering with interleaved gradient noise.
///
/// The offset of a pixel is a deterministic function of its position that looks random but
/// spreads evenly over small areas, so every pixel can be processed independently.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InterleavedGradientNoiseDitherer {
    strength: f32,
    auto_strength_mode: AutoStrengthMode,
}

impl InterleavedGradientNoiseDitherer {
    /// A ditherer with automatic strength.
    #[must_use]
    pub const fn new() -> Self {
        Self { strength: 0.0, auto_strength_mode: AutoStrengthMode::Constant }
    }

    /// Sets the strength in `(0, 1]`, or `0` for an automatic strength. Values out of range are
    /// clamped.
    #[must_use]
    pub fn strength(mut self, strength: f32) -> Self {
        self.strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
        self
    }

    /// Sets how the strength is chosen when it is automatic.
    #[must_use]
    pub const fn auto_strength_mode(mut self, mode: AutoStrengthMode) -> Self {
        self.auto_strength_mode = mode;
        self
    }
}

/// The noise value in `[0, 1)` at `(x, y)`.
#[inline]
fn interleaved_gradient_noise(x: u32, y: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let (x, y) = (x as f32, y as f32);
    (52.982_918_9 * (0.067_110_56 * x + 0.005_837_15 * y).fract()).fract()
}

impl Ditherer for InterleavedGradientNoiseDitherer {
    type Session<'a> = InterleavedGradientNoiseSession<'a>;

    fn initialize<'a>(
        &'a self,
        source: &'a BitmapData,
        quantizer: &'a dyn QuantizingSession,
        stop: &dyn Stop,
    ) -> Result<Self::Session<'a>, StopReason> {
        stop.check()?;
        let amplitude = Amplitude::new(self.strength, self.auto_strength_mode, quantizer);
        log::debug!(
            "interleaved gradient noise dithering of {}x{} source",
            source.width(),
            source.height(),
        );
        Ok(InterleavedGradientNoiseSession {
            quantizer,
            amplitude,
            linear: quantizer.working_color_space().is_linear(),
        })
    }
}

/// The session of an [`InterleavedGradientNoiseDitherer`].
#[derive(Clone)]
pub struct InterleavedGradientNoiseSession<'a> {
    quantizer: &'a dyn QuantizingSession,
    amplitude: Amplitude,
    linear: bool,
}

impl DitheringSession for InterleavedGradientNoiseSession<'_> {
    fn is_sequential(&self) -> bool {
        false
    }

    fn get_dithered_color(&mut self, x: u32, y: u32, color: Color32) -> Color32 {
        if skips_dithering(color, self.quantizer) {
            return self.quantizer.get_quantized_color(color);
        }
        let amplitude = self.amplitude.at(color, self.quantizer);
        let offset = (interleaved_gradient_noise(x, y) - 0.5) * amplitude;
        self.quantizer.get_quantized_color(offset_color(color, [offset; 3], self.linear))
    }
}

/// Dithering with white noise.
///
/// With a seed the result is reproducible. The pixels are processed sequentially so that every
/// pixel draws the same numbers on every run. Grayscale quantizers get the same offset on every
/// channel, others an independent offset per channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RandomNoiseDitherer {
    seed: Option<u64>,
    strength: f32,
    auto_strength_mode: AutoStrengthMode,
}

impl RandomNoiseDitherer {
    /// An unseeded ditherer with automatic strength.
    #[must_use]
    pub const fn new() -> Self {
        Self { seed: None, strength: 0.0, auto_strength_mode: AutoStrengthMode::Constant }
    }

    /// Sets the seed of the random number generator, or `None` for a different result every time.
    #[must_use]
    pub const fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the strength in `(0, 1]`, or `0` for an automatic strength. Values out of range are
    /// clamped.
    #[must_use]
    pub fn strength(mut self, strength: f32) -> Self {
        self.strength = if strength.is_nan() { 0.0 } else { strength.clamp(0.0, 1.0) };
        self
    }

    /// Sets how the strength is chosen when it is automatic.
    #[must_use]
    pub const fn auto_strength_mode(mut self, mode: AutoStrengthMode) -> Self {
        self.auto_strength_mode = mode;
        self
    }
}

impl Ditherer for RandomNoiseDitherer {
    type Session<'a> = RandomNoiseSession<'a>;

    fn initialize<'a>(
        &'a self,
        source: &'a BitmapData,
        quantizer: &'a dyn QuantizingSession,
        stop: &dyn Stop,
    ) -> Result<Self::Session<'a>, StopReason> {
        stop.check()?;
        let seed = self.seed.unwrap_or_else(|| RandomState::new().hash_one(source.offset()));
        let amplitude = Amplitude::new(self.strength, self.auto_strength_mode, quantizer);
        log::debug!(
            "random noise dithering of {}x{} source (seeded: {})",
            source.width(),
            source.height(),
            self.seed.is_some(),
        );
        Ok(RandomNoiseSession {
            quantizer,
            amplitude,
            linear: quantizer.working_color_space().is_linear(),
            grayscale: quantizer.is_grayscale(),
            rng: Xoroshiro128PlusPlus::seed_from_u64(seed),
        })
    }
}

/// The session of a [`RandomNoiseDitherer`].
#[derive(Clone)]
pub struct RandomNoiseSession<'a> {
    quantizer: &'a dyn QuantizingSession,
    amplitude: Amplitude,
    linear: bool,
    grayscale: bool,
    rng: Xoroshiro128PlusPlus,
}

impl DitheringSession for RandomNoiseSession<'_> {
    fn is_sequential(&self) -> bool {
        true
    }

    fn get_dithered_color(&mut self, _x: u32, _y: u32, color: Color32) -> Color32 {
        if skips_dithering(color, self.quantizer) {
            return self.quantizer.get_quantized_color(color);
        }
        let amplitude = self.amplitude.at(color, self.quantizer);
        let offsets = if self.grayscale {
            [(self.rng.random::<f32>() - 0.5) * amplitude; 3]
        } else {
            [(); 3].map(|()| (self.rng.random::<f32>() - 0.5) * amplitude)
        };
        self.quantizer.get_quantized_color(offset_color(color, offsets, self.linear))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KnownPixelFormat, Quantizer, quantize::PredefinedColorsQuantizer, tests::gradient};
    use alloc::vec::Vec;
    use enough::Unstoppable;

    #[test]
    fn gradient_noise_is_in_range() {
        for y in 0..64 {
            for x in 0..64 {
                let n = interleaved_gradient_noise(x, y);
                assert!((0.0..1.0).contains(&n), "{x} {y} {n}");
            }
        }
        assert_eq!(interleaved_gradient_noise(0, 0), 0.0);
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let source = gradient(8, 8, KnownPixelFormat::Format24bppRgb);
        let quantizer =
            PredefinedColorsQuantizer::rgb555().initialize(&source, &Unstoppable).unwrap();
        let ditherer = RandomNoiseDitherer::new().seed(Some(7)).strength(0.5);
        let run = || {
            let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
            (0..64u32)
                .map(|i| session.get_dithered_color(i % 8, i / 8, Color32::from_rgb(100, 150, 200)))
                .collect::<Vec<_>>()
        };
        let first = run();
        assert_eq!(first, run());
        assert!(first.iter().any(|&c| c != first[0]));
    }

    #[test]
    fn grayscale_quantizers_get_gray_noise() {
        let source = gradient(4, 4, KnownPixelFormat::Format24bppRgb);
        let quantizer =
            PredefinedColorsQuantizer::grayscale().initialize(&source, &Unstoppable).unwrap();
        let ditherer = RandomNoiseDitherer::new().seed(Some(1)).strength(1.0);
        let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        for x in 0..16 {
            assert!(session.get_dithered_color(x, 0, Color32::from_rgb(128, 128, 128)).is_gray());
        }
    }

    #[test]
    fn transparent_pixels_are_not_dithered() {
        let source = gradient(4, 4, KnownPixelFormat::Format32bppArgb);
        let quantizer =
            PredefinedColorsQuantizer::argb1555().initialize(&source, &Unstoppable).unwrap();
        let ditherer = InterleavedGradientNoiseDitherer::new().strength(1.0);
        let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        let color = session.get_dithered_color(1, 1, Color32::new(10, 255, 255, 255));
        assert_eq!(color, Color32::TRANSPARENT);
    }
}
