use super::{Quantizer, QuantizingSession, median_cut, octree, resolve_alpha, wu};
use crate::{
    BitmapData, Color32, DEFAULT_ALPHA_THRESHOLD, KnownPixelFormat, Palette, PaletteSize,
    WorkingColorSpace,
};
use alloc::vec::Vec;
use enough::{Stop, StopReason};
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// The algorithm an [`OptimizedPaletteQuantizer`] uses to pick palette entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuantizeAlgorithm {
    /// Repeatedly merge the least used leaves of a color octree.
    Octree,
    /// Repeatedly split the color box with the greatest extent at its weighted median.
    MedianCut,
    /// Wu's greedy variance minimization on a color moment histogram.
    #[default]
    Wu,
}

/// The distinct opaque colors of an image and how often each occurs, sorted by color.
#[derive(Debug, Clone, Default)]
pub(crate) struct ColorCounts {
    pub colors: Vec<Color32>,
    pub counts: Vec<u32>,
}

impl ColorCounts {
    /// Count the colors of `pixels`, which is sorted in place first.
    pub(crate) fn from_pixels(mut pixels: Vec<Color32>) -> Self {
        #[cfg(feature = "threads")]
        pixels.par_sort_unstable_by_key(|c| c.to_argb_u32());
        #[cfg(not(feature = "threads"))]
        pixels.sort_unstable_by_key(|c| c.to_argb_u32());

        let mut counts = Self::default();
        for color in pixels {
            match (counts.colors.last(), counts.counts.last_mut()) {
                (Some(&last), Some(count)) if last == color => *count = count.saturating_add(1),
                _ => {
                    counts.colors.push(color);
                    counts.counts.push(1);
                }
            }
        }
        counts
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// A quantizer that generates a palette of up to [`max_colors`](Self::max_colors) entries
/// optimized for the source image.
///
/// With a nonzero alpha threshold, source colors with alpha below the threshold are considered
/// transparent and get a palette entry of their own, which counts towards the maximum unless
/// only one color is allowed. Other partially transparent colors are blended with the back color.
/// An alpha threshold of zero blends every color, so the palette is fully opaque.
///
/// # Examples
///
/// ```
/// use pixquant::{BitmapData, Color32, KnownPixelFormat, PaletteSize, Quantizer, QuantizingSession};
/// use pixquant::quantize::OptimizedPaletteQuantizer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bitmap = BitmapData::new(2, 1, KnownPixelFormat::Format32bppArgb)?;
/// bitmap.set_color32(0, 0, Color32::from_rgb(200, 10, 10));
/// bitmap.set_color32(1, 0, Color32::TRANSPARENT);
///
/// let quantizer = OptimizedPaletteQuantizer::median_cut().max_colors(PaletteSize::try_from(4u32)?);
/// let session = quantizer.initialize(&bitmap, &enough::Unstoppable)?;
/// let palette = session.palette().expect("optimized sessions have a palette");
/// assert_eq!(palette.entries(), [Color32::from_rgb(200, 10, 10), Color32::TRANSPARENT]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizedPaletteQuantizer {
    algorithm: QuantizeAlgorithm,
    max_colors: PaletteSize,
    back_color: Color32,
    alpha_threshold: u8,
    working_color_space: WorkingColorSpace,
    bit_level: Option<u8>,
}

impl OptimizedPaletteQuantizer {
    /// A quantizer using `algorithm` with at most 256 colors, a black back color, the default
    /// alpha threshold, and the default working color space.
    #[must_use]
    #[inline]
    pub const fn new(algorithm: QuantizeAlgorithm) -> Self {
        Self {
            algorithm,
            max_colors: PaletteSize::DEFAULT,
            back_color: Color32::BLACK,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            working_color_space: WorkingColorSpace::Default,
            bit_level: None,
        }
    }

    /// An octree quantizer.
    #[must_use]
    #[inline]
    pub const fn octree() -> Self {
        Self::new(QuantizeAlgorithm::Octree)
    }

    /// A median cut quantizer.
    #[must_use]
    #[inline]
    pub const fn median_cut() -> Self {
        Self::new(QuantizeAlgorithm::MedianCut)
    }

    /// A Wu quantizer.
    #[must_use]
    #[inline]
    pub const fn wu() -> Self {
        Self::new(QuantizeAlgorithm::Wu)
    }

    /// Sets the maximum number of palette entries.
    #[must_use]
    #[inline]
    pub const fn max_colors(mut self, max_colors: PaletteSize) -> Self {
        self.max_colors = max_colors;
        self
    }

    /// Sets the color partially transparent colors are blended with.
    #[must_use]
    #[inline]
    pub const fn back_color(mut self, back_color: Color32) -> Self {
        self.back_color = back_color.opaque();
        self
    }

    /// Sets the alpha threshold. Zero blends every color with the back color.
    #[must_use]
    #[inline]
    pub const fn alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        self
    }

    /// Sets the working color space of the generated palette.
    #[must_use]
    #[inline]
    pub const fn working_color_space(mut self, space: WorkingColorSpace) -> Self {
        self.working_color_space = space;
        self
    }

    /// Sets the number of bits per channel the algorithm distinguishes.
    ///
    /// For the octree this is the tree depth (1 to 8, default 8). For Wu it is the histogram
    /// resolution (1 to 7, default 5 for up to 256 colors and 6 otherwise). Median cut always
    /// uses full precision. Values out of range are clamped.
    #[must_use]
    #[inline]
    pub const fn bit_level(mut self, bit_level: Option<u8>) -> Self {
        self.bit_level = bit_level;
        self
    }

    /// The configured algorithm.
    #[must_use]
    #[inline]
    pub const fn algorithm(&self) -> QuantizeAlgorithm {
        self.algorithm
    }

    /// Collect the opaque colors of `source` and whether any pixel is transparent.
    fn collect(
        &self,
        source: &BitmapData,
        space: WorkingColorSpace,
        stop: &dyn Stop,
    ) -> Result<(ColorCounts, bool), StopReason> {
        let row_colors = |y: u32| -> Result<(Vec<Color32>, bool), StopReason> {
            stop.check()?;
            let row = source.row(y);
            let mut transparent = false;
            let mut colors = Vec::with_capacity(source.width() as usize);
            for x in 0..source.width() {
                let color =
                    resolve_alpha(row.get_color32(x), self.back_color, self.alpha_threshold, space);
                if color.a == 0 {
                    transparent = true;
                } else {
                    colors.push(color);
                }
            }
            Ok((colors, transparent))
        };

        #[cfg(feature = "threads")]
        let rows = (0..source.height())
            .into_par_iter()
            .map(row_colors)
            .collect::<Result<Vec<_>, _>>()?;
        #[cfg(not(feature = "threads"))]
        let rows = (0..source.height()).map(row_colors).collect::<Result<Vec<_>, _>>()?;

        let transparent = rows.iter().any(|&(_, t)| t);
        let pixels = rows.into_iter().flat_map(|(colors, _)| colors).collect();
        Ok((ColorCounts::from_pixels(pixels), transparent))
    }
}

impl Default for OptimizedPaletteQuantizer {
    fn default() -> Self {
        Self::wu()
    }
}

impl Quantizer for OptimizedPaletteQuantizer {
    type Session = OptimizedPaletteSession;

    fn initialize(
        &self,
        source: &BitmapData,
        stop: &dyn Stop,
    ) -> Result<Self::Session, StopReason> {
        let space = self.working_color_space.resolve(false);
        let (counts, transparent) = self.collect(source, space, stop)?;

        let max = self.max_colors.as_usize();
        let reserve = transparent && max >= 2;
        let budget = if reserve { max - 1 } else { max };

        let mut lookup = None;
        let mut entries = if counts.is_empty() {
            Vec::new()
        } else {
            match self.algorithm {
                QuantizeAlgorithm::Octree => {
                    octree::palette(&counts, budget, self.bit_level, stop)?
                }
                QuantizeAlgorithm::MedianCut => median_cut::palette(&counts, budget, stop)?,
                QuantizeAlgorithm::Wu => {
                    let (entries, cube_lookup) =
                        wu::palette(&counts, budget, self.bit_level, stop)?;
                    lookup = Some(cube_lookup);
                    entries
                }
            }
        };
        if reserve || entries.is_empty() {
            entries.push(Color32::TRANSPARENT);
        }

        log::debug!(
            "{:?} palette of {} entries from {} distinct colors (transparent: {transparent})",
            self.algorithm,
            entries.len(),
            counts.len(),
        );

        // between 1 and `max_colors` entries
        #[allow(clippy::expect_used)]
        let palette = Palette::new(entries, space, self.back_color, self.alpha_threshold)
            .expect("palette length is within bounds");
        let palette = match lookup {
            Some(lookup) => palette.with_lookup(lookup),
            None => palette,
        };
        Ok(OptimizedPaletteSession { palette })
    }

    fn pixel_format_hint(&self) -> KnownPixelFormat {
        KnownPixelFormat::smallest_indexed(self.max_colors.as_usize())
            .unwrap_or(KnownPixelFormat::Format32bppArgb)
    }
}

/// The session of an [`OptimizedPaletteQuantizer`], which owns the generated palette.
#[derive(Debug, Clone)]
pub struct OptimizedPaletteSession {
    palette: Palette,
}

impl OptimizedPaletteSession {
    /// Take the generated palette.
    #[must_use]
    pub fn into_palette(self) -> Palette {
        self.palette
    }
}

impl QuantizingSession for OptimizedPaletteSession {
    fn palette(&self) -> Option<&Palette> {
        Some(&self.palette)
    }

    fn back_color(&self) -> Color32 {
        self.palette.back_color()
    }

    fn alpha_threshold(&self) -> u8 {
        self.palette.alpha_threshold()
    }

    fn working_color_space(&self) -> WorkingColorSpace {
        self.palette.working_color_space()
    }

    fn get_quantized_color(&self, color: Color32) -> Color32 {
        self.palette.nearest_color(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{CancelAfter, gradient, test_colors};
    use enough::Unstoppable;

    const ALGORITHMS: [QuantizeAlgorithm; 3] =
        [QuantizeAlgorithm::Octree, QuantizeAlgorithm::MedianCut, QuantizeAlgorithm::Wu];

    fn noisy(width: u32, height: u32) -> BitmapData {
        let bitmap = BitmapData::new(width, height, KnownPixelFormat::Format32bppArgb).unwrap();
        let colors = test_colors((width * height) as usize);
        for (i, &c) in colors.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let i = i as u32;
            bitmap.set_color32(i % width, i / width, c);
        }
        bitmap
    }

    fn palette_len(algorithm: QuantizeAlgorithm, source: &BitmapData, max: u32) -> usize {
        let quantizer = OptimizedPaletteQuantizer::new(algorithm)
            .max_colors(PaletteSize::try_from(max).unwrap());
        let session = quantizer.initialize(source, &Unstoppable).unwrap();
        session.palette().unwrap().len()
    }

    #[test]
    fn palettes_respect_max_colors() {
        let source = noisy(64, 64);
        for algorithm in ALGORITHMS {
            for max in [1, 2, 4, 16, 256, 512, 1024] {
                let len = palette_len(algorithm, &source, max);
                assert!(len <= max as usize, "{algorithm:?} {max}: {len}");
                assert!(len >= 1);
            }
        }
    }

    #[test]
    fn few_colors_are_kept_exactly() {
        let source = BitmapData::new(3, 3, KnownPixelFormat::Format24bppRgb).unwrap();
        let colors = [
            Color32::from_rgb(255, 0, 0),
            Color32::from_rgb(0, 255, 0),
            Color32::from_rgb(10, 20, 30),
        ];
        for y in 0..3 {
            for (x, &c) in (0..3).zip(&colors) {
                source.set_color32(x, y, c);
            }
        }
        for algorithm in ALGORITHMS {
            let session = OptimizedPaletteQuantizer::new(algorithm)
                .bit_level(Some(8))
                .initialize(&source, &Unstoppable)
                .unwrap();
            let palette = session.palette().unwrap();
            assert_eq!(palette.len(), 3, "{algorithm:?}");
            for &c in &colors {
                assert_eq!(session.get_quantized_color(c), c, "{algorithm:?}");
            }
        }
    }

    #[test]
    fn wu_maps_colors_to_their_box_mean() {
        let a = Color32::from_rgb(10, 20, 30);
        let b = Color32::from_rgb(30, 40, 50);
        let c = Color32::from_rgb(250, 250, 250);
        let source = BitmapData::new(5, 1, KnownPixelFormat::Format24bppRgb).unwrap();
        for (x, color) in (0..).zip([a, a, a, b, c]) {
            source.set_color32(x, 0, color);
        }
        // with one bit per channel, `a` and `b` share a bin
        let session = OptimizedPaletteQuantizer::wu()
            .bit_level(Some(1))
            .initialize(&source, &Unstoppable)
            .unwrap();
        let mean = Color32::from_rgb(15, 25, 35);
        let mut entries = session.palette().unwrap().entries().to_vec();
        entries.sort_unstable();
        assert_eq!(entries, [mean, c]);
        assert_eq!(session.get_quantized_color(a), mean);
        assert_eq!(session.get_quantized_color(b), mean);
        assert_eq!(session.get_quantized_color(c), c);
    }

    #[test]
    fn transparent_images() {
        let source = BitmapData::new(5, 5, KnownPixelFormat::Format32bppArgb).unwrap();
        for algorithm in ALGORITHMS {
            for max in [1u32, 2, 256] {
                let quantizer = OptimizedPaletteQuantizer::new(algorithm)
                    .max_colors(PaletteSize::try_from(max).unwrap());
                let session = quantizer.initialize(&source, &Unstoppable).unwrap();
                assert_eq!(session.palette().unwrap().entries(), [Color32::TRANSPARENT]);
                let color = session.get_quantized_color(Color32::new(3, 1, 2, 3));
                assert_eq!(color, Color32::TRANSPARENT);
            }
        }
    }

    #[test]
    fn transparency_reserves_an_entry() {
        let source = noisy(16, 16);
        source.set_color32(0, 0, Color32::TRANSPARENT);
        for algorithm in ALGORITHMS {
            let session = OptimizedPaletteQuantizer::new(algorithm)
                .max_colors(PaletteSize::try_from(2u32).unwrap())
                .initialize(&source, &Unstoppable)
                .unwrap();
            let palette = session.palette().unwrap();
            assert_eq!(palette.len(), 2, "{algorithm:?}");
            assert_eq!(palette.transparent_index(), Some(1));
            assert_eq!(palette[0].a, 255);
        }
    }

    #[test]
    fn solid_mode_blends_everything() {
        let source = BitmapData::new(2, 2, KnownPixelFormat::Format32bppArgb).unwrap();
        for algorithm in ALGORITHMS {
            let session = OptimizedPaletteQuantizer::new(algorithm)
                .alpha_threshold(0)
                .back_color(Color32::from_rgb(10, 200, 30))
                .initialize(&source, &Unstoppable)
                .unwrap();
            let palette = session.palette().unwrap();
            assert_eq!(palette.transparent_index(), None);
            assert_eq!(palette.len(), 1);
            assert_eq!(session.get_quantized_color(Color32::TRANSPARENT), palette[0]);
        }
    }

    #[test]
    fn max_palette_for_small_image() {
        let source = gradient(32, 32, KnownPixelFormat::Format24bppRgb);
        for algorithm in ALGORITHMS {
            let len = palette_len(algorithm, &source, 65536);
            assert!(len <= 32 * 32);
        }
    }

    #[test]
    fn format_hint_follows_max_colors() {
        let quantizer =
            OptimizedPaletteQuantizer::octree().max_colors(PaletteSize::try_from(16u32).unwrap());
        assert_eq!(quantizer.pixel_format_hint(), KnownPixelFormat::Format4bppIndexed);
        assert_eq!(
            OptimizedPaletteQuantizer::wu().max_colors(PaletteSize::MAX).pixel_format_hint(),
            KnownPixelFormat::Format16bppIndexed
        );
    }

    #[test]
    fn cancellation() {
        let source = noisy(16, 16);
        for algorithm in ALGORITHMS {
            let result =
                OptimizedPaletteQuantizer::new(algorithm).initialize(&source, &CancelAfter::new(3));
            assert!(result.is_err());
        }
    }

    #[test]
    fn color_counts() {
        let a = Color32::from_rgb(1, 2, 3);
        let b = Color32::from_rgb(4, 5, 6);
        let counts = ColorCounts::from_pixels(alloc::vec![b, a, b, b, a]);
        assert_eq!(counts.colors, [a, b]);
        assert_eq!(counts.counts, [2, 3]);
    }
}
