use super::{Amplitude, AutoStrengthMode, Ditherer, DitheringSession, offset_color, skips_dithering};
use crate::{BitmapData, Color32, QuantizingSession};
use alloc::{sync::Arc, vec::Vec};
use enough::{Stop, StopReason};

/// The 3x3 matrix with the most even spread of thresholds.
const BAYER_3X3: [[u8; 3]; 3] = [[0, 7, 3], [6, 5, 2], [4, 1, 8]];

/// Clustered dots growing from the centers of the two halves of the matrix.
const DOTTED_HALFTONE: [[u8; 8]; 8] = [
    [24, 10, 12, 26, 35, 47, 49, 37],
    [8, 0, 2, 14, 45, 59, 61, 51],
    [22, 6, 4, 16, 43, 57, 63, 53],
    [30, 20, 18, 28, 33, 41, 55, 39],
    [34, 46, 48, 36, 25, 11, 13, 27],
    [44, 58, 60, 50, 9, 1, 3, 15],
    [42, 56, 62, 52, 23, 7, 5, 17],
    [32, 40, 54, 38, 31, 21, 19, 29],
];

/// A threshold matrix with values in `0..=max`.
#[derive(Debug, PartialEq)]
struct Matrix {
    width: usize,
    height: usize,
    /// Precomputed offsets in `[-0.5, 0.5]`, row-major.
    offsets: Vec<f32>,
}

impl Matrix {
    fn new(width: usize, values: Vec<u8>) -> Self {
        let height = values.len() / width;
        let levels = f32::from(values.iter().copied().max().unwrap_or_default()) + 1.0;
        let offsets = values.into_iter().map(|m| (f32::from(m) + 0.5) / levels - 0.5).collect();
        Self { width, height, offsets }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> f32 {
        self.offsets[(y as usize % self.height) * self.width + x as usize % self.width]
    }
}

/// The Bayer matrix of size `2^order`.
fn bayer(order: u32) -> Vec<u8> {
    let mut matrix = alloc::vec![0u8];
    let mut size = 1;
    for _ in 0..order {
        let next_size = size * 2;
        let mut next = alloc::vec![0u8; next_size * next_size];
        for y in 0..next_size {
            for x in 0..next_size {
                let base = matrix[(y % size) * size + x % size];
                let quadrant = [[0, 2], [3, 1]][y / size][x / size];
                next[y * next_size + x] = 4 * base + quadrant;
            }
        }
        matrix = next;
        size = next_size;
    }
    matrix
}

/// Ordered dithering with a threshold matrix.
///
/// Each channel of a pixel is offset by the matrix value at its position, tiled over the image,
/// before quantization. The strength scales the offsets: `1.0` spans the whole channel range,
/// while `0.0` (the default) picks a strength automatically from the colors of the quantizer, see
/// [`AutoStrengthMode`].
///
/// # Examples
///
/// ```
/// use pixquant::{BitmapData, Color32, KnownPixelFormat, OrderedDitherer};
/// use pixquant::quantize::PredefinedColorsQuantizer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bitmap = BitmapData::new(8, 8, KnownPixelFormat::Format24bppRgb)?;
/// for y in 0..8 {
///     for x in 0..8 {
///         bitmap.set_color32(x, y, Color32::from_rgb(128, 128, 128));
///     }
/// }
/// let quantizer = PredefinedColorsQuantizer::black_and_white(128);
/// assert!(bitmap.dither(&quantizer, &OrderedDitherer::bayer8x8(), &enough::Unstoppable));
///
/// let white = (0..8)
///     .flat_map(|y| (0..8).map(move |x| (x, y)))
///     .filter(|&(x, y)| bitmap.get_color32(x, y) == Color32::WHITE)
///     .count();
/// assert_eq!(white, 32);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedDitherer {
    matrix: Arc<Matrix>,
    strength: f32,
    auto_strength_mode: AutoStrengthMode,
}

impl OrderedDitherer {
    fn with_matrix(width: usize, values: Vec<u8>) -> Self {
        Self {
            matrix: Arc::new(Matrix::new(width, values)),
            strength: 0.0,
            auto_strength_mode: AutoStrengthMode::Constant,
        }
    }

    /// The 2x2 Bayer matrix.
    #[must_use]
    pub fn bayer2x2() -> Self {
        Self::with_matrix(2, bayer(1))
    }

    /// A 3x3 dispersed dot matrix.
    #[must_use]
    pub fn bayer3x3() -> Self {
        Self::with_matrix(3, BAYER_3X3.as_flattened().to_vec())
    }

    /// The 4x4 Bayer matrix.
    #[must_use]
    pub fn bayer4x4() -> Self {
        Self::with_matrix(4, bayer(2))
    }

    /// The 8x8 Bayer matrix.
    #[must_use]
    pub fn bayer8x8() -> Self {
        Self::with_matrix(8, bayer(3))
    }

    /// An 8x8 clustered dot matrix imitating printed halftones.
    #[must_use]
    pub fn dotted_halftone() -> Self {
        Self::with_matrix(8, DOTTED_HALFTONE.as_flattened().to_vec())
    }

    /// A custom matrix given as rows of thresholds. The thresholds are relative to the greatest
    /// value in the matrix.
    ///
    /// Returns `None` if the matrix is empty or its rows differ in length.
    #[must_use]
    pub fn from_matrix(rows: &[&[u8]]) -> Option<Self> {
        let width = rows.first()?.len();
        if width == 0 || rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Self::with_matrix(width, rows.concat()))
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
    pub fn auto_strength_mode(mut self, mode: AutoStrengthMode) -> Self {
        self.auto_strength_mode = mode;
        self
    }
}

impl Ditherer for OrderedDitherer {
    type Session<'a> = OrderedSession<'a>;

    fn initialize<'a>(
        &'a self,
        source: &'a BitmapData,
        quantizer: &'a dyn QuantizingSession,
        stop: &dyn Stop,
    ) -> Result<Self::Session<'a>, StopReason> {
        stop.check()?;
        let amplitude = Amplitude::new(self.strength, self.auto_strength_mode, quantizer);
        log::debug!(
            "ordered dithering of {}x{} source with {}x{} matrix ({amplitude:?})",
            source.width(),
            source.height(),
            self.matrix.width,
            self.matrix.height,
        );
        Ok(OrderedSession {
            matrix: &self.matrix,
            quantizer,
            amplitude,
            linear: quantizer.working_color_space().is_linear(),
        })
    }
}

/// The session of an [`OrderedDitherer`].
#[derive(Clone)]
pub struct OrderedSession<'a> {
    matrix: &'a Matrix,
    quantizer: &'a dyn QuantizingSession,
    amplitude: Amplitude,
    linear: bool,
}

impl DitheringSession for OrderedSession<'_> {
    fn is_sequential(&self) -> bool {
        false
    }

    fn get_dithered_color(&mut self, x: u32, y: u32, color: Color32) -> Color32 {
        if skips_dithering(color, self.quantizer) {
            return self.quantizer.get_quantized_color(color);
        }
        let offset = self.matrix.offset(x, y) * self.amplitude.at(color, self.quantizer);
        self.quantizer.get_quantized_color(offset_color(color, [offset; 3], self.linear))
    }
}
