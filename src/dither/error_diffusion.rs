use super::{Ditherer, DitheringSession, channels, from_channels, skips_dithering};
use crate::{BitmapData, Color32, QuantizingSession};
use alloc::{sync::Arc, vec, vec::Vec};
use enough::{Stop, StopReason};

/// The neighbors that receive the error of a pixel.
#[derive(Debug, PartialEq)]
struct Kernel {
    /// Horizontal offset, row offset, and share of the error.
    taps: Vec<(i32, usize, f32)>,
    /// Number of rows including the current one.
    rows: usize,
    /// The largest horizontal offset in either direction.
    pad: usize,
}

impl Kernel {
    /// A kernel from rows of weights, where `origin` is the column of the current pixel in the
    /// first row. Weights at or left of the origin in the first row are ignored.
    fn new(matrix: &[&[u8]], divisor: u16, origin: usize) -> Option<Self> {
        let width = matrix.first()?.len();
        if divisor == 0 || origin >= width || matrix.iter().any(|row| row.len() != width) {
            return None;
        }
        let mut taps = Vec::new();
        for (dy, row) in matrix.iter().enumerate() {
            for (column, &weight) in row.iter().enumerate() {
                if weight == 0 || (dy == 0 && column <= origin) {
                    continue;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
                let dx = column as i32 - origin as i32;
                taps.push((dx, dy, f32::from(weight) / f32::from(divisor)));
            }
        }
        let pad =
            taps.iter().map(|&(dx, _, _)| dx.unsigned_abs() as usize).max().unwrap_or_default();
        Some(Self { taps, rows: matrix.len(), pad })
    }
}

/// Error diffusion dithering.
///
/// The difference between the adjusted color of a pixel and its quantized color is distributed
/// to the pixels right of and below it, in the proportions of the kernel. Pixels are processed in
/// row-major order. With serpentine processing odd rows are processed from right to left with the
/// kernel mirrored, which avoids directional artifacts.
///
/// # Examples
///
/// ```
/// use pixquant::{BitmapData, Color32, ErrorDiffusionDitherer, KnownPixelFormat};
/// use pixquant::quantize::PredefinedColorsQuantizer;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bitmap = BitmapData::new(16, 16, KnownPixelFormat::Format24bppRgb)?;
/// bitmap.clear(Color32::from_rgb(64, 64, 64));
/// let quantizer = PredefinedColorsQuantizer::black_and_white(128);
/// let ditherer = ErrorDiffusionDitherer::floyd_steinberg().serpentine(true);
/// let result = bitmap
///     .clone_dithered(KnownPixelFormat::Format1bppIndexed, &quantizer, &ditherer, &enough::Unstoppable)?
///     .expect("not cancelled");
///
/// let white = (0..16)
///     .flat_map(|y| (0..16).map(move |x| (x, y)))
///     .filter(|&(x, y)| result.get_color_index(x, y) == 1)
///     .count();
/// assert!((48..=80).contains(&white));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDiffusionDitherer {
    kernel: Arc<Kernel>,
    serpentine: bool,
    by_brightness: bool,
}

impl ErrorDiffusionDitherer {
    fn preset(matrix: &[&[u8]], divisor: u16, origin: usize) -> Self {
        #[allow(clippy::expect_used)]
        let kernel = Kernel::new(matrix, divisor, origin).expect("preset kernels are valid");
        Self { kernel: Arc::new(kernel), serpentine: false, by_brightness: false }
    }

    /// A custom kernel from rows of weights that are divided by `divisor`. `origin` is the column
    /// of the current pixel in the first row; weights at or left of it in the first row are
    /// ignored.
    ///
    /// Returns `None` if the matrix is empty, the rows differ in length, `divisor` is zero, or
    /// `origin` is outside the first row.
    #[must_use]
    pub fn from_matrix(matrix: &[&[u8]], divisor: u16, origin: usize) -> Option<Self> {
        Kernel::new(matrix, divisor, origin).map(|kernel| Self {
            kernel: Arc::new(kernel),
            serpentine: false,
            by_brightness: false,
        })
    }

    /// Floyd–Steinberg: 4 neighbors, sixteenths.
    #[must_use]
    pub fn floyd_steinberg() -> Self {
        Self::preset(&[&[0, 0, 7], &[3, 5, 1]], 16, 1)
    }

    /// Jarvis, Judice, and Ninke: 12 neighbors over two rows.
    #[must_use]
    pub fn jarvis_judice_ninke() -> Self {
        Self::preset(&[&[0, 0, 0, 7, 5], &[3, 5, 7, 5, 3], &[1, 3, 5, 3, 1]], 48, 2)
    }

    /// Stucki: like Jarvis, Judice, and Ninke with weights that are powers of two.
    #[must_use]
    pub fn stucki() -> Self {
        Self::preset(&[&[0, 0, 0, 8, 4], &[2, 4, 8, 4, 2], &[1, 2, 4, 2, 1]], 42, 2)
    }

    /// Burkes: the first two rows of Stucki.
    #[must_use]
    pub fn burkes() -> Self {
        Self::preset(&[&[0, 0, 0, 8, 4], &[2, 4, 8, 4, 2]], 32, 2)
    }

    /// Sierra with three rows.
    #[must_use]
    pub fn sierra3() -> Self {
        Self::preset(&[&[0, 0, 0, 5, 3], &[2, 4, 5, 4, 2], &[0, 2, 3, 2, 0]], 32, 2)
    }

    /// Sierra with two rows.
    #[must_use]
    pub fn sierra2() -> Self {
        Self::preset(&[&[0, 0, 0, 4, 3], &[1, 2, 3, 2, 1]], 16, 2)
    }

    /// Sierra Lite: 3 neighbors, quarters.
    #[must_use]
    pub fn sierra_lite() -> Self {
        Self::preset(&[&[0, 0, 2], &[1, 1, 0]], 4, 1)
    }

    /// Atkinson: only three quarters of the error are distributed.
    #[must_use]
    pub fn atkinson() -> Self {
        Self::preset(&[&[0, 0, 1, 1], &[1, 1, 1, 0], &[0, 1, 0, 0]], 8, 1)
    }

    /// Sets whether odd rows are processed from right to left.
    #[must_use]
    pub fn serpentine(mut self, serpentine: bool) -> Self {
        self.serpentine = serpentine;
        self
    }

    /// Sets whether only the brightness error is distributed, equally to every channel.
    #[must_use]
    pub fn by_brightness(mut self, by_brightness: bool) -> Self {
        self.by_brightness = by_brightness;
        self
    }
}

impl Ditherer for ErrorDiffusionDitherer {
    type Session<'a> = ErrorDiffusionSession<'a>;

    fn initialize<'a>(
        &'a self,
        source: &'a BitmapData,
        quantizer: &'a dyn QuantizingSession,
        stop: &dyn Stop,
    ) -> Result<Self::Session<'a>, StopReason> {
        stop.check()?;
        let kernel = &*self.kernel;
        let row_len = source.width() as usize + 2 * kernel.pad;
        log::debug!(
            "error diffusion of {}x{} source ({} taps, serpentine: {})",
            source.width(),
            source.height(),
            kernel.taps.len(),
            self.serpentine,
        );
        Ok(ErrorDiffusionSession {
            quantizer,
            kernel,
            serpentine: self.serpentine,
            by_brightness: self.by_brightness || quantizer.is_grayscale(),
            linear: quantizer.working_color_space().is_linear(),
            errors: vec![vec![[0.0; 3]; row_len]; kernel.rows],
            row: None,
        })
    }
}

/// The session of an [`ErrorDiffusionDitherer`].
///
/// Rows must be requested from top to bottom. Within a row, pixels must be requested from left
/// to right, except on odd rows of a serpentine session, which go from right to left.
/// [`DitheringSession::dither_row`] visits every row in the right direction.
#[derive(Clone)]
pub struct ErrorDiffusionSession<'a> {
    quantizer: &'a dyn QuantizingSession,
    kernel: &'a Kernel,
    serpentine: bool,
    by_brightness: bool,
    linear: bool,
    /// Accumulated errors of the current and following rows, indexed by `y % rows`.
    errors: Vec<Vec<[f32; 3]>>,
    /// The row being processed.
    row: Option<u32>,
}

impl ErrorDiffusionSession<'_> {
    /// Switch to row `y`, clearing the error rows that were left behind.
    fn enter_row(&mut self, y: u32) {
        let rows = self.kernel.rows;
        let passed = match self.row {
            Some(row) if row < y => (y - row) as usize,
            Some(_) => rows,
            None => 0,
        };
        for step in 0..passed.min(rows) {
            // rows before `y` become rows at the end of the window
            let old = (y as usize + rows - 1 - step) % rows;
            self.errors[old].fill([0.0; 3]);
        }
        self.row = Some(y);
    }

    /// The horizontal direction of row `y`.
    #[inline]
    fn direction(&self, y: u32) -> i32 {
        if self.serpentine && y % 2 == 1 { -1 } else { 1 }
    }

    /// Quantize the pixel at `(x, y)` and spread its error in direction `dir`.
    fn dither(&mut self, x: u32, y: u32, color: Color32, dir: i32) -> Color32 {
        let rows = self.kernel.rows;
        let pad = self.kernel.pad;
        let current = y as usize % rows;
        let index = x as usize + pad;

        if skips_dithering(color, self.quantizer) {
            return self.quantizer.get_quantized_color(color);
        }

        let error = self.errors[current][index];
        let mut values = channels(color, self.linear);
        for (v, e) in values.iter_mut().zip(error) {
            *v = (*v + e).clamp(0.0, 255.0);
        }
        let adjusted = from_channels(values, color.a, self.linear);
        let quantized = self.quantizer.get_quantized_color(adjusted);
        if quantized.a == 0 {
            return quantized;
        }

        let target = channels(quantized, self.linear);
        let mut diff: [f32; 3] = core::array::from_fn(|i| values[i] - target[i]);
        if self.by_brightness {
            let brightness = 0.299 * diff[0] + 0.587 * diff[1] + 0.114 * diff[2];
            diff = [brightness; 3];
        }

        for &(dx, dy, weight) in &self.kernel.taps {
            #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
            let column = (index as i32 + dx * dir) as usize;
            let row = &mut self.errors[(current + dy) % rows];
            if let Some(slot) = row.get_mut(column) {
                for (s, d) in slot.iter_mut().zip(diff) {
                    *s += d * weight;
                }
            }
        }
        quantized
    }
}

impl DitheringSession for ErrorDiffusionSession<'_> {
    fn is_sequential(&self) -> bool {
        true
    }

    fn get_dithered_color(&mut self, x: u32, y: u32, color: Color32) -> Color32 {
        if self.row != Some(y) {
            self.enter_row(y);
        }
        let dir = self.direction(y);
        self.dither(x, y, color, dir)
    }

    fn dither_row(&mut self, y: u32, colors: &mut [Color32]) {
        if self.row != Some(y) {
            self.enter_row(y);
        }
        let dir = self.direction(y);
        let width = colors.len();
        for i in 0..width {
            let index = if dir < 0 { width - 1 - i } else { i };
            #[allow(clippy::cast_possible_truncation)]
            let x = index as u32;
            colors[index] = self.dither(x, y, colors[index], dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KnownPixelFormat, Palette, Quantizer, quantize::PredefinedColorsQuantizer};
    use enough::Unstoppable;

    fn total_error(session: &ErrorDiffusionSession<'_>) -> f32 {
        session.errors.iter().flatten().map(|e| e[0]).sum()
    }

    #[test]
    fn kernels_distribute_everything_but_atkinson() {
        for (ditherer, total) in [
            (ErrorDiffusionDitherer::floyd_steinberg(), 1.0),
            (ErrorDiffusionDitherer::jarvis_judice_ninke(), 1.0),
            (ErrorDiffusionDitherer::stucki(), 1.0),
            (ErrorDiffusionDitherer::burkes(), 1.0),
            (ErrorDiffusionDitherer::sierra3(), 1.0),
            (ErrorDiffusionDitherer::sierra2(), 1.0),
            (ErrorDiffusionDitherer::sierra_lite(), 1.0),
            (ErrorDiffusionDitherer::atkinson(), 0.75),
        ] {
            let sum: f32 = ditherer.kernel.taps.iter().map(|&(_, _, w)| w).sum();
            assert!((sum - total).abs() < 1e-6, "{ditherer:?}");
        }
    }

    #[test]
    fn floyd_steinberg_conserves_error() {
        let source = BitmapData::new(8, 4, KnownPixelFormat::Format24bppRgb).unwrap();
        let quantizer = PredefinedColorsQuantizer::from_palette(Palette::black_and_white())
            .initialize(&source, &Unstoppable)
            .unwrap();
        let ditherer = ErrorDiffusionDitherer::floyd_steinberg();
        let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();

        let result = session.get_dithered_color(3, 0, Color32::from_rgb(100, 100, 100));
        assert_eq!(result, Color32::BLACK);
        assert!((total_error(&session) - 100.0).abs() < 1e-3);
        assert!((session.errors[0][3 + 1 + 1][0] - 100.0 * 7.0 / 16.0).abs() < 1e-4);
        assert!((session.errors[1][3 + 1 - 1][0] - 100.0 * 3.0 / 16.0).abs() < 1e-4);
    }

    #[test]
    fn mirrored_on_serpentine_rows() {
        let source = BitmapData::new(8, 4, KnownPixelFormat::Format24bppRgb).unwrap();
        let quantizer = PredefinedColorsQuantizer::from_palette(Palette::black_and_white())
            .initialize(&source, &Unstoppable)
            .unwrap();
        let ditherer = ErrorDiffusionDitherer::floyd_steinberg().serpentine(true);
        let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        session.row = Some(1);
        let pad = session.kernel.pad;
        let _ = session.dither(4, 1, Color32::from_rgb(100, 100, 100), -1);
        assert!((session.errors[1][4 + pad - 1][0] - 100.0 * 7.0 / 16.0).abs() < 1e-4);
        assert!((session.errors[0][4 + pad + 1][0] - 100.0 * 3.0 / 16.0).abs() < 1e-4);
    }

    #[test]
    fn serpentine_rows_dither_the_given_colors() {
        let source = BitmapData::new(4, 2, KnownPixelFormat::Format24bppRgb).unwrap();
        let quantizer = PredefinedColorsQuantizer::from_palette(Palette::black_and_white())
            .initialize(&source, &Unstoppable)
            .unwrap();
        let ditherer = ErrorDiffusionDitherer::floyd_steinberg().serpentine(true);

        let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        for x in 0..4 {
            assert_eq!(session.get_dithered_color(x, 0, Color32::WHITE), Color32::WHITE);
        }
        for x in (0..4).rev() {
            assert_eq!(session.get_dithered_color(x, 1, Color32::WHITE), Color32::WHITE);
        }

        let gray = Color32::from_rgb(100, 100, 100);
        let mut by_pixel = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        let mut expected = Vec::new();
        for y in 0..2 {
            let mut row = [Color32::BLACK; 4];
            if y % 2 == 0 {
                for x in 0..4 {
                    row[x as usize] = by_pixel.get_dithered_color(x, y, gray);
                }
            } else {
                for x in (0..4).rev() {
                    row[x as usize] = by_pixel.get_dithered_color(x, y, gray);
                }
            }
            expected.push(row);
        }

        let mut by_row = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        for (y, expected) in (0..2).zip(expected) {
            let mut row = [gray; 4];
            by_row.dither_row(y, &mut row);
            assert_eq!(row, expected, "row {y}");
        }
    }

    #[test]
    fn invalid_kernels() {
        assert!(ErrorDiffusionDitherer::from_matrix(&[], 1, 0).is_none());
        assert!(ErrorDiffusionDitherer::from_matrix(&[&[0, 1]], 0, 0).is_none());
        assert!(ErrorDiffusionDitherer::from_matrix(&[&[0, 1]], 1, 2).is_none());
        assert!(ErrorDiffusionDitherer::from_matrix(&[&[0, 1], &[1]], 1, 0).is_none());
        let custom = ErrorDiffusionDitherer::from_matrix(&[&[0, 1], &[1, 0]], 2, 0).unwrap();
        assert_eq!(custom.kernel.taps, [(1, 0, 0.5), (0, 1, 0.5)]);
    }

    #[test]
    fn transparent_pixels_do_not_spread_error() {
        let source = BitmapData::new(4, 2, KnownPixelFormat::Format32bppArgb).unwrap();
        let quantizer = PredefinedColorsQuantizer::from_palette(Palette::system_default_8bpp())
            .initialize(&source, &Unstoppable)
            .unwrap();
        let ditherer = ErrorDiffusionDitherer::atkinson();
        let mut session = ditherer.initialize(&source, &quantizer, &Unstoppable).unwrap();
        let color = session.get_dithered_color(0, 0, Color32::new(5, 10, 20, 30));
        assert_eq!(color, Color32::TRANSPARENT);
        assert_eq!(total_error(&session), 0.0);
    }
}
