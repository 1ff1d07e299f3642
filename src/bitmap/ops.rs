//! Whole bitmap operations: quantizing, dithering, copying, and clearing.

use super::{BitmapData, PixelLayout, Rect, codec};
use crate::{
    BitmapError, Color32, Color64, ColorF, ColorType, Ditherer, DitheringSession, KnownPixelFormat,
    PColor32, PColor64, PColorF, PixelColor, Quantizer, QuantizingSession,
};
use alloc::vec::Vec;
use enough::{Stop, StopReason, Unstoppable};
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// Run `f` on every row index below `height`, checking `stop` before each row.
///
/// Rows are processed in parallel if `parallel` is set and the `threads` feature is enabled,
/// with every worker getting its own clone of `state`. Otherwise rows are processed in order
/// with a single `state`.
fn for_each_row<S, F>(height: u32, parallel: bool, stop: &dyn Stop, mut state: S, f: F) -> bool
where
    S: Clone + Send,
    F: Fn(&mut S, u32) + Sync + Send,
{
    let run = |state: &mut S, y: u32| -> Result<(), StopReason> {
        stop.check()?;
        f(state, y);
        Ok(())
    };

    #[cfg(feature = "threads")]
    let result = if parallel {
        (0..height).into_par_iter().try_for_each_with(state, run)
    } else {
        (0..height).try_for_each(|y| run(&mut state, y))
    };
    #[cfg(not(feature = "threads"))]
    let result = {
        let _ = parallel;
        (0..height).try_for_each(|y| run(&mut state, y))
    };

    match result {
        Ok(()) => true,
        Err(reason) => {
            log::debug!("row processing stopped: {reason:?}");
            false
        }
    }
}

impl BitmapData {
    /// Quantize every pixel of this bitmap in place.
    ///
    /// Returns `false` if `stop` cancelled the operation. Rows that were already processed keep
    /// their quantized colors.
    pub fn quantize<Q: Quantizer>(&self, quantizer: &Q, stop: &dyn Stop) -> bool {
        match quantizer.initialize(self, stop) {
            Ok(session) => self.quantize_into(self, &session, stop),
            Err(reason) => {
                log::debug!("quantizer initialization stopped: {reason:?}");
                false
            }
        }
    }

    /// Quantize and dither every pixel of this bitmap in place.
    ///
    /// Returns `false` if `stop` cancelled the operation. Rows that were already processed keep
    /// their dithered colors.
    pub fn dither<Q: Quantizer, D: Ditherer>(
        &self,
        quantizer: &Q,
        ditherer: &D,
        stop: &dyn Stop,
    ) -> bool {
        match quantizer.initialize(self, stop) {
            Ok(session) => self.dither_into(self, &session, ditherer, stop),
            Err(reason) => {
                log::debug!("quantizer initialization stopped: {reason:?}");
                false
            }
        }
    }

    /// A new bitmap of `format` holding the quantized colors of this bitmap.
    ///
    /// Indexed targets get the palette of the quantizing session, or the default palette of the
    /// format if the session has none. The target takes the back color, alpha threshold, and
    /// working color space of the session.
    ///
    /// Returns `Ok(None)` if `stop` cancelled the operation.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::OversizedPalette`] if the session palette has more entries than an
    /// indexed `format` can address.
    pub fn clone_quantized<Q: Quantizer>(
        &self,
        format: KnownPixelFormat,
        quantizer: &Q,
        stop: &dyn Stop,
    ) -> Result<Option<Self>, BitmapError> {
        let Ok(session) = quantizer.initialize(self, stop) else {
            return Ok(None);
        };
        let target = self.quantized_target(format, &session)?;
        Ok(self.quantize_into(&target, &session, stop).then_some(target))
    }

    /// A new bitmap of `format` holding the quantized and dithered colors of this bitmap.
    ///
    /// The target is created like in [`BitmapData::clone_quantized`].
    ///
    /// Returns `Ok(None)` if `stop` cancelled the operation.
    ///
    /// # Errors
    ///
    /// Returns [`BitmapError::OversizedPalette`] if the session palette has more entries than an
    /// indexed `format` can address.
    pub fn clone_dithered<Q: Quantizer, D: Ditherer>(
        &self,
        format: KnownPixelFormat,
        quantizer: &Q,
        ditherer: &D,
        stop: &dyn Stop,
    ) -> Result<Option<Self>, BitmapError> {
        let Ok(session) = quantizer.initialize(self, stop) else {
            return Ok(None);
        };
        let target = self.quantized_target(format, &session)?;
        Ok(self.dither_into(&target, &session, ditherer, stop).then_some(target))
    }

    fn quantized_target(
        &self,
        format: KnownPixelFormat,
        session: &dyn QuantizingSession,
    ) -> Result<Self, BitmapError> {
        let target = Self::new(self.width, self.height, format)?
            .with_back_color(session.back_color())
            .with_alpha_threshold(session.alpha_threshold())
            .with_working_color_space(session.working_color_space());
        match session.palette() {
            Some(palette) if format.info().is_indexed() => target.with_palette(palette.clone()),
            _ => Ok(target),
        }
    }

    fn quantize_into(
        &self,
        target: &Self,
        session: &dyn QuantizingSession,
        stop: &dyn Stop,
    ) -> bool {
        log::debug!("quantizing {}x{} pixels", self.width, self.height);
        for_each_row(self.height, true, stop, (), |(), y| {
            let (source, target) = (self.row(y), target.row(y));
            for x in 0..self.width {
                target.set_color32(x, session.get_quantized_color(source.get_color32(x)));
            }
        })
    }

    fn dither_into<D: Ditherer>(
        &self,
        target: &Self,
        session: &dyn QuantizingSession,
        ditherer: &D,
        stop: &dyn Stop,
    ) -> bool {
        let dithering = match ditherer.initialize(self, session, stop) {
            Ok(dithering) => dithering,
            Err(reason) => {
                log::debug!("ditherer initialization stopped: {reason:?}");
                return false;
            }
        };
        let parallel = !dithering.is_sequential();
        log::debug!("dithering {}x{} pixels (parallel: {parallel})", self.width, self.height);
        let state = (dithering, Vec::with_capacity(self.width as usize));
        for_each_row(self.height, parallel, stop, state, |(dithering, colors), y| {
            let (source, target) = (self.row(y), target.row(y));
            colors.clear();
            colors.extend((0..self.width).map(|x| source.get_color32(x)));
            dithering.dither_row(y, colors);
            for (x, &color) in (0..).zip(colors.iter()) {
                target.set_color32(x, color);
            }
        })
    }

    /// Copy this bitmap into `target` with its top left corner at `(x, y)`. Pixels outside the
    /// target are skipped.
    ///
    /// Pixels are converted through the preferred color type of the target. Between equal known
    /// formats, and equal palettes for indexed formats, the raw pixel bits are copied.
    ///
    /// Returns `false` if `stop` cancelled the operation.
    pub fn copy_to(&self, target: &Self, x: u32, y: u32, stop: &dyn Stop) -> bool {
        let Some(target) = target.clip(Rect::new(x, y, self.width, self.height)) else {
            return true;
        };
        let (width, height) = (target.width, target.height);

        if let (PixelLayout::Known(a), PixelLayout::Known(b)) = (&self.layout, &target.layout) {
            let same_colors = match (self.palette(), target.palette()) {
                (Some(a), Some(b)) => a.entries() == b.entries(),
                (None, None) => true,
                _ => false,
            };
            if a == b && same_colors {
                let bpp = self.info.bits_per_pixel();
                return for_each_row(height, true, stop, (), |(), y| {
                    let (source, dest) = (self.backing_row(y), target.backing_row(y));
                    for x in 0..width {
                        let raw = codec::read_raw(source, (self.left + x) as usize, bpp);
                        codec::write_raw(dest, (target.left + x) as usize, bpp, raw);
                    }
                });
            }
        }

        fn copy<C: PixelColor>(source: &BitmapData, target: &BitmapData, stop: &dyn Stop) -> bool {
            for_each_row(target.height, true, stop, (), |(), y| {
                let (from, to) = (source.row(y), target.row(y));
                for x in 0..target.width {
                    to.set_color(x, from.get_color::<C>(x));
                }
            })
        }

        match target.info.preferred_color_type() {
            ColorType::Color32 => copy::<Color32>(self, &target, stop),
            ColorType::PColor32 => copy::<PColor32>(self, &target, stop),
            ColorType::Color64 => copy::<Color64>(self, &target, stop),
            ColorType::PColor64 => copy::<PColor64>(self, &target, stop),
            ColorType::ColorF => copy::<ColorF>(self, &target, stop),
            ColorType::PColorF => copy::<PColorF>(self, &target, stop),
        }
    }

    /// A copy of this bitmap in `format`.
    ///
    /// The copy keeps the back color, alpha threshold, and working color space. An indexed copy
    /// keeps the palette of this bitmap if it fits, and gets the default palette of `format`
    /// otherwise.
    ///
    /// Returns `Ok(None)` if `stop` cancelled the operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the target bitmap cannot be allocated.
    pub fn clone_with(
        &self,
        format: KnownPixelFormat,
        stop: &dyn Stop,
    ) -> Result<Option<Self>, BitmapError> {
        let mut target = Self::new(self.width, self.height, format)?
            .with_back_color(self.back_color)
            .with_alpha_threshold(self.alpha_threshold)
            .with_working_color_space(self.working_color_space);
        if let Some(palette) = self.palette().filter(|_| target.info.is_indexed()) {
            let _ = target.try_set_palette(palette.clone());
        }
        Ok(self.copy_to(&target, 0, 0, stop).then_some(target))
    }

    /// Set every pixel to `color`.
    pub fn clear<C: PixelColor>(&self, color: C) {
        match &self.layout {
            PixelLayout::Known(format) => {
                let raw = codec::encode(*format, color, &self.encode_context());
                let bpp = self.info.bits_per_pixel();
                for_each_row(self.height, true, &Unstoppable, (), |(), y| {
                    let row = self.backing_row(y);
                    for x in self.left..self.left + self.width {
                        codec::write_raw(row, x as usize, bpp, raw);
                    }
                });
            }
            PixelLayout::Custom(_) => {
                for_each_row(self.height, true, &Unstoppable, (), |(), y| {
                    let row = self.row(y);
                    for x in 0..self.width {
                        row.set_color(x, color);
                    }
                });
            }
        }
    }
}
