//! Palettes and nearest color lookup.

mod nearest;
mod predefined;

use crate::{Color32, LengthOutOfRange, PaletteSize, WorkingColorSpace};
use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::{fmt, ops::Index};
use nearest::NearestColors;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The maximum number of memoized lookups per palette.
const CACHE_LIMIT: usize = 1 << 16;

/// A caller supplied palette lookup returning an entry index.
///
/// The lookup receives colors that are already blended with the back color if the palette has
/// no alpha. Returned indices past the end of the palette are clamped to the last entry.
pub type PaletteLookup = dyn Fn(Color32) -> u32 + Send + Sync;

/// An ordered set of colors with a nearest color lookup.
///
/// A palette holds between 1 and 65536 entries, see [`PaletteSize`]. Colors with alpha below the
/// alpha threshold map to the first fully transparent entry, if there is one. Other colors map to
/// the entry with the smallest channel weighted squared distance in the working color space, or
/// to whatever a custom lookup set with [`Palette::with_lookup`] returns.
///
/// Lookups are memoized per distinct color, so repeatedly mapping the same colors is cheap. The
/// memo is shared between threads.
pub struct Palette {
    /// The palette entries.
    entries: Box<[Color32]>,
    /// Space of distance computations and blending.
    working_color_space: WorkingColorSpace,
    /// Opaque color to blend partially transparent inputs with.
    back_color: Color32,
    /// Inputs with alpha below this are transparent.
    alpha_threshold: u8,
    /// Channel weights of the distance function.
    weights: [f32; 3],
    /// The first fully transparent entry.
    transparent_index: Option<u32>,
    /// Whether any entry other than the transparent one has alpha.
    has_alpha: bool,
    /// Whether every opaque entry is gray.
    grayscale: bool,
    nearest: Arc<NearestColors>,
    custom: Option<Arc<PaletteLookup>>,
    cache: RwLock<HashMap<Color32, u32>>,
}

impl Palette {
    /// The maximum number of entries, which is 65536.
    pub const MAX_LEN: usize = PaletteSize::MAX.as_usize();

    /// Create a palette.
    ///
    /// # Errors
    ///
    /// Returns an error if `entries` is empty or longer than [`Palette::MAX_LEN`].
    pub fn new(
        entries: impl Into<Vec<Color32>>,
        working_color_space: WorkingColorSpace,
        back_color: Color32,
        alpha_threshold: u8,
    ) -> Result<Self, LengthOutOfRange> {
        let entries = entries.into();
        LengthOutOfRange::check_u32(&entries, 1, PaletteSize::MAX.as_u32())?;
        Ok(Self::build(
            entries.into_boxed_slice(),
            working_color_space,
            back_color,
            alpha_threshold,
            [1.0; 3],
            None,
        ))
    }

    /// Create a palette with a black back color, an alpha threshold of 128, and the default
    /// working color space.
    ///
    /// # Errors
    ///
    /// Returns an error if `entries` is empty or longer than [`Palette::MAX_LEN`].
    pub fn from_colors(entries: impl Into<Vec<Color32>>) -> Result<Self, LengthOutOfRange> {
        Self::new(entries, WorkingColorSpace::Default, Color32::BLACK, 128)
    }

    fn build(
        entries: Box<[Color32]>,
        working_color_space: WorkingColorSpace,
        back_color: Color32,
        alpha_threshold: u8,
        weights: [f32; 3],
        custom: Option<Arc<PaletteLookup>>,
    ) -> Self {
        let transparent = entries.iter().position(|c| c.a == 0);
        let opaque = || entries.iter().enumerate().filter(move |&(i, _)| Some(i) != transparent);
        let has_alpha = opaque().any(|(_, c)| c.a < 255);
        let grayscale = opaque().count() > 0 && opaque().all(|(_, c)| c.is_gray());

        #[allow(clippy::cast_possible_truncation)]
        let transparent_index = transparent.map(|i| i as u32);

        let nearest = NearestColors::new(
            &entries,
            transparent_index,
            weights,
            has_alpha,
            working_color_space.is_linear(),
            grayscale,
        );

        log::debug!(
            "built palette of {} entries (transparent index {transparent_index:?}, alpha {has_alpha}, grayscale {grayscale})",
            entries.len(),
        );

        Self {
            entries,
            working_color_space,
            back_color: back_color.opaque(),
            alpha_threshold,
            weights,
            transparent_index,
            has_alpha,
            grayscale,
            nearest: Arc::new(nearest),
            custom,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn rebuild(self) -> Self {
        Self::build(
            self.entries,
            self.working_color_space,
            self.back_color,
            self.alpha_threshold,
            self.weights,
            self.custom,
        )
    }

    /// Sets the working color space of distance computations and blending.
    #[must_use]
    pub fn with_working_color_space(mut self, space: WorkingColorSpace) -> Self {
        self.working_color_space = space;
        self.rebuild()
    }

    /// Sets the back color partially transparent inputs are blended with.
    #[must_use]
    pub fn with_back_color(mut self, back_color: Color32) -> Self {
        self.back_color = back_color.opaque();
        self.cache.get_mut().clear();
        self
    }

    /// Sets the alpha threshold below which inputs map to the transparent entry.
    #[must_use]
    pub fn with_alpha_threshold(mut self, alpha_threshold: u8) -> Self {
        self.alpha_threshold = alpha_threshold;
        self.cache.get_mut().clear();
        self
    }

    /// Sets the red, green, and blue weights of the distance function.
    #[must_use]
    pub fn with_channel_weights(mut self, weights: [f32; 3]) -> Self {
        self.weights = weights;
        self.rebuild()
    }

    /// Replace the nearest color search with a custom lookup.
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl Fn(Color32) -> u32 + Send + Sync + 'static) -> Self {
        self.custom = Some(Arc::new(lookup));
        self.cache.get_mut().clear();
        self
    }

    /// The number of entries.
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The entries of the palette.
    #[must_use]
    #[inline]
    pub fn entries(&self) -> &[Color32] {
        &self.entries
    }

    /// The entry at `index`, if any.
    #[must_use]
    #[inline]
    pub fn get(&self, index: usize) -> Option<Color32> {
        self.entries.get(index).copied()
    }

    /// The working color space of distance computations and blending.
    #[must_use]
    #[inline]
    pub fn working_color_space(&self) -> WorkingColorSpace {
        self.working_color_space
    }

    /// The opaque back color partially transparent inputs are blended with.
    #[must_use]
    #[inline]
    pub fn back_color(&self) -> Color32 {
        self.back_color
    }

    /// The alpha threshold below which inputs map to the transparent entry.
    #[must_use]
    #[inline]
    pub fn alpha_threshold(&self) -> u8 {
        self.alpha_threshold
    }

    /// The index of the first fully transparent entry.
    #[must_use]
    #[inline]
    pub fn transparent_index(&self) -> Option<u32> {
        self.transparent_index
    }

    /// Whether any entry other than the transparent entry is partially transparent.
    #[must_use]
    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Whether every opaque entry is gray.
    #[must_use]
    #[inline]
    pub fn is_grayscale(&self) -> bool {
        self.grayscale
    }

    /// Whether a custom lookup replaced the nearest color search.
    #[must_use]
    #[inline]
    pub fn has_custom_lookup(&self) -> bool {
        self.custom.is_some()
    }

    /// The index of the entry `color` maps to.
    #[must_use]
    pub fn nearest_index(&self, color: Color32) -> u32 {
        if color.a < self.alpha_threshold {
            if let Some(index) = self.transparent_index {
                return index;
            }
        }

        let color = if color.a < 255 && !self.has_alpha {
            color.blend_with_background(self.back_color, self.working_color_space)
        } else {
            color
        };

        if let Some(&index) = self.cache.read().get(&color) {
            return index;
        }

        #[allow(clippy::cast_possible_truncation)]
        let last = self.entries.len() as u32 - 1;
        let index = match &self.custom {
            Some(lookup) => lookup(color).min(last),
            None => self.nearest.nearest(color),
        };

        let mut cache = self.cache.write();
        if cache.len() < CACHE_LIMIT {
            cache.insert(color, index);
        }
        index
    }

    /// The entry `color` maps to.
    #[must_use]
    #[inline]
    pub fn nearest_color(&self, color: Color32) -> Color32 {
        self.entries[self.nearest_index(color) as usize]
    }
}

impl Clone for Palette {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            working_color_space: self.working_color_space,
            back_color: self.back_color,
            alpha_threshold: self.alpha_threshold,
            weights: self.weights,
            transparent_index: self.transparent_index,
            has_alpha: self.has_alpha,
            grayscale: self.grayscale,
            nearest: Arc::clone(&self.nearest),
            custom: self.custom.clone(),
            cache: RwLock::new(HashMap::new()),
        }
    }
}

impl fmt::Debug for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Palette")
            .field("entries", &self.entries)
            .field("working_color_space", &self.working_color_space)
            .field("back_color", &self.back_color)
            .field("alpha_threshold", &self.alpha_threshold)
            .field("transparent_index", &self.transparent_index)
            .field("custom_lookup", &self.custom.is_some())
            .finish_non_exhaustive()
    }
}

impl PartialEq for Palette {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
            && self.working_color_space == other.working_color_space
            && self.back_color == other.back_color
            && self.alpha_threshold == other.alpha_threshold
    }
}

impl Index<usize> for Palette {
    type Output = Color32;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}
