//! Predefined palettes.

use super::Palette;
use crate::{Color32, WorkingColorSpace};
use alloc::vec::Vec;

/// The 16 colors of the standard VGA palette.
const SYSTEM_16: [u32; 16] = [
    0xFF00_0000,
    0xFF80_0000,
    0xFF00_8000,
    0xFF80_8000,
    0xFF00_0080,
    0xFF80_0080,
    0xFF00_8080,
    0xFF80_8080,
    0xFFC0_C0C0,
    0xFFFF_0000,
    0xFF00_FF00,
    0xFFFF_FF00,
    0xFF00_00FF,
    0xFFFF_00FF,
    0xFF00_FFFF,
    0xFFFF_FFFF,
];

#[allow(clippy::cast_possible_truncation)]
#[inline]
fn level(i: u32, levels: u32) -> u8 {
    ((i * 255 + (levels - 1) / 2) / (levels - 1)) as u8
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
fn nearest_level(v: u8, levels: u32) -> u32 {
    (u32::from(v) * (levels - 1) + 127) / 255
}

impl Palette {
    fn predefined(entries: Vec<Color32>) -> Self {
        #[allow(clippy::expect_used)]
        Self::new(entries, WorkingColorSpace::Srgb, Color32::BLACK, 128)
            .expect("predefined palettes have a valid length")
    }

    /// Black and white.
    #[must_use]
    pub fn black_and_white() -> Self {
        Self::predefined(alloc::vec![Color32::BLACK, Color32::WHITE])
    }

    fn grayscale(levels: u32) -> Self {
        let entries = (0..levels)
            .map(|i| {
                let v = level(i, levels);
                Color32::from_rgb(v, v, v)
            })
            .collect();
        Self::predefined(entries).with_lookup(move |c| nearest_level(c.brightness(), levels))
    }

    /// 4 evenly spaced shades of gray.
    #[must_use]
    pub fn grayscale4() -> Self {
        Self::grayscale(4)
    }

    /// 16 evenly spaced shades of gray.
    #[must_use]
    pub fn grayscale16() -> Self {
        Self::grayscale(16)
    }

    /// All 256 shades of gray.
    #[must_use]
    pub fn grayscale256() -> Self {
        Self::grayscale(256)
    }

    /// The 16 colors of the standard VGA palette.
    #[must_use]
    pub fn system_default_4bpp() -> Self {
        Self::predefined(SYSTEM_16.iter().map(|&c| Color32::from_argb_u32(c)).collect())
    }

    /// The 16 VGA colors, the 216 color web safe cube, 23 shades of gray, and a transparent entry.
    #[must_use]
    pub fn system_default_8bpp() -> Self {
        let mut entries: Vec<_> = SYSTEM_16.iter().map(|&c| Color32::from_argb_u32(c)).collect();
        for r in 0..6 {
            for g in 0..6 {
                for b in 0..6 {
                    entries.push(Color32::from_rgb(r * 51, g * 51, b * 51));
                }
            }
        }
        entries.extend((1..24).map(|i| {
            let v = level(i, 25);
            Color32::from_rgb(v, v, v)
        }));
        entries.push(Color32::TRANSPARENT);
        Self::predefined(entries)
    }

    /// 3 bits of red and green and 2 bits of blue with a direct lookup.
    #[must_use]
    pub fn rgb332() -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let entries = (0..256u32)
            .map(|i| Color32::from_rgb(level(i >> 5, 8), level((i >> 2) & 7, 8), level(i & 3, 4)))
            .collect();
        Self::predefined(entries).with_lookup(|c| {
            nearest_level(c.r, 8) << 5 | nearest_level(c.g, 8) << 2 | nearest_level(c.b, 4)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(Palette::black_and_white().len(), 2);
        assert_eq!(Palette::grayscale4().len(), 4);
        assert_eq!(Palette::grayscale16().len(), 16);
        assert_eq!(Palette::grayscale256().len(), 256);
        assert_eq!(Palette::system_default_4bpp().len(), 16);
        assert_eq!(Palette::system_default_8bpp().len(), 256);
        assert_eq!(Palette::rgb332().len(), 256);
    }

    #[test]
    fn system_8bpp_has_transparent_last() {
        let palette = Palette::system_default_8bpp();
        assert_eq!(palette.transparent_index(), Some(255));
        assert!(!palette.has_alpha());
    }

    #[test]
    fn analytic_lookups_match_the_search() {
        let rgb332 = Palette::rgb332();
        let search = Palette::from_colors(rgb332.entries().to_vec())
            .unwrap()
            .with_working_color_space(WorkingColorSpace::Srgb);
        for c in crate::tests::test_colors(300) {
            let a = rgb332.nearest_color(c);
            let b = search.nearest_color(c);
            let dist = |x: Color32| {
                let d = |p: u8, q: u8| (i32::from(p) - i32::from(q)).pow(2);
                d(x.r, c.r) + d(x.g, c.g) + d(x.b, c.b)
            };
            assert_eq!(dist(a), dist(b));
        }

        let gray = Palette::grayscale16();
        for v in 0..=u8::MAX {
            let c = Color32::from_rgb(v, v, v);
            let found = gray.nearest_color(c);
            assert!(found.r.abs_diff(v) <= 9, "{v} -> {found:?}");
        }
    }
}
