//! Encoding and decoding of the known pixel formats.

use super::RawRow;
use crate::{
    Color32, Color64, ColorF, KnownPixelFormat, PColor32, PColor64, PColorF, Palette, PixelColor,
    WorkingColorSpace, linear_to_srgb8, linear_to_srgb16,
};

/// A decoded pixel in the precision its format stores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Native {
    Color32(Color32),
    PColor32(PColor32),
    Color64(Color64),
    PColor64(PColor64),
    ColorF(ColorF),
    PColorF(PColorF),
}

impl Native {
    #[inline]
    pub(crate) fn into_color<C: PixelColor>(self) -> C {
        match self {
            Self::Color32(c) => c.into(),
            Self::PColor32(c) => c.into(),
            Self::Color64(c) => c.into(),
            Self::PColor64(c) => c.into(),
            Self::ColorF(c) => c.into(),
            Self::PColorF(c) => c.into(),
        }
    }
}

/// The bitmap properties that take part in encoding.
#[derive(Clone, Copy)]
pub(crate) struct EncodeContext<'a> {
    pub back_color: Color32,
    pub alpha_threshold: u8,
    /// Already resolved, never [`WorkingColorSpace::Default`].
    pub color_space: WorkingColorSpace,
    pub palette: Option<&'a Palette>,
}

impl EncodeContext<'_> {
    /// Blend with the back color unless opaque.
    #[inline]
    pub(crate) fn flatten32(&self, c: Color32) -> Color32 {
        if c.a == u8::MAX { c } else { c.blend_with_background(self.back_color, self.color_space) }
    }

    #[inline]
    pub(crate) fn flatten64(&self, c: Color64) -> Color64 {
        if c.a == u16::MAX {
            c
        } else {
            c.blend_with_background(self.back_color.into(), self.color_space)
        }
    }

    #[inline]
    pub(crate) fn flatten_f(&self, c: ColorF) -> ColorF {
        if c.a >= 1.0 {
            ColorF { a: 1.0, ..c }
        } else {
            c.blend_with_background(self.back_color.into(), self.color_space)
        }
    }

    /// Opaque if alpha reaches the threshold, fully transparent otherwise.
    #[inline]
    pub(crate) fn binarize(&self, c: Color32) -> Color32 {
        if c.a < self.alpha_threshold { Color32::TRANSPARENT } else { c.opaque() }
    }

    #[inline]
    pub(crate) fn palette_index(&self, c: Color32) -> u32 {
        self.palette.map_or(0, |palette| palette.nearest_index(c))
    }
}

/// Read the raw bits of pixel `x` of a row laid out with `bits_per_pixel` bits per pixel.
#[inline]
pub(crate) fn read_raw(row: RawRow<'_>, x: usize, bits_per_pixel: u8) -> u128 {
    let bpp = usize::from(bits_per_pixel);
    if bpp % 8 == 0 {
        row.read_le(x * bpp / 8, bpp / 8)
    } else {
        row.read_bits(x * bpp, bpp as u32)
    }
}

/// Write the raw bits of pixel `x` of a row laid out with `bits_per_pixel` bits per pixel.
#[inline]
pub(crate) fn write_raw(row: RawRow<'_>, x: usize, bits_per_pixel: u8, raw: u128) {
    let bpp = usize::from(bits_per_pixel);
    if bpp % 8 == 0 {
        row.write_le(x * bpp / 8, bpp / 8, raw);
    } else {
        row.write_bits(x * bpp, bpp as u32, raw);
    }
}

#[inline]
fn expand5(v: u128) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let v = (v & 0x1F) as u8;
    v << 3 | v >> 2
}

#[inline]
fn expand6(v: u128) -> u8 {
    #[allow(clippy::cast_possible_truncation)]
    let v = (v & 0x3F) as u8;
    v << 2 | v >> 4
}

#[inline]
fn pack555(c: Color32) -> u128 {
    u128::from(c.r >> 3) << 10 | u128::from(c.g >> 3) << 5 | u128::from(c.b >> 3)
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
fn f32_at(raw: u128, shift: u32) -> f32 {
    f32::from_bits((raw >> shift) as u32)
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
fn u16_at(raw: u128, shift: u32) -> u16 {
    (raw >> shift) as u16
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
fn u8_at(raw: u128, shift: u32) -> u8 {
    (raw >> shift) as u8
}

#[inline]
fn pack_f(values: [f32; 4]) -> u128 {
    values
        .iter()
        .enumerate()
        .fold(0, |acc, (i, v)| acc | u128::from(v.to_bits()) << (i * 32))
}

/// Decode raw pixel bits.
pub(crate) fn decode(format: KnownPixelFormat, raw: u128, palette: Option<&Palette>) -> Native {
    use KnownPixelFormat as F;
    match format {
        F::Format1bppIndexed
        | F::Format2bppIndexed
        | F::Format4bppIndexed
        | F::Format8bppIndexed
        | F::Format16bppIndexed => Native::Color32(palette_entry(palette, raw)),
        F::Format8bppGrayScale => {
            let v = u8_at(raw, 0);
            Native::Color32(Color32::from_rgb(v, v, v))
        }
        F::Format16bppGrayScale => {
            let v = u16_at(raw, 0);
            Native::Color64(Color64::new(u16::MAX, v, v, v))
        }
        F::Format32bppGrayScale => {
            let v = f32_at(raw, 0);
            Native::ColorF(ColorF::new(v, v, v, 1.0))
        }
        F::Format16bppRgb555 => {
            Native::Color32(Color32::from_rgb(expand5(raw >> 10), expand5(raw >> 5), expand5(raw)))
        }
        F::Format16bppRgb565 => {
            Native::Color32(Color32::from_rgb(expand5(raw >> 11), expand6(raw >> 5), expand5(raw)))
        }
        F::Format16bppArgb1555 => {
            let a = if raw & 0x8000 == 0 { 0 } else { u8::MAX };
            Native::Color32(Color32::new(a, expand5(raw >> 10), expand5(raw >> 5), expand5(raw)))
        }
        F::Format24bppRgb | F::Format32bppRgb => {
            Native::Color32(Color32::from_rgb(u8_at(raw, 16), u8_at(raw, 8), u8_at(raw, 0)))
        }
        F::Format32bppArgb => Native::Color32(Color32::new(
            u8_at(raw, 24),
            u8_at(raw, 16),
            u8_at(raw, 8),
            u8_at(raw, 0),
        )),
        F::Format32bppPArgb => Native::PColor32(PColor32::new(
            u8_at(raw, 24),
            u8_at(raw, 16),
            u8_at(raw, 8),
            u8_at(raw, 0),
        )),
        F::Format48bppRgb => Native::Color64(Color64::new(
            u16::MAX,
            u16_at(raw, 32),
            u16_at(raw, 16),
            u16_at(raw, 0),
        )),
        F::Format64bppArgb => Native::Color64(Color64::new(
            u16_at(raw, 48),
            u16_at(raw, 32),
            u16_at(raw, 16),
            u16_at(raw, 0),
        )),
        F::Format64bppPArgb => Native::PColor64(PColor64::new(
            u16_at(raw, 48),
            u16_at(raw, 32),
            u16_at(raw, 16),
            u16_at(raw, 0),
        )),
        F::Format96bppRgb => {
            Native::ColorF(ColorF::new(f32_at(raw, 0), f32_at(raw, 32), f32_at(raw, 64), 1.0))
        }
        F::Format128bppRgba => Native::ColorF(ColorF::new(
            f32_at(raw, 0),
            f32_at(raw, 32),
            f32_at(raw, 64),
            f32_at(raw, 96),
        )),
        F::Format128bppPRgba => Native::PColorF(PColorF::new(
            f32_at(raw, 0),
            f32_at(raw, 32),
            f32_at(raw, 64),
            f32_at(raw, 96),
        )),
    }
}

/// The palette entry at `index`, or transparent black if out of range.
#[inline]
pub(crate) fn palette_entry(palette: Option<&Palette>, index: u128) -> Color32 {
    usize::try_from(index)
        .ok()
        .and_then(|i| palette.and_then(|p| p.get(i)))
        .unwrap_or(Color32::TRANSPARENT)
}

/// Encode a color into raw pixel bits.
pub(crate) fn encode<C: PixelColor>(
    format: KnownPixelFormat,
    color: C,
    ctx: &EncodeContext<'_>,
) -> u128 {
    use KnownPixelFormat as F;
    match format {
        F::Format1bppIndexed
        | F::Format2bppIndexed
        | F::Format4bppIndexed
        | F::Format8bppIndexed
        | F::Format16bppIndexed => u128::from(ctx.palette_index(color.into())),
        F::Format8bppGrayScale => {
            let c = ctx.flatten32(color.into());
            let v = if ctx.color_space.is_linear() {
                linear_to_srgb8(ColorF::from(c).luminance())
            } else {
                c.brightness()
            };
            u128::from(v)
        }
        F::Format16bppGrayScale => {
            let c = ctx.flatten64(color.into());
            let v = if ctx.color_space.is_linear() {
                linear_to_srgb16(ColorF::from(c).luminance())
            } else {
                c.brightness()
            };
            u128::from(v)
        }
        F::Format32bppGrayScale => {
            u128::from(ctx.flatten_f(color.into()).luminance().to_bits())
        }
        F::Format16bppRgb555 => pack555(ctx.flatten32(color.into())),
        F::Format16bppRgb565 => {
            let c = ctx.flatten32(color.into());
            u128::from(c.r >> 3) << 11 | u128::from(c.g >> 2) << 5 | u128::from(c.b >> 3)
        }
        F::Format16bppArgb1555 => {
            let c = ctx.binarize(color.into());
            if c.a == 0 { 0 } else { 0x8000 | pack555(c) }
        }
        F::Format24bppRgb => u128::from(ctx.flatten32(color.into()).to_argb_u32() & 0x00FF_FFFF),
        F::Format32bppRgb => u128::from(ctx.flatten32(color.into()).to_argb_u32() | 0xFF00_0000),
        F::Format32bppArgb => u128::from(Into::<Color32>::into(color).to_argb_u32()),
        F::Format32bppPArgb => {
            let c: PColor32 = color.into();
            u128::from(u32::from_le_bytes([c.b, c.g, c.r, c.a]))
        }
        F::Format48bppRgb => {
            let c = ctx.flatten64(color.into());
            u128::from(c.r) << 32 | u128::from(c.g) << 16 | u128::from(c.b)
        }
        F::Format64bppArgb => {
            let c: Color64 = color.into();
            u128::from(c.a) << 48 | u128::from(c.r) << 32 | u128::from(c.g) << 16 | u128::from(c.b)
        }
        F::Format64bppPArgb => {
            let c: PColor64 = color.into();
            u128::from(c.a) << 48 | u128::from(c.r) << 32 | u128::from(c.g) << 16 | u128::from(c.b)
        }
        F::Format96bppRgb => {
            let c = ctx.flatten_f(color.into());
            pack_f([c.r, c.g, c.b, 0.0]) & (u128::MAX >> 32)
        }
        F::Format128bppRgba => {
            let c: ColorF = color.into();
            pack_f([c.r, c.g, c.b, c.a])
        }
        F::Format128bppPRgba => {
            let c: PColorF = color.into();
            pack_f([c.r, c.g, c.b, c.a])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> EncodeContext<'static> {
        EncodeContext {
            back_color: Color32::BLACK,
            alpha_threshold: 128,
            color_space: WorkingColorSpace::Srgb,
            palette: None,
        }
    }

    #[test]
    fn direct_formats_round_trip_representable_colors() {
        let ctx = ctx();
        let c = Color32::from_rgb(0x12, 0x34, 0x56);
        for format in [
            KnownPixelFormat::Format24bppRgb,
            KnownPixelFormat::Format32bppRgb,
            KnownPixelFormat::Format32bppArgb,
            KnownPixelFormat::Format32bppPArgb,
            KnownPixelFormat::Format48bppRgb,
            KnownPixelFormat::Format64bppArgb,
            KnownPixelFormat::Format64bppPArgb,
            KnownPixelFormat::Format96bppRgb,
            KnownPixelFormat::Format128bppRgba,
            KnownPixelFormat::Format128bppPRgba,
        ] {
            let decoded: Color32 = decode(format, encode(format, c, &ctx), None).into_color();
            assert_eq!(decoded, c, "{format:?}");
        }
    }

    #[test]
    fn packed_16_bit_layouts() {
        let ctx = ctx();
        let c = Color32::from_rgb(0xFF, 0x80, 0x08);
        assert_eq!(encode(KnownPixelFormat::Format16bppRgb565, c, &ctx), 0xFC01);
        assert_eq!(encode(KnownPixelFormat::Format16bppRgb555, c, &ctx), 0x7E01);
        let exact = Color32::from_rgb(0xFF, 0x84, 0x08);
        let raw = encode(KnownPixelFormat::Format16bppRgb555, exact, &ctx);
        let decoded: Color32 = decode(KnownPixelFormat::Format16bppRgb555, raw, None).into_color();
        assert_eq!(decoded, exact);
    }

    #[test]
    fn single_bit_alpha_binarizes_without_blending() {
        let ctx = ctx();
        let format = KnownPixelFormat::Format16bppArgb1555;
        assert_eq!(encode(format, Color32::new(127, 255, 255, 255), &ctx), 0);
        let raw = encode(format, Color32::new(128, 255, 0, 0), &ctx);
        let decoded: Color32 = decode(format, raw, None).into_color();
        assert_eq!(decoded, Color32::from_rgb(255, 0, 0));
    }

    #[test]
    fn opaque_formats_blend_with_back_color() {
        let ctx = ctx();
        let half_blue = Color32::new(128, 0, 0, 255);
        assert_eq!(encode(KnownPixelFormat::Format24bppRgb, half_blue, &ctx), 0x80);
        assert_eq!(encode(KnownPixelFormat::Format32bppRgb, half_blue, &ctx), 0xFF00_0080);
    }

    #[test]
    fn grayscale_stores_brightness() {
        let ctx = ctx();
        let red = Color32::from_rgb(255, 0, 0);
        assert_eq!(encode(KnownPixelFormat::Format8bppGrayScale, red, &ctx), 76);
        let gray = Color32::from_rgb(90, 90, 90);
        let raw = encode(KnownPixelFormat::Format16bppGrayScale, gray, &ctx);
        let decoded: Color32 =
            decode(KnownPixelFormat::Format16bppGrayScale, raw, None).into_color();
        assert_eq!(decoded, gray);
    }

    #[test]
    fn float_formats_keep_out_of_range_values() {
        let ctx = ctx();
        let c = ColorF::new(2.5, -0.25, 0.5, 1.0);
        let format = KnownPixelFormat::Format128bppRgba;
        let decoded: ColorF = decode(format, encode(format, c, &ctx), None).into_color();
        assert_eq!(decoded, c);
    }

    #[test]
    fn out_of_range_index_decodes_transparent() {
        let palette = Palette::black_and_white();
        assert_eq!(palette_entry(Some(&palette), 1), Color32::WHITE);
        assert_eq!(palette_entry(Some(&palette), 5), Color32::TRANSPARENT);
        assert_eq!(palette_entry(None, 0), Color32::TRANSPARENT);
    }
}
