//! The six color value types and the conversions between them.
//!
//! 8-bit and 16-bit colors hold gamma encoded sRGB channels, floating point colors hold linear
//! channels. Converting between precisions therefore also converts the color space. Alpha is
//! never gamma converted.

mod space;

pub use space::*;

use crate::ColorType;
use bytemuck::{Pod, Zeroable};
use core::fmt::Debug;

/// A straight alpha color with 8 bits per channel.
///
/// The field order matches the in-memory layout of 32-bit ARGB pixels on little-endian
/// machines, so a slice of [`Color32`] can be cast to and from raw `BGRA` bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct Color32 {
    /// Blue channel.
    pub b: u8,
    /// Green channel.
    pub g: u8,
    /// Red channel.
    pub r: u8,
    /// Alpha channel.
    pub a: u8,
}

/// A premultiplied alpha color with 8 bits per channel.
///
/// Valid values have every color channel less than or equal to the alpha channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PColor32 {
    /// Blue channel.
    pub b: u8,
    /// Green channel.
    pub g: u8,
    /// Red channel.
    pub r: u8,
    /// Alpha channel.
    pub a: u8,
}

/// A straight alpha color with 16 bits per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Color64 {
    /// Blue channel.
    pub b: u16,
    /// Green channel.
    pub g: u16,
    /// Red channel.
    pub r: u16,
    /// Alpha channel.
    pub a: u16,
}

/// A premultiplied alpha color with 16 bits per channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct PColor64 {
    /// Blue channel.
    pub b: u16,
    /// Green channel.
    pub g: u16,
    /// Red channel.
    pub r: u16,
    /// Alpha channel.
    pub a: u16,
}

/// A straight alpha color with linear `f32` channels.
///
/// The channels are unbounded and may even be NaN until [`ColorF::clip`] is called.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ColorF {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

/// A premultiplied alpha color with linear `f32` channels.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PColorF {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    pub a: f32,
}

/// Implemented by all six color types so that pixel access can be generic over the requested
/// precision.
pub trait PixelColor:
    Copy
    + Default
    + PartialEq
    + Debug
    + Send
    + Sync
    + 'static
    + From<Color32>
    + From<PColor32>
    + From<Color64>
    + From<PColor64>
    + From<ColorF>
    + From<PColorF>
    + Into<Color32>
    + Into<PColor32>
    + Into<Color64>
    + Into<PColor64>
    + Into<ColorF>
    + Into<PColorF>
{
    /// The [`ColorType`] naming this type.
    const COLOR_TYPE: ColorType;
}

impl PixelColor for Color32 {
    const COLOR_TYPE: ColorType = ColorType::Color32;
}

impl PixelColor for PColor32 {
    const COLOR_TYPE: ColorType = ColorType::PColor32;
}

impl PixelColor for Color64 {
    const COLOR_TYPE: ColorType = ColorType::Color64;
}

impl PixelColor for PColor64 {
    const COLOR_TYPE: ColorType = ColorType::PColor64;
}

impl PixelColor for ColorF {
    const COLOR_TYPE: ColorType = ColorType::ColorF;
}

impl PixelColor for PColorF {
    const COLOR_TYPE: ColorType = ColorType::PColorF;
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn premultiply8(c: u8, a: u8) -> u8 {
    ((c as u32 * a as u32 + 127) / 255) as u8
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn unpremultiply8(c: u8, a: u8) -> u8 {
    let v = (c as u32 * 255 + a as u32 / 2) / a as u32;
    if v > 255 { 255 } else { v as u8 }
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn premultiply16(c: u16, a: u16) -> u16 {
    ((c as u32 * a as u32 + 32767) / 65535) as u16
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn unpremultiply16(c: u16, a: u16) -> u16 {
    let v = (c as u32 * 65535 + a as u32 / 2) / a as u32;
    if v > 65535 { 65535 } else { v as u16 }
}

#[inline]
const fn widen(v: u8) -> u16 {
    v as u16 * 257
}

#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn narrow(v: u16) -> u8 {
    (v >> 8) as u8
}

/// Rec. 601 luma of gamma encoded channels with rounding, computed on integers.
#[allow(clippy::cast_possible_truncation)]
#[inline]
const fn luma(r: u32, g: u32, b: u32) -> u32 {
    (r * 299 + g * 587 + b * 114 + 500) / 1000
}

impl Color32 {
    /// Fully opaque black.
    pub const BLACK: Self = Self::from_rgb(0, 0, 0);
    /// Fully opaque white.
    pub const WHITE: Self = Self::from_rgb(255, 255, 255);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Create a color from alpha, red, green, and blue channels.
    #[must_use]
    #[inline]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r, a }
    }

    /// Create an opaque color from red, green, and blue channels.
    #[must_use]
    #[inline]
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(255, r, g, b)
    }

    /// Create a color from a packed `0xAARRGGBB` value.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    #[inline]
    pub const fn from_argb_u32(argb: u32) -> Self {
        Self::new((argb >> 24) as u8, (argb >> 16) as u8, (argb >> 8) as u8, argb as u8)
    }

    /// Pack the color into a `0xAARRGGBB` value.
    #[must_use]
    #[inline]
    pub const fn to_argb_u32(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Returns the same color with the alpha channel set to 255.
    #[must_use]
    #[inline]
    pub const fn opaque(self) -> Self {
        Self::from_rgb(self.r, self.g, self.b)
    }

    /// Returns the same color with a different alpha.
    #[must_use]
    #[inline]
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(a, self.r, self.g, self.b)
    }

    /// Whether all three color channels are equal.
    #[must_use]
    #[inline]
    pub const fn is_gray(self) -> bool {
        self.r == self.g && self.g == self.b
    }

    /// The Rec. 601 brightness of the color, ignoring alpha.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    #[inline]
    pub const fn brightness(self) -> u8 {
        if self.is_gray() {
            self.r
        } else {
            luma(self.r as u32, self.g as u32, self.b as u32) as u8
        }
    }

    /// The gray color with the same brightness and alpha.
    #[must_use]
    #[inline]
    pub const fn to_gray(self) -> Self {
        let v = self.brightness();
        Self::new(self.a, v, v, v)
    }

    /// Blend this color over an opaque background in the given color space.
    ///
    /// The result is always opaque. [`WorkingColorSpace::Default`] blends in sRGB.
    #[must_use]
    pub fn blend_with_background(self, back: Self, space: WorkingColorSpace) -> Self {
        match self.a {
            255 => self,
            0 => back.opaque(),
            a => match space.resolve(false) {
                WorkingColorSpace::Linear => ColorF::from(self)
                    .blend_with_background(back.into(), WorkingColorSpace::Linear)
                    .into(),
                _ => {
                    let a = u32::from(a);
                    let inv = 255 - a;
                    #[allow(clippy::cast_possible_truncation)]
                    let mix =
                        |c: u8, b: u8| ((u32::from(c) * a + u32::from(b) * inv + 127) / 255) as u8;
                    Self::from_rgb(mix(self.r, back.r), mix(self.g, back.g), mix(self.b, back.b))
                }
            },
        }
    }
}

impl PColor32 {
    /// Create a premultiplied color from alpha, red, green, and blue channels without validation.
    #[must_use]
    #[inline]
    pub const fn new(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { b, g, r, a }
    }

    /// Whether every color channel is at most the alpha channel.
    #[must_use]
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.r <= self.a && self.g <= self.a && self.b <= self.a
    }

    /// Clamp each color channel to the alpha channel.
    #[must_use]
    #[inline]
    pub fn clip(self) -> Self {
        Self::new(self.a, self.r.min(self.a), self.g.min(self.a), self.b.min(self.a))
    }
}

impl Color64 {
    /// Fully opaque black.
    pub const BLACK: Self = Self::new(u16::MAX, 0, 0, 0);

    /// Create a color from alpha, red, green, and blue channels.
    #[must_use]
    #[inline]
    pub const fn new(a: u16, r: u16, g: u16, b: u16) -> Self {
        Self { b, g, r, a }
    }

    /// Returns the same color with the alpha channel set to the maximum.
    #[must_use]
    #[inline]
    pub const fn opaque(self) -> Self {
        Self::new(u16::MAX, self.r, self.g, self.b)
    }

    /// The Rec. 601 brightness of the color, ignoring alpha.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    #[inline]
    pub const fn brightness(self) -> u16 {
        if self.r == self.g && self.g == self.b {
            self.r
        } else {
            luma(self.r as u32, self.g as u32, self.b as u32) as u16
        }
    }

    /// Blend this color over an opaque background in the given color space.
    #[must_use]
    pub fn blend_with_background(self, back: Self, space: WorkingColorSpace) -> Self {
        match self.a {
            u16::MAX => self,
            0 => back.opaque(),
            a => match space.resolve(false) {
                WorkingColorSpace::Linear => ColorF::from(self)
                    .blend_with_background(back.into(), WorkingColorSpace::Linear)
                    .into(),
                _ => {
                    let a = u64::from(a);
                    let inv = 65535 - a;
                    #[allow(clippy::cast_possible_truncation)]
                    let mix = |c: u16, b: u16| {
                        ((u64::from(c) * a + u64::from(b) * inv + 32767) / 65535) as u16
                    };
                    let [r, g, b] = [(self.r, back.r), (self.g, back.g), (self.b, back.b)]
                        .map(|(c, b)| mix(c, b));
                    Self::new(u16::MAX, r, g, b)
                }
            },
        }
    }
}

impl PColor64 {
    /// Create a premultiplied color from alpha, red, green, and blue channels without validation.
    #[must_use]
    #[inline]
    pub const fn new(a: u16, r: u16, g: u16, b: u16) -> Self {
        Self { b, g, r, a }
    }

    /// Whether every color channel is at most the alpha channel.
    #[must_use]
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.r <= self.a && self.g <= self.a && self.b <= self.a
    }

    /// Clamp each color channel to the alpha channel.
    #[must_use]
    #[inline]
    pub fn clip(self) -> Self {
        Self::new(self.a, self.r.min(self.a), self.g.min(self.a), self.b.min(self.a))
    }
}

impl ColorF {
    /// Create a color from red, green, blue, and alpha channels.
    #[must_use]
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Whether all channels are within `[0, 1]`.
    #[must_use]
    #[inline]
    pub fn is_valid(self) -> bool {
        [self.r, self.g, self.b, self.a].iter().all(|v| (0.0..=1.0).contains(v))
    }

    /// Clamp all channels to `[0, 1]`, replacing NaN with `0`.
    #[must_use]
    #[inline]
    pub fn clip(self) -> Self {
        Self::new(clamp_unit(self.r), clamp_unit(self.g), clamp_unit(self.b), clamp_unit(self.a))
    }

    /// The Rec. 709 relative luminance of the linear color channels.
    #[must_use]
    #[inline]
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Blend this color over an opaque background in the given color space.
    ///
    /// [`WorkingColorSpace::Default`] blends in linear space.
    #[must_use]
    pub fn blend_with_background(self, back: Self, space: WorkingColorSpace) -> Self {
        let a = clamp_unit(self.a);
        if a >= 1.0 {
            return Self { a: 1.0, ..self };
        }
        let inv = 1.0 - a;
        match space.resolve(true) {
            WorkingColorSpace::Srgb => {
                let mix = |c: f32, b: f32| {
                    srgb_to_linear(linear_to_srgb(c) * a + linear_to_srgb(b) * inv)
                };
                Self::new(mix(self.r, back.r), mix(self.g, back.g), mix(self.b, back.b), 1.0)
            }
            _ => Self::new(
                self.r * a + back.r * inv,
                self.g * a + back.g * inv,
                self.b * a + back.b * inv,
                1.0,
            ),
        }
    }
}

impl PColorF {
    /// Create a premultiplied color from red, green, blue, and alpha channels without validation.
    #[must_use]
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Whether alpha is within `[0, 1]` and every color channel is within `[0, alpha]`.
    #[must_use]
    #[inline]
    pub fn is_valid(self) -> bool {
        (0.0..=1.0).contains(&self.a)
            && [self.r, self.g, self.b].iter().all(|v| (0.0..=self.a).contains(v))
    }

    /// Clamp alpha to `[0, 1]` and every color channel to `[0, alpha]`, replacing NaN with `0`.
    #[must_use]
    #[inline]
    pub fn clip(self) -> Self {
        let a = clamp_unit(self.a);
        let c = |v: f32| if v.is_nan() { 0.0 } else { v.clamp(0.0, a) };
        Self::new(c(self.r), c(self.g), c(self.b), a)
    }
}

impl From<Color32> for PColor32 {
    #[inline]
    fn from(c: Color32) -> Self {
        match c.a {
            255 => Self::new(255, c.r, c.g, c.b),
            0 => Self::default(),
            a => Self::new(a, premultiply8(c.r, a), premultiply8(c.g, a), premultiply8(c.b, a)),
        }
    }
}

impl From<PColor32> for Color32 {
    #[inline]
    fn from(c: PColor32) -> Self {
        match c.a {
            255 => Self::new(255, c.r, c.g, c.b),
            0 => Self::default(),
            a => {
                let [r, g, b] = [c.r, c.g, c.b].map(|v| unpremultiply8(v, a));
                Self::new(a, r, g, b)
            }
        }
    }
}

impl From<Color32> for Color64 {
    #[inline]
    fn from(c: Color32) -> Self {
        Self::new(widen(c.a), widen(c.r), widen(c.g), widen(c.b))
    }
}

impl From<Color64> for Color32 {
    #[inline]
    fn from(c: Color64) -> Self {
        Self::new(narrow(c.a), narrow(c.r), narrow(c.g), narrow(c.b))
    }
}

impl From<PColor32> for PColor64 {
    #[inline]
    fn from(c: PColor32) -> Self {
        Self::new(widen(c.a), widen(c.r), widen(c.g), widen(c.b))
    }
}

impl From<PColor64> for PColor32 {
    #[inline]
    fn from(c: PColor64) -> Self {
        Self::new(narrow(c.a), narrow(c.r), narrow(c.g), narrow(c.b))
    }
}

impl From<Color64> for PColor64 {
    #[inline]
    fn from(c: Color64) -> Self {
        match c.a {
            u16::MAX => Self::new(u16::MAX, c.r, c.g, c.b),
            0 => Self::default(),
            a => Self::new(a, premultiply16(c.r, a), premultiply16(c.g, a), premultiply16(c.b, a)),
        }
    }
}

impl From<PColor64> for Color64 {
    #[inline]
    fn from(c: PColor64) -> Self {
        match c.a {
            u16::MAX => Self::new(u16::MAX, c.r, c.g, c.b),
            0 => Self::default(),
            a => Self::new(
                a,
                unpremultiply16(c.r, a),
                unpremultiply16(c.g, a),
                unpremultiply16(c.b, a),
            ),
        }
    }
}

impl From<Color32> for ColorF {
    #[inline]
    fn from(c: Color32) -> Self {
        Self::new(
            srgb8_to_linear(c.r),
            srgb8_to_linear(c.g),
            srgb8_to_linear(c.b),
            f32::from(c.a) / 255.0,
        )
    }
}

impl From<ColorF> for Color32 {
    #[inline]
    fn from(c: ColorF) -> Self {
        Self::new(unit_to_u8(c.a), linear_to_srgb8(c.r), linear_to_srgb8(c.g), linear_to_srgb8(c.b))
    }
}

impl From<Color64> for ColorF {
    #[inline]
    fn from(c: Color64) -> Self {
        Self::new(
            srgb16_to_linear(c.r),
            srgb16_to_linear(c.g),
            srgb16_to_linear(c.b),
            f32::from(c.a) / 65535.0,
        )
    }
}

impl From<ColorF> for Color64 {
    #[inline]
    fn from(c: ColorF) -> Self {
        Self::new(
            unit_to_u16(c.a),
            linear_to_srgb16(c.r),
            linear_to_srgb16(c.g),
            linear_to_srgb16(c.b),
        )
    }
}

impl From<ColorF> for PColorF {
    #[inline]
    fn from(c: ColorF) -> Self {
        Self::new(c.r * c.a, c.g * c.a, c.b * c.a, c.a)
    }
}

impl From<PColorF> for ColorF {
    #[inline]
    fn from(c: PColorF) -> Self {
        if c.a == 0.0 {
            Self::default()
        } else {
            Self::new(c.r / c.a, c.g / c.a, c.b / c.a, c.a)
        }
    }
}

/// Implements `From<$src> for $dst` by converting through `$via`.
macro_rules! convert_via {
    ($($src:ty => $via:ty => $dst:ty),* $(,)?) => {
        $(
            impl From<$src> for $dst {
                #[inline]
                fn from(c: $src) -> Self {
                    <$via>::from(c).into()
                }
            }
        )*
    };
}

convert_via! {
    Color32 => Color64 => PColor64,
    Color32 => ColorF => PColorF,
    PColor32 => PColor64 => Color64,
    PColor32 => Color32 => ColorF,
    PColor32 => ColorF => PColorF,
    Color64 => PColor64 => PColor32,
    Color64 => ColorF => PColorF,
    PColor64 => Color64 => Color32,
    PColor64 => Color64 => ColorF,
    PColor64 => ColorF => PColorF,
    ColorF => Color32 => PColor32,
    ColorF => Color64 => PColor64,
    PColorF => ColorF => Color32,
    PColorF => ColorF => PColor32,
    PColorF => ColorF => Color64,
    PColorF => ColorF => PColor64,
}
