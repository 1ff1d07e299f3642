//! Transfer functions between gamma encoded sRGB and linear light.

use alloc::{boxed::Box, vec::Vec};
use palette::{LinSrgb, Srgb};
use std::sync::LazyLock;

/// The color space in which blending, averaging, and distance computations take place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkingColorSpace {
    /// Resolved by the pixel format or palette: [`WorkingColorSpace::Linear`] for formats that
    /// prefer floating point colors, [`WorkingColorSpace::Srgb`] otherwise.
    #[default]
    Default,
    /// Linear light.
    Linear,
    /// Gamma encoded sRGB.
    Srgb,
}

impl WorkingColorSpace {
    /// Resolve [`WorkingColorSpace::Default`] given whether the owner prefers linear colors.
    #[must_use]
    #[inline]
    pub const fn resolve(self, prefers_linear: bool) -> Self {
        match self {
            Self::Default if prefers_linear => Self::Linear,
            Self::Default => Self::Srgb,
            space => space,
        }
    }

    /// Whether this color space is linear after resolving [`WorkingColorSpace::Default`] to sRGB.
    #[must_use]
    #[inline]
    pub const fn is_linear(self) -> bool {
        matches!(self, Self::Linear)
    }

    pub(crate) const fn to_id(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Linear => 1,
            Self::Srgb => 2,
        }
    }

    pub(crate) const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Default),
            1 => Some(Self::Linear),
            2 => Some(Self::Srgb),
            _ => None,
        }
    }
}

static SRGB8_TO_LINEAR: LazyLock<[f32; 256]> = LazyLock::new(|| {
    let mut table = [0.0; 256];
    for (v, out) in (0..=u8::MAX).zip(&mut table) {
        *out = Srgb::new(v, v, v).into_linear::<f32>().red;
    }
    table
});

static SRGB16_TO_LINEAR: LazyLock<Box<[f32]>> = LazyLock::new(|| {
    (0..=u16::MAX)
        .map(|v| srgb_to_linear(f32::from(v) / 65535.0))
        .collect::<Vec<_>>()
        .into_boxed_slice()
});

/// Clamp a float channel to `[0, 1]`, mapping NaN to `0`.
#[must_use]
#[inline]
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

/// Convert an sRGB channel in `[0, 1]` to linear light.
#[must_use]
#[inline]
pub fn srgb_to_linear(v: f32) -> f32 {
    let v = clamp_unit(v);
    Srgb::new(v, v, v).into_linear::<f32>().red
}

/// Convert a linear channel to sRGB in `[0, 1]`.
#[must_use]
#[inline]
pub fn linear_to_srgb(v: f32) -> f32 {
    let v = clamp_unit(v);
    let srgb: Srgb<f32> = LinSrgb::new(v, v, v).into_encoding();
    srgb.red
}

/// Convert an 8-bit sRGB channel to linear light.
#[must_use]
#[inline]
pub fn srgb8_to_linear(v: u8) -> f32 {
    SRGB8_TO_LINEAR[usize::from(v)]
}

/// Convert a linear channel to an 8-bit sRGB channel.
#[must_use]
#[inline]
pub fn linear_to_srgb8(v: f32) -> u8 {
    let v = clamp_unit(v);
    let srgb: Srgb<u8> = LinSrgb::new(v, v, v).into_encoding();
    srgb.red
}

/// Convert a 16-bit sRGB channel to linear light.
#[must_use]
#[inline]
pub fn srgb16_to_linear(v: u16) -> f32 {
    SRGB16_TO_LINEAR[usize::from(v)]
}

/// Convert a linear channel to a 16-bit sRGB channel.
#[must_use]
#[inline]
pub fn linear_to_srgb16(v: f32) -> u16 {
    unit_to_u16(linear_to_srgb(v))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[inline]
pub(crate) fn unit_to_u8(v: f32) -> u8 {
    (clamp_unit(v) * 255.0).round() as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[inline]
pub(crate) fn unit_to_u16(v: f32) -> u16 {
    (clamp_unit(v) * 65535.0).round() as u16
}
