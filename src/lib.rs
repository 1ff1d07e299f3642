//! Uniform pixel access over arbitrary bit-packed pixel layouts, palette quantization, and
//! dithering.
//!
//! A [`BitmapData`] wraps a buffer of pixels in one of the [`KnownPixelFormat`]s or in a
//! [`CustomPixelFormat`] defined by caller supplied accessor functions. Pixels are read and
//! written as any of the six color types ([`Color32`], [`PColor32`], [`Color64`], [`PColor64`],
//! [`ColorF`], [`PColorF`]), and bitmaps can be clipped to shared sub-views.
//!
//! Colors are reduced with a [`Quantizer`], either to predefined colors
//! ([`PredefinedColorsQuantizer`]) or to a palette generated from the image
//! ([`OptimizedPaletteQuantizer`] with the octree, median cut, or Wu algorithm), and optionally
//! dithered with a [`Ditherer`]:
//!
//! ```
//! use pixquant::{
//!     BitmapData, Color32, ErrorDiffusionDitherer, KnownPixelFormat, OptimizedPaletteQuantizer,
//!     PaletteSize,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bitmap = BitmapData::new(16, 16, KnownPixelFormat::Format32bppArgb)?;
//! for y in 0..16 {
//!     for x in 0..16 {
//!         bitmap.set_color32(x, y, Color32::from_rgb((x * 16) as u8, (y * 16) as u8, 128));
//!     }
//! }
//!
//! let quantizer = OptimizedPaletteQuantizer::wu().max_colors(PaletteSize::try_from(16u32)?);
//! let ditherer = ErrorDiffusionDitherer::floyd_steinberg();
//! let indexed = bitmap
//!     .clone_dithered(KnownPixelFormat::Format4bppIndexed, &quantizer, &ditherer, &enough::Unstoppable)?
//!     .expect("not cancelled");
//! assert!(indexed.palette().is_some_and(|palette| palette.len() <= 16));
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//! - `threads` (default): process rows in parallel with `rayon` where the quantizer and ditherer
//!   allow it.

#![deny(unsafe_code, unsafe_op_in_unsafe_fn)]
#![warn(
    clippy::pedantic,
    clippy::cargo,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used,
    clippy::unwrap_in_result,
    clippy::expect_used,
    clippy::unneeded_field_pattern,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::unnecessary_self_imports,
    clippy::str_to_string,
    clippy::string_slice,
    missing_docs,
    rustdoc::all,
    clippy::float_cmp_const,
    clippy::lossy_float_literal
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::many_single_char_names,
    clippy::unreadable_literal,
    clippy::wildcard_imports
)]

extern crate alloc;

mod bitmap;
mod color;
mod format;
mod palette;
mod types;

pub mod dither;
pub mod quantize;

pub use bitmap::*;
pub use color::*;
pub use dither::{
    AutoStrengthMode, Ditherer, DitheringSession, ErrorDiffusionDitherer,
    InterleavedGradientNoiseDitherer, OrderedDitherer, RandomNoiseDitherer,
};
pub use format::*;
pub use palette::*;
pub use quantize::{
    OptimizedPaletteQuantizer, PredefinedColorsQuantizer, QuantizeAlgorithm, Quantizer,
    QuantizingSession,
};
pub use types::*;

/// Re-exports of third party crates whose types are present in `pixquant`'s public API.
pub mod deps {
    pub use enough;
}

/// The default alpha threshold: colors with alpha below it are considered transparent.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;
