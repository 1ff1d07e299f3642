#![allow(dead_code)]

use pixquant::{BitmapData, Color32, KnownPixelFormat};
use rand::{Rng as _, SeedableRng as _};
use rand_xoshiro::Xoroshiro128PlusPlus;
use std::sync::OnceLock;

/// A smooth gradient with soft noise, roughly like a photo.
fn photo_like(width: u32, height: u32, seed: u64) -> BitmapData {
    let bitmap = BitmapData::new(width, height, KnownPixelFormat::Format32bppArgb).unwrap();
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    for y in 0..height {
        for x in 0..width {
            let base = [x * 255 / width, y * 255 / height, (x + y) * 127 / (width + height)];
            let [r, g, b] =
                base.map(|v| (v as i32 + rng.random_range(-12..=12)).clamp(0, 255) as u8);
            bitmap.set_color32(x, y, Color32::from_rgb(r, g, b));
        }
    }
    bitmap
}

/// Uniform random colors with some transparent pixels.
fn noise(width: u32, height: u32, seed: u64) -> BitmapData {
    let bitmap = BitmapData::new(width, height, KnownPixelFormat::Format32bppArgb).unwrap();
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    for y in 0..height {
        for x in 0..width {
            let [a, r, g, b] = rng.random::<u32>().to_be_bytes();
            let a = if a < 16 { 0 } else { 255 };
            bitmap.set_color32(x, y, Color32::new(a, r, g, b));
        }
    }
    bitmap
}

static BENCHMARK_BITMAPS: OnceLock<Vec<(String, BitmapData)>> = OnceLock::new();

pub fn benchmark_bitmaps() -> &'static [(String, BitmapData)] {
    BENCHMARK_BITMAPS.get_or_init(|| {
        vec![
            ("photo_640x480".into(), photo_like(640, 480, 1)),
            ("photo_1920x1080".into(), photo_like(1920, 1080, 2)),
            ("noise_512x512".into(), noise(512, 512, 3)),
        ]
    })
}
