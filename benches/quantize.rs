#[path = "../util/mod.rs"]
mod util;

use criterion::{BenchmarkId, Criterion, SamplingMode, criterion_group, criterion_main};
use pixquant::{
    OptimizedPaletteQuantizer, PaletteSize, Quantizer as _, QuantizingSession as _,
    deps::enough::Unstoppable, quantize::PredefinedColorsQuantizer,
};
use std::{hint::black_box, time::Duration};
use util::benchmark_bitmaps;

fn optimized_palette(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimized_palette");
    group
        .sample_size(20)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_secs(2));

    for (name, quantizer) in [
        ("octree", OptimizedPaletteQuantizer::octree()),
        ("median_cut", OptimizedPaletteQuantizer::median_cut()),
        ("wu", OptimizedPaletteQuantizer::wu()),
    ] {
        for k in [PaletteSize::from_usize_clamped(256), PaletteSize::from_usize_clamped(16)] {
            let quantizer = quantizer.max_colors(k);
            for (path, bitmap) in benchmark_bitmaps() {
                group.bench_with_input(
                    BenchmarkId::new(format!("{name}/{k}"), path),
                    bitmap,
                    |b, bitmap| b.iter(|| quantizer.initialize(bitmap, &Unstoppable).unwrap()),
                );
            }
        }
    }
}

fn nearest_color(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_color");
    group.sample_size(30).warm_up_time(Duration::from_secs(1));

    for (path, bitmap) in benchmark_bitmaps() {
        let session = OptimizedPaletteQuantizer::wu().initialize(bitmap, &Unstoppable).unwrap();
        let colors = (0..bitmap.height())
            .flat_map(|y| (0..bitmap.width()).map(move |x| (x, y)))
            .take(1 << 16)
            .map(|(x, y)| bitmap.get_color32(x, y))
            .collect::<Vec<_>>();
        group.bench_with_input(BenchmarkId::new("palette", path), &colors, |b, colors| {
            b.iter(|| {
                for &color in colors {
                    black_box(session.get_quantized_color(color));
                }
            })
        });
    }
}

fn quantize_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize_in_place");
    group.sample_size(20).warm_up_time(Duration::from_secs(1));

    for (path, bitmap) in benchmark_bitmaps() {
        let quantizer = PredefinedColorsQuantizer::rgb565();
        group.bench_with_input(BenchmarkId::new("rgb565", path), bitmap, |b, bitmap| {
            b.iter(|| {
                let format = bitmap.known_pixel_format().unwrap();
                let copy = bitmap.clone_with(format, &Unstoppable).unwrap().unwrap();
                copy.quantize(&quantizer, &Unstoppable)
            })
        });
    }
}

criterion_group!(benches, optimized_palette, nearest_color, quantize_in_place);
criterion_main!(benches);
