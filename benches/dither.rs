#[path = "../util/mod.rs"]
mod util;

use criterion::{BenchmarkId, Criterion, SamplingMode, criterion_group, criterion_main};
use pixquant::{
    Ditherer, ErrorDiffusionDitherer, InterleavedGradientNoiseDitherer, KnownPixelFormat,
    OptimizedPaletteQuantizer, OrderedDitherer, PaletteSize, RandomNoiseDitherer,
    deps::enough::Unstoppable,
};
use std::time::Duration;
use util::benchmark_bitmaps;

fn bench(c: &mut Criterion, group: &str, ditherer: &impl Ditherer) {
    let mut group = c.benchmark_group(group);
    group
        .sample_size(20)
        .noise_threshold(0.05)
        .sampling_mode(SamplingMode::Flat)
        .warm_up_time(Duration::from_secs(2));

    let quantizer = OptimizedPaletteQuantizer::wu().max_colors(PaletteSize::from_usize_clamped(16));
    for (path, bitmap) in benchmark_bitmaps() {
        group.bench_with_input(BenchmarkId::from_parameter(path), bitmap, |b, bitmap| {
            b.iter(|| {
                bitmap
                    .clone_dithered(
                        KnownPixelFormat::Format4bppIndexed,
                        &quantizer,
                        ditherer,
                        &Unstoppable,
                    )
                    .unwrap()
            })
        });
    }
}

fn ordered(c: &mut Criterion) {
    bench(c, "ordered_bayer8x8", &OrderedDitherer::bayer8x8());
}

fn floyd_steinberg(c: &mut Criterion) {
    bench(c, "floyd_steinberg", &ErrorDiffusionDitherer::floyd_steinberg());
}

fn floyd_steinberg_serpentine(c: &mut Criterion) {
    let ditherer = ErrorDiffusionDitherer::floyd_steinberg().serpentine(true);
    bench(c, "floyd_steinberg_serpentine", &ditherer);
}

fn interleaved_gradient_noise(c: &mut Criterion) {
    bench(c, "interleaved_gradient_noise", &InterleavedGradientNoiseDitherer::new());
}

fn random_noise(c: &mut Criterion) {
    bench(c, "random_noise", &RandomNoiseDitherer::new().seed(Some(0)));
}

criterion_group!(
    benches,
    ordered,
    floyd_steinberg,
    floyd_steinberg_serpentine,
    interleaved_gradient_noise,
    random_noise
);
criterion_main!(benches);
