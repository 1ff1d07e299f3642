#[path = "../util/mod.rs"]
mod util;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pixquant::{BitmapData, Color32, ColorF, KnownPixelFormat, deps::enough::Unstoppable};
use std::{hint::black_box, time::Duration};
use util::benchmark_bitmaps;

fn convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone_with");
    group.sample_size(20).warm_up_time(Duration::from_secs(1));

    for format in [
        KnownPixelFormat::Format1bppIndexed,
        KnownPixelFormat::Format16bppRgb565,
        KnownPixelFormat::Format24bppRgb,
        KnownPixelFormat::Format64bppPArgb,
        KnownPixelFormat::Format128bppRgba,
    ] {
        for (path, bitmap) in benchmark_bitmaps() {
            let id = BenchmarkId::new(format!("{format:?}"), path);
            group.bench_with_input(id, bitmap, |b, bitmap| {
                b.iter(|| bitmap.clone_with(format, &Unstoppable).unwrap())
            });
        }
    }
}

fn pixel_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixel_access");
    group.sample_size(30).warm_up_time(Duration::from_secs(1));

    let bitmap = BitmapData::new(512, 512, KnownPixelFormat::Format32bppArgb).unwrap();
    bitmap.clear(Color32::from_rgb(10, 20, 30));
    group.bench_function("get_color32", |b| {
        b.iter(|| {
            for row in bitmap.rows() {
                for x in 0..row.width() {
                    black_box(row.get_color32(x));
                }
            }
        })
    });
    group.bench_function("get_color_f", |b| {
        b.iter(|| {
            for row in bitmap.rows() {
                for x in 0..row.width() {
                    black_box(row.get_color_f(x));
                }
            }
        })
    });
    group.bench_function("set_color_f", |b| {
        b.iter(|| {
            for row in bitmap.rows() {
                for x in 0..row.width() {
                    row.set_color_f(x, ColorF::new(0.25, 0.5, 0.75, 1.0));
                }
            }
        })
    });

    let packed = BitmapData::new(512, 512, KnownPixelFormat::Format4bppIndexed).unwrap();
    group.bench_function("set_color32_4bpp", |b| {
        b.iter(|| {
            for row in packed.rows() {
                for x in 0..row.width() {
                    row.set_color32(x, Color32::from_rgb((x % 256) as u8, 0, 128));
                }
            }
        })
    });
}

criterion_group!(benches, convert, pixel_access);
criterion_main!(benches);
