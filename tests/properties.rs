use pixquant::{
    BitmapData, Color32, Ditherer as _, DitheringSession as _, ErrorDiffusionDitherer,
    KnownPixelFormat, OptimizedPaletteQuantizer, OrderedDitherer, Palette, PaletteSize,
    PixelFormatInfo, QuantizeAlgorithm, Quantizer as _, QuantizingSession as _, Rect,
    deps::enough::Unstoppable, quantize::PredefinedColorsQuantizer,
};
use std::{collections::HashSet, ptr::NonNull, sync::Arc, sync::atomic::{AtomicUsize, Ordering}};

const ALGORITHMS: [QuantizeAlgorithm; 3] =
    [QuantizeAlgorithm::Octree, QuantizeAlgorithm::MedianCut, QuantizeAlgorithm::Wu];

fn noisy(width: u32, height: u32) -> BitmapData {
    let bitmap = BitmapData::new(width, height, KnownPixelFormat::Format32bppArgb).unwrap();
    let mut state = 0x2545_F491_u32;
    for y in 0..height {
        for x in 0..width {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            bitmap.set_color32(x, y, Color32::from_rgb(r, g, b));
        }
    }
    bitmap
}

fn gray_ramp(width: u32, height: u32) -> BitmapData {
    let bitmap = BitmapData::new(width, height, KnownPixelFormat::Format24bppRgb).unwrap();
    for y in 0..height {
        for x in 0..width {
            let v = (x * 255 / (width - 1)) as u8;
            bitmap.set_color32(x, y, Color32::from_rgb(v, v, v));
        }
    }
    bitmap
}

fn mean_brightness(bitmap: &BitmapData) -> f64 {
    let sum: u64 = bitmap
        .rows()
        .flat_map(|row| (0..row.width()).map(move |x| u64::from(row.get_color32(x).brightness())))
        .sum();
    sum as f64 / f64::from(bitmap.width() * bitmap.height())
}

#[test]
fn half_transparent_blue_blends_with_black() {
    let bitmap = BitmapData::new(1, 1, KnownPixelFormat::Format24bppRgb).unwrap();
    bitmap.set_color32(0, 0, Color32::new(128, 0, 0, 255));
    assert_eq!(bitmap.get_color32(0, 0), Color32::from_rgb(0, 0, 128));
    let mut raw = [0; 3];
    bitmap.row(0).raw().copy_to_slice(&mut raw);
    assert_eq!(raw, [0x80, 0, 0]);
}

#[test]
fn clipped_row_sizes() {
    let bitmap = BitmapData::new(127, 2, KnownPixelFormat::Format1bppIndexed).unwrap();
    assert_eq!(bitmap.row_size(), 16);
    assert_eq!(bitmap.clip(Rect::new(0, 0, 126, 2)).unwrap().row_size(), 15);
    assert_eq!(bitmap.clip(Rect::new(1, 0, 126, 2)).unwrap().row_size(), 0);
    assert_eq!(bitmap.clip(Rect::new(8, 0, 100, 2)).unwrap().row_size(), 0);
}

#[test]
fn palette_capacity_of_1bpp() {
    let mut bitmap = BitmapData::new(4, 4, KnownPixelFormat::Format1bppIndexed).unwrap();
    let three =
        Palette::from_colors([Color32::BLACK, Color32::WHITE, Color32::from_rgb(255, 0, 0)])
            .unwrap();
    let two = Palette::from_colors([Color32::from_rgb(0, 0, 255), Color32::WHITE]).unwrap();

    assert!(!bitmap.try_set_palette(three));
    assert_eq!(bitmap.palette().unwrap().entries(), [Color32::BLACK, Color32::WHITE]);
    assert!(bitmap.try_set_palette(two));
    assert_eq!(bitmap.get_color32(0, 0), Color32::from_rgb(0, 0, 255));
}

#[test]
fn optimized_palettes_are_bounded() {
    let source = noisy(64, 64);
    for algorithm in ALGORITHMS {
        for n in [2u32, 4, 16, 256, 512, 1024, 65536] {
            let quantizer = OptimizedPaletteQuantizer::new(algorithm)
                .max_colors(PaletteSize::try_from(n).unwrap());
            let session = quantizer.initialize(&source, &Unstoppable).unwrap();
            assert!(session.palette().unwrap().len() <= n as usize, "{algorithm:?} {n}");

            let format = quantizer.pixel_format_hint();
            let result = source.clone_quantized(format, &quantizer, &Unstoppable).unwrap().unwrap();
            let distinct: HashSet<_> = result
                .rows()
                .flat_map(|row| (0..row.width()).map(move |x| row.get_color32(x)))
                .collect();
            assert!(distinct.len() <= n as usize, "{algorithm:?} {n}");
            assert!(result.palette().unwrap().len() <= n as usize);
        }
    }
}

#[test]
fn transparent_pixel_is_safe() {
    let source = BitmapData::new(1, 1, KnownPixelFormat::Format32bppArgb).unwrap();
    for algorithm in ALGORITHMS {
        for threshold in [0, 128] {
            let quantizer = OptimizedPaletteQuantizer::new(algorithm)
                .max_colors(PaletteSize::try_from(2u32).unwrap())
                .alpha_threshold(threshold);
            let result = source
                .clone_quantized(KnownPixelFormat::Format1bppIndexed, &quantizer, &Unstoppable)
                .unwrap()
                .unwrap();
            let color = result.get_color32(0, 0);
            if threshold == 0 {
                assert_eq!(color, Color32::BLACK, "{algorithm:?}");
            } else {
                assert_eq!(color, Color32::TRANSPARENT, "{algorithm:?}");
            }
        }
    }
}

#[test]
fn ordered_dithering_ignores_processing_order() {
    let source = noisy(40, 24);
    let quantizer = PredefinedColorsQuantizer::rgb555();
    let ditherer = OrderedDitherer::bayer8x8();
    let parallel = source
        .clone_dithered(KnownPixelFormat::Format32bppArgb, &quantizer, &ditherer, &Unstoppable)
        .unwrap()
        .unwrap();

    let session = quantizer.initialize(&source, &Unstoppable).unwrap();
    let mut dithering = ditherer.initialize(&source, &session, &Unstoppable).unwrap();
    for y in (0..24).rev() {
        let columns = (0..3).flat_map(|start| (start..40).step_by(3));
        for x in columns {
            let color = dithering.get_dithered_color(x, y, source.get_color32(x, y));
            assert_eq!(color, parallel.get_color32(x, y), "({x}, {y})");
        }
    }
}

#[test]
fn error_diffusion_keeps_the_average() {
    let source = gray_ramp(64, 64);
    let quantizer = PredefinedColorsQuantizer::black_and_white(128);
    let raster = source
        .clone_dithered(
            KnownPixelFormat::Format1bppIndexed,
            &quantizer,
            &ErrorDiffusionDitherer::floyd_steinberg(),
            &Unstoppable,
        )
        .unwrap()
        .unwrap();
    let serpentine = source
        .clone_dithered(
            KnownPixelFormat::Format1bppIndexed,
            &quantizer,
            &ErrorDiffusionDitherer::floyd_steinberg().serpentine(true),
            &Unstoppable,
        )
        .unwrap()
        .unwrap();

    let expected = mean_brightness(&source);
    for result in [&raster, &serpentine] {
        let mean = mean_brightness(result);
        assert!((mean - expected).abs() < 6.0, "{mean} vs {expected}");
    }
    let differs = (0..64).any(|y| {
        (0..64).any(|x| raster.get_color_index(x, y) != serpentine.get_color_index(x, y))
    });
    assert!(differs);
}

#[test]
fn nested_clips_match_intersection() {
    let bitmap = noisy(50, 40);
    let a = Rect::new(5, 7, 30, 20);
    let b = Rect::new(10, 4, 100, 6);
    let nested = bitmap.clip(a).unwrap().clip(b).unwrap();
    let direct = bitmap.clip(Rect::new(15, 11, 20, 6)).unwrap();
    assert_eq!(nested.offset(), direct.offset());
    assert_eq!((nested.width(), nested.height()), (direct.width(), direct.height()));
    for y in 0..direct.height() {
        for x in 0..direct.width() {
            assert_eq!(nested.get_color32(x, y), direct.get_color32(x, y));
        }
    }
    assert!(bitmap.clip(a).unwrap().clip(Rect::new(30, 0, 5, 5)).is_none());
}

#[test]
fn custom_3bpp_indexed_format() {
    let info = PixelFormatInfo::indexed(3).unwrap();
    let format = pixquant::CustomPixelFormat::indexed::<u8>(
        info,
        |row, x| row.read_bits(x as usize * 3, 3) as u8,
        |row, x, index| row.write_bits(x as usize * 3, 3, u128::from(index)),
    )
    .unwrap();
    let bitmap = BitmapData::new(11, 2, format).unwrap();
    assert_eq!(bitmap.palette().unwrap().len(), 8);
    for x in 0..11 {
        bitmap.set_color_index(x, 1, x % 8);
    }
    for x in 0..11 {
        assert_eq!(bitmap.get_color_index(x, 1), x % 8);
        assert_eq!(bitmap.get_color_index(x, 0), 0);
    }
    let view = bitmap.clip(Rect::new(3, 1, 5, 1)).unwrap();
    assert_eq!(view.get_color_index(0, 0), 3);
    assert!(matches!(
        pixquant::CustomPixelFormat::indexed::<u8>(
            PixelFormatInfo::indexed(9).unwrap(),
            |_, _| 0,
            |_, _, _| {}
        ),
        Err(pixquant::BitmapError::IndexTypeTooSmall { bits_per_pixel: 9, index_bits: 8 })
    ));
}

#[test]
fn external_memory_is_released_once() {
    let released = Arc::new(AtomicUsize::new(0));
    let mut memory = vec![0u8; 64];
    let ptr = NonNull::new(memory.as_mut_ptr()).unwrap();
    let counter = Arc::clone(&released);
    // SAFETY: `memory` outlives the bitmap and is not accessed while the bitmap exists.
    let bitmap = unsafe {
        BitmapData::from_raw_parts(ptr, 64, 4, 4, 16, KnownPixelFormat::Format32bppArgb, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }
    .unwrap();
    bitmap.set_color32(1, 1, Color32::WHITE);
    let view = bitmap.clip(Rect::new(1, 1, 2, 2)).unwrap();
    bitmap.dispose();
    assert_eq!(released.load(Ordering::SeqCst), 0);
    assert_eq!(view.get_color32(0, 0), Color32::WHITE);
    drop(view);
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(&memory[20..24], &[255, 255, 255, 255]);
}

#[test]
fn persistence_round_trip() {
    let source = noisy(9, 5);
    let quantizer =
        OptimizedPaletteQuantizer::octree().max_colors(PaletteSize::try_from(16u32).unwrap());
    let indexed = source
        .clone_quantized(KnownPixelFormat::Format4bppIndexed, &quantizer, &Unstoppable)
        .unwrap()
        .unwrap();
    let mut bytes = Vec::new();
    indexed.save(&mut bytes).unwrap();
    let loaded = BitmapData::load(bytes.as_slice()).unwrap();
    assert_eq!(loaded.known_pixel_format(), Some(KnownPixelFormat::Format4bppIndexed));
    for y in 0..5 {
        for x in 0..9 {
            assert_eq!(loaded.get_color_index(x, y), indexed.get_color_index(x, y));
            assert_eq!(loaded.get_color32(x, y), indexed.get_color32(x, y));
        }
    }
}
