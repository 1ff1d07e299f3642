use crate::{Color32, srgb8_to_linear};
use alloc::vec::Vec;
use core::array;
use wide::{f32x8, u32x8};

/// Palette colors laid out in AoSoA format for a SIMD nearest color search.
#[derive(Clone, Debug)]
pub(crate) struct NearestColors {
    /// `[r, g, b, a]` components of 8 palette entries per chunk.
    data: Vec<[f32x8; 4]>,
    /// Square roots of the channel weights, alpha last.
    scale: [f32; 4],
    /// Whether components are linear.
    linear: bool,
    /// Whether inputs are compared by brightness only.
    grayscale: bool,
    /// Number of real entries.
    len: u32,
}

impl NearestColors {
    /// Build the search data. The entry at `skip` never wins a search.
    pub(crate) fn new(
        entries: &[Color32],
        skip: Option<u32>,
        weights: [f32; 3],
        alpha: bool,
        linear: bool,
        grayscale: bool,
    ) -> Self {
        let [r, g, b] = weights.map(f32::sqrt);
        let scale = [r, g, b, if alpha { 1.0 } else { 0.0 }];
        let mut this = Self { data: Vec::new(), scale, linear, grayscale, len: 0 };

        let (chunks, remainder) = entries.as_chunks::<8>();
        let mut data = Vec::with_capacity(entries.len().div_ceil(8));
        data.extend(
            chunks
                .iter()
                .map(|chunk| array::from_fn(|i| f32x8::new(chunk.map(|c| this.components(c)[i])))),
        );

        if !remainder.is_empty() {
            let mut arr = [[f32::INFINITY; 8]; 4];
            for (i, &color) in remainder.iter().enumerate() {
                for (arr, c) in arr.iter_mut().zip(this.components(color)) {
                    arr[i] = c;
                }
            }
            data.push(arr.map(f32x8::new));
        }

        if let Some(skip) = skip {
            let skip = skip as usize;
            if let Some(chunk) = data.get_mut(skip / 8) {
                for component in chunk {
                    let mut lanes = component.to_array();
                    lanes[skip % 8] = f32::INFINITY;
                    *component = f32x8::new(lanes);
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        {
            this.len = entries.len() as u32;
        }
        this.data = data;
        this
    }

    /// The weighted components of a color as compared by the search.
    #[inline]
    fn components(&self, color: Color32) -> [f32; 4] {
        let color = if self.grayscale { color.to_gray() } else { color };
        let channel = |c: u8| {
            if self.linear { srgb8_to_linear(c) * 255.0 } else { f32::from(c) }
        };
        let [sr, sg, sb, sa] = self.scale;
        [
            channel(color.r) * sr,
            channel(color.g) * sg,
            channel(color.b) * sb,
            f32::from(color.a) * sa,
        ]
    }

    /// The index of the nearest palette entry to `color`.
    #[inline]
    pub(crate) fn nearest(&self, color: Color32) -> u32 {
        let (chunk, lane) = simd_argmin_min_distance(&self.data, self.components(color)).0;
        (chunk * 8 + lane).min(self.len - 1)
    }
}

/// Compute the chunk index and lane index of the nearest palette color to `color` according to
/// euclidean distance.
#[inline]
pub(crate) fn simd_argmin_min_distance<const N: usize>(
    data: &[[f32x8; N]],
    color: [f32; N],
) -> ((u32, u32), f32) {
    let incr = u32x8::ONE;
    let mut cur_chunk = u32x8::ZERO;
    let mut min_chunk = cur_chunk;
    let mut min_distance = f32x8::splat(f32::INFINITY);

    let color = color.map(f32x8::splat);

    for chunk in data {
        #[allow(clippy::expect_used)]
        let distance = array::from_fn::<_, N, _>(|i| {
            let diff = color[i] - chunk[i];
            diff * diff
        })
        .into_iter()
        .reduce(|a, b| a + b)
        .expect("N != 0");

        let mask: u32x8 = bytemuck::cast(distance.simd_le(min_distance));
        min_chunk = mask.blend(cur_chunk, min_chunk);
        min_distance = min_distance.fast_min(distance);
        cur_chunk += incr;
    }

    let mut min_lane = 0;
    let mut min_dist = f32::INFINITY;
    for (i, v) in min_distance.to_array().into_iter().enumerate() {
        if v < min_dist {
            min_dist = v;
            min_lane = i;
        }
    }

    let min_chunk = min_chunk.as_array()[min_lane];

    #[allow(clippy::cast_possible_truncation)]
    {
        ((min_chunk, min_lane as u32), min_dist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(entries: &[Color32], color: Color32) -> u32 {
        let dist = |c: Color32| {
            let d = |a: u8, b: u8| (i32::from(a) - i32::from(b)).pow(2);
            d(c.r, color.r) + d(c.g, color.g) + d(c.b, color.b)
        };
        let mut best = 0;
        for (i, &c) in entries.iter().enumerate() {
            if dist(c) < dist(entries[best]) {
                best = i;
            }
        }
        #[allow(clippy::cast_possible_truncation)]
        {
            best as u32
        }
    }

    #[test]
    fn matches_brute_force() {
        let entries = crate::tests::test_colors(37);
        let nearest = NearestColors::new(&entries, None, [1.0; 3], false, false, false);
        for color in crate::tests::test_colors(200) {
            let i = nearest.nearest(color) as usize;
            let j = brute_force(&entries, color) as usize;
            assert_eq!(entries[i], entries[j]);
        }
    }

    #[test]
    fn skipped_entry_never_wins() {
        let entries = [Color32::BLACK, Color32::WHITE, Color32::TRANSPARENT];
        let nearest = NearestColors::new(&entries, Some(2), [1.0; 3], false, false, false);
        assert_eq!(nearest.nearest(Color32::from_rgb(1, 1, 1)), 0);
        assert_eq!(nearest.nearest(Color32::TRANSPARENT), 0);
    }

    #[test]
    fn single_skipped_entry_still_returns_an_index() {
        let nearest =
            NearestColors::new(&[Color32::TRANSPARENT], Some(0), [1.0; 3], false, false, false);
        assert_eq!(nearest.nearest(Color32::WHITE), 0);
    }
}
