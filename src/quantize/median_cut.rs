//! Median cut color quantization.
//!
//! All distinct colors start in one box. The box with the greatest extent along any channel is
//! split along that channel at the median weighted by pixel count, until there are enough boxes
//! or every box holds a single color.

use super::optimized::ColorCounts;
use crate::Color32;
use alloc::{collections::BinaryHeap, vec::Vec};
use core::cmp::Ordering;
use enough::{Stop, StopReason};

/// A range of the color list and its extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bucket {
    start: usize,
    end: usize,
    count: u64,
    /// The channel with the greatest extent.
    channel: usize,
    extent: u8,
}

impl Bucket {
    fn new(items: &[([u8; 3], u32)], start: usize, end: usize) -> Self {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        let mut count = 0;
        for &(color, n) in &items[start..end] {
            for c in 0..3 {
                min[c] = min[c].min(color[c]);
                max[c] = max[c].max(color[c]);
            }
            count += u64::from(n);
        }
        let (channel, extent) = (0..3)
            .map(|c| (c, max[c] - min[c]))
            .max_by_key(|&(c, extent)| (extent, core::cmp::Reverse(c)))
            .unwrap_or_default();
        Self { start, end, count, channel, extent }
    }

    fn len(&self) -> usize {
        self.end - self.start
    }

    #[allow(clippy::cast_possible_truncation)]
    fn average(&self, items: &[([u8; 3], u32)]) -> Color32 {
        let mut sum = [0u64; 3];
        for &(color, n) in &items[self.start..self.end] {
            for c in 0..3 {
                sum[c] += u64::from(color[c]) * u64::from(n);
            }
        }
        let [r, g, b] = sum.map(|s| ((s + self.count / 2) / self.count) as u8);
        Color32::from_rgb(r, g, b)
    }
}

impl PartialOrd for Bucket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bucket {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.extent, self.count)
            .cmp(&(other.extent, other.count))
            .then_with(|| other.start.cmp(&self.start))
    }
}

/// Split `bucket` at the weighted median of its widest channel.
fn split(items: &mut [([u8; 3], u32)], bucket: Bucket) -> (Bucket, Bucket) {
    let channel = bucket.channel;
    let slice = &mut items[bucket.start..bucket.end];
    slice.sort_unstable_by_key(|&(color, _)| color[channel]);

    let half = bucket.count / 2;
    let mut acc = 0;
    let mut at = slice.len();
    for (i, &(_, n)) in slice.iter().enumerate() {
        acc += u64::from(n);
        if acc >= half {
            at = i + 1;
            break;
        }
    }
    let at = bucket.start + at.clamp(1, slice.len() - 1);
    (Bucket::new(items, bucket.start, at), Bucket::new(items, at, bucket.end))
}

/// Build a palette of at most `max_colors` entries from `colors`, which must not be empty.
pub(crate) fn palette(
    colors: &ColorCounts,
    max_colors: usize,
    stop: &dyn Stop,
) -> Result<Vec<Color32>, StopReason> {
    let mut items: Vec<_> = colors
        .colors
        .iter()
        .zip(&colors.counts)
        .map(|(c, &n)| ([c.r, c.g, c.b], n))
        .collect();

    let mut queue = BinaryHeap::with_capacity(max_colors.min(items.len()));
    queue.push(Bucket::new(&items, 0, items.len()));
    let mut finished = Vec::new();

    while queue.len() + finished.len() < max_colors {
        let Some(bucket) = queue.pop() else { break };
        if bucket.len() < 2 {
            finished.push(bucket);
            continue;
        }
        stop.check()?;
        let (lower, upper) = split(&mut items, bucket);
        log::trace!(
            "median cut split {} colors on channel {} into {} and {}",
            bucket.len(),
            bucket.channel,
            lower.len(),
            upper.len(),
        );
        queue.push(lower);
        queue.push(upper);
    }

    finished.extend(queue);
    finished.sort_unstable_by_key(|bucket| bucket.start);
    Ok(finished.iter().map(|bucket| bucket.average(&items)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_colors;
    use enough::Unstoppable;

    #[test]
    fn bounded_and_complete() {
        let colors = ColorCounts::from_pixels(test_colors(3000));
        for max in [1, 2, 3, 16, 255, 256, 2999, 3000, 5000] {
            let palette = palette(&colors, max, &Unstoppable).unwrap();
            assert_eq!(palette.len(), max.min(colors.len()), "{max}");
        }
    }

    #[test]
    fn splits_at_weighted_median() {
        let mut pixels = alloc::vec![Color32::from_rgb(0, 0, 0); 10];
        pixels.push(Color32::from_rgb(100, 0, 0));
        pixels.push(Color32::from_rgb(200, 0, 0));
        let colors = ColorCounts::from_pixels(pixels);
        let palette = palette(&colors, 2, &Unstoppable).unwrap();
        assert_eq!(palette, [Color32::BLACK, Color32::from_rgb(150, 0, 0)]);
    }

    #[test]
    fn widest_channel_is_split() {
        let colors = ColorCounts::from_pixels(alloc::vec![
            Color32::from_rgb(0, 0, 0),
            Color32::from_rgb(5, 0, 250),
            Color32::from_rgb(10, 0, 255),
        ]);
        let palette = palette(&colors, 2, &Unstoppable).unwrap();
        assert_eq!(palette, [Color32::BLACK, Color32::from_rgb(8, 0, 253)]);
    }
}
