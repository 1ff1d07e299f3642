// Referenced code: https://www.ece.mcmaster.ca/~xwu/cq.c
// and relevant paper (free access):
// Xiaolin Wu, Color quantization by dynamic programming and principal analysis,
// ACM Transactions on Graphics, vol. 11, no. 4, 348–372, 1992.
// https://doi.org/10.1145/146443.146475

//! Wu's color quantization.
//!
//! Colors are binned into a 3 dimensional histogram which is turned into cumulative moments, so
//! that the statistics of any box of bins take 8 lookups. Starting from the box of the whole
//! histogram, the box with the greatest variance is cut along the plane that minimizes the
//! summed variance of the two halves, until there are enough boxes.

use super::optimized::ColorCounts;
use crate::{Color32, Palette};
use alloc::{collections::BinaryHeap, vec::Vec};
use bytemuck::Zeroable;
use core::{
    cmp::Ordering,
    ops::{Add, AddAssign, Index, IndexMut, Sub},
};
use enough::{Stop, StopReason};
use num_traits::Zero;
use ordered_float::OrderedFloat;
#[cfg(feature = "threads")]
use rayon::prelude::*;

/// A box over a range of histogram bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cube {
    /// The lower bin indices (inclusive).
    min: [u8; 3],
    /// The upper bin indices (exclusive).
    max: [u8; 3],
}

/// A cube and its variance.
struct CubeVar(Cube, f64);

impl PartialOrd for CubeVar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CubeVar {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.1).cmp(&OrderedFloat(other.1))
    }
}

impl Eq for CubeVar {}

impl PartialEq for CubeVar {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

/// Statistics for a histogram bin.
#[derive(Debug, Clone, Copy, PartialEq, Zeroable)]
struct Stats {
    /// The number of pixels assigned to the bin.
    count: u64,
    /// The component-wise sum of the colors assigned to the bin.
    components: [u64; 3],
    /// The sum of the squared components of the colors assigned to the bin.
    sum_squared: f64,
}

impl Add for Stats {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            count: self.count + rhs.count,
            components: core::array::from_fn(|i| self.components[i] + rhs.components[i]),
            sum_squared: self.sum_squared + rhs.sum_squared,
        }
    }
}

impl Sub for Stats {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            count: self.count - rhs.count,
            components: core::array::from_fn(|i| self.components[i] - rhs.components[i]),
            sum_squared: self.sum_squared - rhs.sum_squared,
        }
    }
}

impl AddAssign for Stats {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.count += rhs.count;
        for i in 0..3 {
            self.components[i] += rhs.components[i];
        }
        self.sum_squared += rhs.sum_squared;
    }
}

impl Zero for Stats {
    #[inline]
    fn zero() -> Self {
        Self { count: 0, components: [0; 3], sum_squared: 0.0 }
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.count == 0
    }
}

/// A cube shaped histogram with `2^bits` bins per channel.
#[derive(Debug, Clone)]
struct Histogram {
    bits: u8,
    side: usize,
    bins: Vec<Stats>,
}

impl Index<[u8; 3]> for Histogram {
    type Output = Stats;

    #[inline]
    fn index(&self, [r, g, b]: [u8; 3]) -> &Self::Output {
        &self.bins[(usize::from(r) * self.side + usize::from(g)) * self.side + usize::from(b)]
    }
}

impl IndexMut<[u8; 3]> for Histogram {
    #[inline]
    fn index_mut(&mut self, [r, g, b]: [u8; 3]) -> &mut Self::Output {
        &mut self.bins[(usize::from(r) * self.side + usize::from(g)) * self.side + usize::from(b)]
    }
}

impl Histogram {
    /// Create an empty histogram. `bits` must be between 1 and 7.
    fn new(bits: u8) -> Self {
        debug_assert!((1..=7).contains(&bits));
        let side = 1 << bits;
        Self { bits, side, bins: bytemuck::zeroed_vec(side * side * side) }
    }

    #[inline]
    fn bin(&self, color: Color32) -> [u8; 3] {
        let shift = 8 - self.bits;
        [color.r >> shift, color.g >> shift, color.b >> shift]
    }

    /// Add the given colors and their counts to the histogram.
    fn add_color_counts(&mut self, colors: &[Color32], counts: &[u32]) {
        for (&color, &n) in colors.iter().zip(counts) {
            let bin = self.bin(color);
            let Stats { count, components, sum_squared } = &mut self[bin];
            let n = u64::from(n);
            let values = [color.r, color.g, color.b].map(u64::from);
            *count += n;
            for (c, v) in components.iter_mut().zip(values) {
                *c += n * v;
            }
            #[allow(clippy::cast_precision_loss)]
            {
                *sum_squared += n as f64 * sum_of_squares(values);
            }
        }
    }

    /// Merge two histograms by element-wise summing their bins.
    #[cfg(feature = "threads")]
    #[allow(clippy::needless_pass_by_value)]
    fn merge_partial(mut a: Self, b: Self) -> Self {
        for (a, &b) in a.bins.iter_mut().zip(&b.bins) {
            *a += b;
        }
        a
    }

    /// The per thread chunk size for `len` colors, at least a few histograms' worth of colors.
    #[cfg(feature = "threads")]
    fn chunk_size(len: usize, bits: u8) -> usize {
        let bins = 1usize << (3 * bits);
        let chunk_size = len.div_ceil(rayon::current_num_threads()).max(bins * 4);
        let num_chunks = len.div_ceil(chunk_size).max(1);
        len.div_ceil(num_chunks).max(1)
    }

    fn from_color_counts(colors: &ColorCounts, bits: u8) -> Self {
        #[cfg(feature = "threads")]
        {
            let chunk_size = Self::chunk_size(colors.colors.len(), bits);
            colors
                .colors
                .par_chunks(chunk_size)
                .zip(colors.counts.par_chunks(chunk_size))
                .map(|(colors, counts)| {
                    let mut hist = Self::new(bits);
                    hist.add_color_counts(colors, counts);
                    hist
                })
                .reduce_with(Self::merge_partial)
                .unwrap_or_else(|| Self::new(bits))
        }
        #[cfg(not(feature = "threads"))]
        {
            let mut hist = Self::new(bits);
            hist.add_color_counts(&colors.colors, &colors.counts);
            hist
        }
    }

    /// Create moments from the histogram bins to allow inclusion-exclusion lookups/calculations.
    fn calc_cumulative_moments(&mut self) {
        #[allow(clippy::cast_possible_truncation)]
        let side = self.side as u8;
        let mut area = alloc::vec![Stats::zero(); self.side];
        for r in 0..side {
            area.fill(Stats::zero());
            for g in 0..side {
                let mut line = Stats::zero();
                for b in 0..side {
                    let area = &mut area[usize::from(b)];
                    line += self[[r, g, b]];
                    *area += line;

                    if r == 0 {
                        self[[r, g, b]] = *area;
                    } else {
                        self[[r, g, b]] = self[[r - 1, g, b]] + *area;
                    }
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn dims(&self) -> [u8; 3] {
        [self.side as u8; 3]
    }
}

/// This macro generates code for a fixed number of recursive calls to a volume function.
macro_rules! ndvolume {
    ($self: ident, $min: ident, $max: ident, $index: ident; $n: literal $(, $ns: literal)* $(,)?) => {{
        $index[$n] = $max[$n] - 1;
        let upper = ndvolume!($self, $min, $max, $index; $($ns,)*);

        let lower = if $min[$n] == 0 {
            Zero::zero()
        } else {
            $index[$n] = $min[$n] - 1;
            ndvolume!($self, $min, $max, $index; $($ns,)*)
        };

        upper - lower
    }};
    ($self: ident, $min: ident, $max: ident, $index: ident;) => {
        $self[$index]
    };
}

impl Histogram {
    /// Returns the sum of the histogram bins specified by the given cube.
    fn volume(&self, Cube { min, max }: Cube) -> Stats {
        let mut index = [0u8; 3];
        ndvolume!(self, min, max, index; 0, 1, 2)
    }

    /// Returns the sum of the histogram bins specified by the given cube
    /// but with one of the dimensions fixed to the given bin.
    fn volume_at(&self, Cube { min, max }: Cube, dim: usize, bin: u8) -> Stats {
        if bin == 0 {
            return Stats::zero();
        }
        let mut index = [0u8; 3];
        index[dim] = bin - 1;
        match dim {
            0 => ndvolume!(self, min, max, index; 1, 2),
            1 => ndvolume!(self, min, max, index; 0, 2),
            _ => ndvolume!(self, min, max, index; 0, 1),
        }
    }

    /// Compute the variance of the given cube.
    fn variance(&self, cube: Cube) -> f64 {
        if (0..3).all(|c| cube.max[c] - cube.min[c] == 1) {
            0.0
        } else {
            let Stats { count, components, sum_squared } = self.volume(cube);
            #[allow(clippy::cast_precision_loss)]
            let count = count as f64;
            sum_squared - sum_of_squares(components) / count
        }
    }

    /// Attempts to cut the given cube to give a lower variance.
    fn cut(&self, cube: Cube) -> Option<(Cube, Cube)> {
        let sum = self.volume(cube);

        (0..3)
            .filter_map(|dim| {
                let bottom = cube.min[dim];
                let top = cube.max[dim];
                let base = self.volume_at(cube, dim, bottom);

                ((bottom + 1)..top)
                    .filter_map(|bin| {
                        let upper = self.volume_at(cube, dim, bin) - base;
                        let lower = sum - upper;
                        if upper.count == 0 || lower.count == 0 {
                            None
                        } else {
                            #[allow(clippy::cast_precision_loss)]
                            let upper2 = sum_of_squares(upper.components) / upper.count as f64;
                            #[allow(clippy::cast_precision_loss)]
                            let lower2 = sum_of_squares(lower.components) / lower.count as f64;
                            Some(((dim, bin), -(upper2 + lower2)))
                        }
                    })
                    .min_by_key(|&(_, v)| OrderedFloat(v))
            })
            .min_by_key(|&(_, v)| OrderedFloat(v))
            .map(|((d, cut), _)| {
                let mut cube1 = cube;
                let mut cube2 = cube;
                cube1.max[d] = cut;
                cube2.min[d] = cut;
                (cube1, cube2)
            })
    }

    /// Returns the disjoint cubes resulting from Wu's color quantization method.
    fn cubes(&self, k: usize, stop: &dyn Stop) -> Result<Vec<Cube>, StopReason> {
        let whole_cube = Cube { min: [0; 3], max: self.dims() };
        if self.volume(whole_cube).count == 0 {
            return Ok(Vec::new());
        }

        let mut queue = BinaryHeap::with_capacity(k);
        queue.push(CubeVar(whole_cube, f64::INFINITY));

        while queue.len() < k {
            // there should always be one cube, since at least one cube is added back for each popped
            #[allow(clippy::expect_used)]
            let CubeVar(cube, variance) = queue.pop().expect("at least one cube");

            if variance.partial_cmp(&0.0).is_none_or(Ordering::is_le) {
                // all cubes cannot be cut further
                queue.push(CubeVar(cube, variance));
                break;
            }

            stop.check()?;
            if let Some((cube1, cube2)) = self.cut(cube) {
                log::trace!("wu cut {:?}..{:?} at {:?}", cube.min, cube.max, cube1.max);
                queue.push(CubeVar(cube1, self.variance(cube1)));
                queue.push(CubeVar(cube2, self.variance(cube2)));
            } else {
                queue.push(CubeVar(cube, 0.0));
            }
        }

        Ok(queue.into_iter().map(|CubeVar(cube, _)| cube).collect())
    }

    /// Returns the average color of the given cube.
    #[allow(clippy::cast_possible_truncation)]
    fn cube_color(&self, cube: Cube) -> Color32 {
        let Stats { count, components, .. } = self.volume(cube);
        debug_assert!(count > 0);
        let [r, g, b] = components.map(|c| ((c + count / 2) / count) as u8);
        Color32::from_rgb(r, g, b)
    }
}

/// Returns the sum of the squares of the given components.
#[inline]
#[allow(clippy::cast_precision_loss)]
fn sum_of_squares(components: [u64; 3]) -> f64 {
    let mut square = 0.0;
    for c in components {
        let c = c as f64;
        square += c * c;
    }
    square
}

/// Maps each histogram bin to the index of the cube that contains it.
struct CubeLookup {
    bits: u8,
    indices: Vec<u16>,
}

impl CubeLookup {
    fn new(hist: &Histogram, cubes: &[Cube]) -> Self {
        let mut indices = alloc::vec![0u16; hist.bins.len()];
        for (i, Cube { min, max }) in cubes.iter().enumerate() {
            // at most 65536 cubes
            #[allow(clippy::cast_possible_truncation)]
            let i = i as u16;
            for r in min[0]..max[0] {
                for g in min[1]..max[1] {
                    for b in min[2]..max[2] {
                        let index = (usize::from(r) * hist.side + usize::from(g)) * hist.side
                            + usize::from(b);
                        indices[index] = i;
                    }
                }
            }
        }
        Self { bits: hist.bits, indices }
    }

    #[inline]
    fn get(&self, color: Color32) -> u32 {
        let shift = 8 - self.bits;
        let side = 1usize << self.bits;
        let [r, g, b] = [color.r, color.g, color.b].map(|c| usize::from(c >> shift));
        u32::from(self.indices[(r * side + g) * side + b])
    }
}

/// The default histogram resolution for a palette of `max_colors` entries.
fn default_bits(max_colors: usize) -> u8 {
    if max_colors <= 256 { 5 } else { 6 }
}

/// Build a palette of at most `max_colors` entries from `colors`, which must not be empty.
///
/// Also returns a lookup from colors to the palette entry of the box they fall into.
pub(crate) fn palette(
    colors: &ColorCounts,
    max_colors: usize,
    bit_level: Option<u8>,
    stop: &dyn Stop,
) -> Result<(Vec<Color32>, impl Fn(Color32) -> u32 + Send + Sync + 'static), StopReason> {
    let bits = bit_level.unwrap_or_else(|| default_bits(max_colors)).clamp(1, 7);
    stop.check()?;
    let mut hist = Histogram::from_color_counts(colors, bits);
    hist.calc_cumulative_moments();

    let cubes = hist.cubes(max_colors.min(Palette::MAX_LEN), stop)?;
    let entries = cubes.iter().map(|&cube| hist.cube_color(cube)).collect();

    let lookup = CubeLookup::new(&hist, &cubes);
    Ok((entries, move |color| lookup.get(color)))
}
