//! Octree color quantization.
//!
//! Every level of the tree consumes one bit of each of the red, green, and blue components,
//! so a node has up to 8 children. Leaves accumulate the colors that reach them. While there are
//! more leaves than allowed, the least used node on the deepest level with children is reduced,
//! turning it into a leaf holding the colors of its whole subtree.

use super::optimized::ColorCounts;
use crate::Color32;
use alloc::vec::Vec;
use enough::{Stop, StopReason};

/// The tree depth used when none is configured.
const DEFAULT_LEVELS: u8 = 8;

/// Number of insertions between cancellation checks.
const CHECK_INTERVAL: usize = 1 << 14;

#[derive(Clone, Copy, Default)]
struct Node {
    children: [Option<u32>; 8],
    /// Pixels in the subtree.
    count: u64,
    /// Component sums of the pixels in the subtree.
    sum: [u64; 3],
    /// Reduced nodes are leaves even though their children remain in the arena.
    leaf: bool,
}

impl Node {
    fn child_count(&self) -> usize {
        self.children.iter().flatten().count()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn average(&self) -> Color32 {
        let avg = |sum: u64| ((sum + self.count / 2) / self.count) as u8;
        Color32::from_rgb(avg(self.sum[0]), avg(self.sum[1]), avg(self.sum[2]))
    }
}

struct Octree {
    nodes: Vec<Node>,
    levels: u8,
    leaves: usize,
    /// Nodes with children, by depth.
    reducible: Vec<Vec<u32>>,
}

impl Octree {
    fn new(levels: u8) -> Self {
        Self {
            nodes: alloc::vec![Node::default()],
            levels,
            leaves: 0,
            reducible: alloc::vec![Vec::new(); usize::from(levels)],
        }
    }

    #[inline]
    fn child_index(color: Color32, depth: u8) -> usize {
        let shift = 7 - depth;
        let bit = |c: u8| usize::from((c >> shift) & 1);
        bit(color.r) << 2 | bit(color.g) << 1 | bit(color.b)
    }

    fn insert(&mut self, color: Color32, count: u32) {
        let count = u64::from(count);
        let components = [color.r, color.g, color.b].map(|c| u64::from(c) * count);
        let mut node = 0usize;
        for depth in 0..=self.levels {
            let current = &mut self.nodes[node];
            current.count += count;
            for (sum, c) in current.sum.iter_mut().zip(components) {
                *sum += c;
            }
            if depth == self.levels {
                break;
            }

            let index = Self::child_index(color, depth);
            node = match current.children[index] {
                Some(child) => child as usize,
                None => {
                    #[allow(clippy::cast_possible_truncation)]
                    let child = self.nodes.len() as u32;
                    let current = &mut self.nodes[node];
                    #[allow(clippy::cast_possible_truncation)]
                    if current.child_count() == 0 {
                        self.reducible[usize::from(depth)].push(node as u32);
                    }
                    current.children[index] = Some(child);
                    self.nodes.push(Node::default());
                    if depth + 1 == self.levels {
                        self.leaves += 1;
                    }
                    child as usize
                }
            };
        }
    }

    /// Merge the children of `node` into it.
    fn reduce(&mut self, node: u32) {
        let node = &mut self.nodes[node as usize];
        self.leaves = self.leaves + 1 - node.child_count();
        node.leaf = true;
    }

    fn reduce_to(&mut self, max_leaves: usize, stop: &dyn Stop) -> Result<(), StopReason> {
        for depth in (0..usize::from(self.levels)).rev() {
            if self.leaves <= max_leaves {
                break;
            }
            stop.check()?;
            let mut nodes = core::mem::take(&mut self.reducible[depth]);
            // least used last
            nodes.sort_unstable_by_key(|&node| core::cmp::Reverse(self.nodes[node as usize].count));
            while self.leaves > max_leaves {
                let Some(node) = nodes.pop() else { break };
                self.reduce(node);
                log::trace!("octree reduced node {node} at depth {depth}, {} leaves", self.leaves);
            }
        }
        Ok(())
    }

    fn collect_leaves(&self, node: usize, depth: u8, out: &mut Vec<Color32>) {
        let current = &self.nodes[node];
        if current.leaf || depth == self.levels {
            out.push(current.average());
        } else {
            for &child in current.children.iter().flatten() {
                self.collect_leaves(child as usize, depth + 1, out);
            }
        }
    }
}

/// Build a palette of at most `max_colors` entries from `colors`, which must not be empty.
pub(crate) fn palette(
    colors: &ColorCounts,
    max_colors: usize,
    bit_level: Option<u8>,
    stop: &dyn Stop,
) -> Result<Vec<Color32>, StopReason> {
    let levels = bit_level.unwrap_or(DEFAULT_LEVELS).clamp(1, 8);
    let mut tree = Octree::new(levels);
    for (i, (&color, &count)) in colors.colors.iter().zip(&colors.counts).enumerate() {
        if i % CHECK_INTERVAL == 0 {
            stop.check()?;
        }
        tree.insert(color, count);
    }
    tree.reduce_to(max_colors, stop)?;

    let mut entries = Vec::with_capacity(tree.leaves);
    tree.collect_leaves(0, 0, &mut entries);
    debug_assert_eq!(entries.len(), tree.leaves);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_colors;
    use enough::Unstoppable;

    fn counts(colors: Vec<Color32>) -> ColorCounts {
        ColorCounts::from_pixels(colors)
    }

    #[test]
    fn leaves_match_palette() {
        let colors = counts(test_colors(5000));
        for max in [1, 2, 7, 8, 9, 64, 256, 4096] {
            let palette = palette(&colors, max, None, &Unstoppable).unwrap();
            assert!(!palette.is_empty());
            assert!(palette.len() <= max, "{max}: {}", palette.len());
        }
    }

    #[test]
    fn shallow_trees_merge_nearby_colors() {
        let colors = counts(alloc::vec![
            Color32::from_rgb(0, 0, 0),
            Color32::from_rgb(2, 2, 2),
            Color32::from_rgb(255, 255, 255),
        ]);
        let palette = palette(&colors, 256, Some(1), &Unstoppable).unwrap();
        assert_eq!(palette, [Color32::from_rgb(1, 1, 1), Color32::WHITE]);
    }

    #[test]
    fn reduction_weights_by_count() {
        let mut pixels = alloc::vec![Color32::from_rgb(0, 0, 0); 3];
        pixels.push(Color32::from_rgb(4, 4, 4));
        let palette = palette(&counts(pixels), 1, None, &Unstoppable).unwrap();
        assert_eq!(palette, [Color32::from_rgb(1, 1, 1)]);
    }
}
