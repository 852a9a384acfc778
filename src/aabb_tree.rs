use tracing::debug_span;

use crate::aabb::{overlap, Aabb, AabbSphere};

/// Maximum number of points stored in a single leaf bucket.
const LEAF_CAPACITY: usize = 4;

#[derive(Clone, Copy, Debug)]
struct AabbNode {
    lower: [f64; 3],
    upper: [f64; 3],
    /// Number of additional nodes to jump over when the subtree rooted here
    /// is rejected (subtree size minus one); zero for leaves.
    skip: u32,
    /// Start of the leaf bucket in `tags`, or `u32::MAX` for internal nodes.
    start: u32,
    end: u32,
}

impl AabbNode {
    fn is_leaf(&self) -> bool {
        self.start != u32::MAX
    }
}

/// A static binary tree over point AABBs, stored as a flat array of nodes in
/// pre-order. Each node carries a skip offset so that traversal never needs
/// an explicit stack: advance by one on overlap, by `skip + 1` on a miss.
///
/// The tree is built once by recursive median split along the longest axis
/// of the node's bounding box and is immutable afterwards.
pub struct AabbTree {
    nodes: Vec<AabbNode>,
    /// Point indices, grouped per leaf bucket in pre-order.
    tags: Vec<usize>,
}

impl AabbTree {
    /// Builds the tree from an array of leaf AABBs.
    pub fn build(aabbs: &[Aabb]) -> Self {
        let _span = debug_span!("AabbTree::build", n_points = aabbs.len()).entered();

        let mut tree = AabbTree {
            nodes: Vec::new(),
            tags: Vec::with_capacity(aabbs.len()),
        };
        if aabbs.is_empty() {
            return tree;
        }

        // A median-split tree over n leaves of capacity LEAF_CAPACITY has
        // fewer than 2 * (n / LEAF_CAPACITY + 1) nodes.
        tree.nodes.reserve(2 * (aabbs.len() / LEAF_CAPACITY + 1));

        let mut order: Vec<u32> = (0..aabbs.len() as u32).collect();
        tree.build_range(aabbs, &mut order, 0, aabbs.len());
        tree
    }

    /// Recursively emits the subtree for `order[start..end]` and returns its
    /// node count.
    fn build_range(&mut self, aabbs: &[Aabb], order: &mut [u32], start: usize, end: usize) -> u32 {
        let count = end - start;

        // Union box over the range
        let mut lower = [f64::INFINITY; 3];
        let mut upper = [f64::NEG_INFINITY; 3];
        for &i in &order[start..end] {
            let aabb = &aabbs[i as usize];
            for axis in 0..3 {
                if aabb.lower[axis] < lower[axis] {
                    lower[axis] = aabb.lower[axis];
                }
                if aabb.upper[axis] > upper[axis] {
                    upper[axis] = aabb.upper[axis];
                }
            }
        }

        if count <= LEAF_CAPACITY {
            let tag_start = self.tags.len() as u32;
            self.tags
                .extend(order[start..end].iter().map(|&i| aabbs[i as usize].tag));
            self.nodes.push(AabbNode {
                lower,
                upper,
                skip: 0,
                start: tag_start,
                end: self.tags.len() as u32,
            });
            return 1;
        }

        // Split along the longest axis at the median of centers
        let ex = upper[0] - lower[0];
        let ey = upper[1] - lower[1];
        let ez = upper[2] - lower[2];
        let axis = if ex >= ey && ex >= ez {
            0
        } else if ey >= ez {
            1
        } else {
            2
        };

        let mid = count / 2;
        order[start..end].select_nth_unstable_by(mid, |&a, &b| {
            let ca = aabbs[a as usize].center()[axis];
            let cb = aabbs[b as usize].center()[axis];
            ca.partial_cmp(&cb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let node_idx = self.nodes.len();
        self.nodes.push(AabbNode {
            lower,
            upper,
            skip: 0,
            start: u32::MAX,
            end: 0,
        });

        let left = self.build_range(aabbs, order, start, start + mid);
        let right = self.build_range(aabbs, order, start + mid, end);

        self.nodes[node_idx].skip = left + right;
        1 + left + right
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_leaf(&self, idx: usize) -> bool {
        self.nodes[idx].is_leaf()
    }

    /// Number of nodes to jump over (in addition to the unconditional
    /// advance by one) when the subtree at `idx` is rejected.
    pub fn skip(&self, idx: usize) -> usize {
        self.nodes[idx].skip as usize
    }

    /// Whether the query sphere intersects the node's box.
    pub fn node_overlaps(&self, idx: usize, sphere: &AabbSphere) -> bool {
        let node = &self.nodes[idx];
        overlap(&node.lower, &node.upper, sphere)
    }

    /// Number of points in the leaf bucket at `idx`.
    pub fn leaf_len(&self, idx: usize) -> usize {
        let node = &self.nodes[idx];
        (node.end - node.start) as usize
    }

    /// The p-th point tag in the leaf bucket at `idx`.
    pub fn leaf_tag(&self, idx: usize, p: usize) -> usize {
        self.tags[self.nodes[idx].start as usize + p]
    }
}
