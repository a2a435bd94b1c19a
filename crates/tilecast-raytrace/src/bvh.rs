//! Bounding volume hierarchy over world objects.
//!
//! Median split on the longest axis of each range, stored pre-order in a
//! flat arena that the kernel (CPU or GPU) walks with an explicit stack.
//!
//! Every subtree's node count depends only on its object count, so each
//! node's arena slot is known before its children are built. Left and right
//! subtrees therefore own disjoint slices of the arena and can be built in
//! parallel; the layout is identical for any thread count.

use std::time::Instant;

use thiserror::Error;
use tilecast_math::Aabb;
use tilecast_scene::WorldObject;

/// Capacity of the kernel's traversal stack.
pub const STACK_SIZE: usize = 64;

/// Deepest leaf the traversal stack can reach (root at depth 0).
pub const MAX_DEPTH: usize = STACK_SIZE - 1;

/// Errors from BVH construction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhError {
    /// The tree is deeper than the traversal stack allows.
    #[error("BVH depth {depth} exceeds traversal limit {limit}")]
    TooDeep {
        /// Depth of the deepest leaf.
        depth: usize,
        /// Largest supported depth.
        limit: usize,
    },
}

/// Build parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvhSettings {
    /// Ranges with at most this many objects become leaves.
    pub leaf_threshold: usize,
    /// Ranges with at least this many objects build their halves in parallel.
    pub parallel_threshold: usize,
}

impl Default for BvhSettings {
    fn default() -> Self {
        Self {
            leaf_threshold: 1,
            parallel_threshold: 1024,
        }
    }
}

impl BvhSettings {
    fn leaf_size(&self) -> usize {
        self.leaf_threshold.max(1)
    }
}

/// A node in the flattened hierarchy.
///
/// Leaves have both child indices at `-1`. Every node records the range of
/// [`Bvh::objects`] under it in `start`/`count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode {
    /// Union of the bounds of every object under this node.
    pub bounds: Aabb,
    /// Arena index of the left child, `-1` for leaves.
    pub left: i32,
    /// Arena index of the right child, `-1` for leaves.
    pub right: i32,
    /// First object index.
    pub start: u32,
    /// Number of objects.
    pub count: u32,
}

impl FlatNode {
    fn leaf(bounds: Aabb, start: usize, count: usize) -> Self {
        Self {
            bounds,
            left: -1,
            right: -1,
            start: start as u32,
            count: count as u32,
        }
    }

    /// True if both children are absent.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.left < 0 && self.right < 0
    }
}

/// Flattened BVH plus the objects it indexes, reordered so each leaf covers
/// a contiguous range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bvh {
    nodes: Vec<FlatNode>,
    objects: Vec<WorldObject>,
    depth: usize,
}

impl Bvh {
    /// Build a hierarchy, taking ownership of the objects.
    ///
    /// An empty input yields a single leaf with empty bounds that no ray
    /// can hit.
    pub fn build(mut objects: Vec<WorldObject>, settings: &BvhSettings) -> Result<Self, BvhError> {
        let started = Instant::now();
        let leaf_size = settings.leaf_size();
        let mut nodes = vec![FlatNode::leaf(Aabb::empty(), 0, 0); subtree_size(objects.len(), leaf_size)];

        let depth = build_range(&mut objects, &mut nodes, 0, 0, settings);
        if depth > MAX_DEPTH {
            return Err(BvhError::TooDeep {
                depth,
                limit: MAX_DEPTH,
            });
        }

        log::debug!(
            "built BVH: {} objects, {} nodes, depth {} in {:?}",
            objects.len(),
            nodes.len(),
            depth,
            started.elapsed()
        );

        Ok(Self {
            nodes,
            objects,
            depth,
        })
    }

    /// Node arena; the root is at index 0.
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Objects in leaf order.
    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    /// Total node count.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Depth of the deepest leaf (a lone root has depth 0).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bounds of the whole scene.
    pub fn bounds(&self) -> Aabb {
        self.nodes[0].bounds
    }
}

/// Depth a median-split tree reaches for `count` objects.
///
/// `2^k` objects with one object per leaf give depth `k`.
pub fn expected_depth(count: usize, leaf_threshold: usize) -> usize {
    let leaf_size = leaf_threshold.max(1);
    let mut depth = 0;
    let mut largest = count;
    while largest > leaf_size {
        largest -= largest / 2;
        depth += 1;
    }
    depth
}

/// Nodes needed for a range of `count` objects.
fn subtree_size(count: usize, leaf_size: usize) -> usize {
    if count <= leaf_size {
        1
    } else {
        let mid = count / 2;
        1 + subtree_size(mid, leaf_size) + subtree_size(count - mid, leaf_size)
    }
}

/// Build the subtree for `objects` into `nodes` (exactly its subtree size).
///
/// `index` is the arena position of `nodes[0]` and `offset` the position of
/// `objects[0]` in the full object array. Returns the subtree depth.
fn build_range(
    objects: &mut [WorldObject],
    nodes: &mut [FlatNode],
    index: usize,
    offset: usize,
    settings: &BvhSettings,
) -> usize {
    let bounds = objects
        .iter()
        .fold(Aabb::empty(), |acc, o| acc.union(&o.bounds()));

    let Some((node, children)) = nodes.split_first_mut() else {
        return 0;
    };
    *node = FlatNode::leaf(bounds, offset, objects.len());

    let len = objects.len();
    if len <= settings.leaf_size() {
        return 0;
    }

    let axis = bounds.longest_axis();
    objects.sort_by(|a, b| axis.of(&a.position()).total_cmp(&axis.of(&b.position())));

    let mid = len / 2;
    let (left_objects, right_objects) = objects.split_at_mut(mid);
    let left_size = subtree_size(mid, settings.leaf_size());
    let (left_nodes, right_nodes) = children.split_at_mut(left_size);
    let left_index = index + 1;
    let right_index = left_index + left_size;

    let mut build_left = || build_range(left_objects, left_nodes, left_index, offset, settings);
    let mut build_right = || build_range(right_objects, right_nodes, right_index, offset + mid, settings);
    let (left_depth, right_depth) = if len >= settings.parallel_threshold {
        rayon::join(build_left, build_right)
    } else {
        (build_left(), build_right())
    };

    node.left = left_index as i32;
    node.right = right_index as i32;
    1 + left_depth.max(right_depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_math::{Color, Vec3};
    use tilecast_scene::ObjectKind;

    fn grid(n: usize) -> Vec<WorldObject> {
        (0..n)
            .map(|i| {
                let x = (i % 7) as f32 * 64.0;
                let z = (i / 7) as f32 * 64.0;
                let y = ((i * 13) % 5) as f32 * 16.0;
                WorldObject::new(
                    Vec3::new(x, y, z),
                    Vec3::new(64.0, 64.0 + (i % 3) as f32 * 32.0, 64.0),
                    Color::rgba(i as u8, 0, 0, 255),
                    ObjectKind::Tile,
                )
            })
            .collect()
    }

    fn check_invariants(bvh: &Bvh) {
        let nodes = bvh.nodes();
        let mut covered = vec![0u32; bvh.objects().len()];
        for node in nodes {
            if node.is_leaf() {
                assert_eq!(node.left, -1);
                assert_eq!(node.right, -1);
                for i in node.start..node.start + node.count {
                    let obj = &bvh.objects()[i as usize];
                    assert!(node.bounds.contains(&obj.bounds()));
                    covered[i as usize] += 1;
                }
            } else {
                assert!(node.left >= 0 && node.right >= 0);
                let l = &nodes[node.left as usize];
                let r = &nodes[node.right as usize];
                assert_eq!(node.bounds, l.bounds.union(&r.bounds));
                assert_eq!(node.count, l.count + r.count);
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_node_counts() {
        for n in [1, 2, 3, 7, 64, 100] {
            let bvh = Bvh::build(grid(n), &BvhSettings::default()).unwrap();
            assert_eq!(bvh.leaf_count(), n);
            assert_eq!(bvh.node_count(), 2 * n - 1);
            check_invariants(&bvh);
        }
    }

    #[test]
    fn test_empty_scene_is_one_leaf() {
        let bvh = Bvh::build(Vec::new(), &BvhSettings::default()).unwrap();
        assert_eq!(bvh.node_count(), 1);
        assert!(bvh.nodes()[0].is_leaf());
        assert_eq!(bvh.nodes()[0].count, 0);
        assert!(bvh.bounds().is_empty());
        assert_eq!(bvh.depth(), 0);
    }

    #[test]
    fn test_depth_of_power_of_two() {
        for k in 0..8 {
            let n = 1usize << k;
            let bvh = Bvh::build(grid(n), &BvhSettings::default()).unwrap();
            assert_eq!(bvh.depth(), k);
            assert_eq!(expected_depth(n, 1), k);
        }
        // Depth grows as ceil(log2 n), far below the stack limit.
        assert_eq!(expected_depth(1_000_000, 1), 20);
        assert_eq!(expected_depth(1 << 40, 1), 40);
    }

    #[test]
    fn test_leaf_threshold_two() {
        let settings = BvhSettings {
            leaf_threshold: 2,
            ..Default::default()
        };
        let bvh = Bvh::build(grid(8), &settings).unwrap();
        assert_eq!(bvh.leaf_count(), 4);
        assert_eq!(bvh.node_count(), 7);
        assert!(bvh.nodes().iter().filter(|n| n.is_leaf()).all(|n| n.count == 2));
        check_invariants(&bvh);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let sequential = BvhSettings {
            parallel_threshold: usize::MAX,
            ..Default::default()
        };
        let parallel = BvhSettings {
            parallel_threshold: 2,
            ..Default::default()
        };
        let a = Bvh::build(grid(500), &sequential).unwrap();
        let b = Bvh::build(grid(500), &parallel).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let a = Bvh::build(grid(77), &BvhSettings::default()).unwrap();
        let b = Bvh::build(grid(77), &BvhSettings::default()).unwrap();
        assert_eq!(a.nodes(), b.nodes());
        assert_eq!(a.objects(), b.objects());
    }

    #[test]
    fn test_split_axis_tie_prefers_z() {
        // Two cubes stacked along Y inside a cube-shaped union: all extents tie.
        let cube = |y: f32| {
            WorldObject::new(Vec3::new(0.0, y, 0.0), Vec3::new(2.0, 1.0, 2.0), Color::WHITE, ObjectKind::Object)
        };
        let bvh = Bvh::build(vec![cube(0.5), cube(-0.5)], &BvhSettings::default()).unwrap();
        assert_eq!(bvh.bounds().longest_axis(), tilecast_math::Axis::Z);
        // Equal Z keys keep input order under the stable sort.
        assert_eq!(bvh.objects()[0].position().y, 0.5);
    }

    #[test]
    fn test_pre_order_layout() {
        let bvh = Bvh::build(grid(4), &BvhSettings::default()).unwrap();
        let root = bvh.nodes()[0];
        assert_eq!(root.left, 1);
        assert_eq!(root.right, 4);
        assert_eq!(bvh.nodes()[1].left, 2);
        assert_eq!(bvh.nodes()[1].right, 3);
    }
}
