//! # Sparse Voxel Octree
//!
//! Nodes live in a flat arena and reference their children by index, so the
//! tree has no owned-pointer recursion and is trivially `Clone`.
//!
//! ## Octant Layout
//!
//! ```text
//! code = bit0 (+X) | bit1 (+Y) | bit2 (+Z)
//!
//!   0: (0,0,0)  1: (h,0,0)  2: (0,h,0)  3: (h,h,0)
//!   4: (0,0,h)  5: (h,0,h)  6: (0,h,h)  7: (h,h,h)      h = size / 2
//! ```
//!
//! A node subdivides lazily: the first voxel accepted by a node with
//! `size > 1` allocates all 8 children at once, consecutively in the arena.
//! Nodes of size 1 are always leaves.
//!
//! Arena order is allocation order, not traversal order. The flattener
//! re-indexes in pre-order.

use tracing::{debug, warn};

use crate::config::InsertPolicy;
use crate::error::{ModelError, ModelResult};
use crate::loader::VoxelModel;

/// Index of a node in the octree arena.
pub type NodeId = usize;

/// Arena index of the root node.
pub const ROOT: NodeId = 0;

/// Largest root edge length. Record fields are `int32`, so the edge must fit.
pub const MAX_OCTREE_SIZE: u32 = 1 << 30;

/// Octant code for a position relative to a cube's center.
#[inline]
#[must_use]
pub fn octant_code(origin: [i32; 3], half: u32, position: [i32; 3]) -> usize {
    let mut code = 0;
    for axis in 0..3 {
        if i64::from(position[axis]) >= i64::from(origin[axis]) + i64::from(half) {
            code |= 1 << axis;
        }
    }
    code
}

/// Origin of the child cube with the given octant code.
#[inline]
#[must_use]
pub fn octant_origin(origin: [i32; 3], half: u32, code: usize) -> [i32; 3] {
    let mut child = origin;
    for axis in 0..3 {
        if code & (1 << axis) != 0 {
            child[axis] += half as i32;
        }
    }
    child
}

/// One cube of the octree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctreeNode {
    origin: [i32; 3],
    size: u32,
    empty: bool,
    value: Option<u32>,
    first_child: Option<NodeId>,
}

impl OctreeNode {
    const fn new(origin: [i32; 3], size: u32) -> Self {
        Self {
            origin,
            size,
            empty: true,
            value: None,
            first_child: None,
        }
    }

    /// Minimum corner of the cube.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> [i32; 3] {
        self.origin
    }

    /// Edge length, always a power of two.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// True until the node (or any descendant) accepts a voxel.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.empty
    }

    /// Material index held by a filled leaf.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> Option<u32> {
        self.value
    }

    /// True for size-1 nodes.
    #[inline]
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.size == 1
    }

    /// True if the node has subdivided.
    ///
    /// Equivalent to "not empty and holds no value".
    #[inline]
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.first_child.is_some()
    }

    /// Arena ids of the 8 children in octant order, if subdivided.
    #[must_use]
    pub fn children(&self) -> Option<[NodeId; 8]> {
        let first = self.first_child?;
        Some(std::array::from_fn(|octant| first + octant))
    }

    /// Returns true if `position` lies in `[origin, origin + size)` on every axis.
    #[inline]
    #[must_use]
    pub fn contains(&self, position: [i32; 3]) -> bool {
        (0..3).all(|axis| {
            let p = i64::from(position[axis]);
            let min = i64::from(self.origin[axis]);
            p >= min && p < min + i64::from(self.size)
        })
    }
}

/// Sparse voxel octree over a power-of-two cube.
#[derive(Debug, Clone)]
pub struct SparseVoxelOctree {
    nodes: Vec<OctreeNode>,
    policy: InsertPolicy,
    discarded: usize,
}

impl SparseVoxelOctree {
    /// Creates an empty octree.
    ///
    /// The stored size is the smallest power of two `>= size` (a requested
    /// size of 0 is treated as 1).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ExtentTooLarge`] if the rounded size exceeds
    /// [`MAX_OCTREE_SIZE`] or the cube does not fit in `i32` coordinates.
    pub fn new(origin: [i32; 3], size: u64) -> ModelResult<Self> {
        Self::with_policy(origin, size, InsertPolicy::default())
    }

    /// Creates an empty octree with an explicit insertion policy.
    ///
    /// # Errors
    ///
    /// Same as [`SparseVoxelOctree::new`].
    pub fn with_policy(origin: [i32; 3], size: u64, policy: InsertPolicy) -> ModelResult<Self> {
        let rounded = size.max(1).next_power_of_two();
        let fits = rounded <= u64::from(MAX_OCTREE_SIZE)
            && origin
                .iter()
                .all(|&o| i64::from(o) + rounded as i64 - 1 <= i64::from(i32::MAX));
        if !fits {
            return Err(ModelError::ExtentTooLarge { extent: size });
        }

        Ok(Self {
            nodes: vec![OctreeNode::new(origin, rounded as u32)],
            policy,
            discarded: 0,
        })
    }

    /// Builds the octree for a loaded model.
    ///
    /// The root sits at the origin and spans the model's largest extent.
    /// Voxel positions are shifted so the bounds minimum maps to the origin.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ExtentTooLarge`] for models too large to address.
    pub fn from_model(model: &VoxelModel, policy: InsertPolicy) -> ModelResult<Self> {
        let mut octree = Self::with_policy([0, 0, 0], model.bounds.max_extent(), policy)?;

        for voxel in &model.voxels {
            octree.insert(model.bounds.normalize(voxel.position), voxel.material_id);
        }

        debug!(
            size = octree.size(),
            nodes = octree.node_count(),
            policy = ?policy,
            "octree built"
        );
        if octree.discarded > 0 {
            warn!(discarded = octree.discarded, "voxels fell outside the octree root");
        }

        Ok(octree)
    }

    /// Inserts a voxel.
    ///
    /// Positions outside the root cube are silently discarded. Inserting at
    /// an occupied position overwrites the previous material.
    ///
    /// Returns true if the voxel was stored.
    pub fn insert(&mut self, position: [i32; 3], material: u32) -> bool {
        if !self.nodes[ROOT].contains(position) {
            self.discarded += 1;
            return false;
        }

        match self.policy {
            InsertPolicy::Direct => self.insert_direct(position, material),
            InsertPolicy::FanOut => self.insert_fan_out(ROOT, position, material),
        }
        true
    }

    /// Descends through the single containing octant per level.
    fn insert_direct(&mut self, position: [i32; 3], material: u32) {
        let mut id = ROOT;
        loop {
            let node = &mut self.nodes[id];
            node.empty = false;

            if node.size == 1 {
                node.value = Some(material);
                return;
            }

            let (origin, half, first_child) = (node.origin, node.size / 2, node.first_child);
            let first = match first_child {
                Some(first) => first,
                None => self.split(id),
            };
            id = first + octant_code(origin, half, position);
        }
    }

    /// Offers the voxel to every child; each bounds check decides.
    fn insert_fan_out(&mut self, id: NodeId, position: [i32; 3], material: u32) {
        if !self.nodes[id].contains(position) {
            return;
        }

        if self.nodes[id].size == 1 {
            let node = &mut self.nodes[id];
            node.empty = false;
            node.value = Some(material);
            return;
        }

        let first_child = self.nodes[id].first_child;
        let first = match first_child {
            Some(first) => first,
            None => self.split(id),
        };
        for child in first..first + 8 {
            self.insert_fan_out(child, position, material);
        }
        self.nodes[id].empty = false;
    }

    /// Allocates the 8 children of `id` and returns the first child's id.
    fn split(&mut self, id: NodeId) -> NodeId {
        let parent = self.nodes[id];
        debug_assert!(parent.first_child.is_none() && parent.size > 1);

        let half = parent.size / 2;
        let first = self.nodes.len();
        self.nodes.extend(
            (0..8).map(|code| OctreeNode::new(octant_origin(parent.origin, half, code), half)),
        );
        self.nodes[id].first_child = Some(first);
        first
    }

    /// The root node.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &OctreeNode {
        &self.nodes[ROOT]
    }

    /// Gets a node by arena id.
    #[inline]
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&OctreeNode> {
        self.nodes.get(id)
    }

    /// All nodes in arena (allocation) order.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    /// Root origin.
    #[inline]
    #[must_use]
    pub fn origin(&self) -> [i32; 3] {
        self.root().origin
    }

    /// Root edge length.
    #[inline]
    #[must_use]
    pub fn size(&self) -> u32 {
        self.root().size
    }

    /// Number of levels below the root (`log2(size)`).
    #[inline]
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.size().trailing_zeros()
    }

    /// Total nodes, including empty children of subdivided nodes.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves holding a material.
    #[must_use]
    pub fn filled_leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.value.is_some()).count()
    }

    /// Number of insertions discarded for lying outside the root.
    #[inline]
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Insertion policy in use.
    #[inline]
    #[must_use]
    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    /// Returns true if `position` lies inside the root cube.
    #[inline]
    #[must_use]
    pub fn contains(&self, position: [i32; 3]) -> bool {
        self.root().contains(position)
    }

    /// Material stored at `position`, if any.
    #[must_use]
    pub fn get(&self, position: [i32; 3]) -> Option<u32> {
        if !self.contains(position) {
            return None;
        }

        let mut node = self.root();
        loop {
            if node.size == 1 {
                return node.value;
            }
            let first = node.first_child?;
            node = &self.nodes[first + octant_code(node.origin, node.size / 2, position)];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn octree(size: u64, policy: InsertPolicy) -> SparseVoxelOctree {
        SparseVoxelOctree::with_policy([0, 0, 0], size, policy).unwrap()
    }

    #[test]
    fn test_size_rounds_to_power_of_two() {
        for (requested, expected) in [(0, 1), (1, 1), (2, 2), (3, 4), (5, 8), (8, 8), (100, 128)] {
            let tree = SparseVoxelOctree::new([0, 0, 0], requested).unwrap();
            assert_eq!(tree.size(), expected, "requested {requested}");
        }
    }

    #[test]
    fn test_size_limit() {
        assert!(SparseVoxelOctree::new([0, 0, 0], u64::from(MAX_OCTREE_SIZE)).is_ok());
        let err = SparseVoxelOctree::new([0, 0, 0], u64::from(MAX_OCTREE_SIZE) + 1).unwrap_err();
        assert!(matches!(err, ModelError::ExtentTooLarge { .. }));
        assert!(SparseVoxelOctree::new([i32::MAX, 0, 0], 2).is_err());
    }

    #[test]
    fn test_contains() {
        let tree = SparseVoxelOctree::new([0, 0, 0], 8).unwrap();
        assert!(tree.contains([0, 0, 0]));
        assert!(tree.contains([7, 7, 7]));
        assert!(!tree.contains([8, 8, 8]));
        assert!(!tree.contains([-1, 0, 0]));
        assert!(!tree.contains([0, 8, 0]));
    }

    #[test]
    fn test_octant_layout() {
        let mut tree = octree(2, InsertPolicy::Direct);
        tree.insert([0, 0, 0], 0);

        let children = tree.root().children().unwrap();
        let origins: Vec<[i32; 3]> = children.iter().map(|&c| tree.nodes()[c].origin()).collect();
        assert_eq!(
            origins,
            vec![
                [0, 0, 0],
                [1, 0, 0],
                [0, 1, 0],
                [1, 1, 0],
                [0, 0, 1],
                [1, 0, 1],
                [0, 1, 1],
                [1, 1, 1],
            ]
        );
        assert!(children.iter().all(|&c| tree.nodes()[c].size() == 1));
    }

    #[test]
    fn test_insert_into_unit_tree() {
        let mut tree = octree(1, InsertPolicy::Direct);
        assert!(tree.insert([0, 0, 0], 4));

        let root = tree.root();
        assert!(!root.is_empty());
        assert_eq!(root.value(), Some(4));
        assert!(root.children().is_none());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_insert_splits() {
        for policy in [InsertPolicy::Direct, InsertPolicy::FanOut] {
            let mut tree = octree(2, policy);
            tree.insert([0, 0, 0], 0);

            let root = tree.root();
            assert!(!root.is_empty());
            assert_eq!(root.value(), None);
            assert!(root.is_internal());
            assert_eq!(tree.node_count(), 9);
        }
    }

    #[test]
    fn test_out_of_bounds_is_noop() {
        for policy in [InsertPolicy::Direct, InsertPolicy::FanOut] {
            let mut tree = octree(4, policy);
            assert!(!tree.insert([4, 0, 0], 1));
            assert!(!tree.insert([0, -1, 0], 1));

            assert!(tree.root().is_empty());
            assert_eq!(tree.node_count(), 1);
            assert_eq!(tree.discarded(), 2);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut tree = octree(4, InsertPolicy::Direct);
        tree.insert([3, 2, 1], 0);
        tree.insert([3, 2, 1], 5);

        assert_eq!(tree.get([3, 2, 1]), Some(5));
        assert_eq!(tree.filled_leaf_count(), 1);
    }

    #[test]
    fn test_get() {
        let mut tree = octree(8, InsertPolicy::Direct);
        tree.insert([5, 1, 6], 2);

        assert_eq!(tree.get([5, 1, 6]), Some(2));
        assert_eq!(tree.get([5, 1, 7]), None);
        assert_eq!(tree.get([0, 0, 0]), None);
        assert_eq!(tree.get([9, 9, 9]), None);
    }

    #[test]
    fn test_ancestors_marked_filled() {
        let mut tree = octree(8, InsertPolicy::Direct);
        tree.insert([7, 7, 7], 1);

        let mut node = tree.root();
        while let Some(children) = node.children() {
            assert!(!node.is_empty());
            node = &tree.nodes()[children[7]];
        }
        assert_eq!(node.origin(), [7, 7, 7]);
        assert_eq!(node.value(), Some(1));
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_internal_means_filled_without_value() {
        let mut tree = octree(8, InsertPolicy::Direct);
        tree.insert([1, 2, 3], 0);
        tree.insert([6, 6, 0], 1);

        for node in tree.nodes() {
            assert_eq!(node.is_internal(), !node.is_empty() && node.value().is_none());
            if node.is_leaf() {
                assert!(node.children().is_none());
            }
        }
    }

    #[test]
    fn test_policies_build_identical_trees() {
        let positions = [[0, 0, 0], [15, 3, 9], [7, 8, 7], [15, 15, 15], [2, 14, 1], [7, 8, 7]];
        let mut direct = octree(16, InsertPolicy::Direct);
        let mut fan_out = octree(16, InsertPolicy::FanOut);

        for (material, position) in positions.iter().enumerate() {
            direct.insert(*position, material as u32);
            fan_out.insert(*position, material as u32);
        }

        assert_eq!(direct.nodes(), fan_out.nodes());
    }

    #[test]
    fn test_non_zero_origin() {
        let mut tree = SparseVoxelOctree::new([-4, 10, 0], 4).unwrap();
        assert!(tree.insert([-1, 13, 3], 9));
        assert!(!tree.insert([0, 13, 3], 9));
        assert_eq!(tree.get([-1, 13, 3]), Some(9));
    }
}
