//! # Octree Flattening
//!
//! Serializes a [`SparseVoxelOctree`] into the record buffer consumed by the
//! ray-marching kernel.
//!
//! ## Record Layout
//!
//! ```text
//! offset  field         meaning
//! ------  ------------  --------------------------------------------
//!      0  parent_index  record index of the parent, -1 for the root
//!      4  empty         1 until a voxel lands in this cube, else 0
//!      8  value         material index, -1 if none
//!     12  x, y, z       cube origin
//!     24  size          cube edge length
//!     28  children[8]   record index per octant code, -1 if absent
//! ------  ------------
//!     60  (stride)
//! ```
//!
//! Records are in pre-order: index 0 is the root, and every child index is
//! larger than its parent's. Only subdivided nodes have child links; leaves
//! and never-filled nodes keep all eight at -1.
//!
//! THE LAYOUT IS SHARED WITH THE GPU KERNEL. Changing field order or the
//! sentinel breaks every shader reading this buffer.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;
use tracing::debug;

use crate::octree::{NodeId, OctreeNode, SparseVoxelOctree, ROOT};

/// Index value meaning "no record".
pub const NO_INDEX: i32 = -1;

/// Value meaning "no material".
pub const NO_VALUE: i32 = -1;

/// One flattened octree node.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq, Eq, Hash)]
pub struct OctreeRecord {
    /// Parent record index, [`NO_INDEX`] for the root.
    pub parent_index: i32,
    /// 1 if empty, 0 if filled.
    pub empty: i32,
    /// Material index, or [`NO_VALUE`].
    pub value: i32,
    /// Origin X.
    pub x: i32,
    /// Origin Y.
    pub y: i32,
    /// Origin Z.
    pub z: i32,
    /// Edge length.
    pub size: i32,
    /// Child record index per octant code, or [`NO_INDEX`].
    pub children: [i32; 8],
}

const _: () = assert!(std::mem::size_of::<OctreeRecord>() == 60);

impl OctreeRecord {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds an unlinked record for a node.
    #[must_use]
    pub fn from_node(node: &OctreeNode, parent_index: i32) -> Self {
        let [x, y, z] = node.origin();
        Self {
            parent_index,
            empty: i32::from(node.is_empty()),
            value: node.value().map_or(NO_VALUE, |v| v as i32),
            x,
            y,
            z,
            size: node.size() as i32,
            children: [NO_INDEX; 8],
        }
    }

    /// True if the node subdivided: filled, but holding no value.
    #[inline]
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.empty == 0 && self.value == NO_VALUE
    }

    /// True if any child link is set.
    #[inline]
    #[must_use]
    pub fn has_children(&self) -> bool {
        self.children.iter().any(|&c| c != NO_INDEX)
    }
}

impl fmt::Display for OctreeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parent={} empty={} value={} pos=({}, {}, {}) size={} children={:?}",
            self.parent_index,
            self.empty,
            self.value,
            self.x,
            self.y,
            self.z,
            self.size,
            self.children
        )
    }
}

/// Structural problems found by [`FlattenedOctree::validate`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The buffer has no root record.
    #[error("flattened octree is empty")]
    Empty,

    /// The root record has a parent.
    #[error("root record has parent {0}")]
    RootHasParent(i32),

    /// A child link points outside the buffer or not past its parent.
    #[error("record {record} octant {octant} links to invalid index {child}")]
    BadChild {
        /// Linking record.
        record: usize,
        /// Octant code of the link.
        octant: usize,
        /// Linked index.
        child: i32,
    },

    /// A child record does not name its linking record as parent.
    #[error("record {child} is linked from {record} but names parent {parent}")]
    ParentMismatch {
        /// Linking record.
        record: usize,
        /// Linked record.
        child: usize,
        /// Parent stored in the linked record.
        parent: i32,
    },

    /// A leaf or empty record carries child links.
    #[error("record {0} is not subdivided but has child links")]
    UnexpectedChildren(usize),

    /// A subdivided record is missing some of its eight links.
    #[error("record {0} is subdivided but missing child links")]
    MissingChildren(usize),

    /// A non-root record is not linked from any parent.
    #[error("record {0} is not reachable from the root")]
    Unreachable(usize),
}

/// The flattened, index-linked octree buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedOctree {
    records: Vec<OctreeRecord>,
}

impl FlattenedOctree {
    /// Flattens an octree in pre-order, children in octant order `0..7`.
    #[must_use]
    pub fn flatten(octree: &SparseVoxelOctree) -> Self {
        let nodes = octree.nodes();
        let mut records: Vec<OctreeRecord> = Vec::with_capacity(nodes.len());

        // (node, (parent record, octant))
        let mut stack: Vec<(NodeId, Option<(usize, usize)>)> = vec![(ROOT, None)];

        while let Some((id, link)) = stack.pop() {
            let node = &nodes[id];
            let index = records.len();

            let parent_index = match link {
                Some((parent, octant)) => {
                    records[parent].children[octant] = index as i32;
                    parent as i32
                }
                None => NO_INDEX,
            };
            records.push(OctreeRecord::from_node(node, parent_index));

            if let Some(children) = node.children() {
                for (octant, &child) in children.iter().enumerate().rev() {
                    stack.push((child, Some((index, octant))));
                }
            }
        }

        debug!(records = records.len(), "octree flattened");
        Self { records }
    }

    /// All records in index order.
    #[inline]
    #[must_use]
    pub fn records(&self) -> &[OctreeRecord] {
        &self.records
    }

    /// Number of records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if there are no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Gets a record by index.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&OctreeRecord> {
        self.records.get(index)
    }

    /// Returns the buffer as bytes for GPU upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }

    /// Consumes the buffer, returning the records.
    #[must_use]
    pub fn into_records(self) -> Vec<OctreeRecord> {
        self.records
    }

    /// Checks the pre-order linking invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`LinkError`] found.
    pub fn validate(&self) -> Result<(), LinkError> {
        let root = self.records.first().ok_or(LinkError::Empty)?;
        if root.parent_index != NO_INDEX {
            return Err(LinkError::RootHasParent(root.parent_index));
        }

        let len = self.records.len();
        let mut linked = vec![false; len];

        for (index, record) in self.records.iter().enumerate() {
            if !record.is_internal() {
                if record.has_children() {
                    return Err(LinkError::UnexpectedChildren(index));
                }
                continue;
            }

            for (octant, &child) in record.children.iter().enumerate() {
                if child == NO_INDEX {
                    return Err(LinkError::MissingChildren(index));
                }
                if child <= index as i32 || child as usize >= len {
                    return Err(LinkError::BadChild {
                        record: index,
                        octant,
                        child,
                    });
                }

                let child = child as usize;
                let parent = self.records[child].parent_index;
                if parent != index as i32 || linked[child] {
                    return Err(LinkError::ParentMismatch {
                        record: index,
                        child,
                        parent,
                    });
                }
                linked[child] = true;
            }
        }

        match linked.iter().skip(1).position(|&l| !l) {
            Some(orphan) => Err(LinkError::Unreachable(orphan + 1)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for FlattenedOctree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, record) in self.records.iter().enumerate() {
            writeln!(f, "#{index}: {record}")?;
        }
        Ok(())
    }
}
