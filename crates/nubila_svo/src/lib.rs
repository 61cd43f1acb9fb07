//! # Nubila Sparse Voxel Octree
//!
//! Imports point-cloud voxel models and bakes them into the flattened octree
//! buffer traversed by the ray-marching compute kernel.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        BAKE PIPELINE                         │
//! ├──────────────────────────────────────────────────────────────┤
//! │  .ply text → ModelLoader → Voxels + MaterialPalette          │
//! │                  ↓                                           │
//! │  SparseVoxelOctree (arena, single-voxel insert)              │
//! │                  ↓                                           │
//! │  FlattenedOctree (pre-order records) → GPU buffer            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The renderer consumes three things: the record buffer and its count, the
//! palette buffer and its count, and the model's `(width, height, depth)`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use nubila_svo::{BakeConfig, BakedModel};
//!
//! let baked = BakedModel::load("assets/models/castle.ply", BakeConfig::default())?;
//! upload_storage_buffer(3, baked.octree_bytes());
//! upload_storage_buffer(4, baked.palette_bytes());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bake;
pub mod config;
pub mod error;
pub mod flatten;
pub mod loader;
pub mod octree;
pub mod palette;
pub mod voxel;

pub use bake::BakedModel;
pub use config::{BakeConfig, InsertPolicy, LoaderConfig, OctreeConfig};
pub use error::{ModelError, ModelResult};
pub use flatten::{FlattenedOctree, LinkError, OctreeRecord, NO_INDEX, NO_VALUE};
pub use loader::{ModelLoader, VoxelModel};
pub use octree::{OctreeNode, SparseVoxelOctree};
pub use palette::{Material, MaterialPalette};
pub use voxel::{ModelBounds, Voxel};
