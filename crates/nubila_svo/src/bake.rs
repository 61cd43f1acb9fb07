//! # Model Baking
//!
//! Load → insert → flatten, and the queries the renderer needs afterward.
//!
//! ```text
//! model file ──► ModelLoader ──► VoxelModel (voxels + palette + bounds)
//!                                    │
//!                                    ▼
//!                          SparseVoxelOctree::from_model
//!                                    │
//!                                    ▼
//!                          FlattenedOctree::flatten ──► GPU buffers
//! ```
//!
//! Baking is single-threaded and deterministic: the same file always yields
//! byte-identical buffers, so a reload never shifts the indices the kernel
//! addresses.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::BakeConfig;
use crate::error::ModelResult;
use crate::flatten::{FlattenedOctree, OctreeRecord};
use crate::loader::{ModelLoader, VoxelModel};
use crate::octree::SparseVoxelOctree;
use crate::palette::MaterialPalette;
use crate::voxel::Voxel;

/// A loaded model with its octree and flattened buffer.
#[derive(Debug, Clone)]
pub struct BakedModel {
    source: Option<PathBuf>,
    config: BakeConfig,
    model: VoxelModel,
    octree: SparseVoxelOctree,
    flattened: FlattenedOctree,
}

impl BakedModel {
    /// Loads and bakes a model file.
    ///
    /// # Errors
    ///
    /// Returns any load error; no partial model is produced.
    pub fn load<P: AsRef<Path>>(path: P, config: BakeConfig) -> ModelResult<Self> {
        let path = path.as_ref();
        let model = ModelLoader::new(config.loader.clone()).load(path)?;
        let mut baked = Self::from_model(model, config)?;
        baked.source = Some(path.to_path_buf());
        Ok(baked)
    }

    /// Bakes an already loaded model.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ModelError::ExtentTooLarge`] for models too large to
    /// address.
    pub fn from_model(model: VoxelModel, config: BakeConfig) -> ModelResult<Self> {
        let octree = SparseVoxelOctree::from_model(&model, config.octree.insertion)?;
        let flattened = FlattenedOctree::flatten(&octree);

        info!(
            model = %model.name,
            voxels = model.voxel_count(),
            materials = model.palette.len(),
            size = octree.size(),
            records = flattened.len(),
            "model baked"
        );

        Ok(Self {
            source: None,
            config,
            model,
            octree,
            flattened,
        })
    }

    /// Re-reads the source file and rebakes.
    ///
    /// Models baked from memory are rebuilt from their retained voxels. On
    /// error the current state is kept.
    ///
    /// # Errors
    ///
    /// Returns any load error.
    pub fn reload(&mut self) -> ModelResult<()> {
        let rebaked = match &self.source {
            Some(path) => Self::load(path, self.config.clone())?,
            None => Self::from_model(self.model.clone(), self.config.clone())?,
        };
        *self = rebaked;
        Ok(())
    }

    /// Source file, if loaded from disk.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Configuration used for this bake.
    #[must_use]
    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    /// The parsed model.
    #[must_use]
    pub fn model(&self) -> &VoxelModel {
        &self.model
    }

    /// Voxels in file order.
    #[must_use]
    pub fn voxels(&self) -> &[Voxel] {
        &self.model.voxels
    }

    /// The material palette.
    #[must_use]
    pub fn palette(&self) -> &MaterialPalette {
        &self.model.palette
    }

    /// The in-memory octree.
    #[must_use]
    pub fn octree(&self) -> &SparseVoxelOctree {
        &self.octree
    }

    /// The flattened buffer.
    #[must_use]
    pub fn flattened(&self) -> &FlattenedOctree {
        &self.flattened
    }

    /// Flattened records.
    #[must_use]
    pub fn records(&self) -> &[OctreeRecord] {
        self.flattened.records()
    }

    /// Number of flattened records.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.flattened.len()
    }

    /// Number of palette entries.
    #[must_use]
    pub fn palette_count(&self) -> usize {
        self.model.palette.len()
    }

    /// Bounding dimensions `(width, height, depth)`.
    ///
    /// Same as [`VoxelModel::dimensions`] narrowed to `u32`; each fits since
    /// baking rejects larger models.
    #[must_use]
    pub fn dimensions(&self) -> [u32; 3] {
        self.model.dimensions().map(|extent| extent as u32)
    }

    /// Octree buffer bytes for GPU upload.
    #[must_use]
    pub fn octree_bytes(&self) -> &[u8] {
        self.flattened.as_bytes()
    }

    /// Palette buffer bytes for GPU upload.
    #[must_use]
    pub fn palette_bytes(&self) -> &[u8] {
        self.model.palette.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsertPolicy;

    fn bake(text: &str) -> BakedModel {
        let model = ModelLoader::default().load_from_str(text, "test").unwrap();
        BakedModel::from_model(model, BakeConfig::default()).unwrap()
    }

    #[test]
    fn test_queries() {
        let baked = bake("end_header\n0 0 0 255 0 0\n2 0 0 0 255 0\n");

        assert_eq!(baked.dimensions(), [3, 1, 1]);
        assert_eq!(baked.octree().size(), 4);
        assert_eq!(baked.palette_count(), 2);
        assert_eq!(baked.record_count(), baked.records().len());
        assert_eq!(baked.octree_bytes().len(), baked.record_count() * OctreeRecord::SIZE);
        assert_eq!(baked.palette_bytes().len(), 2 * 12);
        assert!(baked.source().is_none());
    }

    #[test]
    fn test_positions_are_normalized() {
        // Bounds min (-5, 10, 3) maps to the octree origin
        let baked = bake("end_header\n-5 3 10 1 1 1\n-4 4 11 2 2 2\n");
        assert_eq!(baked.octree().get([0, 0, 0]), Some(0));
        assert_eq!(baked.octree().get([1, 1, 1]), Some(1));
        assert_eq!(baked.octree().discarded(), 0);
    }

    #[test]
    fn test_reload_from_memory_is_identical() {
        let mut baked = bake("end_header\n0 0 0 9 9 9\n3 5 1 1 2 3\n");
        let before = baked.octree_bytes().to_vec();
        baked.reload().unwrap();
        assert_eq!(baked.octree_bytes(), before.as_slice());
    }

    #[test]
    fn test_insert_policy_from_config() {
        let model = ModelLoader::default()
            .load_from_str("end_header\n0 0 0 1 1 1\n7 7 7 2 2 2\n", "test")
            .unwrap();
        let mut config = BakeConfig::default();
        config.octree.insertion = InsertPolicy::FanOut;

        let fan_out = BakedModel::from_model(model.clone(), config).unwrap();
        let direct = BakedModel::from_model(model, BakeConfig::default()).unwrap();

        assert_eq!(fan_out.octree().policy(), InsertPolicy::FanOut);
        assert_eq!(fan_out.records(), direct.records());
    }
}
