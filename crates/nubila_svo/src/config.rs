//! # Bake Configuration
//!
//! Loaded once at startup from TOML. Every field has a default that
//! reproduces the reference importer exactly, so an empty file is valid.
//!
//! ```toml
//! [loader]
//! header_sentinel = "end_header"
//! swap_yz = true
//!
//! [octree]
//! insertion = "direct"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Header sentinel written by `MagicaVoxel` point exports.
pub const DEFAULT_HEADER_SENTINEL: &str = "end_header";

/// How an insertion descends from a node into its children.
///
/// Both policies build the same tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPolicy {
    /// Pick the single containing octant with three bit tests.
    #[default]
    Direct,
    /// Offer the voxel to all eight children and let each bounds check reject it.
    FanOut,
}

/// Point-cloud parsing options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Exact line that terminates the header.
    pub header_sentinel: String,
    /// Map file field 2 to engine Z and file field 3 to engine Y.
    pub swap_yz: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            header_sentinel: DEFAULT_HEADER_SENTINEL.to_string(),
            swap_yz: true,
        }
    }
}

/// Octree construction options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Descent policy for insertions.
    pub insertion: InsertPolicy,
}

/// Full configuration for a load/bake cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    /// Loader options.
    pub loader: LoaderConfig,
    /// Octree options.
    pub octree: OctreeConfig,
}

impl BakeConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the text is not valid TOML or has
    /// fields of the wrong type.
    pub fn from_toml_str(text: &str) -> ModelResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ModelError::Config(e.to_string()))?;
        if config.loader.header_sentinel.is_empty() {
            return Err(ModelError::Config(
                "loader.header_sentinel must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Io`] if the file cannot be read, or
    /// [`ModelError::Config`] if it does not parse.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Serializes the configuration back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> ModelResult<String> {
        toml::to_string(self).map_err(|e| ModelError::Config(e.to_string()))
    }
}
