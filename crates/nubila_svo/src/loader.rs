//! Point-Cloud Model Loader
//!
//! Parser for the ASCII point export written by `MagicaVoxel` (`.ply` text form).
//!
//! ## Format
//!
//! ```text
//! ply                          ┐
//! format ascii 1.0             │ header, skipped verbatim
//! ...                          │
//! end_header                   ┘ sentinel line
//! 0 0 0 255 0 0                  X Z Y R G B
//! 1 1 1 0 255 0
//! ```
//!
//! The file stores the vertical axis in the third field. The engine is Y-up
//! with Y second, so fields 2 and 3 are swapped on load.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nubila_svo::ModelLoader;
//!
//! let model = ModelLoader::default().load("assets/models/castle.ply")?;
//! println!("{} voxels, {} materials", model.voxel_count(), model.palette.len());
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{ModelError, ModelResult};
use crate::palette::{Material, MaterialPalette};
use crate::voxel::{ModelBounds, Voxel};

/// Number of whitespace-separated fields on every data line.
pub const DATA_FIELDS: usize = 6;

/// A parsed point-cloud model.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelModel {
    /// Model name (from filename).
    pub name: String,
    /// Voxels in file order, engine axis order, palette-resolved materials.
    pub voxels: Vec<Voxel>,
    /// Materials in first-occurrence order.
    pub palette: MaterialPalette,
    /// Per-axis bounds of all voxels.
    pub bounds: ModelBounds,
}

impl VoxelModel {
    /// Returns the number of voxels.
    #[inline]
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.voxels.len()
    }

    /// Bounding dimensions `[width, height, depth]`.
    #[must_use]
    pub fn dimensions(&self) -> [u64; 3] {
        [
            self.bounds.width(),
            self.bounds.height(),
            self.bounds.depth(),
        ]
    }
}

/// Point-cloud model loader.
#[derive(Debug, Clone, Default)]
pub struct ModelLoader {
    config: LoaderConfig,
}

impl ModelLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Returns the loader options.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Loads a model file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Io`] if the file cannot be read, or a format
    /// error if its contents are malformed. Bytes that are not UTF-8 are
    /// replaced before parsing, so they surface as format errors on data
    /// lines and are ignored in the header.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> ModelResult<VoxelModel> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        let io_error = |source: io::Error| ModelError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(io_error)?;
        let reader = BufReader::new(file);

        let lines = reader.split(b'\n').map(|line| -> ModelResult<String> {
            let mut bytes = line.map_err(io_error)?;
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        });

        self.parse(lines, name)
    }

    /// Loads a model from in-memory text.
    ///
    /// # Errors
    ///
    /// Returns a format error if the text is malformed.
    pub fn load_from_str(&self, text: &str, name: &str) -> ModelResult<VoxelModel> {
        self.parse(text.lines().map(Ok), name.to_string())
    }

    /// Parses model lines.
    fn parse<I, S>(&self, lines: I, name: String) -> ModelResult<VoxelModel>
    where
        I: IntoIterator<Item = ModelResult<S>>,
        S: AsRef<str>,
    {
        let mut voxels = Vec::new();
        let mut palette = MaterialPalette::new();
        let mut header_done = false;

        for (index, line) in lines.into_iter().enumerate() {
            let line = line?;
            let line = line.as_ref();
            let line_no = index + 1;

            if !header_done {
                if line == self.config.header_sentinel {
                    debug!(line = line_no, "model header ends");
                    header_done = true;
                }
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            let (position, color) = self.parse_data_line(line, line_no)?;
            let material_id = palette.resolve(color);
            voxels.push(Voxel {
                position,
                material_id,
            });
        }

        if !header_done {
            return Err(ModelError::MissingHeader {
                sentinel: self.config.header_sentinel.clone(),
            });
        }

        let bounds = ModelBounds::from_voxels(&voxels).ok_or(ModelError::NoVoxels)?;

        debug!(
            name = %name,
            voxels = voxels.len(),
            materials = palette.len(),
            "model parsed"
        );

        Ok(VoxelModel {
            name,
            voxels,
            palette,
            bounds,
        })
    }

    /// Parses one data line into an engine-space position and a color.
    fn parse_data_line(&self, line: &str, line_no: usize) -> ModelResult<([i32; 3], Material)> {
        let mut fields = [""; DATA_FIELDS];
        let mut count = 0;
        for field in line.split_whitespace() {
            if count < DATA_FIELDS {
                fields[count] = field;
            }
            count += 1;
        }

        if count != DATA_FIELDS {
            return Err(ModelError::format(
                line_no,
                format!("expected {DATA_FIELDS} fields, found {count}"),
            ));
        }

        let coord = |field: &str| {
            field.parse::<i32>().map_err(|e| {
                ModelError::format(line_no, format!("invalid coordinate {field:?}: {e}"))
            })
        };
        let channel = |field: &str| {
            field.parse::<u8>().map_err(|e| {
                ModelError::format(line_no, format!("invalid color channel {field:?}: {e}"))
            })
        };

        let a = coord(fields[0])?;
        let b = coord(fields[1])?;
        let c = coord(fields[2])?;

        // File order is X, Z, Y
        let position = if self.config.swap_yz {
            [a, c, b]
        } else {
            [a, b, c]
        };

        let color = Material::from_rgb8(
            channel(fields[3])?,
            channel(fields[4])?,
            channel(fields[5])?,
        );

        Ok((position, color))
    }
}
