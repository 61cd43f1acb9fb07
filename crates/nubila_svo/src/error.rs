//! # Model Error Types
//!
//! All errors that can occur while loading and baking a model.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a model or its configuration.
///
/// Every variant is fatal to the load: no partial model is ever returned.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The model file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A data line did not parse into the six required fields.
    #[error("malformed data line {line}: {reason}")]
    Format {
        /// 1-based line number in the source file.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// The header sentinel line never appeared.
    #[error("header sentinel {sentinel:?} not found")]
    MissingHeader {
        /// The sentinel that was expected.
        sentinel: String,
    },

    /// The file has a header but no voxel data.
    #[error("model contains no voxels")]
    NoVoxels,

    /// The model is too large to be addressed by int32 record fields.
    #[error("model extent {extent} exceeds the largest octree size")]
    ExtentTooLarge {
        /// Largest axis extent of the model.
        extent: u64,
    },

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ModelError {
    /// Returns true for the format error kind (malformed file contents).
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(
            self,
            Self::Format { .. } | Self::MissingHeader { .. } | Self::NoVoxels
        )
    }

    /// Returns true for the I/O error kind (file unreadable).
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let io = ModelError::Io {
            path: PathBuf::from("missing.ply"),
            source: io::Error::new(io::ErrorKind::NotFound, "nope"),
        };
        assert!(io.is_io());
        assert!(!io.is_format());

        assert!(ModelError::format(3, "bad").is_format());
        assert!(ModelError::NoVoxels.is_format());
        assert!(!ModelError::ExtentTooLarge { extent: 1 }.is_format());
    }

    #[test]
    fn test_error_display() {
        let err = ModelError::format(12, "expected 6 fields, found 5");
        assert_eq!(
            err.to_string(),
            "malformed data line 12: expected 6 fields, found 5"
        );
    }
}
