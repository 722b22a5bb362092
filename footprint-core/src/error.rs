/// Error types for loading, slicing, exporting and configuration.
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading a mesh file.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The extension is not one of the supported mesh formats.
    #[error("unsupported mesh format: {extension:?}")]
    UnsupportedFormat { extension: String },

    /// The file content could not be decoded.
    #[error("failed to parse {path}: {details}")]
    Parse { path: PathBuf, details: String },

    /// The file decoded to a mesh without faces.
    #[error("mesh has no faces")]
    EmptyMesh,
}

impl MeshError {
    pub(crate) fn parse(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            details: details.into(),
        }
    }
}

/// Errors raised by the planar slicer.
#[derive(Debug, Error, PartialEq)]
pub enum SliceError {
    /// The plane normal has (near) zero length.
    #[error("cutting plane normal must be non-zero")]
    DegenerateNormal,
}

/// Per-file failure while adding a model to the sheet.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Slice(#[from] SliceError),

    /// The mesh does not intersect the cutting plane.
    #[error("no cross-section found for {name} at the cutting plane")]
    NoCrossSection { name: String },
}

/// Errors raised while writing the PDF and JSON outputs.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode placement records: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while loading or validating a [`crate::LayoutConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type MeshResult<T> = Result<T, MeshError>;
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LoadError::NoCrossSection {
            name: "bracket".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "no cross-section found for bracket at the cutting plane"
        );

        let err = MeshError::UnsupportedFormat {
            extension: "fbx".to_string(),
        };
        assert!(err.to_string().contains("fbx"));

        let err: LoadError = SliceError::DegenerateNormal.into();
        assert_eq!(err.to_string(), "cutting plane normal must be non-zero");
    }
}
