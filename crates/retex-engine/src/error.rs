//! Engine error types.
//!
//! Absent values (a pixel outside its declared byte range, an unmapped
//! channel) and empty generator sources are expressed as `Option`, not
//! errors; the variants here are the conditions that abort one
//! material's build. Nothing is retried.

use std::path::PathBuf;

use thiserror::Error;

use retex_spec::{BackendError, SpecError};

use crate::png::PngError;

/// Errors that abort a single material build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Declarative configuration is inconsistent; surfaced immediately.
    #[error("configuration: {0}")]
    Config(#[from] SpecError),

    /// A resolved source file failed to decode.
    #[error("source '{path}': {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: PngError,
    },

    /// A source file asserted by enumeration could not be opened.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output encoding failed while publishing.
    #[error("encode: {0}")]
    Encode(PngError),

    /// The build was cancelled cooperatively.
    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    /// Wrap a decode failure with the path that produced it.
    pub fn source(path: impl Into<PathBuf>, source: PngError) -> Self {
        BuildError::Source {
            path: path.into(),
            source,
        }
    }
}

impl BackendError for BuildError {
    fn code(&self) -> &'static str {
        match self {
            BuildError::Config(_) => "REMAP_001",
            BuildError::Source { .. } => "REMAP_002",
            BuildError::Io(_) => "REMAP_003",
            BuildError::Encode(_) => "REMAP_004",
            BuildError::Cancelled => "REMAP_005",
        }
    }

    fn category(&self) -> &'static str {
        "remap"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(BuildError::Cancelled.code(), "REMAP_005");
        assert_eq!(BuildError::Cancelled.category(), "remap");
    }

    #[test]
    fn source_errors_name_the_file() {
        let err = BuildError::source(
            "textures/stone/albedo.png",
            PngError::InvalidDimensions("0x0".into()),
        );
        assert!(err.to_string().contains("albedo.png"));
    }
}
