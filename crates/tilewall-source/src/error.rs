//! Error types for frame sources
//!
//! Everything returned here is a configuration problem found before a
//! producer starts (missing folder, wrong dimensions, no decoder) or a
//! failure to decode one file. Errors inside a running producer are logged
//! and end that producer's run instead of propagating.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors that can occur while preparing or decoding a frame source
#[derive(Error, Debug)]
pub enum SourceError {
    /// The color lookup table is required but was not loaded
    ///
    /// Image files, RGB pixel entries, video and live sources all need it.
    /// Raw palette matrices do not.
    #[error("Color lookup table not loaded; RGB sources cannot be quantized")]
    LutMissing,

    /// Source path does not exist
    #[error("Source not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Source path exists but is not a directory
    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Folder holds no usable frame files
    #[error("No frame files found in: {}", .0.display())]
    NoFrames(PathBuf),

    /// File extension is not a known frame or video format
    #[error("Unsupported frame file: {}", .0.display())]
    UnsupportedFile(PathBuf),

    /// Frame dimensions differ from the surface grid
    #[error("Frame size mismatch in {}: expected {expected}, got {actual}", path.display())]
    DimensionMismatch {
        /// Offending file
        path: PathBuf,
        /// Expected size, e.g. `256x128` or a byte count
        expected: String,
        /// Size found in the file
        actual: String,
    },

    /// Frame file content is malformed
    #[error("Invalid frame {}: {reason}", path.display())]
    InvalidFrame {
        /// Offending file
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// Decoder binary could not be run
    #[error("Decoder '{0}' is not available")]
    DecoderUnavailable(String),

    /// Decoder subprocess failed to launch
    #[error("Failed to launch decoder: {0}")]
    DecoderSpawn(String),

    /// I/O operation failed
    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON frame could not be parsed
    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Image file could not be decoded
    #[error("Image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// Frame assembly failed
    #[error(transparent)]
    Frame(#[from] tilewall_frame::FrameError),
}

/// Result type for source operations
pub type Result<T> = std::result::Result<T, SourceError>;

impl SourceError {
    pub(crate) fn dimension_mismatch(
        path: &Path,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::DimensionMismatch {
            path: path.to_path_buf(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn invalid_frame(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the request itself was wrong, as opposed to
    /// an I/O failure while reading a valid source
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SourceError::NotFound(PathBuf::from("/media/frames/intro"));
        assert_eq!(err.to_string(), "Source not found: /media/frames/intro");

        let err = SourceError::dimension_mismatch(Path::new("a.json"), "256x128", "128x128");
        assert_eq!(
            err.to_string(),
            "Frame size mismatch in a.json: expected 256x128, got 128x128"
        );
    }

    #[test]
    fn test_error_helpers() {
        let err = SourceError::invalid_frame(Path::new("b.json"), "row 0 is not an array");
        assert!(matches!(err, SourceError::InvalidFrame { .. }));
        assert!(err.is_configuration());

        let err = SourceError::from(std::io::Error::other("pipe closed"));
        assert!(!err.is_configuration());
    }
}
