//! Error types for frame operations

use thiserror::Error;

/// Errors that can occur while building frames or loading the color table
#[derive(Error, Debug)]
pub enum FrameError {
    /// Color lookup table has the wrong size
    ///
    /// The table must hold exactly one palette index for every 24-bit RGB
    /// value (16,777,216 bytes).
    #[error("Color lookup table must be {expected} bytes, got {actual}")]
    LutSize {
        /// Required table size
        expected: usize,
        /// Size that was supplied
        actual: usize,
    },

    /// Pixel buffer length does not match the grid it was built for
    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Bytes required by the grid
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Grid has a zero dimension
    #[error("Invalid grid size: {cols}x{rows}")]
    InvalidGrid {
        /// Columns of surfaces
        cols: u32,
        /// Rows of surfaces
        rows: u32,
    },

    /// Reading the lookup table failed
    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for frame operations
pub type Result<T> = std::result::Result<T, FrameError>;

impl FrameError {
    pub(crate) fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::LengthMismatch { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameError::LutSize {
            expected: 16_777_216,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "Color lookup table must be 16777216 bytes, got 12"
        );

        let err = FrameError::length_mismatch(4, 3);
        assert_eq!(
            err.to_string(),
            "Frame length mismatch: expected 4 bytes, got 3"
        );
    }
}
