//! Color Quantization
//!
//! Maps 24-bit RGB pixels onto the 256-entry display palette through a
//! precomputed lookup table with one entry per RGB value.
//!
//! # Usage
//!
//! ```rust,no_run
//! use tilewall_frame::ColorLut;
//!
//! let lut = ColorLut::load("colormap.lut")?;
//! let index = lut.quantize(255, 0, 0);
//!
//! // Convert a whole RGB24 buffer
//! let rgb = vec![0u8; 128 * 128 * 3];
//! let indices = lut.quantize_rgb24(&rgb);
//! assert_eq!(indices.len(), 128 * 128);
//! # Ok::<(), tilewall_frame::FrameError>(())
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::error::{FrameError, Result};

/// Number of entries in the lookup table (one per 24-bit RGB value)
pub const LUT_SIZE: usize = 1 << 24;

/// Precomputed RGB to palette index table
///
/// Cloning is cheap: the table is shared behind an [`Arc`].
#[derive(Clone)]
pub struct ColorLut {
    table: Arc<[u8]>,
}

impl ColorLut {
    /// Build a table from raw bytes
    ///
    /// The byte at offset `(r << 16) | (g << 8) | b` is the palette index
    /// for that color.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != LUT_SIZE {
            return Err(FrameError::LutSize {
                expected: LUT_SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            table: Arc::from(bytes),
        })
    }

    /// Load a table from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let lut = Self::from_bytes(bytes)?;
        info!("Loaded color lookup table from {}", path.display());
        Ok(lut)
    }

    /// Palette index for one RGB color
    #[inline]
    #[must_use]
    pub fn quantize(&self, r: u8, g: u8, b: u8) -> u8 {
        let key = (usize::from(r) << 16) | (usize::from(g) << 8) | usize::from(b);
        self.table[key]
    }

    /// Palette index used for a blank (black) screen
    #[must_use]
    pub fn black_index(&self) -> u8 {
        self.quantize(0, 0, 0)
    }

    /// Convert packed RGB24 bytes into palette indices
    ///
    /// Trailing bytes that do not form a full pixel are ignored.
    #[must_use]
    pub fn quantize_rgb24(&self, rgb: &[u8]) -> Vec<u8> {
        rgb.chunks_exact(3)
            .map(|px| self.quantize(px[0], px[1], px[2]))
            .collect()
    }
}

impl fmt::Debug for ColorLut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColorLut")
            .field("entries", &self.table.len())
            .finish()
    }
}
