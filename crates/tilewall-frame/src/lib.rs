//! # tilewall-frame
//!
//! Frame primitives for streaming pictures onto a wall of 128x128
//! palette-indexed display surfaces.
//!
//! This crate is part of the [tilewall](https://github.com/tilewall/tilewall)
//! workspace. It holds the pieces that have no threads or processes of
//! their own:
//!
//! - **Color Quantization**: RGB24 to palette index through a 16M-entry table
//! - **PPM Demuxing**: pull P6 images out of a decoder's output pipe
//! - **Tile Slicing**: split a grid-sized frame into per-surface tiles
//! - **Frame Queue**: producer to tick-thread FIFO with ceiling trimming
//!
//! # Quick Start
//!
//! ```rust
//! use tilewall_frame::{Frame, FrameQueue, GridSize};
//!
//! let grid = GridSize::new(2, 2)?;
//! let queue = FrameQueue::new();
//!
//! // A producer thread pushes frames...
//! queue.push(Frame::filled(grid, 0));
//!
//! // ...and the tick thread slices them for publishing
//! if let Some(frame) = queue.pop() {
//!     let tiles = frame.tiles();
//!     assert_eq!(tiles.len(), 4);
//! }
//! # Ok::<(), tilewall_frame::FrameError>(())
//! ```
//!
//! # Frame Layout
//!
//! ```text
//!   cols*128 pixels wide
//! ┌──────────┬──────────┐
//! │ tile 0   │ tile 1   │  row 0
//! │ (0, 0)   │ (0, 1)   │
//! ├──────────┼──────────┤  rows*128 pixels tall
//! │ tile 2   │ tile 3   │  row 1
//! │ (1, 0)   │ (1, 1)   │
//! └──────────┴──────────┘
//! ```
//!
//! One byte per pixel, row-major. Tile `i` sits at row `i / cols`,
//! column `i % cols`.

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod error;
pub mod frame;
pub mod ppm;
pub mod quantize;
pub mod queue;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

pub use error::{FrameError, Result};
pub use frame::{Frame, GridSize, Tile, TILE_AREA, TILE_SIZE};
pub use ppm::{read_full, read_ppm_frame};
pub use quantize::{ColorLut, LUT_SIZE};
pub use queue::FrameQueue;

// =============================================================================
// CRATE-LEVEL ITEMS
// =============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Palette index used for blank frames
///
/// With a lookup table this is whatever black quantizes to; without one,
/// index 0.
#[must_use]
pub fn black_index(lut: Option<&ColorLut>) -> u8 {
    lut.map_or(0, ColorLut::black_index)
}
