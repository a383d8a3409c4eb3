//! Frames and tiles
//!
//! A [`Frame`] is one full picture for a surface grid: `cols*128` by
//! `rows*128` palette indices, row-major. Publishing splits it into
//! [`Tile`]s, one 128x128 block per surface, in row-major grid order.

use crate::error::{FrameError, Result};

/// Edge length of one display surface in pixels
pub const TILE_SIZE: usize = 128;

/// Pixels in one tile
pub const TILE_AREA: usize = TILE_SIZE * TILE_SIZE;

/// Dimensions of a surface grid, in surfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSize {
    /// Surfaces per row
    pub cols: u32,
    /// Surfaces per column
    pub rows: u32,
}

impl GridSize {
    /// Create a grid size, rejecting empty grids
    pub fn new(cols: u32, rows: u32) -> Result<Self> {
        if cols == 0 || rows == 0 {
            return Err(FrameError::InvalidGrid { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    /// Frame width in pixels
    #[must_use]
    pub const fn width(&self) -> usize {
        self.cols as usize * TILE_SIZE
    }

    /// Frame height in pixels
    #[must_use]
    pub const fn height(&self) -> usize {
        self.rows as usize * TILE_SIZE
    }

    /// Bytes in one palette-indexed frame
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Bytes in one RGB24 frame of the same size
    #[must_use]
    pub const fn rgb24_len(&self) -> usize {
        self.pixel_count() * 3
    }

    /// Number of surfaces
    #[must_use]
    pub const fn tile_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Grid position (row, column) of the surface at `index`
    #[must_use]
    pub const fn position(&self, index: usize) -> (usize, usize) {
        (index / self.cols as usize, index % self.cols as usize)
    }
}

/// One 128x128 block of palette indices
#[derive(Clone, PartialEq, Eq)]
pub struct Tile(Box<[u8; TILE_AREA]>);

impl Tile {
    /// Tile with every pixel set to `index`
    #[must_use]
    pub fn filled(index: u8) -> Self {
        Self(Box::new([index; TILE_AREA]))
    }

    /// Copy a tile from a slice of exactly [`TILE_AREA`] bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != TILE_AREA {
            return Err(FrameError::length_mismatch(TILE_AREA, bytes.len()));
        }
        let mut tile = Self::filled(0);
        tile.0.copy_from_slice(bytes);
        Ok(tile)
    }

    /// Pixel bytes, row-major
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; TILE_AREA] {
        &self.0
    }

    /// Overwrite this tile with another without reallocating
    pub fn copy_from(&mut self, other: &Tile) {
        self.0.copy_from_slice(&other.0[..]);
    }
}

impl Default for Tile {
    fn default() -> Self {
        Self::filled(0)
    }
}

impl std::fmt::Debug for Tile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tile({} bytes)", TILE_AREA)
    }
}

/// A full palette-indexed picture for a surface grid
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    grid: GridSize,
    pixels: Vec<u8>,
}

impl Frame {
    /// Wrap a pixel buffer, checking it matches the grid
    pub fn new(grid: GridSize, pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != grid.pixel_count() {
            return Err(FrameError::length_mismatch(grid.pixel_count(), pixels.len()));
        }
        Ok(Self { grid, pixels })
    }

    /// Frame with every pixel set to `index`
    #[must_use]
    pub fn filled(grid: GridSize, index: u8) -> Self {
        Self {
            grid,
            pixels: vec![index; grid.pixel_count()],
        }
    }

    /// Grid this frame was built for
    #[must_use]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Pixel bytes, row-major
    #[must_use]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Release the pixel buffer
    #[must_use]
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Copy out the tile at grid position (`row`, `col`)
    #[must_use]
    pub fn slice_tile(&self, row: usize, col: usize) -> Tile {
        let width = self.grid.width();
        let x0 = col * TILE_SIZE;
        let y0 = row * TILE_SIZE;

        let mut tile = Tile::filled(0);
        for y in 0..TILE_SIZE {
            let src = (y0 + y) * width + x0;
            tile.0[y * TILE_SIZE..(y + 1) * TILE_SIZE]
                .copy_from_slice(&self.pixels[src..src + TILE_SIZE]);
        }
        tile
    }

    /// All tiles in row-major grid order
    #[must_use]
    pub fn tiles(&self) -> Vec<Tile> {
        (0..self.grid.tile_count())
            .map(|i| {
                let (row, col) = self.grid.position(i);
                self.slice_tile(row, col)
            })
            .collect()
    }

    /// Reassemble a frame from tiles in row-major grid order
    pub fn from_tiles(grid: GridSize, tiles: &[Tile]) -> Result<Self> {
        if tiles.len() != grid.tile_count() {
            return Err(FrameError::length_mismatch(grid.tile_count(), tiles.len()));
        }

        let width = grid.width();
        let mut pixels = vec![0u8; grid.pixel_count()];
        for (i, tile) in tiles.iter().enumerate() {
            let (row, col) = grid.position(i);
            for y in 0..TILE_SIZE {
                let dst = (row * TILE_SIZE + y) * width + col * TILE_SIZE;
                pixels[dst..dst + TILE_SIZE]
                    .copy_from_slice(&tile.0[y * TILE_SIZE..(y + 1) * TILE_SIZE]);
            }
        }
        Ok(Self { grid, pixels })
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("cols", &self.grid.cols)
            .field("rows", &self.grid.rows)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
