//! Basic tilewall-frame usage example
//!
//! This example demonstrates the frame primitives:
//! - GridSize for sizing a surface wall
//! - Frame slicing into per-surface tiles
//! - FrameQueue ceiling trimming
//!
//! It does not need a color lookup table or a decoder.

use tilewall_frame::{Frame, FrameQueue, GridSize, TILE_SIZE};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("tilewall-frame v{}", tilewall_frame::VERSION);
    println!();

    let grid = GridSize::new(3, 2)?;
    println!("Grid {}x{} surfaces:", grid.cols, grid.rows);
    println!("  Frame size: {}x{} pixels", grid.width(), grid.height());
    println!("  Frame bytes: {}", grid.pixel_count());
    println!("  Tiles: {}", grid.tile_count());
    println!();

    // A horizontal gradient, one palette index per column of tiles
    let pixels = (0..grid.pixel_count())
        .map(|i| ((i % grid.width()) / TILE_SIZE) as u8)
        .collect();
    let frame = Frame::new(grid, pixels)?;

    println!("Tiles:");
    for (i, tile) in frame.tiles().iter().enumerate() {
        let (row, col) = grid.position(i);
        println!("  #{} at ({}, {}) first pixel = {}", i, row, col, tile.as_bytes()[0]);
    }
    println!();

    let queue = FrameQueue::new();
    let mut dropped = 0;
    for _ in 0..10 {
        dropped += queue.push_with_ceiling(frame.clone(), 4);
    }
    println!("Queue after 10 pushes with ceiling 4:");
    println!("  Queued: {}", queue.len());
    println!("  Dropped: {}", dropped);

    Ok(())
}
