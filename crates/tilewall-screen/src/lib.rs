//! # tilewall-screen
//!
//! Tick-driven playback onto grids of 128x128 display surfaces.
//!
//! This crate is part of the [tilewall](https://github.com/tilewall/tilewall)
//! workspace. It builds on [`tilewall-frame`](https://crates.io/crates/tilewall-frame)
//! for frames and tiles and on [`tilewall-source`](https://crates.io/crates/tilewall-source)
//! for the producer threads.
//!
//! # Features
//!
//! - **Surface Groups**: `cols x rows` surfaces published together under one epoch
//! - **Double Buffering**: staged and current tiles per surface, swapped atomically
//! - **Per-Viewer Dedup**: each viewer receives a tile once per publish
//! - **Visibility Radius**: viewers out of range are skipped without bookkeeping
//! - **Cadence Control**: freeze, source-paced or every `k` ticks, with warmup and pre-roll
//! - **Resume Intents**: playback survives a restart when a JSON store is configured
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tilewall_screen::{
//!     EngineConfig, GridSize, GroupSpec, PlaybackParams, Position, RecordingSink,
//!     ScreenManager, Viewer,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::builder()
//!     .media_root("/srv/tilewall")
//!     .lut_path("/srv/tilewall/colormap.lut")
//!     .build();
//! let mut manager = ScreenManager::new(config)?;
//!
//! // Bind a 2x2 wall and loop the "intro" folder at one frame every 2 ticks
//! let id = manager.bind(GroupSpec::sequential("world", GridSize::new(2, 2)?, 100))?;
//! let params = PlaybackParams { ticks_per_frame: 2, looping: true, ..Default::default() };
//! manager.start_sequence(id, "intro", params)?;
//!
//! // Once per tick
//! let viewers = vec![Viewer::new(1, "world", Position::new(0.0, 64.0, 0.0))];
//! let mut sink = RecordingSink::new();
//! manager.on_tick(&viewers, &mut sink);
//! println!("{}", manager.describe(id)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   frames   ┌──────────────┐
//! │ producer thread  │ ─────────▶ │  FrameQueue  │
//! │ (tilewall-source)│            └──────┬───────┘
//! └──────────────────┘                   │ pop (tick thread)
//!                                        ▼
//! ┌──────────────────┐  on_tick  ┌──────────────────┐
//! │    Scheduler     │ ────────▶ │ PlaybackSession  │ ◄── cadence, warmup,
//! │ (tokio interval) │           └────────┬─────────┘     pre-roll
//! └──────────────────┘                    │ stage + publish (one epoch)
//!                                         ▼
//!                               ┌──────────────────┐
//!                               │ SurfaceRenderer  │ × cols*rows
//!                               └────────┬─────────┘
//!                                        │ render(viewer)
//!                                        ▼
//!                                    TileSink
//! ```
//!
//! # Cadence
//!
//! | `ticks_per_frame` | Behavior                                  |
//! |-------------------|-------------------------------------------|
//! | `-1`              | show the first frame and hold it          |
//! | `0`               | publish as soon as each frame is decoded  |
//! | `k > 0`           | publish every `k` ticks                   |

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod clock;
pub mod config;
pub mod error;
pub mod group;
pub mod manager;
pub mod renderer;
pub mod resume;
pub mod scheduler;
pub mod session;
pub mod viewer;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

pub use clock::TickClock;
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{Result, ScreenError};
pub use group::{GroupId, GroupSpec, SurfaceGroup};
pub use manager::ScreenManager;
pub use renderer::{SurfaceRenderer, Visibility};
pub use resume::{JsonResumeStore, MemoryResumeStore, ResumeIntent, ResumeStore};
pub use scheduler::Scheduler;
pub use session::{
    Cadence, LiveParams, PlaybackMode, PlaybackParams, PlaybackPlan, PlaybackSession, TickOutcome,
};
pub use viewer::{
    Position, RecordingSink, SurfaceId, TileSink, Viewer, ViewerDirectory, ViewerId,
};

// Frequently used alongside the manager
pub use tilewall_frame::{GridSize, Tile};
pub use tilewall_source::{LiveEvent, LiveEvents};

// =============================================================================
// CRATE-LEVEL ITEMS
// =============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
