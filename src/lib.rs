//! # tilewall
//!
//! Stream still frames, video files and live streams onto walls of 128x128
//! palette-indexed display surfaces, at a fixed tick cadence, to many
//! viewers at once.
//!
//! This crate provides a unified interface to the tilewall libraries:
//!
//! - **[`frame`]** - Frames, tiles, color quantization, PPM demuxing, frame queue
//! - **[`source`]** - Sequence, video and live producers driving an external decoder
//! - **[`screen`]** - Surface renderers, playback sessions, screen manager, scheduler
//!
//! # Features
//!
//! All features are enabled by default. You can selectively enable only what you need:
//!
//! ```toml
//! # Use everything (default)
//! tilewall = "0.1"
//!
//! # Frame primitives only
//! tilewall = { version = "0.1", default-features = false, features = ["frame"] }
//!
//! # Frames + producers, bring your own publishing loop
//! tilewall = { version = "0.1", default-features = false, features = ["source"] }
//! ```
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `frame` | Yes | Frame and tile primitives |
//! | `source` | Yes | Frame producers (implies `frame`) |
//! | `screen` | Yes | Playback engine (implies `source`) |
//! | `full` | No | All features |
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tilewall::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::builder()
//!     .media_root("/srv/tilewall")
//!     .lut_path("/srv/tilewall/colormap.lut")
//!     .build();
//! let mut manager = ScreenManager::new(config)?;
//!
//! let id = manager.bind(GroupSpec::sequential("world", GridSize::new(4, 2)?, 1))?;
//! manager.start_live(id, "rtmp://live.example/stream", LiveParams::default())?;
//!
//! let viewers = vec![Viewer::new(1, "world", Position::default())];
//! let mut sink = RecordingSink::new();
//! manager.on_tick(&viewers, &mut sink);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           tilewall                              │
//! ├─────────────────┬─────────────────────┬─────────────────────────┤
//! │ tilewall-frame  │  tilewall-source    │    tilewall-screen      │
//! │                 │                     │                         │
//! │  Frame / Tile   │  ProducerHandle     │  ScreenManager          │
//! │  ColorLut       │  MediaLibrary       │  PlaybackSession        │
//! │  FrameQueue     │  DecoderProbe       │  SurfaceRenderer        │
//! └────────┬────────┴──────────┬──────────┴────────────┬────────────┘
//!          │                   │                       │
//!          ▼                   ▼                       ▼
//!    palette bytes      decoder subprocess        TileSink (viewers)
//! ```
//!
//! # Related Crates
//!
//! You can also use the individual crates directly:
//!
//! - [`tilewall-frame`](https://crates.io/crates/tilewall-frame) - Frame primitives only
//! - [`tilewall-source`](https://crates.io/crates/tilewall-source) - Producers only
//! - [`tilewall-screen`](https://crates.io/crates/tilewall-screen) - Playback engine

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// RE-EXPORTS
// =============================================================================

/// Frame and tile primitives.
///
/// - 128x128 tiles and grid-sized frames
/// - RGB to palette index lookup
/// - P6 image demuxing from a decoder pipe
/// - Producer to tick-thread frame queue
///
/// See [`tilewall_frame`] documentation for details.
#[cfg(feature = "frame")]
#[cfg_attr(docsrs, doc(cfg(feature = "frame")))]
pub use tilewall_frame as frame;

/// Frame producers.
///
/// - Still frame sequences from a media folder
/// - Video files through the external decoder
/// - Live streams with reconnect and probe escalation
///
/// See [`tilewall_source`] documentation for details.
#[cfg(feature = "source")]
#[cfg_attr(docsrs, doc(cfg(feature = "source")))]
pub use tilewall_source as source;

/// Playback engine.
///
/// - Epoch double-buffered surface renderers
/// - Per-group playback sessions with cadence control
/// - Screen manager command surface and tick scheduler
/// - Resume intents
///
/// See [`tilewall_screen`] documentation for details.
#[cfg(feature = "screen")]
#[cfg_attr(docsrs, doc(cfg(feature = "screen")))]
pub use tilewall_screen as screen;

// =============================================================================
// PRELUDE - Common types for convenience
// =============================================================================

/// Prelude module with commonly used types.
///
/// ```rust
/// use tilewall::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "frame")]
    pub use tilewall_frame::{ColorLut, Frame, FrameError, FrameQueue, GridSize, Tile};

    #[cfg(feature = "source")]
    pub use tilewall_source::{DecoderConfig, LiveEvent, MediaLibrary, SourceError};

    #[cfg(feature = "screen")]
    pub use tilewall_screen::{
        EngineConfig, GroupId, GroupSpec, LiveParams, PlaybackParams, Position, RecordingSink,
        Scheduler, ScreenError, ScreenManager, TileSink, Viewer, ViewerDirectory,
    };
}
