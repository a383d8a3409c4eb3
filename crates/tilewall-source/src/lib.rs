//! # tilewall-source
//!
//! Background frame producers for tiled display walls: still frame
//! sequences, video files and live network streams.
//!
//! This crate is part of the [tilewall](https://github.com/tilewall/tilewall)
//! workspace and feeds [`tilewall-frame`](https://crates.io/crates/tilewall-frame)
//! queues that the playback engine drains on its tick.
//!
//! # Features
//!
//! - **Media Library**: resolve named frame folders, natural frame order
//! - **Frame Files**: raw palette matrices, JSON pixel grids, PNG and JPEG
//! - **Video Decoding**: external decoder subprocess, raw RGB24 pipe
//! - **Live Streams**: P6 image pipe, reconnects, probe escalation
//! - **Clean Shutdown**: decoder processes are killed when a producer stops
//!
//! # Requirements
//!
//! Video and live sources need an `ffmpeg` compatible decoder on `PATH`
//! (or configured via [`DecoderConfig::decoder_binary`]) and a color
//! lookup table. Still frame sequences need neither, unless they contain
//! RGB images or RGB pixel entries.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tilewall_frame::{FrameQueue, GridSize};
//! use tilewall_source::{
//!     FolderContent, FrameSource, MediaLibrary, ProducerContext, ProducerHandle,
//!     SequenceSource, DecoderConfig,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let grid = GridSize::new(2, 2)?;
//! let library = MediaLibrary::new("/srv/tilewall");
//! let folder = library.load_folder("intro", grid)?;
//!
//! if let FolderContent::Sequence(files) = folder.content {
//!     let source = FrameSource::Sequence(SequenceSource {
//!         files,
//!         start_index: 0,
//!         looping: true,
//!         capacity: 60,
//!     });
//!     let ctx = ProducerContext {
//!         owner: "1".to_string(),
//!         grid,
//!         lut: None,
//!         config: DecoderConfig::default(),
//!     };
//!     let mut producer = ProducerHandle::spawn(source, ctx, FrameQueue::new())?;
//!
//!     // ...the playback engine pops frames from producer.queue()...
//!
//!     producer.stop(std::time::Duration::from_millis(250));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Producer thread (std)        │
//! │                              │   stdout    ┌──────────────┐
//! │  sequence: read files ───────┼─────────────│ decoder      │
//! │  video:    raw RGB24 pipe ◀──┼─────────────│ subprocess   │
//! │  live:     P6 image pipe  ◀──┼─────────────│ (ProcessSlot)│
//! │                              │             └──────────────┘
//! │  quantize through ColorLut   │
//! └──────────────┬───────────────┘
//!                │ FrameQueue
//!                ▼
//!       tick thread pops frames
//! ```
//!
//! Producers are plain OS threads since they spend their time in blocking
//! reads. Live connection milestones are sent over a tokio unbounded
//! channel so async callers can await them.

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod command;
pub mod config;
pub mod error;
pub mod loader;
pub mod process;
pub mod producer;

mod live;
mod sequence;
mod video;

// =============================================================================
// RE-EXPORTS - PRIMARY API
// =============================================================================

pub use config::{DecoderConfig, DecoderConfigBuilder, ProbeBudget, RECONNECT_DELAY};
pub use error::{Result, SourceError};
pub use live::{LiveEvent, LiveEvents};
pub use loader::{
    is_video_path, natural_order, read_frame_file, FolderContent, FrameFileKind, LoadedFolder,
    MediaLibrary,
};
pub use process::{DecoderProbe, DecoderProcess, ProcessSlot};
pub use producer::{
    FrameSource, LiveSource, ProducerContext, ProducerHandle, SequenceSource, SourceKind,
    VideoSource,
};

// =============================================================================
// CRATE-LEVEL ITEMS
// =============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
