//! Viewer-facing interfaces
//!
//! The surrounding application owns the list of viewers and the network
//! path to them. The engine only needs two things from it: who is present
//! in a scene partition this tick ([`ViewerDirectory`]), and a way to hand
//! a tile to one viewer ([`TileSink`]).

use std::fmt;

use serde::{Deserialize, Serialize};
use tilewall_frame::Tile;

/// Stable viewer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display surface identity, as known to the viewers' clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u32);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point in scene coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared euclidean distance to `other`
    #[must_use]
    pub fn distance_squared(&self, other: &Self) -> f64 {
        let (dx, dy, dz) = (self.x - other.x, self.y - other.y, self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }
}

/// A viewer as seen on one tick
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub id: ViewerId,
    /// Scene partition (world, room, shard) the viewer is in
    pub partition: String,
    pub position: Position,
}

impl Viewer {
    #[must_use]
    pub fn new(id: u64, partition: impl Into<String>, position: Position) -> Self {
        Self {
            id: ViewerId(id),
            partition: partition.into(),
            position,
        }
    }
}

/// Lists the viewers present in a scene partition
pub trait ViewerDirectory {
    fn viewers_in(&self, partition: &str) -> Vec<Viewer>;
}

impl ViewerDirectory for [Viewer] {
    fn viewers_in(&self, partition: &str) -> Vec<Viewer> {
        self.iter().filter(|v| v.partition == partition).cloned().collect()
    }
}

impl ViewerDirectory for Vec<Viewer> {
    fn viewers_in(&self, partition: &str) -> Vec<Viewer> {
        self.as_slice().viewers_in(partition)
    }
}

/// Delivers a full tile to one viewer
///
/// Called outside any renderer lock, so implementations may block on I/O.
pub trait TileSink {
    fn send(&mut self, viewer: ViewerId, surface: SurfaceId, tile: &Tile);
}

/// Sink that records every send, for tests and diagnostics
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    /// `(viewer, surface, first pixel)` per send, in order
    pub sends: Vec<(ViewerId, SurfaceId, u8)>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sends to `viewer`
    #[must_use]
    pub fn count_for(&self, viewer: ViewerId) -> usize {
        self.sends.iter().filter(|(v, _, _)| *v == viewer).count()
    }

    pub fn clear(&mut self) {
        self.sends.clear();
    }
}

impl TileSink for RecordingSink {
    fn send(&mut self, viewer: ViewerId, surface: SurfaceId, tile: &Tile) {
        self.sends.push((viewer, surface, tile.as_bytes()[0]));
    }
}
