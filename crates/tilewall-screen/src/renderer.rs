//! Surface Renderer
//!
//! Each display surface keeps two tiles: `current`, what viewers are shown,
//! and `staged`, the next tile waiting for its group to publish. Versions
//! are tracked with an epoch number; every viewer's last received epoch is
//! remembered so a tile is only sent to a viewer once per publish.
//!
//! ```text
//!   stage(tile, epoch)        publish()              render(viewer)
//!  ─────────────────▶ staged ──────────▶ current ──────────────────▶ sink
//!                               seen map cleared     seen[viewer] = epoch
//! ```
//!
//! Epoch 0 means "never published": a fresh surface sends nothing.
//!
//! The lock only guards memory copies and counter updates. Sending to the
//! sink happens after the lock is released.

use std::collections::HashMap;

use parking_lot::Mutex;
use tilewall_frame::Tile;

use crate::viewer::{Position, SurfaceId, TileSink, Viewer, ViewerId};

/// Area a surface is visible from
#[derive(Debug, Clone, PartialEq)]
pub struct Visibility {
    /// Scene partition the surface lives in
    pub partition: String,
    /// Reference point for the distance check
    pub center: Position,
    /// Maximum viewing distance; zero or negative disables the check
    pub radius: f64,
}

impl Visibility {
    /// Whether `viewer` is in the partition and within the radius
    #[must_use]
    pub fn contains(&self, viewer: &Viewer) -> bool {
        if viewer.partition != self.partition {
            return false;
        }
        if self.radius <= 0.0 {
            return true;
        }
        viewer.position.distance_squared(&self.center) <= self.radius * self.radius
    }
}

#[derive(Debug, Default)]
struct RendererState {
    current: Tile,
    current_epoch: u64,
    staged: Tile,
    staged_epoch: u64,
    has_staged: bool,
    seen: HashMap<ViewerId, u64>,
    visibility: Option<Visibility>,
}

/// Double-buffered tile for one display surface
#[derive(Debug)]
pub struct SurfaceRenderer {
    surface: SurfaceId,
    state: Mutex<RendererState>,
}

impl SurfaceRenderer {
    /// Renderer showing nothing yet
    #[must_use]
    pub fn new(surface: SurfaceId) -> Self {
        Self {
            surface,
            state: Mutex::new(RendererState::default()),
        }
    }

    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Set or remove the visibility area
    pub fn set_visibility(&self, visibility: Option<Visibility>) {
        self.state.lock().visibility = visibility;
    }

    /// Copy `tile` into the staged buffer under `epoch`
    ///
    /// The current tile is untouched until [`publish`](Self::publish).
    pub fn stage(&self, tile: &Tile, epoch: u64) {
        let mut state = self.state.lock();
        state.staged.copy_from(tile);
        state.staged_epoch = epoch;
        state.has_staged = true;
    }

    /// Promote the staged tile to current
    ///
    /// Returns `false` (and changes nothing) when nothing is staged. On
    /// success every viewer is owed a redraw.
    pub fn publish(&self) -> bool {
        let mut state = self.state.lock();
        if !state.has_staged {
            return false;
        }
        let RendererState {
            current, staged, ..
        } = &mut *state;
        current.copy_from(staged);
        state.current_epoch = state.staged_epoch;
        state.has_staged = false;
        state.seen.clear();
        true
    }

    /// Drop the staged tile without publishing it
    pub fn clear_staged(&self) {
        let mut state = self.state.lock();
        state.has_staged = false;
        state.staged_epoch = 0;
    }

    /// Forget which viewers have the current tile
    pub fn reset_seen(&self) {
        self.state.lock().seen.clear();
    }

    /// Whether a tile is staged but not yet published
    #[must_use]
    pub fn has_staged(&self) -> bool {
        self.state.lock().has_staged
    }

    /// Epoch of the tile viewers are shown
    #[must_use]
    pub fn current_epoch(&self) -> u64 {
        self.state.lock().current_epoch
    }

    /// Copy of the tile viewers are shown
    #[must_use]
    pub fn current_tile(&self) -> Tile {
        self.state.lock().current.clone()
    }

    /// Last epoch sent to `viewer`, if any since the last publish
    #[must_use]
    pub fn seen_epoch(&self, viewer: ViewerId) -> Option<u64> {
        self.state.lock().seen.get(&viewer).copied()
    }

    /// Offer the current tile to `viewer`
    ///
    /// Nothing is sent when the viewer is out of range (its record is left
    /// as is), when it already has the current epoch, or when nothing was
    /// ever published. Returns whether a send happened.
    pub fn render(&self, viewer: &Viewer, sink: &mut dyn TileSink) -> bool {
        let (epoch, tile) = {
            let state = self.state.lock();
            if let Some(visibility) = &state.visibility {
                if !visibility.contains(viewer) {
                    return false;
                }
            }
            if state.current_epoch == 0 || state.seen.get(&viewer.id) == Some(&state.current_epoch) {
                return false;
            }
            (state.current_epoch, state.current.clone())
        };

        sink.send(viewer.id, self.surface, &tile);
        self.state.lock().seen.insert(viewer.id, epoch);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::RecordingSink;

    fn viewer(id: u64, x: f64) -> Viewer {
        Viewer::new(id, "world", Position::new(x, 0.0, 0.0))
    }

    fn published(index: u8, epoch: u64) -> SurfaceRenderer {
        let renderer = SurfaceRenderer::new(SurfaceId(1));
        renderer.stage(&Tile::filled(index), epoch);
        assert!(renderer.publish());
        renderer
    }

    #[test]
    fn test_stage_does_not_touch_current() {
        let renderer = published(3, 1);
        renderer.stage(&Tile::filled(9), 2);
        assert!(renderer.has_staged());
        assert_eq!(renderer.current_epoch(), 1);
        assert_eq!(renderer.current_tile().as_bytes()[0], 3);
    }

    #[test]
    fn test_publish_is_idempotent() {
        let renderer = published(3, 1);
        assert!(!renderer.publish());
        assert_eq!(renderer.current_epoch(), 1);
        assert_eq!(renderer.current_tile(), Tile::filled(3));
    }

    #[test]
    fn test_fresh_renderer_sends_nothing() {
        let renderer = SurfaceRenderer::new(SurfaceId(1));
        let mut sink = RecordingSink::new();
        assert!(!renderer.render(&viewer(1, 0.0), &mut sink));
        assert!(sink.sends.is_empty());
    }

    #[test]
    fn test_render_once_per_epoch() {
        let renderer = published(3, 1);
        let mut sink = RecordingSink::new();
        let v = viewer(1, 0.0);

        assert!(renderer.render(&v, &mut sink));
        assert!(!renderer.render(&v, &mut sink));
        assert_eq!(renderer.seen_epoch(v.id), Some(1));

        renderer.stage(&Tile::filled(4), 2);
        assert!(!renderer.render(&v, &mut sink));
        assert!(renderer.publish());
        assert_eq!(renderer.seen_epoch(v.id), None);
        assert!(renderer.render(&v, &mut sink));
        assert_eq!(sink.sends, vec![(v.id, SurfaceId(1), 3), (v.id, SurfaceId(1), 4)]);
    }

    #[test]
    fn test_out_of_range_viewer_untouched() {
        let renderer = published(3, 1);
        renderer.set_visibility(Some(Visibility {
            partition: "world".to_string(),
            center: Position::default(),
            radius: 10.0,
        }));
        let mut sink = RecordingSink::new();

        let far = viewer(1, 10.5);
        let edge = viewer(2, 10.0);
        let elsewhere = Viewer::new(3, "other", Position::default());

        assert!(!renderer.render(&far, &mut sink));
        assert!(!renderer.render(&elsewhere, &mut sink));
        assert_eq!(renderer.seen_epoch(far.id), None);
        assert_eq!(renderer.seen_epoch(elsewhere.id), None);
        assert!(renderer.render(&edge, &mut sink));
        assert_eq!(sink.sends.len(), 1);
    }

    #[test]
    fn test_zero_radius_is_unlimited() {
        let visibility = Visibility {
            partition: "world".to_string(),
            center: Position::default(),
            radius: 0.0,
        };
        assert!(visibility.contains(&viewer(1, 1.0e6)));
        assert!(!visibility.contains(&Viewer::new(1, "other", Position::default())));
    }

    #[test]
    fn test_reset_seen_forces_resend() {
        let renderer = published(3, 1);
        let mut sink = RecordingSink::new();
        let v = viewer(1, 0.0);
        assert!(renderer.render(&v, &mut sink));
        renderer.reset_seen();
        assert!(renderer.render(&v, &mut sink));
        assert_eq!(sink.sends.len(), 2);
    }

    #[test]
    fn test_clear_staged() {
        let renderer = published(3, 1);
        renderer.stage(&Tile::filled(4), 2);
        renderer.clear_staged();
        assert!(!renderer.has_staged());
        assert!(!renderer.publish());
        assert_eq!(renderer.current_epoch(), 1);
    }
}
