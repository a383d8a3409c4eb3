//! Surface groups
//!
//! A group is a `cols x rows` grid of surfaces treated as one logical
//! screen. Member `i` shows tile row `i / cols`, column `i % cols` of every
//! frame. Publishing stages every member under one shared epoch and then
//! publishes them all in the same call, so members never disagree about
//! which frame they show.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tilewall_frame::{Frame, GridSize};

use crate::error::{Result, ScreenError};
use crate::renderer::{SurfaceRenderer, Visibility};
use crate::viewer::{Position, SurfaceId};

/// Surface group identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to bind a group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    /// Scene partition the surfaces live in
    pub partition: String,
    /// Grid layout
    pub grid: GridSize,
    /// Surfaces in row-major order; exactly `cols * rows` of them
    pub surfaces: Vec<SurfaceId>,
    /// Reference point for viewer distance
    pub center: Position,
    /// Maximum viewing distance; zero disables the check
    pub radius: f64,
}

impl GroupSpec {
    /// Spec for `grid` with surfaces numbered from `first_surface`
    #[must_use]
    pub fn sequential(partition: impl Into<String>, grid: GridSize, first_surface: u32) -> Self {
        let surfaces = (0..grid.tile_count() as u32)
            .map(|i| SurfaceId(first_surface + i))
            .collect();
        Self {
            partition: partition.into(),
            grid,
            surfaces,
            center: Position::default(),
            radius: 0.0,
        }
    }

    #[must_use]
    pub fn with_center(mut self, center: Position) -> Self {
        self.center = center;
        self
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Check the surface list against the layout
    pub fn validate(&self) -> Result<()> {
        let expected = self.grid.tile_count();
        if self.grid.cols == 0 || self.grid.rows == 0 {
            return Err(ScreenError::invalid_layout(format!(
                "layout {}x{} has no surfaces",
                self.grid.cols, self.grid.rows
            )));
        }
        if self.surfaces.len() != expected {
            return Err(ScreenError::invalid_layout(format!(
                "layout {}x{} needs {} surfaces, got {}",
                self.grid.cols,
                self.grid.rows,
                expected,
                self.surfaces.len()
            )));
        }
        let unique: HashSet<SurfaceId> = self.surfaces.iter().copied().collect();
        if unique.len() != self.surfaces.len() {
            return Err(ScreenError::invalid_layout("surface listed twice"));
        }
        if !self.radius.is_finite() {
            return Err(ScreenError::invalid_layout("radius must be finite"));
        }
        Ok(())
    }
}

/// A bound grid of surface renderers
#[derive(Debug)]
pub struct SurfaceGroup {
    id: GroupId,
    partition: String,
    grid: GridSize,
    center: Position,
    radius: f64,
    members: Vec<Arc<SurfaceRenderer>>,
    epoch: u64,
}

impl SurfaceGroup {
    /// Create renderers for every surface in `spec`
    pub fn new(id: GroupId, spec: GroupSpec) -> Result<Self> {
        spec.validate()?;
        let visibility = Visibility {
            partition: spec.partition.clone(),
            center: spec.center,
            radius: spec.radius,
        };
        let members = spec
            .surfaces
            .iter()
            .map(|&surface| {
                let renderer = SurfaceRenderer::new(surface);
                renderer.set_visibility(Some(visibility.clone()));
                Arc::new(renderer)
            })
            .collect();
        Ok(Self {
            id,
            partition: spec.partition,
            grid: spec.grid,
            center: spec.center,
            radius: spec.radius,
            members,
            epoch: 0,
        })
    }

    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    #[must_use]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    #[must_use]
    pub fn center(&self) -> Position {
        self.center
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Renderers in row-major order
    #[must_use]
    pub fn members(&self) -> &[Arc<SurfaceRenderer>] {
        &self.members
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Renderer at grid position (`row`, `col`)
    #[must_use]
    pub fn member_at(&self, row: usize, col: usize) -> Option<&Arc<SurfaceRenderer>> {
        if col >= self.grid.cols as usize {
            return None;
        }
        self.members.get(row * self.grid.cols as usize + col)
    }

    /// Renderer for `surface`, if it belongs to this group
    #[must_use]
    pub fn renderer(&self, surface: SurfaceId) -> Option<&Arc<SurfaceRenderer>> {
        self.members.iter().find(|r| r.surface() == surface)
    }

    /// Last epoch handed out
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether any member holds an unpublished tile
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.members.iter().any(|r| r.has_staged())
    }

    /// Stage every tile of `frame` under a new epoch, then publish all
    /// members
    ///
    /// Returns the new epoch.
    pub fn publish_frame(&mut self, frame: &Frame) -> Result<u64> {
        if self.members.is_empty() {
            return Err(ScreenError::EmptyGroup(self.id));
        }
        if frame.grid() != self.grid {
            return Err(ScreenError::invalid_parameter(format!(
                "frame is {}x{} surfaces, screen {} is {}x{}",
                frame.grid().cols,
                frame.grid().rows,
                self.id,
                self.grid.cols,
                self.grid.rows
            )));
        }

        self.epoch += 1;
        let epoch = self.epoch;
        for (index, renderer) in self.members.iter().enumerate() {
            let (row, col) = self.grid.position(index);
            renderer.stage(&frame.slice_tile(row, col), epoch);
        }
        for renderer in &self.members {
            renderer.publish();
        }
        Ok(epoch)
    }

    /// Drop staged tiles and forget every viewer's seen epoch
    pub fn reset_renderers(&self) {
        for renderer in &self.members {
            renderer.clear_staged();
            renderer.reset_seen();
        }
    }

    /// Unbind every surface
    pub fn clear_members(&mut self) {
        self.members.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilewall_frame::{Tile, TILE_SIZE};

    fn group(cols: u32, rows: u32) -> SurfaceGroup {
        let spec = GroupSpec::sequential("world", GridSize { cols, rows }, 100);
        SurfaceGroup::new(GroupId(1), spec).expect("group")
    }

    #[test]
    fn test_spec_validation() {
        let grid = GridSize { cols: 2, rows: 2 };
        let mut spec = GroupSpec::sequential("world", grid, 0);
        assert!(spec.validate().is_ok());

        spec.surfaces.pop();
        assert!(matches!(spec.validate(), Err(ScreenError::InvalidLayout(_))));

        let mut spec = GroupSpec::sequential("world", grid, 0);
        spec.surfaces[3] = SurfaceId(0);
        assert!(matches!(spec.validate(), Err(ScreenError::InvalidLayout(_))));

        let spec = GroupSpec::sequential("world", grid, 0).with_radius(f64::NAN);
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_member_positions() {
        let group = group(3, 2);
        assert_eq!(group.len(), 6);
        assert_eq!(group.member_at(0, 0).map(|r| r.surface()), Some(SurfaceId(100)));
        assert_eq!(group.member_at(1, 2).map(|r| r.surface()), Some(SurfaceId(105)));
        assert!(group.member_at(0, 3).is_none());
        assert!(group.member_at(2, 0).is_none());
        assert!(group.renderer(SurfaceId(104)).is_some());
    }

    #[test]
    fn test_publish_is_atomic_across_members() {
        let mut group = group(2, 2);
        let grid = group.grid();
        let pixels = (0..grid.pixel_count())
            .map(|i| {
                let (x, y) = (i % grid.width(), i / grid.width());
                ((y / TILE_SIZE) * 2 + x / TILE_SIZE) as u8
            })
            .collect();
        let frame = Frame::new(grid, pixels).expect("frame");

        assert_eq!(group.publish_frame(&frame).expect("publish"), 1);
        assert!(!group.has_pending());
        for (i, renderer) in group.members().iter().enumerate() {
            assert_eq!(renderer.current_epoch(), 1);
            assert_eq!(renderer.current_tile(), Tile::filled(i as u8));
        }

        assert_eq!(group.publish_frame(&frame).expect("publish"), 2);
        assert!(group.members().iter().all(|r| r.current_epoch() == 2));
    }

    #[test]
    fn test_black_frame_for_any_layout() {
        for (cols, rows) in [(1, 1), (2, 1), (1, 3), (4, 2)] {
            let mut group = group(cols, rows);
            let frame = Frame::filled(group.grid(), 0);
            group.publish_frame(&frame).expect("publish");
            assert!(group.members().iter().all(|r| r.current_tile() == Tile::filled(0)));
        }
    }

    #[test]
    fn test_publish_rejects_wrong_grid() {
        let mut group = group(2, 2);
        let frame = Frame::filled(GridSize { cols: 1, rows: 1 }, 0);
        assert!(matches!(group.publish_frame(&frame), Err(ScreenError::InvalidParameter(_))));
        assert_eq!(group.epoch(), 0);
    }

    #[test]
    fn test_cleared_group() {
        let mut group = group(1, 1);
        group.clear_members();
        assert!(group.is_empty());
        let frame = Frame::filled(GridSize { cols: 1, rows: 1 }, 0);
        assert!(matches!(group.publish_frame(&frame), Err(ScreenError::EmptyGroup(_))));
    }
}
