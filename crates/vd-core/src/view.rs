//! Coordinate spaces and the view state that links them.
//!
//! - **screen**: device pixels relative to the page
//! - **paint**: device pixels relative to the canvas origin (screen minus the
//!   viewport offset)
//! - **scene**: document space, independent of pan and zoom
//!
//! `scene = (screen - viewport_offset) / zoom - scene_scroll` and
//! `screen = (scene + scene_scroll) * zoom + viewport_offset` are exact
//! inverses; both directions are written out explicitly rather than derived
//! from an inverted matrix so repeated round trips do not drift.

use crate::geometry::BoundingArea;
use kurbo::{Affine, Point, Vec2};

/// Pan/zoom state supplied by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Canvas origin relative to the page, in screen pixels.
    pub viewport_offset: Vec2,
    /// Scroll of the scene, in scene units.
    pub scene_scroll: Vec2,
    /// Screen pixels per scene unit. Always `> 0`.
    pub zoom: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            viewport_offset: Vec2::ZERO,
            scene_scroll: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl ViewState {
    pub const MIN_ZOOM: f64 = 0.01;
    pub const MAX_ZOOM: f64 = 256.0;

    pub fn new(viewport_offset: Vec2, scene_scroll: Vec2, zoom: f64) -> Self {
        Self {
            viewport_offset,
            scene_scroll,
            zoom: zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM),
        }
    }

    pub fn screen_to_scene(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.viewport_offset.x) / self.zoom - self.scene_scroll.x,
            (p.y - self.viewport_offset.y) / self.zoom - self.scene_scroll.y,
        )
    }

    pub fn scene_to_screen(&self, p: Point) -> Point {
        Point::new(
            (p.x + self.scene_scroll.x) * self.zoom + self.viewport_offset.x,
            (p.y + self.scene_scroll.y) * self.zoom + self.viewport_offset.y,
        )
    }

    pub fn screen_to_paint(&self, p: Point) -> Point {
        p - self.viewport_offset
    }

    pub fn paint_to_screen(&self, p: Point) -> Point {
        p + self.viewport_offset
    }

    pub fn scene_to_paint(&self, p: Point) -> Point {
        Point::new(
            (p.x + self.scene_scroll.x) * self.zoom,
            (p.y + self.scene_scroll.y) * self.zoom,
        )
    }

    pub fn paint_to_scene(&self, p: Point) -> Point {
        Point::new(
            p.x / self.zoom - self.scene_scroll.x,
            p.y / self.zoom - self.scene_scroll.y,
        )
    }

    /// Convert a length in screen pixels to scene units.
    pub fn screen_len_to_scene(&self, len: f64) -> f64 {
        len / self.zoom
    }

    /// Matrix mapping scene coordinates to paint coordinates, for the
    /// rendering backend.
    pub fn scene_to_paint_transform(&self) -> Affine {
        Affine::scale(self.zoom) * Affine::translate(self.scene_scroll)
    }

    /// Scene-space area covered by a paint-space viewport of the given size.
    pub fn visible_scene_area(&self, width: f64, height: f64) -> BoundingArea {
        let tl = self.paint_to_scene(Point::ORIGIN);
        let br = self.paint_to_scene(Point::new(width, height));
        BoundingArea::new(tl.x, tl.y, br.x, br.y)
    }

    /// Change the zoom while keeping the scene point under `screen_point`
    /// stationary on screen.
    pub fn zoom_at(&mut self, screen_point: Point, zoom: f64) {
        let zoom = zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        let anchor = self.screen_to_scene(screen_point);
        self.zoom = zoom;
        self.scene_scroll = Vec2::new(
            (screen_point.x - self.viewport_offset.x) / zoom - anchor.x,
            (screen_point.y - self.viewport_offset.y) / zoom - anchor.y,
        );
    }

    /// Pan by a delta in screen pixels.
    pub fn scroll_by(&mut self, screen_delta: Vec2) {
        self.scene_scroll += screen_delta / self.zoom;
    }
}
