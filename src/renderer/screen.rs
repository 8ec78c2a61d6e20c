//! ScreenBase: The model view of the render thread.
//!
//! Maps between pixel space (origin top-left, y down) and mercator space
//! (y up) through a center, a scale in mercator units per pixel and a
//! rotation.

use crate::geometry::{world_rect, AnyRectD, PointD, RectD};

/// Tile edge in pixels at the reference density.
const TILE_SIZE: f64 = 256.0;
/// Most zoomed-out level.
const MIN_ZOOM: f64 = 1.0;
/// Most zoomed-in level.
const MAX_ZOOM: f64 = 20.0;

/// Mercator units per pixel at a zoom level.
fn scale_for_zoom(zoom: f64) -> f64 {
    world_rect().width() / (TILE_SIZE * zoom.exp2())
}

/// The current view transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBase {
    center: PointD,
    scale: f64,
    angle: f64,
    width: u32,
    height: u32,
}

impl Default for ScreenBase {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl ScreenBase {
    /// Whole-world view for a surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            center: PointD::ZERO,
            scale: scale_for_zoom(MIN_ZOOM),
            angle: 0.0,
            width,
            height,
        }
    }

    /// View center in mercator space.
    pub const fn center(&self) -> PointD {
        self.center
    }

    /// Mercator units per pixel.
    pub const fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotation in radians.
    pub const fn angle(&self) -> f64 {
        self.angle
    }

    /// Surface size in pixels.
    pub const fn pixel_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Fractional zoom level.
    pub fn zoom_level(&self) -> f64 {
        (world_rect().width() / (TILE_SIZE * self.scale)).log2()
    }

    fn half_extent(&self) -> PointD {
        PointD::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }

    /// Convert a pixel position to mercator space.
    pub fn pixel_to_global(&self, pixel: PointD) -> PointD {
        let half = self.half_extent();
        let offset = PointD::new(pixel.x - half.x, half.y - pixel.y);
        self.center + offset.rotated(self.angle) * self.scale
    }

    /// Convert a mercator position to pixel space.
    pub fn global_to_pixel(&self, global: PointD) -> PointD {
        let half = self.half_extent();
        let offset = ((global - self.center) * (1.0 / self.scale)).rotated(-self.angle);
        PointD::new(offset.x + half.x, half.y - offset.y)
    }

    /// The visible area as a rotated rectangle.
    pub fn clip_rect(&self) -> AnyRectD {
        let half = self.half_extent();
        AnyRectD::new(self.center, half.x * self.scale, half.y * self.scale, self.angle)
    }

    /// Move the view so that content follows a drag of `delta` pixels.
    pub fn move_by_pixels(&mut self, delta: PointD) {
        let offset = PointD::new(-delta.x, delta.y).rotated(self.angle) * self.scale;
        self.set_center(self.center + offset);
    }

    /// Zoom by `factor` keeping `pixel` fixed on screen.
    pub fn scale_around(&mut self, factor: f64, pixel: PointD) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        let anchor = self.pixel_to_global(pixel);
        self.scale = Self::clamp_scale(self.scale / factor);
        let half = self.half_extent();
        let offset = PointD::new(pixel.x - half.x, half.y - pixel.y).rotated(self.angle) * self.scale;
        self.set_center(anchor - offset);
    }

    /// Center on a point, optionally at a zoom level.
    pub fn set_center_and_zoom(&mut self, center: PointD, zoom: Option<u8>) {
        if let Some(zoom) = zoom {
            self.scale = Self::clamp_scale(scale_for_zoom(f64::from(zoom)));
        }
        self.set_center(center);
    }

    /// Fit an axis-aligned rectangle into the view.
    pub fn set_from_rect(&mut self, rect: &RectD, keep_rotation: bool, zoom: Option<u8>) {
        if rect.is_empty() && zoom.is_none() {
            return;
        }
        if !keep_rotation {
            self.angle = 0.0;
        }
        self.scale = match zoom {
            Some(zoom) => Self::clamp_scale(scale_for_zoom(f64::from(zoom))),
            None => self.fit_scale(rect.width(), rect.height()),
        };
        self.set_center(rect.center());
    }

    /// Fit a rotated rectangle into the view, adopting its rotation.
    pub fn set_from_any_rect(&mut self, rect: &AnyRectD) {
        if !(rect.half_width > 0.0 && rect.half_height > 0.0) {
            return;
        }
        self.angle = rect.angle;
        self.scale = self.fit_scale(rect.half_width * 2.0, rect.half_height * 2.0);
        self.set_center(rect.center);
    }

    /// Set the rotation.
    pub fn set_angle(&mut self, angle: f64) {
        if angle.is_finite() {
            self.angle = angle;
        }
    }

    /// Change the surface size, keeping center and scale.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn fit_scale(&self, width: f64, height: f64) -> f64 {
        let w = f64::from(self.width.max(1));
        let h = f64::from(self.height.max(1));
        Self::clamp_scale((width / w).max(height / h))
    }

    fn clamp_scale(scale: f64) -> f64 {
        scale.clamp(scale_for_zoom(MAX_ZOOM), scale_for_zoom(MIN_ZOOM))
    }

    fn set_center(&mut self, center: PointD) {
        if !center.is_finite() {
            return;
        }
        let world = world_rect();
        self.center = PointD::new(
            center.x.clamp(world.min_x, world.max_x),
            center.y.clamp(world.min_y, world.max_y),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: PointD, b: PointD) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_pixel_global_round_trip() {
        let mut screen = ScreenBase::new(800, 600);
        screen.set_center_and_zoom(PointD::new(10.0, 20.0), Some(10));
        screen.set_angle(0.3);
        let p = PointD::new(123.0, 456.0);
        assert!(close(screen.global_to_pixel(screen.pixel_to_global(p)), p));
        assert!(close(screen.pixel_to_global(PointD::new(400.0, 300.0)), PointD::new(10.0, 20.0)));
    }

    #[test]
    fn test_scale_around_keeps_anchor() {
        let mut screen = ScreenBase::new(800, 600);
        screen.set_center_and_zoom(PointD::new(0.0, 0.0), Some(5));
        let pixel = PointD::new(100.0, 100.0);
        let before = screen.pixel_to_global(pixel);
        screen.scale_around(2.0, pixel);
        assert!(close(screen.pixel_to_global(pixel), before));
        assert!((screen.zoom_level() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_drag_moves_content_with_finger() {
        let mut screen = ScreenBase::new(800, 600);
        screen.set_center_and_zoom(PointD::new(0.0, 0.0), Some(8));
        let grabbed = screen.pixel_to_global(PointD::new(400.0, 300.0));
        screen.move_by_pixels(PointD::new(50.0, -20.0));
        assert!(close(screen.global_to_pixel(grabbed), PointD::new(450.0, 280.0)));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut screen = ScreenBase::new(800, 600);
        screen.scale_around(1e12, PointD::new(400.0, 300.0));
        assert!((screen.zoom_level() - MAX_ZOOM).abs() < 1e-9);
    }

    #[test]
    fn test_fit_rect() {
        let mut screen = ScreenBase::new(100, 100);
        screen.set_from_rect(&RectD::new(0.0, 0.0, 1.0, 0.5), false, None);
        assert!((screen.scale() - 0.01).abs() < 1e-12);
        assert!(close(screen.center(), PointD::new(0.5, 0.25)));
    }
}
