//! Rect: Axis-aligned and rotated rectangles for viewport calculations.

use super::PointD;

/// Lower bound of the mercator plane on both axes.
const MERCATOR_MIN: f64 = -180.0;
/// Upper bound of the mercator plane on both axes.
const MERCATOR_MAX: f64 = 180.0;

/// The whole valid mercator space.
pub const fn world_rect() -> RectD {
    RectD::new(MERCATOR_MIN, MERCATOR_MIN, MERCATOR_MAX, MERCATOR_MAX)
}

/// An axis-aligned rectangle defined by its two corners.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct RectD {
    /// Left edge.
    pub min_x: f64,
    /// Bottom edge.
    pub min_y: f64,
    /// Right edge.
    pub max_x: f64,
    /// Top edge.
    pub max_y: f64,
}

impl RectD {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Rectangle spanning `width` x `height` from the origin.
    #[inline]
    pub const fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    /// Rectangle of the given half-size around a center.
    #[inline]
    pub fn around(center: PointD, half_width: f64, half_height: f64) -> Self {
        Self::new(
            center.x - half_width,
            center.y - half_height,
            center.x + half_width,
            center.y + half_height,
        )
    }

    /// Width of the rectangle.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the rectangle.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> PointD {
        PointD::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Whether the rectangle has no area or non-finite corners.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Check if a point lies inside (edges included).
    #[inline]
    pub fn contains(&self, p: PointD) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    /// Check if `other` lies entirely inside this rectangle.
    #[inline]
    pub fn is_rect_inside(&self, other: &Self) -> bool {
        !other.is_empty()
            && other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// Check if this rectangle intersects with another.
    #[inline]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Grow the rectangle by `dx`/`dy` on each side.
    #[inline]
    #[must_use]
    pub fn inflate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.min_x - dx, self.min_y - dy, self.max_x + dx, self.max_y + dy)
    }
}

impl std::fmt::Debug for RectD {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RectD([{}, {}] - [{}, {}])",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

/// A rectangle rotated by an angle around its center.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnyRectD {
    /// Center in mercator space.
    pub center: PointD,
    /// Half of the width before rotation.
    pub half_width: f64,
    /// Half of the height before rotation.
    pub half_height: f64,
    /// Rotation in radians.
    pub angle: f64,
}

impl AnyRectD {
    /// Create a rotated rectangle.
    pub const fn new(center: PointD, half_width: f64, half_height: f64, angle: f64) -> Self {
        Self { center, half_width, half_height, angle }
    }

    /// The four corners in mercator space.
    pub fn corners(&self) -> [PointD; 4] {
        let (w, h) = (self.half_width, self.half_height);
        [
            PointD::new(-w, -h),
            PointD::new(w, -h),
            PointD::new(w, h),
            PointD::new(-w, h),
        ]
        .map(|corner| self.center + corner.rotated(self.angle))
    }

    /// Axis-aligned bounding box.
    pub fn global_rect(&self) -> RectD {
        let corners = self.corners();
        corners.iter().skip(1).fold(
            RectD::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y),
            |acc, p| RectD::new(acc.min_x.min(p.x), acc.min_y.min(p.y), acc.max_x.max(p.x), acc.max_y.max(p.y)),
        )
    }
}

/// A triangle, used for the bound area of choose-position mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TriangleD(pub [PointD; 3]);

impl TriangleD {
    /// Check if a point lies inside the triangle (edges included).
    pub fn contains(&self, p: PointD) -> bool {
        let [a, b, c] = self.0;
        let cross = |u: PointD, v: PointD, w: PointD| (v.x - u.x).mul_add(w.y - u.y, -(v.y - u.y) * (w.x - u.x));
        let d1 = cross(a, b, p);
        let d2 = cross(b, c, p);
        let d3 = cross(c, a, p);
        let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
        let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
        !(has_neg && has_pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_rect_inside() {
        let world = world_rect();
        assert!(world.is_rect_inside(&RectD::new(-10.0, -10.0, 10.0, 10.0)));
        assert!(!world.is_rect_inside(&RectD::new(-200.0, 0.0, 10.0, 10.0)));
        // Degenerate rectangles are never inside.
        assert!(!world.is_rect_inside(&RectD::new(5.0, 5.0, 5.0, 5.0)));
    }

    #[test]
    fn test_nan_rect_is_empty() {
        let r = RectD::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(r.is_empty());
        assert!(!world_rect().is_rect_inside(&r));
    }

    #[test]
    fn test_any_rect_global_rect() {
        let r = AnyRectD::new(PointD::new(1.0, 1.0), 2.0, 1.0, 0.0);
        let g = r.global_rect();
        assert!((g.min_x + 1.0).abs() < 1e-12);
        assert!((g.max_x - 3.0).abs() < 1e-12);
        assert!(g.min_y.abs() < 1e-12);
        assert!((g.max_y - 2.0).abs() < 1e-12);

        let rotated = AnyRectD::new(PointD::ZERO, 1.0, 1.0, std::f64::consts::FRAC_PI_4);
        let g = rotated.global_rect();
        assert!((g.max_x - std::f64::consts::SQRT_2).abs() < 1e-9);
    }

    #[test]
    fn test_triangle_contains() {
        let t = TriangleD([PointD::new(0.0, 0.0), PointD::new(4.0, 0.0), PointD::new(0.0, 4.0)]);
        assert!(t.contains(PointD::new(1.0, 1.0)));
        assert!(!t.contains(PointD::new(3.0, 3.0)));
    }
}
