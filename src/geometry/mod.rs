//! Geometry: Points and rectangles in mercator and pixel space.

mod point;
mod rect;

pub use point::PointD;
pub use rect::{world_rect, AnyRectD, RectD, TriangleD};
