//! User events: Continuous interaction consumed by the frame loop.

use crate::geometry::{AnyRectD, PointD, RectD};

/// Phase of a touch gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    /// Fingers went down.
    Down,
    /// Fingers moved.
    Move,
    /// Fingers lifted.
    Up,
    /// The gesture was interrupted by the platform.
    Cancel,
}

/// A single finger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    /// Platform pointer identifier.
    pub id: i64,
    /// Position in pixels.
    pub position: PointD,
}

/// A touch sample with up to two fingers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    /// Gesture phase.
    pub kind: TouchKind,
    /// First finger.
    pub first: Touch,
    /// Second finger, for pinch gestures.
    pub second: Option<Touch>,
}

impl TouchEvent {
    /// Single-finger touch sample.
    pub const fn single(kind: TouchKind, id: i64, position: PointD) -> Self {
        Self {
            kind,
            first: Touch { id, position },
            second: None,
        }
    }
}

/// Events appended to the render thread's user event queue.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    /// Touch input.
    Touch(TouchEvent),
    /// Zoom by `factor` around a pixel point.
    Scale {
        /// Greater than 1 zooms in.
        factor: f64,
        /// Fixed point of the zoom, in pixels.
        pixel_point: PointD,
        /// Animate the change.
        animate: bool,
    },
    /// Move the view center.
    SetCenter {
        /// New center in mercator space.
        center: PointD,
        /// Zoom level, or `None` to keep the current scale.
        zoom: Option<u8>,
        /// Animate the change.
        animate: bool,
    },
    /// Fit a rectangle into the view.
    SetRect {
        /// Rectangle in mercator space.
        rect: RectD,
        /// Keep the current rotation.
        apply_rotation: bool,
        /// Zoom level override, or `None` to derive it from `rect`.
        zoom: Option<u8>,
        /// Animate the change.
        animate: bool,
    },
    /// Fit a rotated rectangle into the view.
    SetAnyRect {
        /// Rectangle in mercator space.
        rect: AnyRectD,
        /// Animate the change.
        animate: bool,
    },
    /// The surface size changed.
    Resize {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
}
