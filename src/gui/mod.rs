//! GUI widgets drawn over the map.
//!
//! The engine keeps the widget table; the resource-upload thread caches
//! widget geometry from it and the render thread draws the result.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::geometry::PointD;

bitflags! {
    /// Map overlay widgets.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Widget: u8 {
        /// Distance ruler.
        const RULER = 0x1;
        /// Compass rose.
        const COMPASS = 0x2;
        /// Map data attribution.
        const COPYRIGHT = 0x4;
        /// Zoom level label.
        const SCALE_LABEL = 0x8;
        /// Crosshair shown in choose-position mode.
        const CHOOSE_POSITION_MARK = 0x10;
    }
}

bitflags! {
    /// Which side of a widget its pivot is attached to.
    ///
    /// No flags means centered on both axes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Anchor: u8 {
        /// Pivot on the left edge.
        const LEFT = 0x1;
        /// Pivot on the right edge.
        const RIGHT = 0x2;
        /// Pivot on the top edge.
        const TOP = 0x4;
        /// Pivot on the bottom edge.
        const BOTTOM = 0x8;
    }
}

/// Where a widget is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetPosition {
    /// Pivot in pixels.
    pub pixel_pivot: PointD,
    /// Side of the widget the pivot is attached to.
    pub anchor: Anchor,
}

impl WidgetPosition {
    /// Create a widget position.
    pub const fn new(pixel_pivot: PointD, anchor: Anchor) -> Self {
        Self { pixel_pivot, anchor }
    }
}

/// Every widget the host wants drawn, with its placement.
pub type WidgetsInfo = HashMap<Widget, WidgetPosition>;

/// New pivots for already placed widgets.
pub type WidgetsLayout = HashMap<Widget, PointD>;

/// Move pivots of known widgets; unknown widgets in `layout` are ignored.
pub fn apply_layout(info: &mut WidgetsInfo, layout: &WidgetsLayout) {
    for (widget, pivot) in layout {
        if let Some(position) = info.get_mut(widget) {
            position.pixel_pivot = *pivot;
        }
    }
}

/// Union of all widgets in a table.
pub fn widget_set(info: &WidgetsInfo) -> Widget {
    info.keys().fold(Widget::empty(), |acc, w| acc | *w)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_layout_ignores_unknown_widgets() {
        let mut info = WidgetsInfo::new();
        info.insert(Widget::RULER, WidgetPosition::new(PointD::new(10.0, 10.0), Anchor::LEFT | Anchor::BOTTOM));

        let mut layout = WidgetsLayout::new();
        layout.insert(Widget::RULER, PointD::new(20.0, 30.0));
        layout.insert(Widget::COMPASS, PointD::new(1.0, 1.0));
        apply_layout(&mut info, &layout);

        assert_eq!(info.len(), 1);
        assert_eq!(info[&Widget::RULER].pixel_pivot, PointD::new(20.0, 30.0));
        assert_eq!(info[&Widget::RULER].anchor, Anchor::LEFT | Anchor::BOTTOM);
    }

    #[test]
    fn test_widget_set() {
        let mut info = WidgetsInfo::new();
        info.insert(Widget::RULER, WidgetPosition::new(PointD::ZERO, Anchor::empty()));
        info.insert(Widget::COPYRIGHT, WidgetPosition::new(PointD::ZERO, Anchor::empty()));
        assert_eq!(widget_set(&info), Widget::RULER | Widget::COPYRIGHT);
    }
}
