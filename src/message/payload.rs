//! Payload types carried by messages.
//!
//! Route, traffic and feature data are owned by collaborators outside
//! this crate; these are the minimal shapes the engine needs to move them
//! between threads.

use std::collections::HashMap;
use std::sync::Arc;

use crate::geometry::{PointD, RectD};
use crate::renderer::ScreenBase;

/// Identifier of a user mark layer (bookmarks, search results, ...).
pub type LayerId = usize;

/// A downloaded map file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MwmId {
    /// File name without extension.
    pub name: String,
    /// Data version.
    pub version: i64,
}

impl MwmId {
    /// Create a map identifier.
    pub fn new(name: impl Into<String>, version: i64) -> Self {
        Self { name: name.into(), version }
    }
}

/// A feature inside a map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FeatureId {
    /// Map the feature belongs to.
    pub mwm: MwmId,
    /// Index inside the map.
    pub index: u32,
}

impl FeatureId {
    /// Create a feature identifier.
    pub const fn new(mwm: MwmId, index: u32) -> Self {
        Self { mwm, index }
    }
}

/// A mark shown in a user mark layer.
#[derive(Debug, Clone, PartialEq)]
pub struct UserMark {
    /// Position in mercator space.
    pub point: PointD,
    /// Symbol to draw.
    pub symbol: String,
    /// Backing feature, if the mark is a point of interest.
    pub feature: Option<FeatureId>,
}

/// Compass reading.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompassInfo {
    /// Heading in radians, clockwise from north.
    pub bearing: f64,
}

/// Location fix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsInfo {
    /// Seconds since the unix epoch.
    pub timestamp: f64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy in meters.
    pub horizontal_accuracy: f64,
    /// Course in degrees, if known.
    pub bearing: Option<f64>,
    /// Speed in meters per second, if known.
    pub speed: Option<f64>,
}

impl GpsInfo {
    /// Project the fix to mercator space.
    pub fn to_mercator(&self) -> PointD {
        let lat = self.latitude.clamp(-86.0, 86.0).to_radians();
        let y = ((std::f64::consts::FRAC_PI_4 + lat / 2.0).tan()).ln().to_degrees();
        PointD::new(self.longitude, y)
    }
}

/// A fix snapped to the active route.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteMatchingInfo {
    /// Snapped position, if the fix matched the route.
    pub matched_point: Option<PointD>,
    /// Index of the matched route segment.
    pub segment_index: usize,
}

/// What the position marker does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MyPositionMode {
    /// Waiting for the first fix.
    #[default]
    PendingPosition,
    /// The fix was lost.
    NotFollowNoPosition,
    /// Position known, view is free.
    NotFollow,
    /// View follows the position.
    Follow,
    /// View follows the position and heading.
    FollowAndRotate,
}

impl MyPositionMode {
    /// Stable code used when persisting the mode.
    pub const fn code(self) -> i64 {
        match self {
            Self::PendingPosition => 0,
            Self::NotFollowNoPosition => 1,
            Self::NotFollow => 2,
            Self::Follow => 3,
            Self::FollowAndRotate => 4,
        }
    }

    /// Inverse of [`MyPositionMode::code`].
    pub const fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Self::PendingPosition,
            1 => Self::NotFollowNoPosition,
            2 => Self::NotFollow,
            3 => Self::Follow,
            4 => Self::FollowAndRotate,
            _ => return None,
        })
    }
}

/// Commands for the position mode state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeMyPositionMode {
    /// The user tapped the position button.
    SwitchNextMode,
    /// Location services stopped delivering fixes.
    LoseLocation,
    /// The user moved the map by hand.
    StopFollowing,
}

/// Kind of the currently selected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectedObject {
    /// Nothing is selected.
    #[default]
    Empty,
    /// A point of interest.
    Poi,
    /// A user mark.
    UserMark,
    /// The position marker.
    MyPosition,
}

/// A tap reported to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct TapInfo {
    /// Tap position in pixels.
    pub pixel_point: PointD,
    /// Tap position in mercator space.
    pub mercator: PointD,
    /// Whether the press was long.
    pub is_long: bool,
    /// Whether the position marker was tapped.
    pub is_my_position_tapped: bool,
    /// Feature under the tap, if any.
    pub feature: Option<FeatureId>,
}

/// Route geometry handed in by the routing collaborator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteSegment {
    /// Polyline in mercator space.
    pub polyline: Vec<PointD>,
    /// Color name from the style.
    pub color: String,
    /// Whether this is a transit segment.
    pub is_transit: bool,
}

/// A route segment prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRenderData {
    /// Polyline in mercator space.
    pub polyline: Vec<PointD>,
    /// Bounding box of the polyline.
    pub bounds: RectD,
    /// Length in mercator units.
    pub length: f64,
    /// Color name from the style.
    pub color: String,
}

impl RouteRenderData {
    /// Build display data for a segment.
    pub fn build(segment: RouteSegment) -> Self {
        let bounds = segment.polyline.iter().fold(None, |acc: Option<RectD>, p| {
            Some(acc.map_or(RectD::new(p.x, p.y, p.x, p.y), |r| {
                RectD::new(r.min_x.min(p.x), r.min_y.min(p.y), r.max_x.max(p.x), r.max_y.max(p.y))
            }))
        });
        let length = segment
            .polyline
            .windows(2)
            .map(|pair| pair[0].distance(pair[1]))
            .sum();
        Self {
            bounds: bounds.unwrap_or_default(),
            length,
            polyline: segment.polyline,
            color: segment.color,
        }
    }
}

/// A point of the recorded GPS track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsTrackPoint {
    /// Identifier used for later removal.
    pub id: u32,
    /// Position in mercator space.
    pub point: PointD,
    /// Speed in meters per second.
    pub speed: f64,
    /// Seconds since the unix epoch.
    pub timestamp: f64,
}

/// Post-processing effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostEffect {
    /// Full-screen antialiasing.
    Antialiasing,
}

/// Label displacement strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplacementMode {
    /// Regular label priorities.
    #[default]
    Default,
    /// Hotels win over other labels.
    Hotel,
}

/// Traffic speed buckets, slowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeedGroup {
    /// Standing still.
    G0,
    /// Very slow.
    G1,
    /// Slow.
    G2,
    /// Moderate.
    G3,
    /// Near free flow.
    G4,
    /// Free flow.
    G5,
    /// Temporarily blocked.
    TempBlock,
    /// No data.
    Unknown,
}

/// Identifier of a road segment inside a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrafficSegmentId {
    /// Feature index.
    pub feature: u32,
    /// Segment index inside the feature.
    pub segment: u16,
    /// Whether the segment is traversed against its geometry.
    pub reversed: bool,
}

/// Traffic coloring per map.
pub type TrafficColoring = HashMap<MwmId, HashMap<TrafficSegmentId, SpeedGroup>>;

/// A symbol drawn over a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSymbol {
    /// Symbol name in the style.
    pub symbol_name: String,
    /// Draw under the regular feature icon.
    pub underlay: bool,
}

/// Custom symbols keyed by feature.
pub type CustomSymbols = HashMap<FeatureId, CustomSymbol>;

/// Pixel sizes of style symbols, keyed by symbol name.
pub type SymbolSizes = HashMap<String, PointD>;

/// One-shot callback that receives symbol sizes on the resource-upload
/// thread.
pub struct SymbolsSizeCallback(Box<dyn FnOnce(SymbolSizes) + Send>);

impl SymbolsSizeCallback {
    /// Wrap a callback.
    pub fn new(callback: impl FnOnce(SymbolSizes) + Send + 'static) -> Self {
        Self(Box::new(callback))
    }

    /// Consume the callback with the answer.
    pub fn call(self, sizes: SymbolSizes) {
        (self.0)(sizes);
    }
}

impl std::fmt::Debug for SymbolsSizeCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymbolsSizeCallback")
    }
}

/// Called on the render thread when the visible model view changed.
pub type ModelViewListener = Arc<dyn Fn(&ScreenBase) + Send + Sync>;
/// Called on the render thread for taps on the map.
pub type TapListener = Arc<dyn Fn(&TapInfo) + Send + Sync>;
/// Called on the render thread when the device position moved.
pub type UserPositionListener = Arc<dyn Fn(PointD) + Send + Sync>;
/// Called on the render thread when the position mode changed; the flag
/// tells whether routing is active.
pub type MyPositionModeListener = Arc<dyn Fn(MyPositionMode, bool) + Send + Sync>;

/// Callbacks the render thread reports through.
///
/// The engine owns the master copy and ships a snapshot to the render
/// thread whenever it changes.
#[derive(Clone, Default)]
pub struct Listeners {
    /// Model view changes.
    pub model_view: Option<ModelViewListener>,
    /// Taps.
    pub tap: Option<TapListener>,
    /// Device position changes.
    pub user_position: Option<UserPositionListener>,
    /// Position mode changes.
    pub my_position_mode: Option<MyPositionModeListener>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("model_view", &self.model_view.is_some())
            .field("tap", &self.tap.is_some())
            .field("user_position", &self.user_position.is_some())
            .field("my_position_mode", &self.my_position_mode.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes_round_trip() {
        for mode in [
            MyPositionMode::PendingPosition,
            MyPositionMode::NotFollowNoPosition,
            MyPositionMode::NotFollow,
            MyPositionMode::Follow,
            MyPositionMode::FollowAndRotate,
        ] {
            assert_eq!(MyPositionMode::from_code(mode.code()), Some(mode));
        }
        assert_eq!(MyPositionMode::from_code(42), None);
    }

    #[test]
    fn test_route_render_data() {
        let data = RouteRenderData::build(RouteSegment {
            polyline: vec![PointD::new(0.0, 0.0), PointD::new(3.0, 4.0), PointD::new(3.0, 10.0)],
            color: "Route".into(),
            is_transit: false,
        });
        assert!((data.length - 11.0).abs() < 1e-9);
        assert_eq!(data.bounds, RectD::new(0.0, 0.0, 3.0, 10.0));
    }

    #[test]
    fn test_mercator_projection_equator() {
        let gps = GpsInfo { latitude: 0.0, longitude: 37.5, ..GpsInfo::default() };
        let p = gps.to_mercator();
        assert!((p.x - 37.5).abs() < 1e-12);
        assert!(p.y.abs() < 1e-9);
    }
}
