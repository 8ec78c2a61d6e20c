//! Message types for cross-thread communication.
//!
//! Every public engine operation ends up as one of these values, posted
//! to the queue of the worker thread that owns the state it touches.
//! The set is closed: adding a message means adding a variant here and a
//! `MessageKind` for it, and the compiler points at every dispatcher that
//! has to learn about it.
//!
//! ```text
//! ┌────────────┐  post(thread, msg, prio)  ┌──────────────────┐
//! │   Engine   │ ────────────────────────▶ │ ThreadsCommutator│
//! └────────────┘                           └───────┬──────────┘
//!       │ push(UserEvent)                  High/Normal/Low
//!       ▼                                    ┌─────┴──────┐
//! ┌────────────┐                             ▼            ▼
//! │ UserEvents │ ──────────────────▶  Render thread  Resource-upload
//! └────────────┘     drained per frame                thread
//! ```

mod blocker;
mod kind;
mod payload;
mod user_event;

pub use blocker::{blocking_pair, Blocker, Responder};
pub use kind::MessageKind;
pub use payload::{
    ChangeMyPositionMode, CompassInfo, CustomSymbol, CustomSymbols, DisplacementMode, FeatureId,
    GpsInfo, GpsTrackPoint, LayerId, Listeners, ModelViewListener, MwmId, MyPositionMode,
    MyPositionModeListener, PostEffect, RouteMatchingInfo, RouteRenderData, RouteSegment,
    SelectedObject, SpeedGroup, SymbolSizes, SymbolsSizeCallback, TapInfo, TapListener,
    TrafficColoring, TrafficSegmentId, UserMark, UserPositionListener,
};
pub use user_event::{Touch, TouchEvent, TouchKind, UserEvent};

use crate::engine::DrapeId;
use crate::error::Result;
use crate::geometry::{PointD, RectD, TriangleD};
use crate::gui::{WidgetsInfo, WidgetsLayout};
use crate::renderer::{BackendStats, ContextHandle, FrontendStats};

/// The worker threads that own a message queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadId {
    /// Prepares GPU-uploadable resources from map, style and route changes.
    ResourceUpload,
    /// Runs the frame loop and owns everything visible on screen.
    Render,
}

impl ThreadId {
    /// Both worker threads.
    pub const ALL: [Self; 2] = [Self::ResourceUpload, Self::Render];

    /// Index into per-thread tables.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::ResourceUpload => 0,
            Self::Render => 1,
        }
    }

    /// OS thread name used when spawning the worker.
    pub const fn thread_name(self) -> &'static str {
        match self {
            Self::ResourceUpload => "drape-resource-upload",
            Self::Render => "drape-render",
        }
    }
}

/// Dequeue priority. Higher tiers always drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Priority {
    /// Drained first.
    High,
    /// Default tier.
    Normal,
    /// Drained only when nothing else is pending.
    Low,
}

impl Priority {
    /// All priorities, highest first.
    pub const ALL: [Self; 3] = [Self::High, Self::Normal, Self::Low];

    /// Index into per-priority tables; 0 is the highest tier.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Normal => 1,
            Self::Low => 2,
        }
    }
}

/// A unit of cross-thread work.
///
/// Messages are moved into the commutator on post and out of it by the
/// single consumer of the target queue; nothing else can observe them.
#[derive(Debug)]
pub enum Message {
    // ---------------------------------------------------------------
    // Render thread
    // ---------------------------------------------------------------
    /// Part of the screen that is not covered by host UI.
    SetVisibleViewport(RectD),
    /// Redraw everything on the next frame.
    Invalidate,
    /// Redraw the given mercator rectangle.
    InvalidateRect(RectD),
    /// Remove every mark of a user mark layer.
    ClearUserMarkLayer(LayerId),
    /// Show or hide a user mark layer.
    ChangeUserMarkLayerVisibility {
        /// Target layer.
        layer: LayerId,
        /// New visibility.
        visible: bool,
    },
    /// Prepared user marks coming from the resource-upload thread.
    FlushUserMarks {
        /// Target layer.
        layer: LayerId,
        /// Complete new contents of the layer.
        marks: Vec<UserMark>,
    },
    /// Reload the map style; answered once the style is swapped.
    UpdateMapStyle(Responder<()>),
    /// The graphics context was recreated; rebuild GPU objects.
    RecoverGraphicsResources,
    /// New compass heading.
    CompassInfo(CompassInfo),
    /// New location fix.
    GpsInfo {
        /// The fix itself.
        info: GpsInfo,
        /// Whether the fix can be used for navigation.
        is_navigable: bool,
        /// Fix snapped to the active route, if any.
        route_info: RouteMatchingInfo,
    },
    /// Drive the position mode state machine.
    ChangeMyPositionMode(ChangeMyPositionMode),
    /// Start following the active route.
    FollowRoute {
        /// Zoom level to use in 2d.
        preferred_zoom: i32,
        /// Zoom level to use in 3d.
        preferred_zoom_3d: i32,
        /// Whether auto zoom may change the scale while following.
        enable_auto_zoom: bool,
    },
    /// Find the visible point of interest nearest to a mercator point.
    FindVisiblePoi {
        /// Query point in mercator space.
        point: PointD,
        /// Receives the feature, if one is close enough.
        reply: Responder<Option<FeatureId>>,
    },
    /// Show the selection marker on an object.
    SelectObject {
        /// What kind of object is selected.
        object: SelectedObject,
        /// Where it is.
        point: PointD,
        /// Backing feature, if any.
        feature: Option<FeatureId>,
        /// Animate the marker appearance.
        animate: bool,
    },
    /// Dismiss the selection marker.
    DeselectObject,
    /// Report the current selection.
    GetSelectedObject(Responder<SelectedObject>),
    /// Report the last known device position.
    GetMyPosition(Responder<Option<PointD>>),
    /// A built route segment ready for display.
    FlushRouteSegment {
        /// Identifier handed out when the segment was added.
        id: DrapeId,
        /// Prepared geometry.
        data: RouteRenderData,
    },
    /// Release a displayed route segment.
    DropRouteSegment {
        /// Segment to release.
        id: DrapeId,
        /// Also stop following the route.
        deactivate_following: bool,
    },
    /// Stop following the route.
    DeactivateRouteFollowing,
    /// Show or hide a route segment.
    SetRouteSegmentVisibility {
        /// Target segment.
        id: DrapeId,
        /// New visibility.
        visible: bool,
    },
    /// Add a preview line between two points.
    AddRoutePreviewSegment {
        /// Identifier handed out to the caller.
        id: DrapeId,
        /// Start point in mercator space.
        start: PointD,
        /// Finish point in mercator space.
        finish: PointD,
    },
    /// Remove one preview segment, or all of them when `None`.
    RemoveRoutePreviewSegment(Option<DrapeId>),
    /// Allow auto zoom while following a route.
    AllowAutoZoom(bool),
    /// Perspective and 3d building preferences.
    Allow3dMode {
        /// Tilt the map while navigating.
        perspective_in_navigation: bool,
        /// Extrude buildings.
        buildings: bool,
    },
    /// Switch to perspective immediately.
    EnablePerspective,
    /// Incremental GPS track update.
    UpdateGpsTrackPoints {
        /// Points to add.
        to_add: Vec<GpsTrackPoint>,
        /// Point identifiers to remove.
        to_remove: Vec<u32>,
    },
    /// Drop the whole GPS track.
    ClearGpsTrackPoints,
    /// Enter or leave choose-position mode.
    SetAddNewPlaceMode {
        /// Entering when true.
        enable: bool,
        /// Area the chosen position must lie in; empty means anywhere.
        bound_area: Vec<TriangleD>,
        /// Kinetic scroll state to apply.
        kinetic_scroll: bool,
        /// Position to center on, if known.
        position: Option<PointD>,
    },
    /// Ignore taps until unblocked.
    BlockTapEvents(bool),
    /// Enable or disable kinetic scrolling.
    SetKineticScrollEnabled(bool),
    /// Seconds the app spent in background before this session.
    SetTimeInBackground(f64),
    /// Toggle a post-processing effect.
    SetPosteffectEnabled {
        /// The effect.
        effect: PostEffect,
        /// New state.
        enabled: bool,
    },
    /// Play the first launch animation.
    RunFirstLaunchAnimation,
    /// Prepared GUI widgets coming from the resource-upload thread.
    FlushGui {
        /// Widgets that were cached.
        widgets: WidgetsInfo,
        /// Replace the GUI layer instead of merging into it.
        reset_old_gui: bool,
    },
    /// Widget pivots moved.
    FlushGuiLayout(WidgetsLayout),
    /// The choose-position mark is cached and may be shown.
    FlushChoosePositionMark,
    /// Replace the callbacks the render thread reports through.
    UpdateListeners(Listeners),
    /// Snapshot of render-thread state.
    QueryFrontendStats(Responder<FrontendStats>),

    // ---------------------------------------------------------------
    // Resource-upload thread
    // ---------------------------------------------------------------
    /// New contents for a user mark layer.
    UpdateUserMarkLayer {
        /// Target layer.
        layer: LayerId,
        /// Complete new contents of the layer.
        marks: Vec<UserMark>,
    },
    /// Rebuild cached map shapes.
    MapShapesRecache,
    /// Rebuild GUI widgets.
    GuiRecache {
        /// Widgets to cache.
        widgets: WidgetsInfo,
        /// Discard the old GUI layer instead of merging.
        reset_old_gui: bool,
    },
    /// Widget pivots moved.
    GuiLayerLayout(WidgetsLayout),
    /// Cache the choose-position mark.
    ShowChoosePositionMark,
    /// Build a route segment.
    AddRouteSegment {
        /// Identifier handed out to the caller.
        id: DrapeId,
        /// Route geometry.
        segment: RouteSegment,
    },
    /// Release a route segment.
    RemoveRouteSegment {
        /// Segment to release.
        id: DrapeId,
        /// Also stop following the route.
        deactivate_following: bool,
    },
    /// Build extruded buildings.
    Allow3dBuildings(bool),
    /// Label displacement strategy.
    SetDisplacementMode(DisplacementMode),
    /// Enable or disable traffic rendering.
    EnableTraffic(bool),
    /// New traffic coloring.
    UpdateTraffic(TrafficColoring),
    /// Drop traffic data of one map.
    ClearTrafficData(MwmId),
    /// Use the reduced traffic palette.
    SetSimplifiedTrafficColors(bool),
    /// New font scale factor.
    SetFontScale(f64),
    /// Add symbols drawn over features.
    AddCustomSymbols(CustomSymbols),
    /// Remove custom symbols of one map, or all when `None`.
    RemoveCustomSymbols(Option<MwmId>),
    /// Look up pixel sizes of style symbols; unknown names are left out.
    RequestSymbolsSize {
        /// Symbol names.
        symbols: Vec<String>,
        /// Receives the sizes on the resource-upload thread.
        callback: SymbolsSizeCallback,
    },
    /// Snapshot of resource-upload-thread state.
    QueryBackendStats(Responder<BackendStats>),
    /// Forward a frontend stats query behind everything posted so far.
    RelayFrontendStats(Responder<FrontendStats>),

    // ---------------------------------------------------------------
    // Control, accepted by either thread
    // ---------------------------------------------------------------
    /// Attach a graphics context and start rendering.
    EnableRendering {
        /// Factory to attach with.
        context: ContextHandle,
        /// Receives the outcome of the attach.
        ack: Responder<Result<()>>,
    },
    /// Stop rendering.
    DisableRendering {
        /// Destroy the context instead of keeping it for later.
        destroy_context: bool,
        /// Answered once rendering stopped.
        ack: Responder<()>,
    },
}

impl Message {
    /// The kind of this message.
    #[allow(clippy::too_many_lines)]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::SetVisibleViewport(_) => MessageKind::SetVisibleViewport,
            Self::Invalidate => MessageKind::Invalidate,
            Self::InvalidateRect(_) => MessageKind::InvalidateRect,
            Self::ClearUserMarkLayer(_) => MessageKind::ClearUserMarkLayer,
            Self::ChangeUserMarkLayerVisibility { .. } => MessageKind::ChangeUserMarkLayerVisibility,
            Self::FlushUserMarks { .. } => MessageKind::FlushUserMarks,
            Self::UpdateMapStyle(_) => MessageKind::UpdateMapStyle,
            Self::RecoverGraphicsResources => MessageKind::RecoverGraphicsResources,
            Self::CompassInfo(_) => MessageKind::CompassInfo,
            Self::GpsInfo { .. } => MessageKind::GpsInfo,
            Self::ChangeMyPositionMode(_) => MessageKind::ChangeMyPositionMode,
            Self::FollowRoute { .. } => MessageKind::FollowRoute,
            Self::FindVisiblePoi { .. } => MessageKind::FindVisiblePoi,
            Self::SelectObject { .. } => MessageKind::SelectObject,
            Self::DeselectObject => MessageKind::DeselectObject,
            Self::GetSelectedObject(_) => MessageKind::GetSelectedObject,
            Self::GetMyPosition(_) => MessageKind::GetMyPosition,
            Self::FlushRouteSegment { .. } => MessageKind::FlushRouteSegment,
            Self::DropRouteSegment { .. } => MessageKind::DropRouteSegment,
            Self::DeactivateRouteFollowing => MessageKind::DeactivateRouteFollowing,
            Self::SetRouteSegmentVisibility { .. } => MessageKind::SetRouteSegmentVisibility,
            Self::AddRoutePreviewSegment { .. } => MessageKind::AddRoutePreviewSegment,
            Self::RemoveRoutePreviewSegment(_) => MessageKind::RemoveRoutePreviewSegment,
            Self::AllowAutoZoom(_) => MessageKind::AllowAutoZoom,
            Self::Allow3dMode { .. } => MessageKind::Allow3dMode,
            Self::EnablePerspective => MessageKind::EnablePerspective,
            Self::UpdateGpsTrackPoints { .. } => MessageKind::UpdateGpsTrackPoints,
            Self::ClearGpsTrackPoints => MessageKind::ClearGpsTrackPoints,
            Self::SetAddNewPlaceMode { .. } => MessageKind::SetAddNewPlaceMode,
            Self::BlockTapEvents(_) => MessageKind::BlockTapEvents,
            Self::SetKineticScrollEnabled(_) => MessageKind::SetKineticScrollEnabled,
            Self::SetTimeInBackground(_) => MessageKind::SetTimeInBackground,
            Self::SetPosteffectEnabled { .. } => MessageKind::SetPosteffectEnabled,
            Self::RunFirstLaunchAnimation => MessageKind::RunFirstLaunchAnimation,
            Self::FlushGui { .. } => MessageKind::FlushGui,
            Self::FlushGuiLayout(_) => MessageKind::FlushGuiLayout,
            Self::FlushChoosePositionMark => MessageKind::FlushChoosePositionMark,
            Self::UpdateListeners(_) => MessageKind::UpdateListeners,
            Self::QueryFrontendStats(_) => MessageKind::QueryFrontendStats,
            Self::UpdateUserMarkLayer { .. } => MessageKind::UpdateUserMarkLayer,
            Self::MapShapesRecache => MessageKind::MapShapesRecache,
            Self::GuiRecache { .. } => MessageKind::GuiRecache,
            Self::GuiLayerLayout(_) => MessageKind::GuiLayerLayout,
            Self::ShowChoosePositionMark => MessageKind::ShowChoosePositionMark,
            Self::AddRouteSegment { .. } => MessageKind::AddRouteSegment,
            Self::RemoveRouteSegment { .. } => MessageKind::RemoveRouteSegment,
            Self::Allow3dBuildings(_) => MessageKind::Allow3dBuildings,
            Self::SetDisplacementMode(_) => MessageKind::SetDisplacementMode,
            Self::EnableTraffic(_) => MessageKind::EnableTraffic,
            Self::UpdateTraffic(_) => MessageKind::UpdateTraffic,
            Self::ClearTrafficData(_) => MessageKind::ClearTrafficData,
            Self::SetSimplifiedTrafficColors(_) => MessageKind::SetSimplifiedTrafficColors,
            Self::SetFontScale(_) => MessageKind::SetFontScale,
            Self::AddCustomSymbols(_) => MessageKind::AddCustomSymbols,
            Self::RemoveCustomSymbols(_) => MessageKind::RemoveCustomSymbols,
            Self::RequestSymbolsSize { .. } => MessageKind::RequestSymbolsSize,
            Self::QueryBackendStats(_) => MessageKind::QueryBackendStats,
            Self::RelayFrontendStats(_) => MessageKind::RelayFrontendStats,
            Self::EnableRendering { .. } => MessageKind::EnableRendering,
            Self::DisableRendering { .. } => MessageKind::DisableRendering,
        }
    }

    /// Whether this message carries a responder its poster waits on.
    pub const fn is_blocking(&self) -> bool {
        self.kind().is_blocking()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Priority::High < Priority::Normal);
        assert!(Priority::Normal < Priority::Low);
        for (i, p) in Priority::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn test_thread_index_is_dense() {
        for (i, t) in ThreadId::ALL.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
    }

    #[test]
    fn test_kind_matches_variant() {
        let (reply, _blocker) = blocking_pair();
        let msg = Message::FindVisiblePoi { point: PointD::ZERO, reply };
        assert_eq!(msg.kind(), MessageKind::FindVisiblePoi);
        assert!(msg.is_blocking());
        assert!(!Message::Invalidate.is_blocking());
        assert_eq!(Message::MapShapesRecache.kind().target(), Some(ThreadId::ResourceUpload));
    }
}
