//! FrontendRenderer: Everything that lives on the render thread.
//!
//! The frontend owns the model view, the position marker, the selection
//! and every object that is already prepared for display. It runs the
//! frame loop: pending user events are drained and applied at the start
//! of a frame, all at once, and the model-view listener hears about the
//! result once per changed frame.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{MyPositionController, Renderer, ScreenBase, UserEventQueue};
use crate::engine::DrapeId;
use crate::geometry::{PointD, RectD, TriangleD};
use crate::gui::{self, Widget, WidgetsInfo};
use crate::message::{
    ChangeMyPositionMode, FeatureId, GpsTrackPoint, LayerId, Listeners, Message, MyPositionMode,
    PostEffect, RouteRenderData, SelectedObject, TapInfo, ThreadId, Touch, TouchEvent, TouchKind,
    UserEvent, UserMark,
};

/// Presses held at least this long are reported as long taps.
const LONG_PRESS: Duration = Duration::from_millis(500);
/// Per-frame decay of a kinetic fling.
const KINETIC_DECAY: f64 = 0.85;
/// Flings slower than this many pixels per frame stop.
const KINETIC_MIN_SPEED: f64 = 0.5;

/// Construction bundle for [`FrontendRenderer`].
pub struct FrontendParams {
    /// Events pushed by the engine, drained once per frame.
    pub user_events: Arc<UserEventQueue>,
    /// Initial surface size in pixels.
    pub viewport: (u32, u32),
    /// Startup position mode.
    pub my_position_mode: MyPositionMode,
    /// Seconds spent in background before this session.
    pub time_in_background: f64,
    /// Whether a route is being followed at startup.
    pub routing_active: bool,
    /// Whether auto zoom is allowed while following a route.
    pub auto_zoom: bool,
    /// Callbacks to report through.
    pub listeners: Listeners,
    /// Whether buildings are extruded.
    pub allow_3d_buildings: bool,
    /// Ignore taps from the start.
    pub block_tap_events: bool,
    /// Post effects enabled at startup.
    pub effects: Vec<PostEffect>,
    /// Frame period while rendering.
    pub frame_interval: Duration,
    /// Finger travel in pixels before a press becomes a drag.
    pub tap_slop_px: f64,
    /// Search radius in pixels for points of interest.
    pub poi_search_radius_px: f64,
}

/// Snapshot of render-thread state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontendStats {
    /// Frames run while rendering was enabled.
    pub frames_rendered: u64,
    /// Messages dispatched to the frontend.
    pub messages_handled: u64,
    /// User events drained and applied.
    pub user_events_applied: u64,
    /// Resize events applied.
    pub resize_events: u64,
    /// Current surface size.
    pub viewport: (u32, u32),
    /// Route segments on display.
    pub active_route_segments: usize,
    /// Route segments on display and visible.
    pub visible_route_segments: usize,
    /// Route preview segments.
    pub preview_segments: usize,
    /// Marks across all user mark layers.
    pub user_marks: usize,
    /// Points of the GPS track.
    pub gps_track_points: usize,
    /// Current selection.
    pub selected_object: SelectedObject,
    /// Position mode.
    pub my_position_mode: MyPositionMode,
    /// Whether flings continue after release.
    pub kinetic_scroll_enabled: bool,
    /// Whether choose-position mode is active.
    pub choose_position_mode: bool,
    /// Whether taps are ignored.
    pub tap_events_blocked: bool,
    /// GUI flushes received.
    pub gui_flushes: u64,
    /// GUI flushes that replaced the layer.
    pub gui_resets: u64,
    /// Widgets in the GUI layer.
    pub gui_widgets: Widget,
    /// Map style reloads.
    pub style_version: u64,
    /// Whether a graphics context is attached.
    pub rendering_enabled: bool,
    /// Whether the view follows the route.
    pub following_route: bool,
    /// Seconds spent in background, as last reported.
    pub time_in_background: f64,
    /// Whether antialiasing is on.
    pub antialiasing: bool,
    /// Whether the view is tilted.
    pub perspective: bool,
    /// Whether buildings are extruded.
    pub buildings_3d: bool,
    /// Part of the surface not covered by host UI.
    pub visible_viewport: Option<RectD>,
    /// Frames that had to redraw after an invalidation.
    pub invalidations: u64,
    /// Total length of visible route segments, in mercator units.
    pub visible_route_length: f64,
    /// Feature behind the current selection.
    pub selected_feature: Option<FeatureId>,
    /// Where the selection marker is.
    pub selected_point: Option<PointD>,
    /// Whether the choose-position mark is shown.
    pub choose_position_mark_visible: bool,
    /// Whether the view center lies in the choose-position bound area.
    pub choose_position_in_bounds: bool,
}

#[derive(Debug, Clone, Copy)]
enum Gesture {
    Idle,
    Press {
        id: i64,
        start: PointD,
        last: PointD,
        at: Instant,
        dragging: bool,
        velocity: PointD,
    },
    Pinch {
        distance: f64,
    },
}

#[derive(Debug)]
struct Selection {
    object: SelectedObject,
    point: PointD,
    feature: Option<FeatureId>,
}

#[derive(Debug)]
struct MarkLayer {
    marks: Vec<UserMark>,
    visible: bool,
}

/// Render-thread state and message handlers.
pub struct FrontendRenderer {
    user_events: Arc<UserEventQueue>,
    listeners: Listeners,
    screen: ScreenBase,
    /// Part of the surface not covered by host UI, in pixels.
    visible_viewport: Option<RectD>,
    position: MyPositionController,
    selection: Option<Selection>,
    routes: HashMap<DrapeId, RouteRenderData>,
    /// Hidden segment ids. Kept apart from `routes` so a segment can be
    /// hidden before its flush arrives.
    hidden_routes: HashSet<DrapeId>,
    previews: HashMap<DrapeId, (PointD, PointD)>,
    layers: HashMap<LayerId, MarkLayer>,
    gps_track: BTreeMap<u32, GpsTrackPoint>,
    gui: WidgetsInfo,
    /// Bound area of choose-position mode, `Some` while it is active.
    choose_position: Option<Vec<TriangleD>>,
    /// Whether the resource-upload thread has cached the mark.
    choose_position_mark_cached: bool,
    gesture: Gesture,
    kinetic: Option<PointD>,
    kinetic_scroll_enabled: bool,
    taps_blocked: bool,
    perspective_in_navigation: bool,
    buildings_3d: bool,
    perspective: bool,
    effects: HashSet<PostEffect>,
    time_in_background: f64,
    rendering_enabled: bool,
    model_view_changed: bool,
    invalidated: bool,
    frame_interval: Duration,
    tap_slop_px: f64,
    poi_search_radius_px: f64,
    stats: FrontendStats,
}

impl FrontendRenderer {
    /// Create the frontend state.
    pub fn new(params: FrontendParams) -> Self {
        let (width, height) = params.viewport;
        let mut position = MyPositionController::new(
            params.my_position_mode,
            params.time_in_background,
            params.routing_active,
            params.auto_zoom,
        );
        position.set_listener(params.listeners.my_position_mode.clone());

        Self {
            user_events: params.user_events,
            listeners: params.listeners,
            screen: ScreenBase::new(width, height),
            visible_viewport: None,
            position,
            selection: None,
            routes: HashMap::new(),
            hidden_routes: HashSet::new(),
            previews: HashMap::new(),
            layers: HashMap::new(),
            gps_track: BTreeMap::new(),
            gui: WidgetsInfo::new(),
            choose_position: None,
            choose_position_mark_cached: false,
            gesture: Gesture::Idle,
            kinetic: None,
            kinetic_scroll_enabled: true,
            taps_blocked: params.block_tap_events,
            perspective_in_navigation: false,
            buildings_3d: params.allow_3d_buildings,
            perspective: false,
            effects: params.effects.into_iter().collect(),
            time_in_background: params.time_in_background,
            rendering_enabled: false,
            model_view_changed: false,
            invalidated: false,
            frame_interval: params.frame_interval,
            tap_slop_px: params.tap_slop_px,
            poi_search_radius_px: params.poi_search_radius_px,
            stats: FrontendStats::default(),
        }
    }

    /// The current model view.
    pub const fn screen(&self) -> &ScreenBase {
        &self.screen
    }

    fn snapshot(&self) -> FrontendStats {
        FrontendStats {
            viewport: self.screen.pixel_size(),
            active_route_segments: self.routes.len(),
            visible_route_segments: self.visible_routes().count(),
            preview_segments: self.previews.len(),
            user_marks: self.layers.values().map(|l| l.marks.len()).sum(),
            gps_track_points: self.gps_track.len(),
            selected_object: self.selection.as_ref().map_or(SelectedObject::Empty, |s| s.object),
            my_position_mode: self.position.mode(),
            kinetic_scroll_enabled: self.kinetic_scroll_enabled,
            choose_position_mode: self.choose_position.is_some(),
            tap_events_blocked: self.taps_blocked,
            gui_widgets: gui::widget_set(&self.gui),
            rendering_enabled: self.rendering_enabled,
            following_route: self.position.is_following_route(),
            time_in_background: self.time_in_background,
            antialiasing: self.effects.contains(&PostEffect::Antialiasing),
            perspective: self.perspective,
            buildings_3d: self.buildings_3d,
            visible_viewport: self.visible_viewport,
            visible_route_length: self.visible_routes().map(|data| data.length).sum(),
            selected_feature: self.selection.as_ref().and_then(|s| s.feature.clone()),
            selected_point: self.selection.as_ref().map(|s| s.point),
            choose_position_mark_visible: self.choose_position_mark_cached && self.choose_position.is_some(),
            choose_position_in_bounds: self.center_in_bound_area(),
            ..self.stats.clone()
        }
    }

    fn visible_routes(&self) -> impl Iterator<Item = &RouteRenderData> {
        self.routes
            .iter()
            .filter(|(id, _)| !self.hidden_routes.contains(id))
            .map(|(_, data)| data)
    }

    fn layer_mut(&mut self, layer: LayerId) -> &mut MarkLayer {
        self.layers.entry(layer).or_insert_with(|| MarkLayer { marks: Vec::new(), visible: true })
    }

    /// Whether the view center is a valid chosen position. Anything goes
    /// outside choose-position mode or with an empty bound area.
    fn center_in_bound_area(&self) -> bool {
        let center = self.screen.center();
        self.choose_position
            .as_ref()
            .map_or(true, |area| area.is_empty() || area.iter().any(|t| t.contains(center)))
    }

    // -----------------------------------------------------------------
    // User events
    // -----------------------------------------------------------------

    /// Apply every pending user event in post order.
    fn apply_user_events(&mut self) {
        for event in self.user_events.drain() {
            self.stats.user_events_applied += 1;
            match event {
                UserEvent::Touch(touch) => self.on_touch(touch),
                UserEvent::Scale { factor, pixel_point, animate: _ } => {
                    self.screen.scale_around(factor, pixel_point);
                    self.model_view_changed = true;
                }
                UserEvent::SetCenter { center, zoom, animate: _ } => {
                    self.screen.set_center_and_zoom(center, zoom);
                    self.model_view_changed = true;
                }
                UserEvent::SetRect { rect, apply_rotation, zoom, animate: _ } => {
                    self.screen.set_from_rect(&rect, apply_rotation, zoom);
                    self.model_view_changed = true;
                }
                UserEvent::SetAnyRect { rect, animate: _ } => {
                    self.screen.set_from_any_rect(&rect);
                    self.model_view_changed = true;
                }
                UserEvent::Resize { width, height } => {
                    self.screen.resize(width, height);
                    self.stats.resize_events += 1;
                    self.model_view_changed = true;
                }
            }
        }
    }

    fn on_touch(&mut self, touch: TouchEvent) {
        match (touch.kind, touch.second) {
            (TouchKind::Down | TouchKind::Move, Some(second)) => {
                self.on_pinch(touch.first.position, second.position);
            }
            (TouchKind::Down, None) => {
                self.kinetic = None;
                self.gesture = Gesture::Press {
                    id: touch.first.id,
                    start: touch.first.position,
                    last: touch.first.position,
                    at: Instant::now(),
                    dragging: false,
                    velocity: PointD::ZERO,
                };
            }
            (TouchKind::Move, None) => self.on_drag(touch.first),
            (TouchKind::Up, _) => self.on_release(touch.first),
            (TouchKind::Cancel, _) => self.gesture = Gesture::Idle,
        }
    }

    fn on_pinch(&mut self, a: PointD, b: PointD) {
        let distance = a.distance(b);
        if let Gesture::Pinch { distance: previous } = self.gesture {
            if previous > 0.0 && distance > 0.0 {
                self.screen.scale_around(distance / previous, (a + b) * 0.5);
                self.model_view_changed = true;
            }
        }
        self.gesture = Gesture::Pinch { distance };
    }

    fn on_drag(&mut self, touch: Touch) {
        let Gesture::Press { id, start, last, at, mut dragging, .. } = self.gesture else {
            return;
        };
        if id != touch.id {
            return;
        }

        let mut velocity = PointD::ZERO;
        if !dragging && touch.position.distance(start) > self.tap_slop_px {
            dragging = true;
            self.position.stop_following();
            velocity = touch.position - start;
        } else if dragging {
            velocity = touch.position - last;
        }
        if dragging {
            self.screen.move_by_pixels(velocity);
            self.model_view_changed = true;
        }
        self.gesture = Gesture::Press { id, start, last: touch.position, at, dragging, velocity };
    }

    fn on_release(&mut self, touch: Touch) {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        let Gesture::Press { dragging, velocity, at, .. } = gesture else {
            return;
        };

        if dragging {
            if self.kinetic_scroll_enabled && velocity.distance(PointD::ZERO) >= KINETIC_MIN_SPEED {
                self.kinetic = Some(velocity);
            }
            return;
        }
        if self.taps_blocked || self.choose_position.is_some() {
            return;
        }
        self.report_tap(touch.position, at.elapsed() >= LONG_PRESS);
    }

    fn report_tap(&self, pixel_point: PointD, is_long: bool) {
        let Some(listener) = &self.listeners.tap else {
            return;
        };
        let mercator = self.screen.pixel_to_global(pixel_point);
        let is_my_position_tapped = self.position.position().is_some_and(|p| {
            self.screen.global_to_pixel(p).distance(pixel_point) <= self.poi_search_radius_px
        });
        let info = TapInfo {
            pixel_point,
            mercator,
            is_long,
            is_my_position_tapped,
            feature: self.find_poi(mercator),
        };
        listener(&info);
    }

    fn step_kinetic(&mut self) {
        let Some(velocity) = self.kinetic else {
            return;
        };
        self.screen.move_by_pixels(velocity);
        self.model_view_changed = true;
        let next = velocity * KINETIC_DECAY;
        self.kinetic = (next.distance(PointD::ZERO) >= KINETIC_MIN_SPEED).then_some(next);
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Nearest feature-backed mark of a visible layer within the search
    /// radius of `point`.
    fn find_poi(&self, point: PointD) -> Option<FeatureId> {
        let radius = self.poi_search_radius_px * self.screen.scale();
        let radius_sq = radius * radius;
        self.layers
            .values()
            .filter(|layer| layer.visible)
            .flat_map(|layer| layer.marks.iter())
            .filter_map(|mark| {
                let feature = mark.feature.as_ref()?;
                let d = mark.point.distance_sq(point);
                (d <= radius_sq).then_some((d, feature))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, feature)| feature.clone())
    }

    // -----------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------

    fn follow_position(&mut self) {
        let Some(position) = self.position.position() else {
            return;
        };
        match self.position.mode() {
            MyPositionMode::Follow => {
                self.screen.set_center_and_zoom(position, None);
                self.model_view_changed = true;
            }
            MyPositionMode::FollowAndRotate => {
                self.screen.set_center_and_zoom(position, None);
                if let Some(bearing) = self.position.bearing() {
                    self.screen.set_angle(-bearing);
                }
                self.model_view_changed = true;
            }
            _ => {}
        }
    }

    fn on_gps(&mut self, point: PointD, bearing: Option<f64>, is_navigable: bool) {
        self.position.on_location_update(point);
        if is_navigable {
            if let Some(bearing) = bearing {
                self.position.on_compass_update(bearing.to_radians());
            }
        }
        self.follow_position();
        if let Some(listener) = &self.listeners.user_position {
            listener(point);
        }
    }

    fn set_choose_position_mode(&mut self, enable: bool, bound_area: Vec<TriangleD>, position: Option<PointD>) {
        if enable {
            self.selection = None;
            self.choose_position = Some(bound_area);
            if let Some(position) = position {
                self.screen.set_center_and_zoom(position, None);
                self.model_view_changed = true;
            }
        } else {
            self.choose_position = None;
        }
    }
}

impl Renderer for FrontendRenderer {
    const THREAD: ThreadId = ThreadId::Render;

    #[allow(clippy::too_many_lines)]
    fn accept(&mut self, message: Message) {
        self.stats.messages_handled += 1;
        match message {
            Message::SetVisibleViewport(rect) => self.visible_viewport = Some(rect),
            Message::Invalidate => self.invalidated = true,
            Message::InvalidateRect(rect) => {
                if self.screen.clip_rect().global_rect().intersects(&rect) {
                    self.invalidated = true;
                }
            }
            Message::ClearUserMarkLayer(layer) => {
                if let Some(layer) = self.layers.get_mut(&layer) {
                    layer.marks.clear();
                }
            }
            Message::ChangeUserMarkLayerVisibility { layer, visible } => self.layer_mut(layer).visible = visible,
            Message::FlushUserMarks { layer, marks } => self.layer_mut(layer).marks = marks,
            Message::UpdateMapStyle(reply) => {
                self.stats.style_version += 1;
                self.invalidated = true;
                tracing::debug!(version = self.stats.style_version, "map style updated");
                reply.respond(());
            }
            Message::RecoverGraphicsResources => {
                tracing::debug!("recovering graphics resources");
                self.invalidated = true;
            }
            Message::CompassInfo(info) => {
                self.position.on_compass_update(info.bearing);
                if self.position.mode() == MyPositionMode::FollowAndRotate {
                    self.follow_position();
                }
            }
            Message::GpsInfo { info, is_navigable, route_info } => {
                let point = route_info.matched_point.unwrap_or_else(|| info.to_mercator());
                self.on_gps(point, info.bearing, is_navigable);
            }
            Message::ChangeMyPositionMode(change) => {
                self.position.apply(change);
                if change == ChangeMyPositionMode::SwitchNextMode {
                    self.follow_position();
                }
            }
            Message::FollowRoute { preferred_zoom, preferred_zoom_3d, enable_auto_zoom } => {
                self.position.follow_route(enable_auto_zoom);
                self.perspective = self.perspective_in_navigation;
                let zoom = if self.perspective { preferred_zoom_3d } else { preferred_zoom };
                if let (Some(position), Ok(zoom)) = (self.position.position(), u8::try_from(zoom)) {
                    self.screen.set_center_and_zoom(position, Some(zoom));
                    self.model_view_changed = true;
                }
            }
            Message::FindVisiblePoi { point, reply } => {
                self.apply_user_events();
                reply.respond(self.find_poi(point));
            }
            Message::SelectObject { object, point, feature, animate: _ } => {
                if object == SelectedObject::Empty {
                    self.selection = None;
                } else {
                    self.selection = Some(Selection { object, point, feature });
                }
            }
            Message::DeselectObject => self.selection = None,
            Message::GetSelectedObject(reply) => {
                reply.respond(self.selection.as_ref().map_or(SelectedObject::Empty, |s| s.object));
            }
            Message::GetMyPosition(reply) => reply.respond(self.position.position()),
            Message::FlushRouteSegment { id, data } => {
                self.routes.insert(id, data);
            }
            Message::DropRouteSegment { id, deactivate_following } => {
                self.routes.remove(&id);
                self.hidden_routes.remove(&id);
                if deactivate_following {
                    self.position.deactivate_route_following();
                    self.perspective = false;
                }
            }
            Message::DeactivateRouteFollowing => {
                self.position.deactivate_route_following();
                self.perspective = false;
            }
            Message::SetRouteSegmentVisibility { id, visible } => {
                if visible {
                    self.hidden_routes.remove(&id);
                } else {
                    self.hidden_routes.insert(id);
                }
            }
            Message::AddRoutePreviewSegment { id, start, finish } => {
                self.previews.insert(id, (start, finish));
            }
            Message::RemoveRoutePreviewSegment(Some(id)) => {
                self.previews.remove(&id);
            }
            Message::RemoveRoutePreviewSegment(None) => self.previews.clear(),
            Message::AllowAutoZoom(allow) => self.position.allow_auto_zoom(allow),
            Message::Allow3dMode { perspective_in_navigation, buildings } => {
                self.perspective_in_navigation = perspective_in_navigation;
                self.buildings_3d = buildings;
                if !perspective_in_navigation {
                    self.perspective = false;
                }
            }
            Message::EnablePerspective => self.perspective = true,
            Message::UpdateGpsTrackPoints { to_add, to_remove } => {
                for id in to_remove {
                    self.gps_track.remove(&id);
                }
                self.gps_track.extend(to_add.into_iter().map(|p| (p.id, p)));
            }
            Message::ClearGpsTrackPoints => self.gps_track.clear(),
            Message::SetAddNewPlaceMode { enable, bound_area, kinetic_scroll, position } => {
                self.kinetic_scroll_enabled = kinetic_scroll;
                if !kinetic_scroll {
                    self.kinetic = None;
                }
                self.set_choose_position_mode(enable, bound_area, position);
            }
            Message::BlockTapEvents(block) => self.taps_blocked = block,
            Message::SetKineticScrollEnabled(enabled) => {
                self.kinetic_scroll_enabled = enabled;
                if !enabled {
                    self.kinetic = None;
                }
            }
            Message::SetTimeInBackground(time) => self.time_in_background = time,
            Message::SetPosteffectEnabled { effect, enabled } => {
                if enabled {
                    self.effects.insert(effect);
                } else {
                    self.effects.remove(&effect);
                }
            }
            Message::RunFirstLaunchAnimation => {
                tracing::debug!("first launch animation");
                self.screen.set_center_and_zoom(self.screen.center(), Some(2));
                self.model_view_changed = true;
            }
            Message::FlushGui { widgets, reset_old_gui } => {
                self.stats.gui_flushes += 1;
                if reset_old_gui {
                    self.stats.gui_resets += 1;
                    self.gui = widgets;
                } else {
                    self.gui.extend(widgets);
                }
            }
            Message::FlushGuiLayout(layout) => gui::apply_layout(&mut self.gui, &layout),
            Message::FlushChoosePositionMark => {
                self.choose_position_mark_cached = true;
            }
            Message::UpdateListeners(listeners) => {
                self.position.set_listener(listeners.my_position_mode.clone());
                self.listeners = listeners;
            }
            Message::QueryFrontendStats(reply) => {
                self.apply_user_events();
                reply.respond(self.snapshot());
            }
            other => {
                tracing::warn!(kind = ?other.kind(), "message not handled by the render thread");
            }
        }
    }

    fn frame_interval(&self) -> Option<Duration> {
        (self.rendering_enabled || self.kinetic.is_some()).then_some(self.frame_interval)
    }

    fn on_frame(&mut self) {
        self.apply_user_events();
        self.step_kinetic();

        if std::mem::take(&mut self.model_view_changed) {
            if let Some(listener) = &self.listeners.model_view {
                listener(&self.screen);
            }
        }
        if self.rendering_enabled {
            self.stats.frames_rendered += 1;
            if std::mem::take(&mut self.invalidated) {
                self.stats.invalidations += 1;
            }
        }
    }

    fn on_rendering_enabled(&mut self) {
        self.rendering_enabled = true;
        self.invalidated = true;
    }

    fn on_rendering_disabled(&mut self) {
        self.rendering_enabled = false;
        self.kinetic = None;
    }
}

impl std::fmt::Debug for FrontendRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontendRenderer")
            .field("screen", &self.screen)
            .field("position", &self.position)
            .field("routes", &self.routes.len())
            .field("rendering_enabled", &self.rendering_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commutator::MessageQueue;
    use crate::message::{blocking_pair, MessageKind, MwmId, RouteSegment};
    use parking_lot::Mutex;

    fn frontend() -> (FrontendRenderer, Arc<UserEventQueue>) {
        let events = Arc::new(UserEventQueue::new(Arc::new(MessageQueue::new())));
        let renderer = FrontendRenderer::new(FrontendParams {
            user_events: Arc::clone(&events),
            viewport: (800, 600),
            my_position_mode: MyPositionMode::PendingPosition,
            time_in_background: 0.0,
            routing_active: false,
            auto_zoom: false,
            listeners: Listeners::default(),
            allow_3d_buildings: false,
            block_tap_events: false,
            effects: Vec::new(),
            frame_interval: Duration::from_millis(16),
            tap_slop_px: 8.0,
            poi_search_radius_px: 20.0,
        });
        (renderer, events)
    }

    fn stats(renderer: &mut FrontendRenderer) -> FrontendStats {
        let (reply, blocker) = blocking_pair();
        renderer.accept(Message::QueryFrontendStats(reply));
        blocker.wait(MessageKind::QueryFrontendStats).unwrap()
    }

    fn touch(kind: TouchKind, x: f64, y: f64) -> UserEvent {
        UserEvent::Touch(TouchEvent::single(kind, 1, PointD::new(x, y)))
    }

    #[test]
    fn test_route_segment_flush_and_drop() {
        let (mut renderer, _events) = frontend();
        let id = DrapeId::generate();
        let data = RouteRenderData::build(RouteSegment {
            polyline: vec![PointD::ZERO, PointD::new(1.0, 1.0)],
            ..RouteSegment::default()
        });
        renderer.accept(Message::FlushRouteSegment { id, data });
        renderer.accept(Message::SetRouteSegmentVisibility { id, visible: false });
        let s = stats(&mut renderer);
        assert_eq!(s.active_route_segments, 1);
        assert_eq!(s.visible_route_segments, 0);

        renderer.accept(Message::DropRouteSegment { id, deactivate_following: true });
        assert_eq!(stats(&mut renderer).active_route_segments, 0);
    }

    #[test]
    fn test_segment_hidden_before_its_flush_stays_hidden() {
        let (mut renderer, _events) = frontend();
        let id = DrapeId::generate();
        renderer.accept(Message::SetRouteSegmentVisibility { id, visible: false });
        renderer.accept(Message::FlushRouteSegment {
            id,
            data: RouteRenderData::build(RouteSegment {
                polyline: vec![PointD::ZERO, PointD::new(3.0, 4.0)],
                ..RouteSegment::default()
            }),
        });
        let s = stats(&mut renderer);
        assert_eq!(s.active_route_segments, 1);
        assert_eq!(s.visible_route_segments, 0);
        assert!(s.visible_route_length.abs() < f64::EPSILON);

        renderer.accept(Message::DropRouteSegment { id, deactivate_following: false });
        assert!(renderer.hidden_routes.is_empty());
    }

    #[test]
    fn test_choose_position_mark_flushed_before_mode() {
        let (mut renderer, _events) = frontend();
        renderer.accept(Message::FlushChoosePositionMark);
        assert!(!stats(&mut renderer).choose_position_mark_visible);

        renderer.accept(Message::SetAddNewPlaceMode {
            enable: true,
            bound_area: Vec::new(),
            kinetic_scroll: false,
            position: None,
        });
        let s = stats(&mut renderer);
        assert!(s.choose_position_mode);
        assert!(s.choose_position_mark_visible);

        renderer.accept(Message::SetAddNewPlaceMode {
            enable: false,
            bound_area: Vec::new(),
            kinetic_scroll: true,
            position: None,
        });
        assert!(!stats(&mut renderer).choose_position_mark_visible);
    }

    #[test]
    fn test_queries_apply_pending_user_events() {
        let (mut renderer, events) = frontend();
        events.push(UserEvent::Resize { width: 1024, height: 768 });
        let s = stats(&mut renderer);
        assert_eq!(s.viewport, (1024, 768));
        assert_eq!(s.resize_events, 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_model_view_listener_fires_once_per_changed_frame() {
        let (mut renderer, events) = frontend();
        let calls = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&calls);
        renderer.accept(Message::UpdateListeners(Listeners {
            model_view: Some(Arc::new(move |_screen: &ScreenBase| *sink.lock() += 1)),
            ..Listeners::default()
        }));

        events.push(UserEvent::Scale { factor: 2.0, pixel_point: PointD::new(400.0, 300.0), animate: false });
        events.push(UserEvent::Scale { factor: 2.0, pixel_point: PointD::new(400.0, 300.0), animate: false });
        renderer.on_frame();
        renderer.on_frame();
        assert_eq!(*calls.lock(), 1);
    }

    #[test]
    fn test_tap_reported_with_feature_under_finger() {
        let (mut renderer, events) = frontend();
        let taps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&taps);
        renderer.accept(Message::UpdateListeners(Listeners {
            tap: Some(Arc::new(move |info: &TapInfo| sink.lock().push(info.clone()))),
            ..Listeners::default()
        }));
        let feature = FeatureId::new(MwmId::new("World", 1), 7);
        let center = renderer.screen().pixel_to_global(PointD::new(400.0, 300.0));
        renderer.accept(Message::FlushUserMarks {
            layer: 0,
            marks: vec![UserMark { point: center, symbol: "poi".into(), feature: Some(feature.clone()) }],
        });

        events.push(touch(TouchKind::Down, 401.0, 301.0));
        events.push(touch(TouchKind::Up, 401.0, 301.0));
        renderer.on_frame();

        let taps = taps.lock();
        assert_eq!(taps.len(), 1);
        assert_eq!(taps[0].feature, Some(feature));
        assert!(!taps[0].is_long);
    }

    #[test]
    fn test_drag_is_not_a_tap_and_stops_following() {
        let (mut renderer, events) = frontend();
        let taps = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&taps);
        renderer.accept(Message::UpdateListeners(Listeners {
            tap: Some(Arc::new(move |_: &TapInfo| *sink.lock() += 1)),
            ..Listeners::default()
        }));
        renderer.accept(Message::GpsInfo {
            info: crate::message::GpsInfo::default(),
            is_navigable: false,
            route_info: crate::message::RouteMatchingInfo::default(),
        });
        assert_eq!(stats(&mut renderer).my_position_mode, MyPositionMode::Follow);

        events.push(touch(TouchKind::Down, 100.0, 100.0));
        events.push(touch(TouchKind::Move, 150.0, 100.0));
        events.push(touch(TouchKind::Up, 150.0, 100.0));
        renderer.on_frame();

        assert_eq!(*taps.lock(), 0);
        assert_eq!(stats(&mut renderer).my_position_mode, MyPositionMode::NotFollow);
    }

    #[test]
    fn test_choose_position_mode_suppresses_taps_and_selection() {
        let (mut renderer, events) = frontend();
        let taps = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&taps);
        renderer.accept(Message::UpdateListeners(Listeners {
            tap: Some(Arc::new(move |_: &TapInfo| *sink.lock() += 1)),
            ..Listeners::default()
        }));
        renderer.accept(Message::SelectObject {
            object: SelectedObject::Poi,
            point: PointD::ZERO,
            feature: None,
            animate: false,
        });
        renderer.accept(Message::SetAddNewPlaceMode {
            enable: true,
            bound_area: Vec::new(),
            kinetic_scroll: false,
            position: None,
        });

        events.push(touch(TouchKind::Down, 10.0, 10.0));
        events.push(touch(TouchKind::Up, 10.0, 10.0));
        let s = stats(&mut renderer);
        assert_eq!(*taps.lock(), 0);
        assert!(s.choose_position_mode);
        assert!(!s.kinetic_scroll_enabled);
        assert_eq!(s.selected_object, SelectedObject::Empty);
    }

    #[test]
    fn test_gui_flush_merge_and_reset() {
        use crate::gui::{Anchor, WidgetPosition};

        let (mut renderer, _events) = frontend();
        let mut first = WidgetsInfo::new();
        first.insert(Widget::RULER, WidgetPosition::new(PointD::ZERO, Anchor::LEFT));
        let mut second = WidgetsInfo::new();
        second.insert(Widget::COMPASS, WidgetPosition::new(PointD::ZERO, Anchor::RIGHT));

        renderer.accept(Message::FlushGui { widgets: first, reset_old_gui: false });
        renderer.accept(Message::FlushGui { widgets: second.clone(), reset_old_gui: false });
        assert_eq!(stats(&mut renderer).gui_widgets, Widget::RULER | Widget::COMPASS);

        renderer.accept(Message::FlushGui { widgets: second, reset_old_gui: true });
        let s = stats(&mut renderer);
        assert_eq!(s.gui_widgets, Widget::COMPASS);
        assert_eq!(s.gui_resets, 1);
        assert_eq!(s.gui_flushes, 3);
    }

    #[test]
    fn test_frames_counted_only_while_rendering() {
        let (mut renderer, _events) = frontend();
        assert_eq!(renderer.frame_interval(), None);
        renderer.on_frame();
        renderer.on_rendering_enabled();
        assert_eq!(renderer.frame_interval(), Some(Duration::from_millis(16)));
        renderer.on_frame();
        renderer.on_frame();
        assert_eq!(stats(&mut renderer).frames_rendered, 2);
    }
}
