//! Engine: The public entry point of a map view session.
//!
//! The engine owns the commutator and both worker threads. Every public
//! operation becomes one of three things:
//!
//! - a fire-and-forget post to a worker,
//! - a blocking call that waits for the worker's answer,
//! - an update of engine-local state followed by a post.
//!
//! Engine-local state (viewport, widget table, listeners, choose-position
//! and kinetic-scroll flags) is only touched from the caller thread.
//! Workers see it through messages.
//!
//! Teardown order is fixed: the render thread stops first, then the
//! resource-upload thread, which may still be forwarding to it.

mod config;
mod drape_id;

pub use config::EngineConfig;
pub use drape_id::DrapeId;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::commutator::ThreadsCommutator;
use crate::error::{EngineError, Result};
use crate::geometry::{world_rect, AnyRectD, PointD, RectD, TriangleD};
use crate::gui::{self, WidgetsInfo, WidgetsLayout};
use crate::message::{
    blocking_pair, ChangeMyPositionMode, CompassInfo, CustomSymbols, DisplacementMode, FeatureId,
    GpsInfo, GpsTrackPoint, LayerId, Listeners, Message, ModelViewListener, MwmId, MyPositionMode,
    MyPositionModeListener, PostEffect, Priority, Responder, RouteMatchingInfo, RouteSegment,
    SelectedObject, SpeedGroup, SymbolSizes, SymbolsSizeCallback, TapListener, ThreadId,
    TouchEvent, TrafficColoring, TrafficSegmentId, UserEvent, UserMark, UserPositionListener,
};
use crate::renderer::{
    BackendParams, BackendRenderer, BackendStats, ContextFactory, ContextHandle, FrontendParams,
    FrontendRenderer, FrontendStats, RendererThread, ScreenBase, UserEventQueue,
};
use crate::settings::{self, SettingValue, SettingsStore};

/// Font scale bounds.
const MIN_FONT_SCALE: f64 = 0.5;
const MAX_FONT_SCALE: f64 = 2.0;

/// Drawing surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Create a viewport.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Everything needed to start a session.
pub struct EngineParams {
    /// Initial surface size.
    pub viewport: Viewport,
    /// Position mode to start in; `None` reads the persisted one.
    pub initial_my_position_mode: Option<MyPositionMode>,
    /// Persisted settings.
    pub settings: Arc<dyn SettingsStore>,
    /// GUI widgets to draw.
    pub widgets: WidgetsInfo,
    /// Font scale factor.
    pub font_scale: f64,
    /// Whether a route is being followed.
    pub routing_active: bool,
    /// Whether auto zoom is allowed while following a route.
    pub auto_zoom: bool,
    /// Whether buildings are extruded.
    pub allow_3d_buildings: bool,
    /// Whether traffic is shown.
    pub traffic_enabled: bool,
    /// Use the reduced traffic palette.
    pub simplified_traffic_colors: bool,
    /// Ignore taps from the start.
    pub block_tap_events: bool,
    /// Start in choose-position mode.
    pub show_choose_position_mark: bool,
    /// Bound area for choose-position mode.
    pub bound_area: Vec<TriangleD>,
    /// Pixel sizes of the style's symbols.
    pub symbol_sizes: SymbolSizes,
    /// Attach graphics contexts right away.
    pub context_factory: Option<Arc<dyn ContextFactory>>,
    /// Position mode changes, called on the render thread.
    pub my_position_mode_listener: Option<MyPositionModeListener>,
    /// Tunables.
    pub config: EngineConfig,
}

impl EngineParams {
    /// Defaults for a surface of the given size.
    pub fn new(width: u32, height: u32, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            viewport: Viewport::new(width, height),
            initial_my_position_mode: None,
            settings,
            widgets: WidgetsInfo::new(),
            font_scale: 1.0,
            routing_active: false,
            auto_zoom: false,
            allow_3d_buildings: false,
            traffic_enabled: false,
            simplified_traffic_colors: false,
            block_tap_events: false,
            show_choose_position_mark: false,
            bound_area: Vec::new(),
            symbol_sizes: SymbolSizes::new(),
            context_factory: None,
            my_position_mode_listener: None,
            config: EngineConfig::default(),
        }
    }
}

/// Seconds since the unix epoch.
fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |elapsed| elapsed.as_secs_f64())
}

/// Position mode to start in.
///
/// Without an explicit or persisted mode the session waits for a fix.
/// Follow-and-rotate needs a valid persisted screen rectangle to animate
/// from; without one it degrades to follow.
fn startup_mode(explicit: Option<MyPositionMode>, store: &dyn SettingsStore) -> MyPositionMode {
    let Some(mode) = explicit.or_else(|| settings::last_location_state_mode(store)) else {
        return MyPositionMode::PendingPosition;
    };
    if mode == MyPositionMode::FollowAndRotate {
        let rect_valid = settings::get_rect(store, settings::SCREEN_CLIP_RECT)
            .is_some_and(|rect| world_rect().is_rect_inside(&rect.global_rect()));
        if !rect_valid {
            return MyPositionMode::Follow;
        }
    }
    mode
}

/// A running map view session.
pub struct Engine {
    commutator: ThreadsCommutator,
    frontend: RendererThread,
    backend: RendererThread,
    user_events: Arc<UserEventQueue>,
    settings: Arc<dyn SettingsStore>,
    viewport: Viewport,
    widgets: WidgetsInfo,
    layout: WidgetsLayout,
    /// Callbacks set by the host.
    model_view_listener: Option<ModelViewListener>,
    tap_listener: Option<TapListener>,
    user_position_listener: Option<UserPositionListener>,
    /// Persists the mode, then calls the host's listener.
    my_position_mode_listener: MyPositionModeListener,
    choose_position_mode: bool,
    kinetic_scroll_enabled: bool,
    blocking_timeout: Option<Duration>,
}

impl Engine {
    /// Start a session: spawn the workers and kick off the initial caches.
    ///
    /// # Errors
    ///
    /// Fails if a worker thread cannot be spawned or the graphics context
    /// cannot be attached.
    pub fn new(params: EngineParams) -> Result<Self> {
        let store = params.settings;
        let mode = startup_mode(params.initial_my_position_mode, store.as_ref());

        let time_in_background = settings::get_float(store.as_ref(), settings::LAST_ENTER_BACKGROUND)
            .map_or(0.0, |entered| (now_secs() - entered).max(0.0));

        let mut effects = Vec::new();
        let antialiasing = settings::antialiasing(store.as_ref());
        if antialiasing {
            tracing::info!("antialiasing is enabled");
            effects.push(PostEffect::Antialiasing);
        }

        let my_position_mode_listener: MyPositionModeListener = {
            let store = Arc::clone(&store);
            let host = params.my_position_mode_listener;
            Arc::new(move |mode: MyPositionMode, routing_active: bool| {
                settings::set_last_location_state_mode(store.as_ref(), mode);
                if let Some(host) = &host {
                    host(mode, routing_active);
                }
            })
        };

        let commutator = ThreadsCommutator::new();
        let user_events = Arc::new(UserEventQueue::new(Arc::clone(commutator.queue(ThreadId::Render))));
        let config = params.config;

        let backend = RendererThread::spawn(
            BackendRenderer::new(BackendParams {
                commutator: commutator.clone(),
                allow_3d_buildings: params.allow_3d_buildings,
                traffic_enabled: params.traffic_enabled,
                simplified_traffic_colors: params.simplified_traffic_colors,
                font_scale: params.font_scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE),
                symbol_sizes: params.symbol_sizes,
            }),
            &commutator,
        )?;

        let frontend = RendererThread::spawn(
            FrontendRenderer::new(FrontendParams {
                user_events: Arc::clone(&user_events),
                viewport: (params.viewport.width, params.viewport.height),
                my_position_mode: mode,
                time_in_background,
                routing_active: params.routing_active,
                auto_zoom: params.auto_zoom,
                listeners: Listeners {
                    my_position_mode: Some(Arc::clone(&my_position_mode_listener)),
                    ..Listeners::default()
                },
                allow_3d_buildings: params.allow_3d_buildings,
                block_tap_events: params.block_tap_events,
                effects,
                frame_interval: config.frame_interval(),
                tap_slop_px: config.tap_slop_px,
                poi_search_radius_px: config.poi_search_radius_px,
            }),
            &commutator,
        )?;

        let mut engine = Self {
            frontend,
            backend,
            commutator,
            user_events,
            settings: store,
            viewport: params.viewport,
            widgets: params.widgets,
            layout: WidgetsLayout::new(),
            model_view_listener: None,
            tap_listener: None,
            user_position_listener: None,
            my_position_mode_listener,
            choose_position_mode: false,
            kinetic_scroll_enabled: true,
            blocking_timeout: config.blocking_timeout(),
        };

        if let Some(factory) = params.context_factory {
            engine.set_rendering_enabled(factory)?;
        }

        engine.recache_gui(false);
        engine.recache_map_shapes();
        if params.show_choose_position_mark {
            engine.enable_choose_position_mode(true, params.bound_area, None);
        }
        engine.resize_impl(params.viewport.width, params.viewport.height);

        tracing::info!(
            ?mode,
            antialiasing,
            width = params.viewport.width,
            height = params.viewport.height,
            "engine created"
        );
        Ok(engine)
    }

    // -----------------------------------------------------------------
    // Posting
    // -----------------------------------------------------------------

    /// Fire-and-forget post. A rejected post means teardown has begun.
    fn post(&self, thread: ThreadId, message: Message, priority: Priority) {
        if let Err(err) = self.commutator.post(thread, message, priority) {
            tracing::warn!(%err, "message dropped");
        }
    }

    /// Post a request and wait for its answer.
    fn request<T>(
        &self,
        thread: ThreadId,
        priority: Priority,
        build: impl FnOnce(Responder<T>) -> Message,
    ) -> Result<T> {
        let (reply, blocker) = blocking_pair();
        let message = build(reply);
        let kind = message.kind();
        self.commutator.post(thread, message, priority)?;
        blocker.wait_for(kind, self.blocking_timeout)
    }

    fn add_user_event(&self, event: UserEvent) {
        self.user_events.push(event);
    }

    // -----------------------------------------------------------------
    // Surface and rendering
    // -----------------------------------------------------------------

    /// Current surface size.
    pub const fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Recover after the graphics context was lost and recreated.
    pub fn update(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidViewport { width, height });
        }
        if self.choose_position_mode {
            self.post(ThreadId::ResourceUpload, Message::ShowChoosePositionMark, Priority::High);
        }
        self.recache_gui(false);
        self.recache_map_shapes();
        self.post(ThreadId::Render, Message::RecoverGraphicsResources, Priority::High);
        self.resize_impl(width, height);
        Ok(())
    }

    /// Change the surface size.
    ///
    /// Returns whether anything changed; resizing to the current size is
    /// a no-op.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<bool> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvalidViewport { width, height });
        }
        if self.viewport == Viewport::new(width, height) {
            return Ok(false);
        }
        self.resize_impl(width, height);
        Ok(true)
    }

    fn resize_impl(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
        self.add_user_event(UserEvent::Resize { width, height });
    }

    /// Part of the surface not covered by host UI, in pixels.
    pub fn set_visible_viewport(&self, rect: RectD) {
        self.post(ThreadId::Render, Message::SetVisibleViewport(rect), Priority::Normal);
    }

    /// Redraw everything.
    pub fn invalidate(&self) {
        self.post(ThreadId::Render, Message::Invalidate, Priority::High);
    }

    /// Redraw a mercator rectangle.
    pub fn invalidate_rect(&self, rect: RectD) {
        self.post(ThreadId::Render, Message::InvalidateRect(rect), Priority::High);
    }

    /// Attach graphics contexts on both workers, resource upload first.
    pub fn set_rendering_enabled(&self, factory: Arc<dyn ContextFactory>) -> Result<()> {
        let context = ContextHandle::new(factory);
        self.backend.set_rendering_enabled(context.clone())?;
        self.frontend.set_rendering_enabled(context)?;
        tracing::debug!("rendering enabled");
        Ok(())
    }

    /// Detach graphics contexts, render thread first.
    pub fn set_rendering_disabled(&self, destroy_context: bool) -> Result<()> {
        self.frontend.set_rendering_disabled(destroy_context)?;
        self.backend.set_rendering_disabled(destroy_context)?;
        tracing::debug!(destroy_context, "rendering disabled");
        Ok(())
    }

    // -----------------------------------------------------------------
    // User events
    // -----------------------------------------------------------------

    /// Feed a touch sample.
    pub fn add_touch_event(&self, event: TouchEvent) {
        self.add_user_event(UserEvent::Touch(event));
    }

    /// Zoom by `factor` around a pixel point.
    pub fn scale(&self, factor: f64, pixel_point: PointD, animate: bool) {
        self.add_user_event(UserEvent::Scale { factor, pixel_point, animate });
    }

    /// Center the view, optionally at a zoom level.
    pub fn set_model_view_center(&self, center: PointD, zoom: Option<u8>, animate: bool) {
        self.add_user_event(UserEvent::SetCenter { center, zoom, animate });
    }

    /// Fit a rectangle into the view.
    pub fn set_model_view_rect(&self, rect: RectD, apply_rotation: bool, zoom: Option<u8>, animate: bool) {
        self.add_user_event(UserEvent::SetRect { rect, apply_rotation, zoom, animate });
    }

    /// Fit a rotated rectangle into the view.
    pub fn set_model_view_any_rect(&self, rect: AnyRectD, animate: bool) {
        self.add_user_event(UserEvent::SetAnyRect { rect, animate });
    }

    // -----------------------------------------------------------------
    // User marks and style
    // -----------------------------------------------------------------

    /// Remove every mark of a layer.
    pub fn clear_user_marks_layer(&self, layer: LayerId) {
        self.post(ThreadId::Render, Message::ClearUserMarkLayer(layer), Priority::Normal);
    }

    /// Show or hide a layer.
    pub fn change_visibility_user_marks_layer(&self, layer: LayerId, visible: bool) {
        self.post(
            ThreadId::Render,
            Message::ChangeUserMarkLayerVisibility { layer, visible },
            Priority::Normal,
        );
    }

    /// Replace the contents of a layer.
    pub fn update_user_marks_layer(&self, layer: LayerId, marks: Vec<UserMark>) {
        self.post(
            ThreadId::ResourceUpload,
            Message::UpdateUserMarkLayer { layer, marks },
            Priority::Normal,
        );
    }

    /// Reload the map style, then rebuild the GUI for it.
    pub fn update_map_style(&self) -> Result<()> {
        self.request(ThreadId::Render, Priority::High, Message::UpdateMapStyle)?;
        self.recache_gui(false);
        Ok(())
    }

    fn recache_map_shapes(&self) {
        self.post(ThreadId::ResourceUpload, Message::MapShapesRecache, Priority::Normal);
    }

    fn recache_gui(&self, reset_old_gui: bool) {
        self.post(
            ThreadId::ResourceUpload,
            Message::GuiRecache { widgets: self.widgets.clone(), reset_old_gui },
            Priority::High,
        );
    }

    /// Move widget pivots.
    pub fn set_widget_layout(&mut self, layout: WidgetsLayout) {
        gui::apply_layout(&mut self.widgets, &layout);
        self.layout = layout;
        self.post(
            ThreadId::ResourceUpload,
            Message::GuiLayerLayout(self.layout.clone()),
            Priority::Normal,
        );
    }

    /// Current widget table.
    pub const fn widgets(&self) -> &WidgetsInfo {
        &self.widgets
    }

    // -----------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------

    /// New compass heading.
    pub fn set_compass_info(&self, info: CompassInfo) {
        self.post(ThreadId::Render, Message::CompassInfo(info), Priority::High);
    }

    /// New location fix.
    pub fn set_gps_info(&self, info: GpsInfo, is_navigable: bool, route_info: RouteMatchingInfo) {
        self.post(
            ThreadId::Render,
            Message::GpsInfo { info, is_navigable, route_info },
            Priority::High,
        );
    }

    fn change_my_position_mode(&self, change: ChangeMyPositionMode) {
        self.post(ThreadId::Render, Message::ChangeMyPositionMode(change), Priority::High);
    }

    /// The position button was tapped.
    pub fn switch_my_position_next_mode(&self) {
        self.change_my_position_mode(ChangeMyPositionMode::SwitchNextMode);
    }

    /// Location services stopped.
    pub fn lose_location(&self) {
        self.change_my_position_mode(ChangeMyPositionMode::LoseLocation);
    }

    /// Stop following the position.
    pub fn stop_location_follow(&self) {
        self.change_my_position_mode(ChangeMyPositionMode::StopFollowing);
    }

    /// Start following the active route.
    pub fn follow_route(&self, preferred_zoom: i32, preferred_zoom_3d: i32, enable_auto_zoom: bool) {
        self.post(
            ThreadId::Render,
            Message::FollowRoute { preferred_zoom, preferred_zoom_3d, enable_auto_zoom },
            Priority::High,
        );
    }

    /// Last known device position, if any.
    pub fn get_my_position(&self) -> Result<Option<PointD>> {
        self.request(ThreadId::Render, Priority::High, Message::GetMyPosition)
    }

    // -----------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------

    fn update_listeners(&self) {
        let listeners = Listeners {
            model_view: self.model_view_listener.clone(),
            tap: self.tap_listener.clone(),
            user_position: self.user_position_listener.clone(),
            my_position_mode: Some(Arc::clone(&self.my_position_mode_listener)),
        };
        self.post(ThreadId::Render, Message::UpdateListeners(listeners), Priority::High);
    }

    /// Model view changes. The visible rectangle is persisted on every
    /// change before the listener is called.
    pub fn set_model_view_listener(&mut self, listener: Option<ModelViewListener>) {
        let store = Arc::clone(&self.settings);
        self.model_view_listener = Some(Arc::new(move |screen: &ScreenBase| {
            store.set(settings::SCREEN_CLIP_RECT, SettingValue::Rect(screen.clip_rect()));
            if let Some(listener) = &listener {
                listener(screen);
            }
        }));
        self.update_listeners();
    }

    /// Taps on the map.
    pub fn set_tap_listener(&mut self, listener: Option<TapListener>) {
        self.tap_listener = listener;
        self.update_listeners();
    }

    /// Device position changes.
    pub fn set_user_position_listener(&mut self, listener: Option<UserPositionListener>) {
        self.user_position_listener = listener;
        self.update_listeners();
    }

    // -----------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------

    /// Visible point of interest near a mercator point.
    pub fn get_visible_poi(&self, point: PointD) -> Result<Option<FeatureId>> {
        self.request(ThreadId::Render, Priority::High, |reply| Message::FindVisiblePoi { point, reply })
    }

    /// Show the selection marker.
    pub fn select_object(&self, object: SelectedObject, point: PointD, feature: Option<FeatureId>, animate: bool) {
        self.post(
            ThreadId::Render,
            Message::SelectObject { object, point, feature, animate },
            Priority::High,
        );
    }

    /// Hide the selection marker.
    pub fn deselect_object(&self) {
        self.post(ThreadId::Render, Message::DeselectObject, Priority::High);
    }

    /// Current selection.
    pub fn get_selected_object(&self) -> Result<SelectedObject> {
        self.request(ThreadId::Render, Priority::High, Message::GetSelectedObject)
    }

    // -----------------------------------------------------------------
    // Routes
    // -----------------------------------------------------------------

    /// Build and show a route segment.
    pub fn add_route_segment(&self, segment: RouteSegment) -> DrapeId {
        let id = DrapeId::generate();
        self.post(
            ThreadId::ResourceUpload,
            Message::AddRouteSegment { id, segment },
            Priority::Normal,
        );
        id
    }

    /// Remove a route segment.
    pub fn remove_route_segment(&self, id: DrapeId, deactivate_following: bool) {
        self.post(
            ThreadId::ResourceUpload,
            Message::RemoveRouteSegment { id, deactivate_following },
            Priority::Normal,
        );
    }

    /// Stop following the route.
    pub fn deactivate_route_following(&self) {
        self.post(ThreadId::Render, Message::DeactivateRouteFollowing, Priority::Normal);
    }

    /// Show or hide a route segment.
    pub fn set_route_segment_visibility(&self, id: DrapeId, visible: bool) {
        self.post(
            ThreadId::Render,
            Message::SetRouteSegmentVisibility { id, visible },
            Priority::Normal,
        );
    }

    /// Show a preview line between two points.
    pub fn add_route_preview_segment(&self, start: PointD, finish: PointD) -> DrapeId {
        let id = DrapeId::generate();
        self.post(
            ThreadId::Render,
            Message::AddRoutePreviewSegment { id, start, finish },
            Priority::Normal,
        );
        id
    }

    /// Remove one preview line.
    pub fn remove_route_preview_segment(&self, id: DrapeId) {
        self.post(ThreadId::Render, Message::RemoveRoutePreviewSegment(Some(id)), Priority::Normal);
    }

    /// Remove every preview line.
    pub fn remove_all_route_preview_segments(&self) {
        self.post(ThreadId::Render, Message::RemoveRoutePreviewSegment(None), Priority::Normal);
    }

    /// Allow auto zoom while following a route.
    pub fn allow_auto_zoom(&self, allow: bool) {
        self.post(ThreadId::Render, Message::AllowAutoZoom(allow), Priority::Normal);
    }

    // -----------------------------------------------------------------
    // 3d and GPS track
    // -----------------------------------------------------------------

    /// Perspective and 3d building preferences.
    pub fn allow_3d_mode(&self, perspective_in_navigation: bool, buildings: bool) {
        self.post(ThreadId::ResourceUpload, Message::Allow3dBuildings(buildings), Priority::Normal);
        self.post(
            ThreadId::Render,
            Message::Allow3dMode { perspective_in_navigation, buildings },
            Priority::Normal,
        );
    }

    /// Tilt the view now.
    pub fn enable_perspective(&self) {
        self.post(ThreadId::Render, Message::EnablePerspective, Priority::Normal);
    }

    /// Incremental GPS track update.
    pub fn update_gps_track_points(&self, to_add: Vec<GpsTrackPoint>, to_remove: Vec<u32>) {
        self.post(
            ThreadId::Render,
            Message::UpdateGpsTrackPoints { to_add, to_remove },
            Priority::Normal,
        );
    }

    /// Drop the GPS track.
    pub fn clear_gps_track_points(&self) {
        self.post(ThreadId::Render, Message::ClearGpsTrackPoints, Priority::Normal);
    }

    // -----------------------------------------------------------------
    // Interaction modes
    // -----------------------------------------------------------------

    /// Enter or leave choose-position mode.
    ///
    /// Entering stops following the position and turns kinetic scrolling
    /// off. Leaving restores the kinetic scroll preference and rebuilds
    /// the GUI from scratch.
    pub fn enable_choose_position_mode(&mut self, enable: bool, bound_area: Vec<TriangleD>, position: Option<PointD>) {
        self.choose_position_mode = enable;
        let mut kinetic_scroll = self.kinetic_scroll_enabled;
        if enable {
            self.stop_location_follow();
            self.post(ThreadId::ResourceUpload, Message::ShowChoosePositionMark, Priority::High);
            kinetic_scroll = false;
        } else {
            self.recache_gui(true);
        }
        self.post(
            ThreadId::Render,
            Message::SetAddNewPlaceMode { enable, bound_area, kinetic_scroll, position },
            Priority::High,
        );
    }

    /// Whether choose-position mode is active.
    pub const fn is_choose_position_mode(&self) -> bool {
        self.choose_position_mode
    }

    /// Ignore taps until unblocked.
    pub fn block_tap_events(&self, block: bool) {
        self.post(ThreadId::Render, Message::BlockTapEvents(block), Priority::Normal);
    }

    /// Kinetic scroll preference. Remembered but not applied while
    /// choose-position mode is active.
    pub fn set_kinetic_scroll_enabled(&mut self, enabled: bool) {
        self.kinetic_scroll_enabled = enabled;
        if self.choose_position_mode {
            return;
        }
        self.post(ThreadId::Render, Message::SetKineticScrollEnabled(enabled), Priority::High);
    }

    /// Kinetic scroll preference.
    pub const fn is_kinetic_scroll_enabled(&self) -> bool {
        self.kinetic_scroll_enabled
    }

    /// Seconds the app spent in background.
    pub fn set_time_in_background(&self, seconds: f64) {
        self.post(ThreadId::Render, Message::SetTimeInBackground(seconds), Priority::High);
    }

    /// The app is going to background; remember when.
    pub fn enter_background(&self) {
        self.settings
            .set(settings::LAST_ENTER_BACKGROUND, SettingValue::Float(now_secs()));
    }

    // -----------------------------------------------------------------
    // Map data
    // -----------------------------------------------------------------

    /// Label displacement strategy.
    pub fn set_displacement_mode(&self, mode: DisplacementMode) {
        self.post(ThreadId::ResourceUpload, Message::SetDisplacementMode(mode), Priority::Normal);
    }

    /// Show or hide traffic.
    pub fn enable_traffic(&self, enabled: bool) {
        self.post(ThreadId::ResourceUpload, Message::EnableTraffic(enabled), Priority::Normal);
    }

    /// New traffic coloring for one map. An empty coloring is ignored.
    pub fn update_traffic(&self, mwm: MwmId, coloring: HashMap<TrafficSegmentId, SpeedGroup>) {
        if coloring.is_empty() {
            return;
        }
        debug_assert!(
            coloring.values().all(|group| *group != SpeedGroup::Unknown),
            "traffic coloring with unknown speed group"
        );
        let mut update = TrafficColoring::new();
        update.insert(mwm, coloring);
        self.post(ThreadId::ResourceUpload, Message::UpdateTraffic(update), Priority::Normal);
    }

    /// Drop traffic data of one map.
    pub fn clear_traffic_cache(&self, mwm: MwmId) {
        self.post(ThreadId::ResourceUpload, Message::ClearTrafficData(mwm), Priority::Normal);
    }

    /// Use the reduced traffic palette.
    pub fn set_simplified_traffic_colors(&self, simplified: bool) {
        self.post(
            ThreadId::ResourceUpload,
            Message::SetSimplifiedTrafficColors(simplified),
            Priority::Normal,
        );
    }

    /// Font scale factor, clamped to [0.5, 2.0].
    pub fn set_font_scale_factor(&self, scale: f64) {
        if !scale.is_finite() {
            return;
        }
        let scale = scale.clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
        self.post(ThreadId::ResourceUpload, Message::SetFontScale(scale), Priority::Normal);
    }

    /// Draw symbols over features.
    pub fn add_custom_symbols(&self, symbols: CustomSymbols) {
        self.post(ThreadId::ResourceUpload, Message::AddCustomSymbols(symbols), Priority::Normal);
    }

    /// Remove custom symbols of one map.
    pub fn remove_custom_symbols(&self, mwm: MwmId) {
        self.post(ThreadId::ResourceUpload, Message::RemoveCustomSymbols(Some(mwm)), Priority::Normal);
    }

    /// Remove every custom symbol.
    pub fn remove_all_custom_symbols(&self) {
        self.post(ThreadId::ResourceUpload, Message::RemoveCustomSymbols(None), Priority::Normal);
    }

    /// Look up pixel sizes of style symbols.
    ///
    /// The callback runs on the resource-upload thread with the sizes of
    /// the known symbols; unknown names are left out.
    pub fn request_symbols_size(
        &self,
        symbols: Vec<String>,
        callback: impl FnOnce(SymbolSizes) + Send + 'static,
    ) {
        let callback = SymbolsSizeCallback::new(callback);
        self.post(
            ThreadId::ResourceUpload,
            Message::RequestSymbolsSize { symbols, callback },
            Priority::Normal,
        );
    }

    /// Toggle a post effect. Antialiasing is persisted.
    pub fn set_posteffect_enabled(&self, effect: PostEffect, enabled: bool) {
        if effect == PostEffect::Antialiasing {
            tracing::info!(enabled, "antialiasing toggled");
            self.settings.set(settings::ANTIALIASING, SettingValue::Bool(enabled));
        }
        self.post(
            ThreadId::Render,
            Message::SetPosteffectEnabled { effect, enabled },
            Priority::Normal,
        );
    }

    /// Play the first launch animation.
    pub fn run_first_launch_animation(&self) {
        self.post(ThreadId::Render, Message::RunFirstLaunchAnimation, Priority::Normal);
    }

    // -----------------------------------------------------------------
    // Diagnostics and lifecycle
    // -----------------------------------------------------------------

    /// Snapshot of the render thread.
    ///
    /// Routed through the resource-upload thread so that everything posted
    /// before it, including data the backend forwards, is reflected.
    pub fn frontend_stats(&self) -> Result<FrontendStats> {
        self.request(ThreadId::ResourceUpload, Priority::Normal, Message::RelayFrontendStats)
    }

    /// Snapshot of the resource-upload thread.
    pub fn backend_stats(&self) -> Result<BackendStats> {
        self.request(ThreadId::ResourceUpload, Priority::Normal, Message::QueryBackendStats)
    }

    fn teardown_workers(&mut self) -> Vec<ThreadId> {
        let mut stopped = Vec::with_capacity(2);
        for worker in [&mut self.frontend, &mut self.backend] {
            if worker.is_running() {
                worker.teardown();
                stopped.push(worker.thread());
            }
        }
        stopped
    }

    /// Stop both workers and return the order they stopped in.
    pub fn shutdown(mut self) -> Vec<ThreadId> {
        let stopped = self.teardown_workers();
        tracing::info!(?stopped, "engine shut down");
        stopped
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.teardown_workers();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("viewport", &self.viewport)
            .field("frontend", &self.frontend)
            .field("backend", &self.backend)
            .field("choose_position_mode", &self.choose_position_mode)
            .field("kinetic_scroll_enabled", &self.kinetic_scroll_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;

    fn store(values: Vec<(&'static str, SettingValue)>) -> MemorySettings {
        MemorySettings::with_values(values)
    }

    #[test]
    fn test_startup_mode_defaults_to_pending() {
        assert_eq!(startup_mode(None, &store(vec![])), MyPositionMode::PendingPosition);
    }

    #[test]
    fn test_startup_mode_explicit_wins() {
        let s = store(vec![(settings::LAST_LOCATION_STATE_MODE, SettingValue::Int(2))]);
        assert_eq!(startup_mode(Some(MyPositionMode::Follow), &s), MyPositionMode::Follow);
        assert_eq!(startup_mode(None, &s), MyPositionMode::NotFollow);
    }

    #[test]
    fn test_follow_and_rotate_needs_valid_clip_rect() {
        let code = SettingValue::Int(MyPositionMode::FollowAndRotate.code());
        let missing = store(vec![(settings::LAST_LOCATION_STATE_MODE, code.clone())]);
        assert_eq!(startup_mode(None, &missing), MyPositionMode::Follow);

        let outside = store(vec![
            (settings::LAST_LOCATION_STATE_MODE, code.clone()),
            (settings::SCREEN_CLIP_RECT, SettingValue::Rect(AnyRectD::new(PointD::ZERO, 500.0, 1.0, 0.0))),
        ]);
        assert_eq!(startup_mode(None, &outside), MyPositionMode::Follow);

        let valid = store(vec![
            (settings::LAST_LOCATION_STATE_MODE, code),
            (settings::SCREEN_CLIP_RECT, SettingValue::Rect(AnyRectD::new(PointD::ZERO, 1.0, 1.0, 0.3))),
        ]);
        assert_eq!(startup_mode(None, &valid), MyPositionMode::FollowAndRotate);
    }
}
