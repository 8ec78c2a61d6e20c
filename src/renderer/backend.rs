//! BackendRenderer: Resource preparation on the resource-upload thread.
//!
//! The backend turns raw data from the engine (widgets, user marks, route
//! geometry, traffic) into display-ready form and forwards the result to
//! the render thread through the commutator.

use std::collections::{HashMap, HashSet};

use super::Renderer;
use crate::commutator::ThreadsCommutator;
use crate::engine::DrapeId;
use crate::gui::{self, WidgetsInfo};
use crate::message::{
    CustomSymbols, DisplacementMode, LayerId, Message, Priority, RouteRenderData, SymbolSizes,
    ThreadId, TrafficColoring,
};

/// Construction bundle for [`BackendRenderer`].
#[derive(Debug, Clone)]
pub struct BackendParams {
    /// Route to the render thread.
    pub commutator: ThreadsCommutator,
    /// Whether buildings are extruded.
    pub allow_3d_buildings: bool,
    /// Whether traffic is shown.
    pub traffic_enabled: bool,
    /// Use the reduced traffic palette.
    pub simplified_traffic_colors: bool,
    /// Font scale factor.
    pub font_scale: f64,
    /// Pixel sizes of the style's symbols.
    pub symbol_sizes: SymbolSizes,
}

/// Snapshot of resource-upload-thread state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendStats {
    /// Messages dispatched to the backend.
    pub messages_handled: u64,
    /// GUI recaches performed.
    pub gui_recaches: u64,
    /// GUI recaches that discarded the old layer.
    pub gui_resets: u64,
    /// Map shape recaches performed.
    pub map_shape_recaches: u64,
    /// Route segments built since startup.
    pub route_segments_built: u64,
    /// Route segments currently cached.
    pub cached_route_segments: usize,
    /// User mark layers known to the backend.
    pub user_mark_layers: usize,
    /// Whether traffic is shown.
    pub traffic_enabled: bool,
    /// Colored traffic segments across all maps.
    pub traffic_segments: usize,
    /// Custom symbols registered.
    pub custom_symbols: usize,
    /// Whether buildings are extruded.
    pub buildings_3d: bool,
    /// Label displacement strategy.
    pub displacement_mode: DisplacementMode,
    /// Font scale factor.
    pub font_scale: f64,
    /// Whether the reduced traffic palette is used.
    pub simplified_traffic_colors: bool,
    /// Whether the choose-position mark is cached.
    pub choose_position_mark_cached: bool,
}

/// Resource-upload-thread state and message handlers.
#[derive(Debug)]
pub struct BackendRenderer {
    commutator: ThreadsCommutator,
    gui: WidgetsInfo,
    layers: HashMap<LayerId, usize>,
    routes: HashSet<DrapeId>,
    traffic: TrafficColoring,
    custom_symbols: CustomSymbols,
    symbol_sizes: SymbolSizes,
    stats: BackendStats,
}

impl BackendRenderer {
    /// Create the backend state.
    pub fn new(params: BackendParams) -> Self {
        Self {
            commutator: params.commutator,
            gui: WidgetsInfo::new(),
            layers: HashMap::new(),
            routes: HashSet::new(),
            traffic: TrafficColoring::new(),
            custom_symbols: CustomSymbols::new(),
            symbol_sizes: params.symbol_sizes,
            stats: BackendStats {
                traffic_enabled: params.traffic_enabled,
                buildings_3d: params.allow_3d_buildings,
                simplified_traffic_colors: params.simplified_traffic_colors,
                font_scale: params.font_scale,
                ..BackendStats::default()
            },
        }
    }

    /// Hand prepared data to the render thread.
    ///
    /// Normal priority keeps forwarded data in the order it was prepared.
    fn forward(&self, message: Message) {
        let kind = message.kind();
        if let Err(err) = self.commutator.post(ThreadId::Render, message, Priority::Normal) {
            tracing::debug!(?kind, %err, "render thread gone, forwarded message dropped");
        }
    }

    fn snapshot(&self) -> BackendStats {
        BackendStats {
            cached_route_segments: self.routes.len(),
            user_mark_layers: self.layers.len(),
            traffic_segments: self.traffic.values().map(HashMap::len).sum(),
            custom_symbols: self.custom_symbols.len(),
            ..self.stats.clone()
        }
    }
}

impl Renderer for BackendRenderer {
    const THREAD: ThreadId = ThreadId::ResourceUpload;

    fn accept(&mut self, message: Message) {
        self.stats.messages_handled += 1;
        match message {
            Message::UpdateUserMarkLayer { layer, mut marks } => {
                marks.retain(|mark| mark.point.is_finite());
                self.layers.insert(layer, marks.len());
                self.forward(Message::FlushUserMarks { layer, marks });
            }
            Message::MapShapesRecache => self.stats.map_shape_recaches += 1,
            Message::GuiRecache { widgets, reset_old_gui } => {
                self.stats.gui_recaches += 1;
                if reset_old_gui {
                    self.stats.gui_resets += 1;
                    self.gui.clone_from(&widgets);
                } else {
                    self.gui.extend(widgets.iter().map(|(w, p)| (*w, *p)));
                }
                self.forward(Message::FlushGui { widgets, reset_old_gui });
            }
            Message::GuiLayerLayout(layout) => {
                gui::apply_layout(&mut self.gui, &layout);
                self.forward(Message::FlushGuiLayout(layout));
            }
            Message::ShowChoosePositionMark => {
                self.stats.choose_position_mark_cached = true;
                self.forward(Message::FlushChoosePositionMark);
            }
            Message::AddRouteSegment { id, segment } => {
                if segment.polyline.len() < 2 {
                    tracing::warn!(?id, points = segment.polyline.len(), "degenerate route segment");
                }
                let data = RouteRenderData::build(segment);
                self.stats.route_segments_built += 1;
                self.routes.insert(id);
                self.forward(Message::FlushRouteSegment { id, data });
            }
            Message::RemoveRouteSegment { id, deactivate_following } => {
                self.routes.remove(&id);
                self.forward(Message::DropRouteSegment { id, deactivate_following });
            }
            Message::Allow3dBuildings(allow) => self.stats.buildings_3d = allow,
            Message::SetDisplacementMode(mode) => self.stats.displacement_mode = mode,
            Message::EnableTraffic(enabled) => {
                self.stats.traffic_enabled = enabled;
                if !enabled {
                    self.traffic.clear();
                }
            }
            Message::UpdateTraffic(coloring) => {
                if self.stats.traffic_enabled {
                    self.traffic.extend(coloring);
                }
            }
            Message::ClearTrafficData(mwm) => {
                self.traffic.remove(&mwm);
            }
            Message::SetSimplifiedTrafficColors(simplified) => {
                self.stats.simplified_traffic_colors = simplified;
            }
            Message::SetFontScale(scale) => self.stats.font_scale = scale,
            Message::AddCustomSymbols(symbols) => self.custom_symbols.extend(symbols),
            Message::RemoveCustomSymbols(Some(mwm)) => {
                self.custom_symbols.retain(|feature, _| feature.mwm != mwm);
            }
            Message::RemoveCustomSymbols(None) => self.custom_symbols.clear(),
            Message::RequestSymbolsSize { symbols, callback } => {
                let sizes = symbols
                    .into_iter()
                    .filter_map(|name| self.symbol_sizes.get(&name).map(|&size| (name, size)))
                    .collect();
                callback.call(sizes);
            }
            Message::QueryBackendStats(reply) => reply.respond(self.snapshot()),
            Message::RelayFrontendStats(reply) => self.forward(Message::QueryFrontendStats(reply)),
            other => {
                tracing::warn!(kind = ?other.kind(), "message not handled by the resource-upload thread");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::PointD;
    use crate::message::{
        blocking_pair, CustomSymbol, FeatureId, MessageKind, MwmId, RouteSegment, SpeedGroup,
        SymbolsSizeCallback, TrafficSegmentId, UserMark,
    };

    fn backend() -> (BackendRenderer, ThreadsCommutator) {
        let commutator = ThreadsCommutator::new();
        let renderer = BackendRenderer::new(BackendParams {
            commutator: commutator.clone(),
            allow_3d_buildings: false,
            traffic_enabled: true,
            simplified_traffic_colors: false,
            font_scale: 1.0,
            symbol_sizes: SymbolSizes::from([("star".to_owned(), PointD::new(24.0, 24.0))]),
        });
        (renderer, commutator)
    }

    fn stats(renderer: &mut BackendRenderer) -> BackendStats {
        let (reply, blocker) = blocking_pair();
        renderer.accept(Message::QueryBackendStats(reply));
        blocker.wait(MessageKind::QueryBackendStats).unwrap()
    }

    fn forwarded(commutator: &ThreadsCommutator) -> Vec<MessageKind> {
        let queue = commutator.queue(ThreadId::Render);
        std::iter::from_fn(|| queue.try_pop()).map(|m| m.kind()).collect()
    }

    #[test]
    fn test_route_segment_is_built_and_forwarded() {
        let (mut renderer, commutator) = backend();
        let id = DrapeId::generate();
        renderer.accept(Message::AddRouteSegment {
            id,
            segment: RouteSegment {
                polyline: vec![PointD::ZERO, PointD::new(0.0, 2.0)],
                ..RouteSegment::default()
            },
        });
        renderer.accept(Message::RemoveRouteSegment { id, deactivate_following: false });

        assert_eq!(
            forwarded(&commutator),
            vec![MessageKind::FlushRouteSegment, MessageKind::DropRouteSegment]
        );
        let s = stats(&mut renderer);
        assert_eq!(s.route_segments_built, 1);
        assert_eq!(s.cached_route_segments, 0);
    }

    #[test]
    fn test_user_marks_drop_non_finite_points() {
        let (mut renderer, commutator) = backend();
        let mark = |x: f64| UserMark { point: PointD::new(x, 0.0), symbol: "pin".into(), feature: None };
        renderer.accept(Message::UpdateUserMarkLayer { layer: 3, marks: vec![mark(1.0), mark(f64::NAN)] });

        let message = commutator.queue(ThreadId::Render).try_pop();
        assert!(matches!(message, Some(Message::FlushUserMarks { layer: 3, ref marks }) if marks.len() == 1));
    }

    #[test]
    fn test_gui_recache_counts_resets() {
        let (mut renderer, commutator) = backend();
        renderer.accept(Message::GuiRecache { widgets: WidgetsInfo::new(), reset_old_gui: false });
        renderer.accept(Message::GuiRecache { widgets: WidgetsInfo::new(), reset_old_gui: true });
        let s = stats(&mut renderer);
        assert_eq!(s.gui_recaches, 2);
        assert_eq!(s.gui_resets, 1);
        assert_eq!(forwarded(&commutator), vec![MessageKind::FlushGui, MessageKind::FlushGui]);
    }

    #[test]
    fn test_traffic_lifecycle() {
        let (mut renderer, _commutator) = backend();
        let mwm = MwmId::new("Berlin", 170_101);
        let segment = TrafficSegmentId { feature: 1, segment: 0, reversed: false };
        let mut coloring = TrafficColoring::new();
        coloring.insert(mwm.clone(), HashMap::from([(segment, SpeedGroup::G3)]));

        renderer.accept(Message::UpdateTraffic(coloring));
        assert_eq!(stats(&mut renderer).traffic_segments, 1);

        renderer.accept(Message::ClearTrafficData(mwm));
        assert_eq!(stats(&mut renderer).traffic_segments, 0);
    }

    #[test]
    fn test_custom_symbols_removed_per_map() {
        let (mut renderer, _commutator) = backend();
        let symbol = CustomSymbol { symbol_name: "star".into(), underlay: false };
        let a = FeatureId::new(MwmId::new("A", 1), 1);
        let b = FeatureId::new(MwmId::new("B", 1), 1);
        renderer.accept(Message::AddCustomSymbols(CustomSymbols::from([
            (a, symbol.clone()),
            (b.clone(), symbol),
        ])));

        renderer.accept(Message::RemoveCustomSymbols(Some(b.mwm)));
        assert_eq!(stats(&mut renderer).custom_symbols, 1);
        renderer.accept(Message::RemoveCustomSymbols(None));
        assert_eq!(stats(&mut renderer).custom_symbols, 0);
    }

    #[test]
    fn test_symbols_size_answers_known_symbols() {
        let (mut renderer, commutator) = backend();
        let (tx, rx) = crossbeam_channel::bounded(1);
        renderer.accept(Message::RequestSymbolsSize {
            symbols: vec!["star".into(), "missing".into()],
            callback: SymbolsSizeCallback::new(move |sizes| {
                let _ = tx.send(sizes);
            }),
        });

        let sizes = rx.try_recv().unwrap();
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes["star"], PointD::new(24.0, 24.0));
        assert!(forwarded(&commutator).is_empty());
    }

    #[test]
    fn test_frontend_stats_relay_goes_to_render_queue() {
        let (mut renderer, commutator) = backend();
        let (reply, _blocker) = blocking_pair();
        renderer.accept(Message::RelayFrontendStats(reply));
        assert_eq!(forwarded(&commutator), vec![MessageKind::QueryFrontendStats]);
    }
}
