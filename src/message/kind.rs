//! Message kinds: the enumerable, payload-free mirror of `Message`.

use super::ThreadId;

macro_rules! message_kinds {
    (
        render: [$($render:ident),* $(,)?],
        resource_upload: [$($upload:ident),* $(,)?],
        control: [$($control:ident),* $(,)?],
        blocking: [$($blocking:ident),* $(,)?] $(,)?
    ) => {
        /// The kind of a `Message`, without its payload.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKind {
            $(
                #[doc = concat!("Kind of `Message::", stringify!($render), "`.")]
                $render,
            )*
            $(
                #[doc = concat!("Kind of `Message::", stringify!($upload), "`.")]
                $upload,
            )*
            $(
                #[doc = concat!("Kind of `Message::", stringify!($control), "`.")]
                $control,
            )*
        }

        impl MessageKind {
            /// Every message kind.
            pub const ALL: &'static [Self] = &[
                $(Self::$render,)*
                $(Self::$upload,)*
                $(Self::$control,)*
            ];

            /// The thread that consumes this kind; `None` for control
            /// messages every worker understands.
            pub const fn target(self) -> Option<ThreadId> {
                match self {
                    $(Self::$render)|* => Some(ThreadId::Render),
                    $(Self::$upload)|* => Some(ThreadId::ResourceUpload),
                    $(Self::$control)|* => None,
                }
            }

            /// Whether the poster of this kind waits for an answer.
            pub const fn is_blocking(self) -> bool {
                matches!(self, $(Self::$blocking)|*)
            }
        }
    };
}

message_kinds! {
    render: [
        SetVisibleViewport,
        Invalidate,
        InvalidateRect,
        ClearUserMarkLayer,
        ChangeUserMarkLayerVisibility,
        FlushUserMarks,
        UpdateMapStyle,
        RecoverGraphicsResources,
        CompassInfo,
        GpsInfo,
        ChangeMyPositionMode,
        FollowRoute,
        FindVisiblePoi,
        SelectObject,
        DeselectObject,
        GetSelectedObject,
        GetMyPosition,
        FlushRouteSegment,
        DropRouteSegment,
        DeactivateRouteFollowing,
        SetRouteSegmentVisibility,
        AddRoutePreviewSegment,
        RemoveRoutePreviewSegment,
        AllowAutoZoom,
        Allow3dMode,
        EnablePerspective,
        UpdateGpsTrackPoints,
        ClearGpsTrackPoints,
        SetAddNewPlaceMode,
        BlockTapEvents,
        SetKineticScrollEnabled,
        SetTimeInBackground,
        SetPosteffectEnabled,
        RunFirstLaunchAnimation,
        FlushGui,
        FlushGuiLayout,
        FlushChoosePositionMark,
        UpdateListeners,
        QueryFrontendStats,
    ],
    resource_upload: [
        UpdateUserMarkLayer,
        MapShapesRecache,
        GuiRecache,
        GuiLayerLayout,
        ShowChoosePositionMark,
        AddRouteSegment,
        RemoveRouteSegment,
        Allow3dBuildings,
        SetDisplacementMode,
        EnableTraffic,
        UpdateTraffic,
        ClearTrafficData,
        SetSimplifiedTrafficColors,
        SetFontScale,
        AddCustomSymbols,
        RemoveCustomSymbols,
        RequestSymbolsSize,
        QueryBackendStats,
        RelayFrontendStats,
    ],
    control: [
        EnableRendering,
        DisableRendering,
    ],
    blocking: [
        UpdateMapStyle,
        FindVisiblePoi,
        GetSelectedObject,
        GetMyPosition,
        QueryFrontendStats,
        QueryBackendStats,
        RelayFrontendStats,
        EnableRendering,
        DisableRendering,
    ],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_kinds_are_distinct() {
        let unique: HashSet<_> = MessageKind::ALL.iter().copied().collect();
        assert_eq!(unique.len(), MessageKind::ALL.len());
        assert_eq!(MessageKind::ALL.len(), 60);
    }

    #[test]
    fn test_resource_upload_blocking_kinds_are_answered_in_place() {
        // The resource-upload thread never waits: its blocking kinds are
        // answered directly or handed on with the caller's responder.
        let upload: HashSet<_> = MessageKind::ALL
            .iter()
            .copied()
            .filter(|k| k.is_blocking() && k.target() == Some(ThreadId::ResourceUpload))
            .collect();
        assert_eq!(
            upload,
            HashSet::from([MessageKind::QueryBackendStats, MessageKind::RelayFrontendStats])
        );
    }

    #[test]
    fn test_blocking_kinds_per_target() {
        let render: HashSet<_> = MessageKind::ALL
            .iter()
            .copied()
            .filter(|k| k.is_blocking() && k.target() == Some(ThreadId::Render))
            .collect();
        assert_eq!(
            render,
            HashSet::from([
                MessageKind::UpdateMapStyle,
                MessageKind::FindVisiblePoi,
                MessageKind::GetSelectedObject,
                MessageKind::GetMyPosition,
                MessageKind::QueryFrontendStats,
            ])
        );
        for kind in MessageKind::ALL.iter().filter(|k| k.target().is_none()) {
            assert!(kind.is_blocking(), "{kind:?} is acknowledged");
        }
        assert!(!MessageKind::RequestSymbolsSize.is_blocking());
        assert!(!MessageKind::AddRouteSegment.is_blocking());
    }

    #[test]
    fn test_targets() {
        assert_eq!(MessageKind::AddRouteSegment.target(), Some(ThreadId::ResourceUpload));
        assert_eq!(MessageKind::AddRoutePreviewSegment.target(), Some(ThreadId::Render));
        assert_eq!(MessageKind::EnableRendering.target(), None);
    }
}
