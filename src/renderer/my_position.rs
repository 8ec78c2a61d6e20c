//! MyPositionController: State machine of the position marker.

use crate::geometry::PointD;
use crate::message::{ChangeMyPositionMode, MyPositionMode, MyPositionModeListener};

/// After this long in background a free view snaps back to the position.
const MAX_TIME_IN_BACKGROUND_SEC: f64 = 60.0 * 60.0 * 8.0;

/// Tracks the device position and what the view does with it.
pub struct MyPositionController {
    mode: MyPositionMode,
    position: Option<PointD>,
    bearing: Option<f64>,
    routing_active: bool,
    following_route: bool,
    auto_zoom: bool,
    listener: Option<MyPositionModeListener>,
}

impl MyPositionController {
    /// Create a controller in `mode`.
    pub fn new(
        mode: MyPositionMode,
        time_in_background: f64,
        routing_active: bool,
        auto_zoom: bool,
    ) -> Self {
        let mode = if mode == MyPositionMode::NotFollow && time_in_background >= MAX_TIME_IN_BACKGROUND_SEC {
            MyPositionMode::Follow
        } else {
            mode
        };
        Self {
            mode,
            position: None,
            bearing: None,
            routing_active,
            following_route: false,
            auto_zoom,
            listener: None,
        }
    }

    /// Current mode.
    pub const fn mode(&self) -> MyPositionMode {
        self.mode
    }

    /// Last position, if the mode says it is known.
    pub fn position(&self) -> Option<PointD> {
        match self.mode {
            MyPositionMode::PendingPosition | MyPositionMode::NotFollowNoPosition => None,
            _ => self.position,
        }
    }

    /// Last compass heading.
    pub const fn bearing(&self) -> Option<f64> {
        self.bearing
    }

    /// Whether the view is following the route.
    pub const fn is_following_route(&self) -> bool {
        self.following_route
    }

    /// Whether auto zoom is allowed while following the route.
    pub const fn is_auto_zoom_enabled(&self) -> bool {
        self.auto_zoom
    }

    /// Replace the mode listener.
    pub fn set_listener(&mut self, listener: Option<MyPositionModeListener>) {
        self.listener = listener;
    }

    /// A location fix arrived. Routing state only changes through
    /// [`Self::follow_route`] and [`Self::deactivate_route_following`].
    pub fn on_location_update(&mut self, position: PointD) {
        self.position = Some(position);
        match self.mode {
            MyPositionMode::PendingPosition => self.change_mode(MyPositionMode::Follow),
            MyPositionMode::NotFollowNoPosition => self.change_mode(MyPositionMode::NotFollow),
            _ => {}
        }
    }

    /// A compass reading arrived.
    pub fn on_compass_update(&mut self, bearing: f64) {
        if bearing.is_finite() {
            self.bearing = Some(bearing);
        }
    }

    /// Apply a mode command.
    pub fn apply(&mut self, change: ChangeMyPositionMode) {
        match change {
            ChangeMyPositionMode::SwitchNextMode => self.next_mode(),
            ChangeMyPositionMode::LoseLocation => self.change_mode(MyPositionMode::NotFollowNoPosition),
            ChangeMyPositionMode::StopFollowing => self.stop_following(),
        }
    }

    /// The user dragged the map.
    pub fn stop_following(&mut self) {
        if matches!(self.mode, MyPositionMode::Follow | MyPositionMode::FollowAndRotate) {
            self.change_mode(MyPositionMode::NotFollow);
        }
    }

    /// Start following the active route.
    pub fn follow_route(&mut self, auto_zoom: bool) {
        self.following_route = true;
        self.routing_active = true;
        self.auto_zoom = auto_zoom;
        if self.position().is_some() {
            self.change_mode(MyPositionMode::FollowAndRotate);
        }
    }

    /// Stop following the active route.
    pub fn deactivate_route_following(&mut self) {
        self.following_route = false;
        self.routing_active = false;
        if self.mode == MyPositionMode::FollowAndRotate {
            self.change_mode(MyPositionMode::Follow);
        }
    }

    /// Allow or forbid auto zoom.
    pub fn allow_auto_zoom(&mut self, allow: bool) {
        self.auto_zoom = allow;
    }

    fn next_mode(&mut self) {
        let next = match self.mode {
            // Still waiting for the first fix.
            MyPositionMode::PendingPosition => return,
            MyPositionMode::NotFollowNoPosition => MyPositionMode::PendingPosition,
            MyPositionMode::NotFollow => MyPositionMode::Follow,
            MyPositionMode::Follow if self.bearing.is_some() || self.routing_active => {
                MyPositionMode::FollowAndRotate
            }
            MyPositionMode::Follow => MyPositionMode::NotFollow,
            MyPositionMode::FollowAndRotate if self.routing_active => MyPositionMode::Follow,
            MyPositionMode::FollowAndRotate => MyPositionMode::NotFollow,
        };
        self.change_mode(next);
    }

    fn change_mode(&mut self, mode: MyPositionMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        if let Some(listener) = &self.listener {
            listener(mode, self.routing_active);
        }
    }
}

impl std::fmt::Debug for MyPositionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MyPositionController")
            .field("mode", &self.mode)
            .field("position", &self.position)
            .field("following_route", &self.following_route)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_first_fix_starts_following() {
        let mut controller = MyPositionController::new(MyPositionMode::PendingPosition, 0.0, false, false);
        assert_eq!(controller.position(), None);
        controller.on_location_update(PointD::new(1.0, 2.0));
        assert_eq!(controller.mode(), MyPositionMode::Follow);
        assert_eq!(controller.position(), Some(PointD::new(1.0, 2.0)));
    }

    #[test]
    fn test_lose_location_hides_position() {
        let mut controller = MyPositionController::new(MyPositionMode::PendingPosition, 0.0, false, false);
        controller.on_location_update(PointD::ZERO);
        controller.apply(ChangeMyPositionMode::LoseLocation);
        assert_eq!(controller.mode(), MyPositionMode::NotFollowNoPosition);
        assert_eq!(controller.position(), None);

        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        assert_eq!(controller.mode(), MyPositionMode::PendingPosition);
    }

    #[test]
    fn test_switch_cycle_without_compass() {
        let mut controller = MyPositionController::new(MyPositionMode::NotFollow, 0.0, false, false);
        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        assert_eq!(controller.mode(), MyPositionMode::Follow);
        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        assert_eq!(controller.mode(), MyPositionMode::NotFollow);

        controller.on_compass_update(0.5);
        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        assert_eq!(controller.mode(), MyPositionMode::FollowAndRotate);
    }

    #[test]
    fn test_fix_keeps_routing_state_from_startup() {
        let mut controller = MyPositionController::new(MyPositionMode::PendingPosition, 0.0, true, false);
        controller.on_location_update(PointD::new(3.0, 4.0));
        assert_eq!(controller.mode(), MyPositionMode::Follow);

        // No compass yet; an active route alone allows rotation.
        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        assert_eq!(controller.mode(), MyPositionMode::FollowAndRotate);
        controller.apply(ChangeMyPositionMode::SwitchNextMode);
        assert_eq!(controller.mode(), MyPositionMode::Follow);
    }

    #[test]
    fn test_long_background_recenters() {
        let controller =
            MyPositionController::new(MyPositionMode::NotFollow, MAX_TIME_IN_BACKGROUND_SEC, false, false);
        assert_eq!(controller.mode(), MyPositionMode::Follow);
    }

    #[test]
    fn test_listener_sees_changes_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut controller = MyPositionController::new(MyPositionMode::Follow, 0.0, false, false);
        controller.set_listener(Some(Arc::new(move |mode: MyPositionMode, _routing: bool| sink.lock().push(mode))));

        controller.apply(ChangeMyPositionMode::StopFollowing);
        controller.apply(ChangeMyPositionMode::StopFollowing);
        assert_eq!(*seen.lock(), vec![MyPositionMode::NotFollow]);
    }
}
