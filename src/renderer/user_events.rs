//! UserEventQueue: Interaction events waiting for the next frame.
//!
//! Gestures arrive far more often than frames are drawn. Instead of going
//! through the general message queue, they collect here and the render
//! thread takes all of them at once at the start of a frame.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::commutator::MessageQueue;
use crate::message::UserEvent;

/// Ordered queue of pending user events.
#[derive(Debug)]
pub struct UserEventQueue {
    events: Mutex<VecDeque<UserEvent>>,
    /// Queue of the render thread, woken on every push.
    render_queue: Arc<MessageQueue>,
}

impl UserEventQueue {
    /// Create an empty queue that wakes `render_queue` on push.
    pub fn new(render_queue: Arc<MessageQueue>) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            render_queue,
        }
    }

    /// Append an event and wake the render thread.
    pub fn push(&self, event: UserEvent) {
        if self.render_queue.is_closed() {
            tracing::debug!(?event, "user event dropped, render thread stopped");
            return;
        }
        self.events.lock().push_back(event);
        self.render_queue.wake();
    }

    /// Take every pending event, oldest first.
    pub fn drain(&self) -> Vec<UserEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commutator::Popped;
    use crate::geometry::PointD;
    use crate::message::{TouchEvent, TouchKind};

    #[test]
    fn test_drain_keeps_post_order_across_kinds() {
        let queue = UserEventQueue::new(Arc::new(MessageQueue::new()));
        queue.push(UserEvent::Resize { width: 10, height: 10 });
        queue.push(UserEvent::Touch(TouchEvent::single(TouchKind::Down, 1, PointD::ZERO)));
        queue.push(UserEvent::Scale { factor: 2.0, pixel_point: PointD::ZERO, animate: false });

        let drained = queue.drain();
        assert_eq!(drained.len(), 3);
        assert!(matches!(drained[0], UserEvent::Resize { .. }));
        assert!(matches!(drained[1], UserEvent::Touch(_)));
        assert!(matches!(drained[2], UserEvent::Scale { .. }));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_push_wakes_render_queue() {
        let render_queue = Arc::new(MessageQueue::new());
        let queue = UserEventQueue::new(Arc::clone(&render_queue));
        queue.push(UserEvent::Resize { width: 1, height: 1 });
        assert!(matches!(render_queue.pop_timeout(None), Popped::Idle));
    }

    #[test]
    fn test_push_after_close_is_dropped() {
        let render_queue = Arc::new(MessageQueue::new());
        let queue = UserEventQueue::new(Arc::clone(&render_queue));
        render_queue.close();
        queue.push(UserEvent::Resize { width: 1, height: 1 });
        assert!(queue.is_empty());
    }
}
