//! MessageQueue: Three-tier FIFO queue with a single consumer.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::message::{Message, Priority};

/// Result of waiting on a queue.
#[derive(Debug)]
pub enum Popped {
    /// The next message in priority order.
    Message(Message),
    /// Nothing arrived before the deadline, or the consumer was woken.
    Idle,
    /// The queue was closed; the consumer should exit.
    Closed,
}

#[derive(Debug, Default)]
struct State {
    tiers: [VecDeque<Message>; 3],
    closed: bool,
    woken: bool,
}

impl State {
    fn pop(&mut self) -> Option<Message> {
        self.tiers.iter_mut().find_map(VecDeque::pop_front)
    }

    fn len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }
}

/// A prioritized message queue.
///
/// Any number of threads may push; one thread drains. Messages come out
/// strictly by priority and in push order within a priority.
#[derive(Debug, Default)]
pub struct MessageQueue {
    state: Mutex<State>,
    available: Condvar,
}

impl MessageQueue {
    /// Create an empty, open queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to its priority tier.
    ///
    /// Hands the message back if the queue is already closed.
    pub fn push(&self, message: Message, priority: Priority) -> Result<(), Message> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(message);
        }
        state.tiers[priority.index()].push_back(message);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Take the next message without waiting.
    pub fn try_pop(&self) -> Option<Message> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.pop()
    }

    /// Take the next message, waiting up to `timeout` (forever if `None`).
    ///
    /// Returns `Idle` when the timeout elapses or [`MessageQueue::wake`]
    /// was called while nothing was pending.
    pub fn pop_timeout(&self, timeout: Option<Duration>) -> Popped {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Popped::Closed;
            }
            if let Some(message) = state.pop() {
                return Popped::Message(message);
            }
            if state.woken {
                state.woken = false;
                return Popped::Idle;
            }
            match deadline {
                Some(deadline) => {
                    if self.available.wait_until(&mut state, deadline).timed_out() {
                        if state.closed {
                            return Popped::Closed;
                        }
                        return state.pop().map_or(Popped::Idle, Popped::Message);
                    }
                }
                None => self.available.wait(&mut state),
            }
        }
    }

    /// Wake the consumer without giving it a message.
    pub fn wake(&self) {
        self.state.lock().woken = true;
        self.available.notify_one();
    }

    /// Close the queue. Later pushes fail and the consumer sees `Closed`.
    ///
    /// Returns how many pending messages were discarded.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let discarded = state.len();
        for tier in &mut state.tiers {
            tier.clear();
        }
        drop(state);
        self.available.notify_all();
        discarded
    }

    /// Whether the queue was closed.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use std::sync::Arc;
    use std::thread;

    fn numbered(n: u32) -> Message {
        Message::SetTimeInBackground(f64::from(n))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn seq(message: &Message) -> u32 {
        match message {
            Message::SetTimeInBackground(t) => *t as u32,
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn test_fifo_within_priority() {
        let queue = MessageQueue::new();
        for i in 0..100 {
            queue.push(numbered(i), Priority::Normal).unwrap();
        }
        for i in 0..100 {
            assert_eq!(seq(&queue.try_pop().unwrap()), i);
        }
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn test_higher_priority_first() {
        let queue = MessageQueue::new();
        queue.push(Message::MapShapesRecache, Priority::Low).unwrap();
        queue.push(Message::Invalidate, Priority::Normal).unwrap();
        queue.push(Message::EnablePerspective, Priority::High).unwrap();
        queue.push(Message::ClearGpsTrackPoints, Priority::Normal).unwrap();

        let kinds: Vec<_> = std::iter::from_fn(|| queue.try_pop()).map(|m| m.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                MessageKind::EnablePerspective,
                MessageKind::Invalidate,
                MessageKind::ClearGpsTrackPoints,
                MessageKind::MapShapesRecache,
            ]
        );
    }

    #[test]
    fn test_push_after_close_is_rejected() {
        let queue = MessageQueue::new();
        queue.push(Message::Invalidate, Priority::High).unwrap();
        assert_eq!(queue.close(), 1);
        assert!(queue.is_closed());
        assert!(queue.push(Message::Invalidate, Priority::High).is_err());
        assert!(matches!(queue.pop_timeout(None), Popped::Closed));
    }

    #[test]
    fn test_pop_timeout_idle() {
        let queue = MessageQueue::new();
        assert!(matches!(queue.pop_timeout(Some(Duration::from_millis(5))), Popped::Idle));
    }

    #[test]
    fn test_wake_interrupts_wait() {
        let queue = Arc::new(MessageQueue::new());
        let waker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                queue.wake();
            })
        };
        assert!(matches!(queue.pop_timeout(None), Popped::Idle));
        waker.join().unwrap();
    }

    #[test]
    fn test_concurrent_producers_keep_per_producer_order() {
        let queue = Arc::new(MessageQueue::new());
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(numbered(p * 1000 + i), Priority::Normal).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        let mut last = [None::<u32>; 4];
        let mut total = 0;
        while let Some(message) = queue.try_pop() {
            let v = seq(&message);
            let p = (v / 1000) as usize;
            if let Some(prev) = last[p] {
                assert!(v > prev);
            }
            last[p] = Some(v);
            total += 1;
        }
        assert_eq!(total, 1000);
    }
}
