//! Threads commutator: The only channel between the engine's threads.
//!
//! The commutator is a registry of one prioritized queue per worker,
//! indexed by [`ThreadId`]. It holds no reference to the workers
//! themselves; a worker only ever sees its own queue, and a poster only
//! ever sees the commutator. Closing a queue is how teardown stops
//! traffic to a worker before its thread is joined.

mod queue;

pub use queue::{MessageQueue, Popped};

use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::message::{Message, Priority, ThreadId};

/// Per-thread prioritized queues.
///
/// Cloning is cheap and yields a handle to the same queues.
#[derive(Debug, Clone)]
pub struct ThreadsCommutator {
    queues: Arc<[Arc<MessageQueue>; 2]>,
}

impl Default for ThreadsCommutator {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadsCommutator {
    /// Create a commutator with an open queue for every worker.
    pub fn new() -> Self {
        Self {
            queues: Arc::new([Arc::new(MessageQueue::new()), Arc::new(MessageQueue::new())]),
        }
    }

    /// Enqueue `message` for `thread` at `priority`.
    ///
    /// Never blocks beyond the queue's short critical section. Fails with
    /// [`EngineError::ThreadClosed`] once the thread's teardown has begun;
    /// the message is dropped, which wakes any caller blocked on it.
    pub fn post(&self, thread: ThreadId, message: Message, priority: Priority) -> Result<()> {
        let kind = message.kind();
        debug_assert!(
            kind.target().map_or(true, |target| target == thread),
            "{kind:?} posted to {thread:?}"
        );
        self.queue(thread).push(message, priority).map_err(|_| {
            tracing::debug!(?thread, ?kind, "post rejected, queue closed");
            EngineError::ThreadClosed(thread)
        })
    }

    /// The queue of a thread.
    pub fn queue(&self, thread: ThreadId) -> &Arc<MessageQueue> {
        &self.queues[thread.index()]
    }

    /// Close a thread's queue, discarding what is pending.
    ///
    /// Returns how many messages were discarded.
    pub fn close(&self, thread: ThreadId) -> usize {
        self.queue(thread).close()
    }

    /// Whether a thread's queue is closed.
    pub fn is_closed(&self, thread: ThreadId) -> bool {
        self.queue(thread).is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    #[test]
    fn test_queues_are_independent() {
        let commutator = ThreadsCommutator::new();
        commutator.post(ThreadId::Render, Message::Invalidate, Priority::High).unwrap();
        commutator
            .post(ThreadId::ResourceUpload, Message::MapShapesRecache, Priority::Normal)
            .unwrap();

        assert_eq!(commutator.queue(ThreadId::Render).len(), 1);
        assert_eq!(commutator.queue(ThreadId::ResourceUpload).len(), 1);
        assert_eq!(
            commutator.queue(ThreadId::Render).try_pop().map(|m| m.kind()),
            Some(MessageKind::Invalidate)
        );
    }

    #[test]
    fn test_post_after_close_fails_for_that_thread_only() {
        let commutator = ThreadsCommutator::new();
        let handle = commutator.clone();
        assert_eq!(commutator.close(ThreadId::Render), 0);

        let err = handle.post(ThreadId::Render, Message::Invalidate, Priority::High).unwrap_err();
        assert!(matches!(err, EngineError::ThreadClosed(ThreadId::Render)));
        assert!(handle
            .post(ThreadId::ResourceUpload, Message::MapShapesRecache, Priority::Normal)
            .is_ok());
    }

    #[test]
    fn test_control_messages_go_anywhere() {
        let commutator = ThreadsCommutator::new();
        for thread in ThreadId::ALL {
            let (ack, _blocker) = crate::message::blocking_pair();
            commutator
                .post(thread, Message::DisableRendering { destroy_context: false, ack }, Priority::High)
                .unwrap();
        }
    }
}
