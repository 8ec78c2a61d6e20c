//! Renderer threads: Long-lived workers that drain a message queue.
//!
//! Each worker owns its state outright and is reachable only through its
//! queue in the [`ThreadsCommutator`]. The thread wrapper here is shared
//! by both workers; what a worker does with a message is up to its
//! [`Renderer`] implementation.
//!
//! # Lifecycle
//!
//! ```text
//! spawn ──▶ drain queue / run frames ──▶ teardown(): close queue ──▶ join
//!              ▲                │
//!              └── Enable/DisableRendering (acknowledged)
//! ```

mod backend;
mod frontend;
mod my_position;
mod screen;
mod user_events;

pub use backend::{BackendParams, BackendRenderer, BackendStats};
pub use frontend::{FrontendParams, FrontendRenderer, FrontendStats};
pub use my_position::MyPositionController;
pub use screen::ScreenBase;
pub use user_events::UserEventQueue;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::commutator::{MessageQueue, Popped, ThreadsCommutator};
use crate::error::Result;
use crate::message::{blocking_pair, Message, MessageKind, Priority, ThreadId};

/// Messages handled per batch before a frame gets a chance to run.
const MAX_MESSAGES_PER_BATCH: usize = 256;

/// Source of graphics contexts for the worker threads.
///
/// Implemented by the platform layer; each worker attaches on its own
/// thread, so implementations see one call per thread.
pub trait ContextFactory: Send + Sync {
    /// Create or bind the context of `thread`.
    fn attach(&self, thread: ThreadId) -> Result<()>;

    /// Unbind the context of `thread`, destroying it if asked.
    fn detach(&self, thread: ThreadId, destroy: bool);
}

/// Shared handle to a [`ContextFactory`], as carried by messages.
#[derive(Clone)]
pub struct ContextHandle(Arc<dyn ContextFactory>);

impl ContextHandle {
    /// Wrap a factory.
    pub fn new(factory: Arc<dyn ContextFactory>) -> Self {
        Self(factory)
    }
}

impl std::fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContextHandle { .. }")
    }
}

/// A worker's graphics context. A context kept across a disable stays
/// here detached until it is attached again or dropped.
struct WorkerContext {
    handle: ContextHandle,
    attached: bool,
}

/// What a worker does with the messages of its queue.
pub trait Renderer: Send + 'static {
    /// The queue this renderer drains.
    const THREAD: ThreadId;

    /// Handle one message addressed to this thread.
    fn accept(&mut self, message: Message);

    /// How long to wait for messages before running a frame anyway.
    /// `None` waits for messages indefinitely.
    fn frame_interval(&self) -> Option<Duration> {
        None
    }

    /// Called after every batch of messages and on every idle wakeup.
    fn on_frame(&mut self) {}

    /// A graphics context was attached on this thread.
    fn on_rendering_enabled(&mut self) {}

    /// The graphics context was detached from this thread.
    fn on_rendering_disabled(&mut self) {}
}

/// Handle to a running worker thread.
pub struct RendererThread {
    /// Which worker this is.
    thread: ThreadId,
    /// Route to the worker's queue.
    commutator: ThreadsCommutator,
    /// Handle to the OS thread.
    handle: Option<JoinHandle<()>>,
}

impl RendererThread {
    /// Spawn a worker thread for `renderer`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::Spawn`] if the OS refuses the thread.
    pub fn spawn<R: Renderer>(renderer: R, commutator: &ThreadsCommutator) -> Result<Self> {
        let thread = R::THREAD;
        let queue = Arc::clone(commutator.queue(thread));

        let handle = thread::Builder::new()
            .name(thread.thread_name().to_string())
            .spawn(move || Self::run_loop(renderer, &queue))?;

        Ok(Self {
            thread,
            commutator: commutator.clone(),
            handle: Some(handle),
        })
    }

    /// Which worker this handle controls.
    pub const fn thread(&self) -> ThreadId {
        self.thread
    }

    /// Whether the thread has not been torn down yet.
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Attach a graphics context on the worker and start rendering.
    ///
    /// Blocks until the worker has attached.
    pub fn set_rendering_enabled(&self, context: ContextHandle) -> Result<()> {
        let (ack, blocker) = blocking_pair();
        self.commutator
            .post(self.thread, Message::EnableRendering { context, ack }, Priority::High)?;
        blocker.wait(MessageKind::EnableRendering)?
    }

    /// Stop rendering on the worker.
    ///
    /// Blocks until the worker has detached its context.
    pub fn set_rendering_disabled(&self, destroy_context: bool) -> Result<()> {
        let (ack, blocker) = blocking_pair();
        self.commutator.post(
            self.thread,
            Message::DisableRendering { destroy_context, ack },
            Priority::High,
        )?;
        blocker.wait(MessageKind::DisableRendering)
    }

    /// Stop the worker and wait for its thread to exit.
    ///
    /// The queue is closed first, so nothing can be posted to this worker
    /// once teardown has begun. Messages still pending are discarded;
    /// callers blocked on them are woken with an error.
    pub fn teardown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        let discarded = self.commutator.close(self.thread);
        if discarded > 0 {
            tracing::debug!(thread = ?self.thread, discarded, "discarded pending messages at teardown");
        }

        if handle.join().is_err() {
            tracing::error!(thread = ?self.thread, "worker thread panicked");
        }
        tracing::debug!(thread = ?self.thread, "worker stopped");
    }

    /// Main worker loop.
    fn run_loop<R: Renderer>(mut renderer: R, queue: &MessageQueue) {
        let thread = R::THREAD;
        let mut context: Option<WorkerContext> = None;
        tracing::debug!(?thread, "worker started");

        loop {
            match queue.pop_timeout(renderer.frame_interval()) {
                Popped::Closed => break,
                Popped::Idle => {}
                Popped::Message(first) => {
                    let mut next = Some(first);
                    let mut handled = 0;
                    while let Some(message) = next {
                        Self::dispatch(&mut renderer, &mut context, message);
                        handled += 1;
                        next = if handled < MAX_MESSAGES_PER_BATCH { queue.try_pop() } else { None };
                    }
                }
            }

            if queue.is_closed() {
                break;
            }
            renderer.on_frame();
        }

        if let Some(context) = context.take().filter(|c| c.attached) {
            context.handle.0.detach(thread, true);
        }
        tracing::debug!(?thread, "worker exiting");
    }

    /// Handle control messages here; pass everything else to the renderer.
    fn dispatch<R: Renderer>(renderer: &mut R, context: &mut Option<WorkerContext>, message: Message) {
        match message {
            Message::EnableRendering { context: handle, ack } => {
                if context.as_ref().is_some_and(|c| c.attached) {
                    ack.respond(Ok(()));
                    return;
                }
                let attached = handle.0.attach(R::THREAD);
                if attached.is_ok() {
                    *context = Some(WorkerContext { handle, attached: true });
                    renderer.on_rendering_enabled();
                }
                ack.respond(attached);
            }
            Message::DisableRendering { destroy_context, ack } => {
                if let Some(current) = context.as_mut().filter(|c| c.attached) {
                    current.handle.0.detach(R::THREAD, destroy_context);
                    current.attached = false;
                    renderer.on_rendering_disabled();
                }
                if destroy_context {
                    *context = None;
                }
                ack.respond(());
            }
            other => renderer.accept(other),
        }
    }
}

impl Drop for RendererThread {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for RendererThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererThread")
            .field("thread", &self.thread)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
