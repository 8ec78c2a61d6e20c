//! Error types for the engine.
//!
//! Most failures inside the engine never reach the caller: bad persisted
//! state falls back to defaults and cross-thread invariants are upheld by
//! construction. What remains is collected here.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::message::{MessageKind, ThreadId};

/// Errors that can occur while driving the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The target thread's queue is closed; its teardown has begun.
    #[error("{0:?} queue is closed")]
    ThreadClosed(ThreadId),

    /// A viewport dimension was zero.
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// A blocking call did not get an answer in time.
    #[error("{request:?} was not answered within {timeout:?}")]
    BlockingCallTimedOut {
        /// The request that timed out.
        request: MessageKind,
        /// The bound that elapsed.
        timeout: Duration,
    },

    /// The consumer dropped the request without answering it.
    #[error("{request:?} was dropped by its worker before an answer was sent")]
    WorkerGone {
        /// The request that was dropped.
        request: MessageKind,
    },

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// An engine configuration document could not be parsed.
    #[error("invalid engine configuration: {0}")]
    Config(String),

    /// The graphics context factory refused to attach a context.
    #[error("graphics context unavailable: {0}")]
    Context(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
