//! Blocker: One-shot request/response between the caller and a worker.
//!
//! The caller keeps the `Blocker` on its own stack and moves the
//! `Responder` into the message it posts. The worker answers by consuming
//! the responder, so a request is answered at most once; if the worker
//! drops the message unanswered (its queue was closed at teardown), the
//! waiting caller is woken with an error instead of hanging.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use super::MessageKind;
use crate::error::{EngineError, Result};

/// Create a connected responder/blocker pair for one request.
pub fn blocking_pair<T>() -> (Responder<T>, Blocker<T>) {
    // Capacity 1: the single answer never blocks the worker.
    let (tx, rx) = bounded(1);
    (Responder { tx }, Blocker { rx })
}

/// Worker side of a blocking request.
pub struct Responder<T> {
    tx: Sender<T>,
}

impl<T> Responder<T> {
    /// Deliver the answer and wake the waiting caller.
    pub fn respond(self, value: T) {
        // A caller that gave up after a timeout has dropped its blocker;
        // the late answer is simply discarded.
        let _ = self.tx.send(value);
    }
}

impl<T> std::fmt::Debug for Responder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Responder { .. }")
    }
}

/// Caller side of a blocking request.
#[derive(Debug)]
pub struct Blocker<T> {
    rx: Receiver<T>,
}

impl<T> Blocker<T> {
    /// Block until the worker answers.
    ///
    /// `request` only labels the error if the worker drops the request.
    pub fn wait(self, request: MessageKind) -> Result<T> {
        self.rx.recv().map_err(|_| EngineError::WorkerGone { request })
    }

    /// Block until the worker answers or `timeout` elapses.
    pub fn wait_timeout(self, request: MessageKind, timeout: Duration) -> Result<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(?request, ?timeout, "blocking call timed out");
                Err(EngineError::BlockingCallTimedOut { request, timeout })
            }
            Err(RecvTimeoutError::Disconnected) => Err(EngineError::WorkerGone { request }),
        }
    }

    /// Wait with an optional bound.
    pub fn wait_for(self, request: MessageKind, timeout: Option<Duration>) -> Result<T> {
        match timeout {
            Some(timeout) => self.wait_timeout(request, timeout),
            None => self.wait(request),
        }
    }
}
