//! Handler and listener types.
//!
//! Every callback receives the graph and the handle of the signal it is
//! attached to, so it can `put`, `next`, `raise` or `end` on that signal
//! without capturing it.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{Graph, SignalId};
use crate::error::SigError;
use crate::value::Value;

/// Handles values arriving at a signal.
///
/// Returning `Err` raises the error on the same signal.
pub type ValueHandler = Box<dyn FnMut(&mut Graph, SignalId, Value) -> Result<(), SigError>>;

/// Handles errors raised on a signal.
///
/// Returning `Ok` swallows the error; returning `Err` bubbles it (or a
/// replacement) to the signal's targets.
pub type ErrorHandler = Box<dyn FnMut(&mut Graph, SignalId, SigError) -> Result<(), SigError>>;

/// Runs once when a signal ends.
pub type Teardown = Box<dyn FnOnce(&mut Graph, SignalId)>;

/// Reacts to an event emitted on a signal.
pub type Listener = Box<dyn FnMut(&mut Graph, SignalId, &Value) -> Result<(), SigError>>;

/// Called once by `done_with`: `None` on end, `Some(err)` on error.
pub type DoneCallback = Box<dyn FnOnce(&mut Graph, Option<SigError>)>;

/// Unique identifier for an event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Generate a new unique listener ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-emit the value and ask for the next one.
pub(crate) fn identity() -> ValueHandler {
    Box::new(|graph, signal, value| {
        graph.put(signal, value)?;
        graph.next(signal)
    })
}

/// Pass the error on to the targets.
pub(crate) fn rethrow() -> ErrorHandler {
    Box::new(|_, _, err| Err(err))
}
