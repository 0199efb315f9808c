//! Error Channel
//!
//! Errors travel the same edges as values, downstream only, but skip the
//! pause and pull machinery: a raised error is handled immediately.
//!
//! `raise(s, err)` runs `s`'s error handler. The handler either swallows
//! the error (returns `Ok`) or rethrows (returns `Err`), in which case the
//! error bubbles to every target of `s`. An error that bubbles out of a
//! signal with no targets has nowhere left to go and is reported to the
//! caller of the public operation that caused it.

use tracing::{debug, warn};

use super::node::{SignalId, Targets};
use super::{ErrorHandler, Graph};
use crate::error::SigError;

impl Graph {
    /// Raise an error on `signal`.
    ///
    /// Returns the error back if nothing downstream handles it.
    pub fn raise(&mut self, signal: SignalId, err: impl Into<SigError>) -> Result<(), SigError> {
        self.ensure(signal)?;
        let err = err.into();
        self.run(|graph| graph.raise_error(signal, err))
    }

    /// Create a signal downstream of `signal` that handles its errors.
    ///
    /// Values pass through unchanged.
    pub fn catch<F>(&mut self, signal: SignalId, handler: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, SignalId, SigError) -> Result<(), SigError> + 'static,
    {
        self.ensure(signal)?;
        let target = self.create();
        self.set_error_handler(target, handler)?;
        self.then(signal, target)
    }

    pub(crate) fn raise_error(&mut self, signal: SignalId, err: SigError) {
        let handler = match self.nodes.get_mut(&signal) {
            None => {
                self.escalate(err);
                return;
            }
            Some(node) if node.is_ended() => {
                debug!(signal = %signal, error = %err, "error raised on an ended signal");
                self.escalate(err);
                return;
            }
            // Errors raised while this signal's handler is running go
            // straight on, so a handler cannot feed itself.
            Some(node) if node.handling_error => None,
            Some(node) => {
                let handler = node.error_handler.take();
                node.handling_error = handler.is_some();
                handler
            }
        };

        let Some(mut handler) = handler else {
            self.bubble(signal, err);
            return;
        };

        let result = handler(self, signal, err);
        self.restore_error_handler(signal, handler);

        if let Err(err) = result {
            self.bubble(signal, err);
        }
    }

    fn restore_error_handler(&mut self, signal: SignalId, handler: ErrorHandler) {
        if let Some(node) = self.nodes.get_mut(&signal) {
            node.handling_error = false;
            if !node.is_ended() && node.error_handler.is_none() {
                node.error_handler = Some(handler);
            }
        }
    }

    /// Pass an error to every target of `signal`.
    fn bubble(&mut self, signal: SignalId, err: SigError) {
        let targets: Targets = self
            .nodes
            .get(&signal)
            .map(|node| node.targets.clone())
            .unwrap_or_default();

        if targets.is_empty() {
            warn!(signal = %signal, error = %err, "unhandled error");
            self.escalate(err);
            return;
        }

        for target in targets {
            self.raise_error(target, err.clone());
        }
    }
}
