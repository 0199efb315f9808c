//! Lifecycle Controller
//!
//! A signal moves `Alive -> Ending -> Ended` when ended gracefully with
//! values still buffered, or straight to `Ended` otherwise. `Ended` is
//! terminal: repeated `end`/`kill` calls do nothing and teardowns run
//! exactly once.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::events::Event;
use super::node::{Lifecycle, SignalId, Targets};
use super::{DoneCallback, Graph};
use crate::error::SigError;
use crate::value::Value;

/// How a signal is being terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Termination {
    /// Deliver the out-buffer first.
    Graceful,
    /// Discard whatever is buffered.
    Forced,
}

impl Graph {
    /// End `signal` once its buffered values have been delivered.
    pub fn end(&mut self, signal: SignalId) -> Result<(), SigError> {
        self.ensure(signal)?;
        self.run(|graph| graph.terminate(signal, Termination::Graceful))
    }

    /// End `signal` immediately, dropping anything still buffered.
    pub fn kill(&mut self, signal: SignalId) -> Result<(), SigError> {
        self.ensure(signal)?;
        self.run(|graph| graph.terminate(signal, Termination::Forced))
    }

    /// Run `f` when `signal` ends, or right away if it already has.
    pub fn teardown<F>(&mut self, signal: SignalId, f: F) -> Result<(), SigError>
    where
        F: FnOnce(&mut Graph, SignalId) + 'static,
    {
        let node = self.node_mut(signal)?;
        if node.is_ended() {
            return self.run(|graph| f(graph, signal));
        }
        node.teardowns.push(Box::new(f));
        Ok(())
    }

    /// Consume `signal`: start it, kill it on error and rethrow.
    pub fn done(&mut self, signal: SignalId) -> Result<SignalId, SigError> {
        self.consume(signal, None)
    }

    /// Consume `signal`, calling `callback` once: with `None` when it ends,
    /// or with the error that killed it.
    pub fn done_with<F>(&mut self, signal: SignalId, callback: F) -> Result<SignalId, SigError>
    where
        F: FnOnce(&mut Graph, Option<SigError>) + 'static,
    {
        self.consume(signal, Some(Box::new(callback)))
    }

    fn consume(
        &mut self,
        signal: SignalId,
        callback: Option<DoneCallback>,
    ) -> Result<SignalId, SigError> {
        self.ensure(signal)?;

        let slot = Rc::new(RefCell::new(callback));
        let on_error = slot.clone();

        self.set_error_handler(signal, move |graph, me, err| {
            let callback = on_error.borrow_mut().take();
            graph.kill(me)?;
            match callback {
                Some(callback) => {
                    callback(graph, Some(err));
                    Ok(())
                }
                None => Err(err),
            }
        })?;

        self.teardown(signal, move |graph, _| {
            let callback = slot.borrow_mut().take();
            if let Some(callback) = callback {
                callback(graph, None);
            }
        })?;

        self.resume(signal)?;
        Ok(signal)
    }

    pub(crate) fn terminate(&mut self, signal: SignalId, mode: Termination) {
        let Some(node) = self.nodes.get_mut(&signal) else {
            return;
        };

        match (node.lifecycle, mode) {
            (Lifecycle::Ended, _) | (Lifecycle::Ending, Termination::Graceful) => {}
            (Lifecycle::Alive, Termination::Graceful) if !node.out_buffer.is_empty() => {
                node.lifecycle = Lifecycle::Ending;
                let paused = node.paused;
                debug!(signal = %signal, pending = node.out_buffer.len(), "ending signal");

                self.notify(signal, &Event::Ending, &Value::Null);
                if !paused {
                    self.flush(signal);
                }
            }
            _ => self.finish(signal),
        }
    }

    /// Move `signal` to `Ended` and release everything it holds.
    pub(crate) fn finish(&mut self, signal: SignalId) {
        let targets: Targets = match self.nodes.get_mut(&signal) {
            Some(node) if !node.is_ended() => {
                node.lifecycle = Lifecycle::Ended;
                node.targets.clone()
            }
            _ => return,
        };

        debug!(signal = %signal, "signal ended");

        for target in targets {
            self.terminate(target, Termination::Graceful);
        }

        self.detach(signal);

        let (teardowns, dependents, owners) = {
            let Some(node) = self.nodes.get_mut(&signal) else {
                return;
            };

            node.source = None;
            node.dormant_source = None;
            node.targets.clear();
            node.in_buffer.clear();
            node.out_buffer.clear();
            node.current = None;
            node.waiting = false;
            node.value_handler = None;
            node.error_handler = None;

            (
                std::mem::take(&mut node.teardowns),
                std::mem::take(&mut node.dependents),
                std::mem::take(&mut node.owners),
            )
        };

        for owner in owners {
            if let Some(node) = self.nodes.get_mut(&owner) {
                node.dependents.shift_remove(&signal);
            }
        }

        for teardown in teardowns {
            teardown(self, signal);
        }

        self.notify(signal, &Event::End, &Value::Null);

        let listeners = self
            .nodes
            .get_mut(&signal)
            .map(|node| std::mem::take(&mut node.listeners))
            .unwrap_or_default();
        for id in listeners {
            self.listeners.remove(&id);
        }

        for dependent in dependents {
            if let Some(node) = self.nodes.get_mut(&dependent) {
                node.owners.retain(|owner| *owner != signal);
            }
            self.terminate(dependent, Termination::Graceful);
        }
    }
}
