//! Connection Manager
//!
//! Every signal has at most one source and any number of targets. The edge
//! is recorded on both ends: `target.source == Some(s)` exactly when
//! `s.targets` contains `target`.
//!
//! Disconnecting prunes upward. When a signal loses its last target it
//! disconnects from its own source, so an abandoned producer chain detaches
//! itself from the graph. A disconnected signal remembers where it was
//! attached (its dormant source) and the whole chain re-attaches as soon as
//! it gains a target again.

use tracing::debug;

use super::events::Event;
use super::lifecycle::Termination;
use super::node::SignalId;
use super::Graph;
use crate::error::SigError;
use crate::value::Value;

impl Graph {
    /// Make `source` feed `target`.
    ///
    /// A signal's source is fixed once set: connecting `target` to a
    /// different source raises [`SigError::SourceAlreadySet`] on `target`.
    /// Connecting the same pair again is a no-op, and connecting to an ended
    /// source is ignored.
    pub fn connect(&mut self, target: SignalId, source: SignalId) -> Result<(), SigError> {
        self.ensure(target)?;
        self.ensure(source)?;
        self.run(|graph| graph.attach(target, source))
    }

    /// Connect `target` to `source` and return `target`.
    pub fn then(&mut self, source: SignalId, target: SignalId) -> Result<SignalId, SigError> {
        self.connect(target, source)?;
        Ok(target)
    }

    /// Connect a new signal built from `handler` to `source`.
    pub fn then_fn<F>(&mut self, source: SignalId, handler: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, SignalId, Value) -> Result<(), SigError> + 'static,
    {
        self.ensure(source)?;
        let target = self.create_from(handler);
        self.then(source, target)
    }

    /// Detach `target` from its source, pruning the source chain if it is
    /// left without targets.
    pub fn disconnect(&mut self, target: SignalId) -> Result<(), SigError> {
        self.ensure(target)?;
        self.run(|graph| graph.detach(target))
    }

    /// Re-attach a disconnected signal and its pruned source chain.
    pub fn reconnect(&mut self, target: SignalId) -> Result<(), SigError> {
        self.ensure(target)?;
        self.run(|graph| graph.reattach(target))
    }

    /// Tie `dependent` to `owner`: it disconnects, reconnects and ends
    /// along with it.
    pub fn depend_on(&mut self, dependent: SignalId, owner: SignalId) -> Result<(), SigError> {
        self.ensure(dependent)?;
        self.ensure(owner)?;
        self.run(|graph| {
            let Some(node) = graph.nodes.get_mut(&owner) else {
                return;
            };

            if node.is_ended() {
                graph.terminate(dependent, Termination::Graceful);
                return;
            }

            node.dependents.insert(dependent);
            let disconnected = node.disconnected;

            if let Some(node) = graph.nodes.get_mut(&dependent) {
                if !node.owners.contains(&owner) {
                    node.owners.push(owner);
                }
            }

            if disconnected {
                graph.detach(dependent);
            }
        })
    }

    fn attach(&mut self, target: SignalId, source: SignalId) {
        if self.is_ended(source) {
            debug!(source = %source, target = %target, "ignoring connection to an ended signal");
            return;
        }

        let Some(node) = self.nodes.get_mut(&target) else {
            return;
        };

        if node.is_ended() {
            debug!(source = %source, target = %target, "ignoring connection of an ended signal");
            return;
        }

        match node.source.or(node.dormant_source) {
            Some(existing) if existing == source => {
                if node.disconnected {
                    self.reattach(target);
                }
                return;
            }
            Some(existing) => {
                let err = SigError::SourceAlreadySet {
                    target,
                    existing,
                    attempted: source,
                };
                self.raise_error(target, err);
                return;
            }
            None => node.source = Some(source),
        }

        // A root pruned while it had no source is live again once attached.
        let revived = std::mem::take(&mut node.disconnected);
        let dependents = if revived {
            node.dependents.iter().copied().collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        let Some(node) = self.nodes.get_mut(&source) else {
            return;
        };

        node.targets.push(target);
        let first = node.targets.len() == 1;
        let revive = node.disconnected;
        let wake = first && node.eager;

        // A current value still sitting in the out-buffer reaches the new
        // target when the buffer is flushed.
        let replay = if node.sticky && node.out_buffer.is_empty() {
            node.current.clone()
        } else {
            None
        };

        debug!(source = %source, target = %target, "connected");

        if revive {
            self.reattach(source);
        }

        if revived {
            self.notify(target, &Event::Reconnect, &Value::Null);
            for dependent in dependents {
                self.reattach(dependent);
            }
        }

        if let Some(value) = replay {
            self.receive(target, value);
        }

        if wake {
            self.start(source);
        }
    }

    pub(crate) fn detach(&mut self, target: SignalId) {
        let (source, dependents) = {
            let Some(node) = self.nodes.get_mut(&target) else {
                return;
            };

            if node.disconnected {
                return;
            }

            node.disconnected = true;
            let source = node.source.take();
            node.dormant_source = source;
            (source, node.dependents.iter().copied().collect::<Vec<_>>())
        };

        debug!(signal = %target, "disconnected");

        if let Some(source) = source {
            let orphaned = self.nodes.get_mut(&source).is_some_and(|node| {
                node.remove_target(target);
                node.targets.is_empty()
            });

            if orphaned {
                self.detach(source);
            }
        }

        self.notify(target, &Event::Disconnect, &Value::Null);

        for dependent in dependents {
            self.detach(dependent);
        }
    }

    pub(crate) fn reattach(&mut self, target: SignalId) {
        let (source, dependents) = {
            let Some(node) = self.nodes.get_mut(&target) else {
                return;
            };

            if !node.disconnected || node.is_ended() {
                return;
            }

            node.disconnected = false;
            (
                node.dormant_source.take(),
                node.dependents.iter().copied().collect::<Vec<_>>(),
            )
        };

        debug!(signal = %target, "reconnected");

        if let Some(source) = source {
            let restored = match self.nodes.get_mut(&source) {
                Some(node) if !node.is_ended() => {
                    if !node.targets.contains(&target) {
                        node.targets.push(target);
                    }
                    true
                }
                // The source ended while we were detached.
                _ => false,
            };

            if restored {
                if let Some(node) = self.nodes.get_mut(&target) {
                    node.source = Some(source);
                }
                self.reattach(source);
            }
        }

        self.notify(target, &Event::Reconnect, &Value::Null);

        for dependent in dependents {
            self.reattach(dependent);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn connect_records_both_ends() {
        let mut graph = Graph::new();
        let s = graph.create();
        let t = graph.create();

        assert_eq!(graph.then(s, t).unwrap(), t);
        assert_eq!(graph.targets(s), &[t]);
        assert_eq!(graph.source(t), Some(s));
    }

    #[test]
    fn reconnecting_the_same_pair_is_a_no_op() {
        let mut graph = Graph::new();
        let s = graph.create();
        let t = graph.create();

        graph.connect(t, s).unwrap();
        graph.connect(t, s).unwrap();
        assert_eq!(graph.targets(s), &[t]);
    }

    #[test]
    fn a_second_source_is_raised_on_the_target() {
        let mut graph = Graph::new();
        let t = graph.create();
        let first = graph.create();
        let second = graph.create();

        graph.connect(t, first).unwrap();
        let err = graph.connect(t, second).unwrap_err();

        assert_eq!(
            err,
            SigError::SourceAlreadySet {
                target: t,
                existing: first,
                attempted: second,
            }
        );
        assert_eq!(graph.source(t), Some(first));
        assert!(graph.targets(second).is_empty());
    }

    #[test]
    fn a_second_source_error_reaches_downstream_handlers() {
        let mut graph = Graph::new();
        let t = graph.create();
        let first = graph.create();
        let second = graph.create();
        graph.connect(t, first).unwrap();

        let caught = Rc::new(RefCell::new(None));
        let slot = caught.clone();
        graph
            .catch(t, move |_, _, err| {
                *slot.borrow_mut() = Some(err);
                Ok(())
            })
            .unwrap();

        graph.connect(t, second).unwrap();
        assert!(matches!(
            *caught.borrow(),
            Some(SigError::SourceAlreadySet { .. })
        ));
    }

    #[test]
    fn disconnect_prunes_and_reconnect_restores() {
        let mut graph = Graph::new();
        let a = graph.create();
        let b = graph.create();
        let c = graph.create();
        let d = graph.create();
        let e = graph.create();

        graph.connect(b, a).unwrap();
        graph.connect(c, b).unwrap();
        graph.connect(d, b).unwrap();
        assert_eq!(graph.targets(b), &[c, d]);

        graph.disconnect(c).unwrap();
        assert!(graph.is_disconnected(c));
        assert!(!graph.is_disconnected(b));
        assert_eq!(graph.targets(b), &[d]);
        assert_eq!(graph.source(c), None);

        graph.disconnect(d).unwrap();
        assert!(graph.is_disconnected(b));
        assert!(graph.is_disconnected(a));
        assert!(graph.targets(a).is_empty());
        assert_eq!(graph.source(b), None);

        graph.connect(e, b).unwrap();
        assert!(!graph.is_disconnected(a));
        assert!(!graph.is_disconnected(b));
        assert!(graph.is_disconnected(c));
        assert_eq!(graph.targets(a), &[b]);
        assert_eq!(graph.source(b), Some(a));
        assert_eq!(graph.targets(b), &[e]);
    }

    #[test]
    fn a_pruned_signal_keeps_its_source() {
        let mut graph = Graph::new();
        let a = graph.create();
        let b = graph.create();
        let other = graph.create();
        graph.connect(b, a).unwrap();
        graph.disconnect(b).unwrap();

        assert!(graph.connect(b, other).is_err());

        graph.connect(b, a).unwrap();
        assert!(!graph.is_disconnected(b));
        assert_eq!(graph.targets(a), &[b]);
    }

    #[test]
    fn a_pruned_root_revives_when_given_a_source() {
        let mut graph = Graph::new();
        let a = graph.create();
        let b = graph.create();
        let x = graph.create();
        graph.connect(b, a).unwrap();
        graph.disconnect(b).unwrap();
        assert!(graph.is_disconnected(a));

        graph.connect(a, x).unwrap();
        assert!(!graph.is_disconnected(a));
        assert_eq!(graph.source(a), Some(x));
        assert_eq!(graph.targets(x), &[a]);

        graph.disconnect(a).unwrap();
        assert!(graph.is_disconnected(a));
        assert!(graph.targets(x).is_empty());

        graph.connect(a, x).unwrap();
        assert_eq!(graph.targets(x), &[a]);

        graph.end(a).unwrap();
        assert!(graph.is_ended(a));
        assert_eq!(graph.source(a), None);
        assert!(graph.targets(x).is_empty());
    }

    #[test]
    fn ended_sources_accept_no_targets() {
        let mut graph = Graph::new();
        let a = graph.create();
        graph.end(a).unwrap();

        let b = graph.create();
        graph.connect(b, a).unwrap();
        assert!(graph.targets(a).is_empty());
        assert_eq!(graph.source(b), None);
    }

    #[test]
    fn sticky_values_replay_to_new_targets() {
        let mut graph = Graph::new();
        let s = graph.val(2);
        graph.resume(s).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        graph
            .then_fn(s, move |_, _, value| {
                sink.borrow_mut().push(value);
                Ok(())
            })
            .unwrap();

        assert_eq!(*seen.borrow(), vec![Value::Int(2)]);
    }

    #[test]
    fn eager_signals_start_on_their_first_target() {
        let mut graph = Graph::new();
        let s = graph.create_with([1]);
        graph.set_eager(s, true).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        graph
            .then_fn(s, move |_, _, value| {
                sink.borrow_mut().push(value);
                Ok(())
            })
            .unwrap();

        assert!(graph.is_started(s));
        assert_eq!(*seen.borrow(), vec![Value::Int(1)]);
    }

    #[test]
    fn dependents_follow_their_owner() {
        let mut graph = Graph::new();
        let src = graph.create();
        let owner = graph.create();
        let helper = graph.create();
        let consumer = graph.create();
        graph.connect(helper, src).unwrap();
        graph.connect(consumer, owner).unwrap();
        graph.depend_on(helper, owner).unwrap();

        graph.disconnect(consumer).unwrap();
        assert!(graph.is_disconnected(owner));
        assert!(graph.is_disconnected(helper));
        assert!(graph.targets(src).is_empty());

        graph.connect(consumer, owner).unwrap();
        assert!(!graph.is_disconnected(helper));
        assert_eq!(graph.targets(src), &[helper]);

        graph.end(owner).unwrap();
        assert!(graph.is_ended(helper));
    }
}
