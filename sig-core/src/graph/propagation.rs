//! Propagation Engine
//!
//! Values move through the graph in two steps:
//!
//! 1. `put` on a signal either buffers the value (paused) or fans it out to
//!    a snapshot of the signal's targets.
//! 2. Each target queues the value in its in-buffer and runs its value
//!    handler only if it is *waiting*. A handler asks for the next value by
//!    calling `next`; until it does, further values accumulate in the
//!    in-buffer. The producer never blocks.
//!
//! A handler is taken out of its node while it runs. A `next` issued from
//! inside the handler only marks the node as waiting, and the drain loop
//! picks the following value up once the handler returns, so a handler is
//! never re-entered and queued values keep their order.

use tracing::{debug, trace};

use super::node::{SignalId, Targets};
use super::{Graph, ValueHandler};
use crate::error::SigError;
use crate::value::Value;

impl Graph {
    /// Send a value from `signal` to its targets, or buffer it if paused.
    ///
    /// Values put on an ending or ended signal are dropped.
    pub fn put(&mut self, signal: SignalId, value: impl Into<Value>) -> Result<(), SigError> {
        self.ensure(signal)?;
        let value = value.into();
        self.run(|graph| graph.emit_value(signal, value))
    }

    /// Put each value in order.
    pub fn put_each<I, V>(&mut self, signal: SignalId, values: I) -> Result<(), SigError>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.ensure(signal)?;
        self.run(|graph| {
            for value in values {
                graph.emit_value(signal, value.into());
            }
        })
    }

    /// Ask for the next queued input of `signal`.
    pub fn next(&mut self, signal: SignalId) -> Result<(), SigError> {
        self.node_mut(signal)?.waiting = true;
        self.run(|graph| graph.drain(signal))
    }

    /// Buffer outgoing values until `resume`.
    pub fn pause(&mut self, signal: SignalId) -> Result<(), SigError> {
        self.node_mut(signal)?.paused = true;
        Ok(())
    }

    /// Deliver buffered values in order, then deliver immediately.
    ///
    /// Resuming a signal for the first time also starts its source chain.
    pub fn resume(&mut self, signal: SignalId) -> Result<(), SigError> {
        self.ensure(signal)?;
        self.run(|graph| graph.start(signal))
    }

    pub(crate) fn emit_value(&mut self, signal: SignalId, value: Value) {
        let Some(node) = self.nodes.get_mut(&signal) else {
            return;
        };

        if !node.is_alive() {
            trace!(signal = %signal, "dropping value put on a terminating signal");
            return;
        }

        if node.sticky {
            node.current = Some(value.clone());
        }

        // Mid-flush puts queue behind the values still being flushed.
        if node.paused || node.flushing {
            node.out_buffer.push_back(value);
            return;
        }

        self.send(signal, value);
    }

    /// Fan a value out to the targets as they are right now.
    fn send(&mut self, signal: SignalId, value: Value) {
        let targets: Targets = match self.nodes.get(&signal) {
            Some(node) => node.targets.clone(),
            None => return,
        };

        let Some((last, rest)) = targets.split_last() else {
            return;
        };

        for target in rest {
            self.receive(*target, value.clone());
        }
        self.receive(*last, value);
    }

    pub(crate) fn receive(&mut self, target: SignalId, value: Value) {
        let Some(node) = self.nodes.get_mut(&target) else {
            return;
        };

        if node.is_ended() {
            return;
        }

        node.in_buffer.push_back(value);
        self.drain(target);
    }

    /// Process queued inputs for as long as the handler keeps asking.
    pub(crate) fn drain(&mut self, signal: SignalId) {
        loop {
            let (handler, value) = {
                let Some(node) = self.nodes.get_mut(&signal) else {
                    return;
                };

                if node.processing || !node.waiting || node.is_ended() {
                    return;
                }

                let Some(value) = node.in_buffer.pop_front() else {
                    return;
                };

                node.waiting = false;
                node.processing = true;
                (node.value_handler.take(), value)
            };

            let result = match handler {
                Some(mut handler) => {
                    let result = handler(self, signal, value);
                    self.restore_value_handler(signal, handler);
                    result
                }
                None => Ok(()),
            };

            if let Some(node) = self.nodes.get_mut(&signal) {
                node.processing = false;
            }

            if let Err(err) = result {
                self.raise_error(signal, err);
            }
        }
    }

    fn restore_value_handler(&mut self, signal: SignalId, handler: ValueHandler) {
        if let Some(node) = self.nodes.get_mut(&signal) {
            // Replaced while running, or dropped by `end`.
            if !node.is_ended() && node.value_handler.is_none() {
                node.value_handler = Some(handler);
            }
        }
    }

    pub(crate) fn start(&mut self, signal: SignalId) {
        match self.nodes.get_mut(&signal) {
            Some(node) if !node.is_ended() => {
                if !node.started {
                    debug!(signal = %signal, "starting signal");
                }
                node.paused = false;
                node.started = true;
            }
            _ => return,
        }

        self.flush(signal);

        if let Some(source) = self.source(signal) {
            if !self.is_started(source) {
                self.start(source);
            }
        }
    }

    /// Deliver the out-buffer until it is empty or the signal pauses again.
    pub(crate) fn flush(&mut self, signal: SignalId) {
        match self.nodes.get_mut(&signal) {
            Some(node) if !node.flushing => node.flushing = true,
            _ => return,
        }

        loop {
            let next = match self.nodes.get_mut(&signal) {
                Some(node) if !node.paused && !node.is_ended() => node.out_buffer.pop_front(),
                _ => None,
            };

            let Some(value) = next else {
                break;
            };

            self.send(signal, value);
        }

        let finished = match self.nodes.get_mut(&signal) {
            Some(node) => {
                node.flushing = false;
                node.is_ending() && node.out_buffer.is_empty()
            }
            None => false,
        };

        if finished {
            self.finish(signal);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn collector(graph: &mut Graph, source: SignalId) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let target = graph.create_from(move |graph, me, value| {
            sink.borrow_mut().push(value);
            graph.next(me)
        });
        graph.connect(target, source).unwrap();
        graph.resume(target).unwrap();
        seen
    }

    #[test]
    fn paused_values_wait_for_resume() {
        let mut graph = Graph::new();
        let s = graph.create();
        let seen = collector(&mut graph, s);

        graph.pause(s).unwrap();
        graph.put(s, 1).unwrap();
        graph.put(s, 2).unwrap();
        assert!(seen.borrow().is_empty());

        graph.resume(s).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Int(1), Value::Int(2)]);

        graph.put(s, 3).unwrap();
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn unpulled_values_stay_in_the_in_buffer() {
        let mut graph = Graph::new();
        let s = graph.create();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        // Never calls `next`.
        let t = graph.create_from(move |_, _, value| {
            sink.borrow_mut().push(value);
            Ok(())
        });
        graph.connect(t, s).unwrap();
        graph.resume(t).unwrap();

        graph.put_each(s, [1, 2, 3]).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Int(1)]);
        assert_eq!(graph.node(t).unwrap().in_buffer_len(), 2);

        graph.next(t).unwrap();
        assert_eq!(*seen.borrow(), vec![Value::Int(1), Value::Int(2)]);

        graph.next(t).unwrap();
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(graph.node(t).unwrap().in_buffer_len(), 0);
        assert!(!graph.node(t).unwrap().is_waiting());

        // Idle and waiting again: the next value is processed on arrival.
        graph.next(t).unwrap();
        graph.put(s, 4).unwrap();
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn fan_out_uses_a_snapshot_of_targets() {
        let mut graph = Graph::new();
        let s = graph.create();
        let late = graph.create();
        let late_seen = collector(&mut graph, late);

        let t = graph.create_from(move |graph, me, value| {
            // Connecting during delivery must not receive the in-flight value.
            graph.connect(late, graph.source(me).unwrap_or(me))?;
            graph.put(me, value)?;
            graph.next(me)
        });
        graph.connect(t, s).unwrap();
        graph.resume(t).unwrap();
        graph.resume(s).unwrap();

        graph.put(s, 1).unwrap();
        assert!(late_seen.borrow().is_empty());

        graph.put(s, 2).unwrap();
        assert_eq!(*late_seen.borrow(), vec![Value::Int(2)]);
    }

    #[test]
    fn puts_during_a_flush_queue_behind_buffered_values() {
        let mut graph = Graph::new();
        let s = graph.create_with([1, 2, 3]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();

        let t = graph.create_from(move |graph, me, value| {
            if value == Value::Int(1) {
                graph.put(s, 10)?;
            }
            sink.borrow_mut().push(value);
            graph.next(me)
        });
        graph.connect(t, s).unwrap();
        graph.resume(t).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(10)]
        );
    }

    #[test]
    fn resuming_starts_the_source_chain() {
        let mut graph = Graph::new();
        let a = graph.create();
        let b = graph.create();
        let c = graph.create();
        graph.connect(b, a).unwrap();
        graph.connect(c, b).unwrap();

        assert!(!graph.is_started(a));
        graph.resume(c).unwrap();
        assert!(graph.is_started(a));
        assert!(graph.is_started(b));
        assert!(graph.is_started(c));
    }

    #[test]
    fn handler_errors_are_raised_on_the_same_signal() {
        let mut graph = Graph::new();
        let s = graph.create();
        let t = graph.create_from(|_, _, _| Err(SigError::from("o_O")));
        graph.connect(t, s).unwrap();
        graph.resume(t).unwrap();

        // `t` has no targets, so the error comes back to the caller.
        assert_eq!(graph.put(s, 1), Err(SigError::from("o_O")));
    }
}
