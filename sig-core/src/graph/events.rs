//! Signal events.
//!
//! Listeners hang off a signal and fire when the lifecycle controller or
//! the connection manager reports a transition, or when user code emits a
//! custom event. A listener returning `Err` raises the error on the signal.

use std::fmt;

use super::handler::{Listener, ListenerId};
use super::node::SignalId;
use super::Graph;
use crate::error::SigError;
use crate::value::Value;

/// Something that happened to a signal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// `end` was called while values were still buffered.
    Ending,
    /// The signal reached `Ended`.
    End,
    /// The signal was detached from its source.
    Disconnect,
    /// The signal was re-attached to its source.
    Reconnect,
    /// A user-defined event.
    Custom(String),
}

impl Event {
    pub fn custom(name: impl Into<String>) -> Self {
        Event::Custom(name.into())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Ending => write!(f, "ending"),
            Event::End => write!(f, "end"),
            Event::Disconnect => write!(f, "disconnect"),
            Event::Reconnect => write!(f, "reconnect"),
            Event::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// A registered listener. `listener` is `None` while it runs.
pub(crate) struct ListenerEntry {
    pub(crate) signal: SignalId,
    pub(crate) event: Event,
    pub(crate) listener: Option<Listener>,
}

impl Graph {
    /// Call `listener` whenever `event` fires on `signal`.
    ///
    /// Listeners on an ended signal are never called.
    pub fn on<F>(&mut self, signal: SignalId, event: Event, listener: F) -> Result<ListenerId, SigError>
    where
        F: FnMut(&mut Graph, SignalId, &Value) -> Result<(), SigError> + 'static,
    {
        let node = self.node_mut(signal)?;
        let id = ListenerId::new();
        if node.is_ended() {
            return Ok(id);
        }

        node.listeners.push(id);
        self.listeners.insert(
            id,
            ListenerEntry {
                signal,
                event,
                listener: Some(Box::new(listener)),
            },
        );
        Ok(id)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let Some(entry) = self.listeners.remove(&id) else {
            return false;
        };

        if let Some(node) = self.nodes.get_mut(&entry.signal) {
            node.listeners.retain(|listener| *listener != id);
        }
        true
    }

    /// Fire `event` on `signal`.
    pub fn emit(
        &mut self,
        signal: SignalId,
        event: Event,
        value: impl Into<Value>,
    ) -> Result<(), SigError> {
        self.ensure(signal)?;
        let value = value.into();
        self.run(|graph| graph.notify(signal, &event, &value))
    }

    /// Create a signal that puts the value of every `event` fired on
    /// `signal`. Ending the returned signal removes the listener.
    pub fn event(&mut self, signal: SignalId, event: Event) -> Result<SignalId, SigError> {
        self.ensure(signal)?;
        let out = self.create();
        let id = self.on(signal, event, move |graph, _, value| graph.put(out, value.clone()))?;
        self.teardown(out, move |graph, _| {
            graph.off(id);
        })?;
        Ok(out)
    }

    /// Count the listeners registered for `event` on `signal`.
    pub fn listener_count(&self, signal: SignalId, event: &Event) -> usize {
        self.nodes.get(&signal).map_or(0, |node| {
            node.listeners
                .iter()
                .filter_map(|id| self.listeners.get(id))
                .filter(|entry| entry.event == *event)
                .count()
        })
    }

    pub(crate) fn notify(&mut self, signal: SignalId, event: &Event, value: &Value) {
        let ids = match self.nodes.get(&signal) {
            Some(node) if !node.listeners.is_empty() => node.listeners.clone(),
            _ => return,
        };

        for id in ids {
            let listener = match self.listeners.get_mut(&id) {
                Some(entry) if entry.event == *event => entry.listener.take(),
                _ => continue,
            };

            // Already running further up the stack.
            let Some(mut listener) = listener else {
                continue;
            };

            let result = listener(self, signal, value);
            if let Some(entry) = self.listeners.get_mut(&id) {
                entry.listener = Some(listener);
            }

            if let Err(err) = result {
                self.raise_error(signal, err);
            }
        }
    }
}
