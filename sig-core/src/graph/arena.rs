//! Signal Arena
//!
//! The `Graph` owns every signal record. Signals refer to each other by
//! `SignalId`, so cyclic source/target references are plain handle pairs
//! and a fan-out snapshot is a copy of a handle list.
//!
//! # Re-entrancy
//!
//! Handlers run with `&mut Graph` and may call back into any public
//! operation. Public operations therefore go through [`Graph::run`], which
//! tracks call depth: errors that escape the graph (reach a signal with no
//! targets) are queued and returned only from the outermost call, so one
//! failure surfaces to whoever started the propagation instead of being
//! re-raised at every level of the handler stack.

use std::collections::{HashMap, VecDeque};

use tracing::{trace, warn};

use super::events::ListenerEntry;
use super::handler::ListenerId;
use super::node::{Node, SignalId};
use super::{ErrorHandler, ValueHandler};
use crate::config::{GraphConfig, UnhandledPolicy};
use crate::error::SigError;
use crate::value::Value;

/// The signal graph.
pub struct Graph {
    /// All signals, indexed by ID.
    pub(crate) nodes: HashMap<SignalId, Node>,

    /// Event listeners, indexed by ID. Each signal keeps the order.
    pub(crate) listeners: HashMap<ListenerId, ListenerEntry>,

    config: GraphConfig,

    /// Nesting level of public calls.
    depth: usize,

    /// Errors nobody handled, waiting for the outermost call to return.
    unhandled: VecDeque<SigError>,
}

impl Graph {
    /// Create an empty graph with the default config.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: HashMap::with_capacity(config.capacity),
            listeners: HashMap::new(),
            config,
            depth: 0,
            unhandled: VecDeque::new(),
        }
    }

    /// Get the graph's config.
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Create a new paused signal.
    pub fn create(&mut self) -> SignalId {
        let node = Node::new(self.config.eager, self.config.sticky);
        let id = node.id();
        self.nodes.insert(id, node);
        trace!(signal = %id, "created signal");
        id
    }

    /// Create a paused signal holding initial values.
    ///
    /// The values are delivered, in order, once the signal is resumed.
    pub fn create_with<I, V>(&mut self, values: I) -> SignalId
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let id = self.create();
        for value in values {
            self.emit_value(id, value.into());
        }
        id
    }

    /// Create a signal that processes incoming values with `handler`.
    pub fn create_from<F>(&mut self, handler: F) -> SignalId
    where
        F: FnMut(&mut Graph, SignalId, Value) -> Result<(), SigError> + 'static,
    {
        let id = self.create();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.value_handler = Some(Box::new(handler));
        }
        id
    }

    /// Replace the handler for incoming values.
    pub fn set_value_handler<F>(&mut self, signal: SignalId, handler: F) -> Result<(), SigError>
    where
        F: FnMut(&mut Graph, SignalId, Value) -> Result<(), SigError> + 'static,
    {
        let node = self.node_mut(signal)?;
        if node.is_ended() {
            return Ok(());
        }
        node.value_handler = Some(Box::new(handler) as ValueHandler);
        Ok(())
    }

    /// Replace the handler for raised errors.
    pub fn set_error_handler<F>(&mut self, signal: SignalId, handler: F) -> Result<(), SigError>
    where
        F: FnMut(&mut Graph, SignalId, SigError) -> Result<(), SigError> + 'static,
    {
        let node = self.node_mut(signal)?;
        if node.is_ended() {
            return Ok(());
        }
        node.error_handler = Some(Box::new(handler) as ErrorHandler);
        Ok(())
    }

    /// Make a signal resume as soon as it gains its first target.
    pub fn set_eager(&mut self, signal: SignalId, eager: bool) -> Result<(), SigError> {
        self.node_mut(signal)?.eager = eager;
        Ok(())
    }

    /// Make a signal retain and replay its last value.
    pub fn set_sticky(&mut self, signal: SignalId, sticky: bool) -> Result<(), SigError> {
        let node = self.node_mut(signal)?;
        node.sticky = sticky;
        if !sticky {
            node.current = None;
        }
        Ok(())
    }

    /// Get a signal's record.
    pub fn node(&self, signal: SignalId) -> Option<&Node> {
        self.nodes.get(&signal)
    }

    /// Check if the signal belongs to this graph.
    pub fn contains(&self, signal: SignalId) -> bool {
        self.nodes.contains_key(&signal)
    }

    /// Get the total number of signals in the graph, ended ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a signal's live source.
    pub fn source(&self, signal: SignalId) -> Option<SignalId> {
        self.nodes.get(&signal).and_then(Node::source)
    }

    /// Get a signal's targets. Unknown signals have none.
    pub fn targets(&self, signal: SignalId) -> &[SignalId] {
        self.nodes.get(&signal).map_or(&[][..], Node::targets)
    }

    pub fn is_ended(&self, signal: SignalId) -> bool {
        self.nodes.get(&signal).is_some_and(Node::is_ended)
    }

    pub fn is_ending(&self, signal: SignalId) -> bool {
        self.nodes.get(&signal).is_some_and(Node::is_ending)
    }

    pub fn is_started(&self, signal: SignalId) -> bool {
        self.nodes.get(&signal).is_some_and(Node::is_started)
    }

    pub fn is_disconnected(&self, signal: SignalId) -> bool {
        self.nodes.get(&signal).is_some_and(Node::is_disconnected)
    }

    pub(crate) fn node_mut(&mut self, signal: SignalId) -> Result<&mut Node, SigError> {
        self.nodes
            .get_mut(&signal)
            .ok_or(SigError::UnknownSignal(signal))
    }

    pub(crate) fn ensure(&self, signal: SignalId) -> Result<(), SigError> {
        if self.nodes.contains_key(&signal) {
            Ok(())
        } else {
            Err(SigError::UnknownSignal(signal))
        }
    }

    /// Run a graph operation as a public call.
    ///
    /// Only the outermost call reports unhandled errors.
    pub(crate) fn run<F>(&mut self, op: F) -> Result<(), SigError>
    where
        F: FnOnce(&mut Self),
    {
        self.depth += 1;
        op(self);
        self.depth -= 1;

        if self.depth > 0 || self.unhandled.is_empty() {
            return Ok(());
        }

        let mut unhandled = std::mem::take(&mut self.unhandled).into_iter();
        let first = unhandled.next();
        for err in unhandled {
            warn!(error = %err, "dropping unhandled error, an earlier one is being reported");
        }

        match (first, self.config.unhandled) {
            (Some(err), UnhandledPolicy::Return) => Err(err),
            (Some(err), UnhandledPolicy::Log) => {
                warn!(error = %err, "unhandled error");
                Ok(())
            }
            (None, _) => Ok(()),
        }
    }

    /// Queue an error that left the graph.
    pub(crate) fn escalate(&mut self, err: SigError) {
        self.unhandled.push_back(err);
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
