//! Graph Nodes
//!
//! This module defines the signal record that lives in the graph arena.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use serde::Serialize;
use smallvec::SmallVec;

use super::handler::{ErrorHandler, ListenerId, Teardown, ValueHandler};
use crate::value::Value;

/// Unique identifier for a signal in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SignalId(u64);

impl SignalId {
    /// Generate a new unique signal ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for SignalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sig#{}", self.0)
    }
}

/// Lifecycle state of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting and delivering values.
    Alive,

    /// `end` was requested while output was still buffered. The signal
    /// finishes once the buffer drains.
    Ending,

    /// Terminal. Edges, buffers and handlers have been dropped.
    Ended,
}

/// Target lists are short in practice; most signals feed one or two targets.
pub(crate) type Targets = SmallVec<[SignalId; 4]>;

/// A signal in the graph.
pub struct Node {
    /// Unique identifier for this signal.
    pub(crate) id: SignalId,

    /// The live upstream edge.
    pub(crate) source: Option<SignalId>,

    /// The source this signal was pruned from while disconnected.
    pub(crate) dormant_source: Option<SignalId>,

    /// Downstream signals, in delivery order.
    pub(crate) targets: Targets,

    /// Signals whose lifecycle follows this one's.
    pub(crate) dependents: IndexSet<SignalId>,

    /// Signals this one depends on.
    pub(crate) owners: SmallVec<[SignalId; 2]>,

    pub(crate) value_handler: Option<ValueHandler>,
    pub(crate) error_handler: Option<ErrorHandler>,

    /// Received values the handler has not pulled yet.
    pub(crate) in_buffer: VecDeque<Value>,

    /// Produced values held back while paused.
    pub(crate) out_buffer: VecDeque<Value>,

    /// Last value produced, kept only when sticky.
    pub(crate) current: Option<Value>,

    pub(crate) lifecycle: Lifecycle,
    pub(crate) paused: bool,
    pub(crate) eager: bool,
    pub(crate) sticky: bool,
    pub(crate) started: bool,
    pub(crate) waiting: bool,
    pub(crate) disconnected: bool,

    // Re-entrancy guards.
    pub(crate) processing: bool,
    pub(crate) flushing: bool,
    pub(crate) handling_error: bool,

    pub(crate) teardowns: Vec<Teardown>,
    pub(crate) listeners: Vec<ListenerId>,
}

impl Node {
    /// Create a paused, unstarted signal with the default handlers.
    pub(crate) fn new(eager: bool, sticky: bool) -> Self {
        Self {
            id: SignalId::new(),
            source: None,
            dormant_source: None,
            targets: SmallVec::new(),
            dependents: IndexSet::new(),
            owners: SmallVec::new(),
            value_handler: Some(super::handler::identity()),
            error_handler: Some(super::handler::rethrow()),
            in_buffer: VecDeque::new(),
            out_buffer: VecDeque::new(),
            current: None,
            lifecycle: Lifecycle::Alive,
            paused: true,
            eager,
            sticky,
            started: false,
            waiting: true,
            disconnected: false,
            processing: false,
            flushing: false,
            handling_error: false,
            teardowns: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Get the signal's ID.
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Get the live source, if connected.
    pub fn source(&self) -> Option<SignalId> {
        self.source
    }

    /// Get the targets in delivery order.
    pub fn targets(&self) -> &[SignalId] {
        &self.targets
    }

    /// Get the dependents.
    pub fn dependents(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.dependents.iter().copied()
    }

    /// Get the lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_ended(&self) -> bool {
        self.lifecycle == Lifecycle::Ended
    }

    pub fn is_ending(&self) -> bool {
        self.lifecycle == Lifecycle::Ending
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }

    pub fn is_sticky(&self) -> bool {
        self.sticky
    }

    /// Check if the handler is ready to take the next input.
    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Get the last value, for sticky signals.
    pub fn current(&self) -> Option<&Value> {
        self.current.as_ref()
    }

    /// Number of received values waiting to be pulled.
    pub fn in_buffer_len(&self) -> usize {
        self.in_buffer.len()
    }

    /// Number of produced values waiting for `resume`.
    pub fn out_buffer_len(&self) -> usize {
        self.out_buffer.len()
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.lifecycle == Lifecycle::Alive
    }

    /// Remove a target, keeping the order of the rest.
    pub(crate) fn remove_target(&mut self, target: SignalId) -> bool {
        match self.targets.iter().position(|t| *t == target) {
            Some(index) => {
                self.targets.remove(index);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("targets", &self.targets)
            .field("lifecycle", &self.lifecycle)
            .field("paused", &self.paused)
            .field("started", &self.started)
            .field("waiting", &self.waiting)
            .field("disconnected", &self.disconnected)
            .field("in_buffer", &self.in_buffer.len())
            .field("out_buffer", &self.out_buffer.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_ids_are_unique() {
        let id1 = SignalId::new();
        let id2 = SignalId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn new_node_starts_paused_and_waiting() {
        let node = Node::new(false, false);
        assert_eq!(node.lifecycle(), Lifecycle::Alive);
        assert!(node.is_paused());
        assert!(!node.is_started());
        assert!(node.is_waiting());
        assert!(node.source().is_none());
        assert!(node.targets().is_empty());
    }

    #[test]
    fn remove_target_keeps_order() {
        let mut node = Node::new(false, false);
        let (a, b, c) = (SignalId::new(), SignalId::new(), SignalId::new());
        node.targets.extend([a, b, c]);

        assert!(node.remove_target(b));
        assert_eq!(node.targets(), &[a, c]);
        assert!(!node.remove_target(b));
    }

    #[test]
    fn display_ids() {
        assert_eq!(SignalId::from(12).to_string(), "sig#12");
    }
}
