//! Signal Graph
//!
//! This module implements the push-based signal graph: signals, the edges
//! between them, and the machinery that moves values and errors along
//! those edges.
//!
//! # Overview
//!
//! The graph is a forest of producer chains where:
//!
//! - Nodes are signals, each with at most one source and any number of
//!   targets
//! - Values flow from a source to its targets, and so do errors
//!
//! Producers never block. A signal buffers outgoing values while paused,
//! and each target buffers incoming values until its handler asks for the
//! next one.
//!
//! # Design Decisions
//!
//! 1. The `Graph` is an arena indexed by `SignalId`. Signals refer to each
//!    other by handle, never by reference.
//!
//! 2. Handlers receive `&mut Graph` and their own handle explicitly. While a
//!    handler runs it is taken out of its node, so handlers may freely call
//!    back into the graph.
//!
//! 3. Everything is synchronous. A `put` runs the whole downstream fan-out
//!    before it returns. A cycle in the graph recurses without bound.

mod arena;
mod connection;
mod error_channel;
mod events;
mod handler;
mod lifecycle;
mod node;
mod propagation;

pub use arena::Graph;
pub use events::Event;
pub use handler::{DoneCallback, ErrorHandler, Listener, ListenerId, Teardown, ValueHandler};
pub use node::{Lifecycle, Node, SignalId};
