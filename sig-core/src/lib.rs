//! Sig Core
//!
//! This crate provides the core runtime for sig, a push-based reactive
//! signal graph. It implements:
//!
//! - Signal nodes with one source and many targets
//! - Backpressure through paused output buffers and pulled input buffers
//! - An error channel that bubbles errors downstream
//! - A lifecycle state machine with teardown and dependency tying
//! - Combinators built on top (`map`, `limit`, `any`, `all`, `update`, …)
//!
//! Everything runs synchronously on the caller's stack. There is no
//! scheduler and no threading.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: The signal arena and the propagation, error and lifecycle
//!   machinery
//! - `combinators`: Derived operators
//! - `value`: The dynamic value type carried by signals
//! - `config`: Graph-wide defaults
//! - `error`: The error type
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use sig_core::{Graph, Value};
//!
//! let mut graph = Graph::new();
//! let numbers = graph.create();
//! let doubled = graph
//!     .map(numbers, |v| Value::Int(v.as_int().unwrap_or_default() * 2))
//!     .unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let out = graph
//!     .each(doubled, move |_, _, v| {
//!         sink.borrow_mut().push(v);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // Signals start paused; resuming the end of the chain starts it all.
//! graph.resume(out).unwrap();
//! graph.put_each(numbers, [1, 2, 3]).unwrap();
//!
//! assert_eq!(*seen.borrow(), vec![Value::Int(2), Value::Int(4), Value::Int(6)]);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod value;

mod combinators;

pub use config::{GraphConfig, UnhandledPolicy};
pub use error::SigError;
pub use graph::{Event, Graph, Lifecycle, ListenerId, SignalId};
pub use value::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
