//! Graph configuration.

use serde::{Deserialize, Serialize};

use crate::error::SigError;

/// What the graph does with an error that reaches a signal with no targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnhandledPolicy {
    /// Return it as `Err` from the outermost public call.
    #[default]
    Return,
    /// Log it with `tracing::warn!` and drop it.
    Log,
}

/// Configuration for a [`Graph`](crate::graph::Graph).
///
/// # Example
///
/// ```
/// use sig_core::GraphConfig;
///
/// let config = GraphConfig::default();
/// assert!(!config.eager);
/// assert_eq!(config.capacity, 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Whether new signals resume as soon as they gain their first target.
    #[serde(default)]
    pub eager: bool,

    /// Whether new signals retain and replay their last value.
    #[serde(default)]
    pub sticky: bool,

    /// Initial capacity of the signal arena.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Handling of errors nobody listens to.
    #[serde(default)]
    pub unhandled: UnhandledPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            eager: false,
            sticky: false,
            capacity: default_capacity(),
            unhandled: UnhandledPolicy::Return,
        }
    }
}

impl GraphConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Make new signals eager.
    pub fn with_eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Make new signals sticky.
    pub fn with_sticky(mut self) -> Self {
        self.sticky = true;
        self
    }

    /// Set the arena's initial capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the unhandled-error policy.
    pub fn unhandled(mut self, policy: UnhandledPolicy) -> Self {
        self.unhandled = policy;
        self
    }
}

fn default_capacity() -> usize {
    64
}
