//! Fan-in combinators over a list or map of signals.
//!
//! The input is a `Value::List` or `Value::Map` whose entries are signal
//! handles or plain values. Plain entries never emit, but `all` keeps them
//! in its snapshots.

use std::collections::HashSet;

use crate::error::SigError;
use crate::graph::{Graph, SignalId};
use crate::value::Value;

/// Position of a signal in the input collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Slot {
    Index(usize),
    Key(String),
}

impl Slot {
    fn key(&self) -> Value {
        match self {
            Slot::Index(i) => Value::from(*i),
            Slot::Key(k) => Value::from(k.as_str()),
        }
    }

    fn from_key(key: &Value) -> Option<Self> {
        match key {
            Value::Int(i) => usize::try_from(*i).ok().map(Slot::Index),
            Value::Str(k) => Some(Slot::Key(k.clone())),
            _ => None,
        }
    }

    fn assign(&self, snapshot: &mut Value, value: Value) {
        let entry = match (self, snapshot) {
            (Slot::Index(i), Value::List(items)) => items.get_mut(*i),
            (Slot::Key(k), Value::Map(entries)) => entries.get_mut(k),
            _ => None,
        };

        if let Some(entry) = entry {
            *entry = value;
        }
    }
}

/// Collect the signal entries of a list or map.
fn signal_slots(values: &Value) -> Result<Vec<(Slot, SignalId)>, SigError> {
    match values {
        Value::List(items) => Ok(items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_signal().map(|s| (Slot::Index(i), s)))
            .collect()),
        Value::Map(entries) => Ok(entries
            .iter()
            .filter_map(|(k, v)| v.as_signal().map(|s| (Slot::Key(k.clone()), s)))
            .collect()),
        other => Err(SigError::InvalidInput(format!(
            "expected a list or map of signals, got {other}"
        ))),
    }
}

/// Split an `[value, key]` pair emitted by `any`.
fn untag(pair: Value) -> Option<(Value, Value)> {
    match pair {
        Value::List(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            Some((items.next()?, items.next()?))
        }
        _ => None,
    }
}

impl Graph {
    /// Emit `[value, key]` whenever a signal in `values` emits, where `key`
    /// is the signal's list index or map key.
    ///
    /// Errors from every signal reach the returned signal.
    pub fn any(&mut self, values: impl Into<Value>) -> Result<SignalId, SigError> {
        let slots = signal_slots(&values.into())?;
        for (_, signal) in &slots {
            self.ensure(*signal)?;
        }

        let out = self.create();
        for (slot, signal) in slots {
            let key = slot.key();
            let tagged = self.map(signal, move |value| Value::List(vec![value, key.clone()]))?;
            self.to(tagged, out)?;
        }
        Ok(out)
    }

    /// Emit a copy of `values` with each signal replaced by its latest
    /// value, every time one of them emits, once all of them have.
    ///
    /// Without any signals the collection is emitted once as is.
    pub fn all(&mut self, values: impl Into<Value>) -> Result<SignalId, SigError> {
        let mut snapshot = values.into();
        let slots = signal_slots(&snapshot)?;
        if slots.is_empty() {
            return Ok(self.create_with([snapshot]));
        }

        let mut pending: HashSet<Slot> = slots.into_iter().map(|(slot, _)| slot).collect();
        let tagged = self.any(snapshot.clone())?;

        self.each(tagged, move |graph, me, pair| {
            let Some((value, slot)) = untag(pair).and_then(|(v, k)| Some((v, Slot::from_key(&k)?)))
            else {
                return Ok(());
            };

            slot.assign(&mut snapshot, value);
            pending.remove(&slot);
            if pending.is_empty() {
                graph.put(me, snapshot.clone())?;
            }
            Ok(())
        })
    }

    /// Emit the values of every signal in `values`, untagged.
    pub fn merge(&mut self, values: impl Into<Value>) -> Result<SignalId, SigError> {
        let tagged = self.any(values)?;
        self.map(tagged, |pair| match untag(pair) {
            Some((value, _)) => value,
            None => Value::Null,
        })
    }
}
