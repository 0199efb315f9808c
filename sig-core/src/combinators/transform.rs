//! Single-input combinators.

use crate::error::SigError;
use crate::graph::{Graph, SignalId};
use crate::value::Value;

impl Graph {
    /// Process each value from `signal` with `f`, then ask for the next.
    ///
    /// The returned signal emits whatever `f` puts on it.
    pub fn each<F>(&mut self, signal: SignalId, mut f: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, SignalId, Value) -> Result<(), SigError> + 'static,
    {
        self.then_fn(signal, move |graph, me, value| {
            let result = f(graph, me, value);
            graph.next(me)?;
            result
        })
    }

    /// Emit `f(value)` for each value.
    pub fn map<F>(&mut self, signal: SignalId, mut f: F) -> Result<SignalId, SigError>
    where
        F: FnMut(Value) -> Value + 'static,
    {
        self.each(signal, move |graph, me, value| graph.put(me, f(value)))
    }

    /// Emit `f(value)` for each value, raising the error when `f` fails.
    pub fn try_map<F>(&mut self, signal: SignalId, mut f: F) -> Result<SignalId, SigError>
    where
        F: FnMut(Value) -> Result<Value, SigError> + 'static,
    {
        self.each(signal, move |graph, me, value| graph.put(me, f(value)?))
    }

    /// Emit the values that satisfy `predicate`.
    pub fn filter<F>(&mut self, signal: SignalId, mut predicate: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&Value) -> bool + 'static,
    {
        self.each(signal, move |graph, me, value| {
            if predicate(&value) {
                graph.put(me, value)?;
            }
            Ok(())
        })
    }

    /// Emit the leaves of nested lists, depth first.
    pub fn flatten(&mut self, signal: SignalId) -> Result<SignalId, SigError> {
        self.each(signal, put_leaves)
    }

    /// Emit the first `n` values, then end.
    ///
    /// With `n == 0` the first value ends the signal without being emitted.
    pub fn limit(&mut self, signal: SignalId, n: usize) -> Result<SignalId, SigError> {
        let mut seen = 0usize;
        self.then_fn(signal, move |graph, me, value| {
            seen += 1;
            if seen <= n {
                graph.put(me, value)?;
            }

            if seen >= n {
                graph.end(me)
            } else {
                graph.next(me)
            }
        })
    }

    /// Emit the first value, then end.
    pub fn once(&mut self, signal: SignalId) -> Result<SignalId, SigError> {
        self.limit(signal, 1)
    }

    /// Call `f` with each value and pass the value on unchanged.
    pub fn tap<F>(&mut self, signal: SignalId, mut f: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, &Value) -> Result<(), SigError> + 'static,
    {
        self.each(signal, move |graph, me, value| {
            f(graph, &value)?;
            graph.put(me, value)
        })
    }

    /// Copy each value into `target` and pass it on unchanged.
    pub fn tap_into(&mut self, signal: SignalId, target: SignalId) -> Result<SignalId, SigError> {
        self.ensure(target)?;
        self.tap(signal, move |graph, value| graph.put(target, value.clone()))
    }

    /// Redirect the values and errors of `signal` into `target`.
    ///
    /// The redirect is started right away and is tied to `target`: it
    /// disconnects, reconnects and ends with it. Returns the redirecting
    /// signal.
    pub fn to(&mut self, signal: SignalId, target: SignalId) -> Result<SignalId, SigError> {
        self.ensure(target)?;
        let redirect = self.then_fn(signal, move |graph, me, value| {
            graph.put(target, value)?;
            graph.next(me)
        })?;

        self.set_error_handler(redirect, move |graph, _, err| graph.raise(target, err))?;
        self.depend_on(redirect, target)?;
        self.resume(redirect)?;
        Ok(redirect)
    }

    /// Put `value` on `signal`, then end it.
    pub fn resolve(&mut self, signal: SignalId, value: impl Into<Value>) -> Result<SignalId, SigError> {
        self.put(signal, value)?;
        self.end(signal)?;
        Ok(signal)
    }

    /// Create a sticky signal holding `value`.
    pub fn val(&mut self, value: impl Into<Value>) -> SignalId {
        let id = self.create_sticky();
        self.emit_value(id, value.into());
        id
    }

    /// Wrap `value` with `val`. A signal handle gets a sticky target
    /// instead, so late consumers still see its last value.
    pub fn ensure_val(&mut self, value: impl Into<Value>) -> Result<SignalId, SigError> {
        match value.into() {
            Value::Signal(id) => {
                self.ensure(id)?;
                let target = self.create_sticky();
                self.then(id, target)
            }
            value => Ok(self.val(value)),
        }
    }

    /// Put `value` on `target` and return `target`.
    pub fn put_to(&mut self, value: impl Into<Value>, target: SignalId) -> Result<SignalId, SigError> {
        self.put(target, value)?;
        Ok(target)
    }

    fn create_sticky(&mut self) -> SignalId {
        let id = self.create();
        if let Some(node) = self.nodes.get_mut(&id) {
            node.sticky = true;
        }
        id
    }
}

fn put_leaves(graph: &mut Graph, me: SignalId, value: Value) -> Result<(), SigError> {
    match value {
        Value::List(items) => items
            .into_iter()
            .try_for_each(|item| put_leaves(graph, me, item)),
        leaf => graph.put(me, leaf),
    }
}
