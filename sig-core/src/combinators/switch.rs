//! Higher-order combinators: signals of signals.

use crate::error::SigError;
use crate::graph::{Graph, SignalId};
use crate::value::Value;

/// What happens to earlier inner signals when a new one arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Switch {
    /// Only the newest inner signal feeds the output.
    Latest,
    /// Every inner signal keeps feeding the output.
    All,
}

impl Graph {
    /// Redirect the signal returned by `f` for each value into one output,
    /// ending the previous redirect each time.
    ///
    /// Results that are not signal handles are ignored.
    pub fn update<F>(&mut self, signal: SignalId, f: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, Value) -> Result<Value, SigError> + 'static,
    {
        self.redirect_inner(signal, f, Switch::Latest)
    }

    /// Redirect every signal returned by `f` into one output.
    ///
    /// Results that are not signal handles are ignored.
    pub fn append<F>(&mut self, signal: SignalId, f: F) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, Value) -> Result<Value, SigError> + 'static,
    {
        self.redirect_inner(signal, f, Switch::All)
    }

    fn redirect_inner<F>(&mut self, signal: SignalId, mut f: F, mode: Switch) -> Result<SignalId, SigError>
    where
        F: FnMut(&mut Graph, Value) -> Result<Value, SigError> + 'static,
    {
        self.ensure(signal)?;
        let out = self.create();
        let mut active: Option<SignalId> = None;

        let driver = self.each(signal, move |graph, _, value| {
            let Value::Signal(inner) = f(graph, value)? else {
                return Ok(());
            };

            if mode == Switch::Latest {
                if let Some(previous) = active.take() {
                    graph.end(previous)?;
                }
            }

            active = Some(graph.to(inner, out)?);
            Ok(())
        })?;

        self.set_error_handler(driver, move |graph, _, err| graph.raise(out, err))?;
        self.depend_on(driver, out)?;
        self.resume(driver)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn capture(graph: &mut Graph, signal: SignalId) -> Rc<RefCell<Vec<Value>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let t = graph
            .each(signal, move |_, _, value| {
                sink.borrow_mut().push(value);
                Ok(())
            })
            .unwrap();
        graph.resume(t).unwrap();
        seen
    }

    fn doubled(graph: &mut Graph, value: Value) -> Result<Value, SigError> {
        let Some(inner) = value.as_signal() else {
            return Ok(value);
        };
        let mapped = graph.map(inner, |x| Value::Int(x.as_int().unwrap_or_default() * 2))?;
        Ok(Value::Signal(mapped))
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().copied().map(Value::Int).collect()
    }

    #[test]
    fn update_switches_to_the_latest_signal() {
        let mut graph = Graph::new();
        let s = graph.create();
        let out = graph.update(s, doubled).unwrap();
        let seen = capture(&mut graph, out);

        let t = graph.create();
        graph.put(s, t).unwrap();
        graph.put_each(t, [1, 2, 3]).unwrap();

        let u = graph.create();
        graph.put(s, u).unwrap();
        graph.put_each(u, [4, 5, 6]).unwrap();
        graph.put_each(t, [7, 8, 9]).unwrap();

        assert_eq!(*seen.borrow(), ints(&[2, 4, 6, 8, 10, 12]));
        assert!(graph.is_disconnected(t));
    }

    #[test]
    fn update_ignores_plain_values() {
        let mut graph = Graph::new();
        let s = graph.create();
        let out = graph.update(s, |_, value| Ok(value)).unwrap();
        let seen = capture(&mut graph, out);

        let t = graph.create();
        graph.put(s, t).unwrap();
        graph.put(s, 23).unwrap();
        graph.put(t, 1).unwrap();

        assert_eq!(*seen.borrow(), ints(&[1]));
    }

    #[test]
    fn append_keeps_every_signal() {
        let mut graph = Graph::new();
        let s = graph.create();
        let out = graph.append(s, doubled).unwrap();
        let seen = capture(&mut graph, out);

        let t = graph.create();
        graph.put(s, t).unwrap();
        graph.put_each(t, [1, 2, 3]).unwrap();

        let u = graph.create();
        graph.put(s, u).unwrap();
        graph.put_each(u, [4, 5, 6]).unwrap();
        graph.put_each(t, [7, 8, 9]).unwrap();

        assert_eq!(*seen.borrow(), ints(&[2, 4, 6, 8, 10, 12, 14, 16, 18]));
    }

    #[test]
    fn errors_reach_the_output() {
        let mut graph = Graph::new();
        let s = graph.create();
        let out = graph
            .append(s, |_, value| match value {
                Value::Signal(_) => Ok(value),
                _ => Err(SigError::from("not a signal")),
            })
            .unwrap();
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        let c = graph
            .catch(out, move |_, _, err| {
                sink.borrow_mut().push(err);
                Ok(())
            })
            .unwrap();
        graph.resume(c).unwrap();

        let t = graph.create();
        graph.put(s, t).unwrap();
        graph.put(s, 23).unwrap();
        graph.raise(t, "inner").unwrap();
        graph.raise(s, "outer").unwrap();

        assert_eq!(
            *errors.borrow(),
            vec![
                SigError::from("not a signal"),
                SigError::from("inner"),
                SigError::from("outer"),
            ]
        );
    }

    #[test]
    fn switching_releases_old_redirects() {
        let mut graph = Graph::new();
        let s = graph.create();
        let out = graph.update(s, |_, value| Ok(value)).unwrap();
        let seen = capture(&mut graph, out);

        let mut last = None;
        for _ in 0..100 {
            let t = graph.create();
            graph.put(s, t).unwrap();
            last = Some(t);
        }

        // The driver and the newest redirect.
        assert_eq!(graph.node(out).unwrap().dependents().count(), 2);

        graph.put(last.unwrap(), 1).unwrap();
        assert_eq!(*seen.borrow(), ints(&[1]));
    }

    #[test]
    fn ending_the_output_releases_the_source() {
        let mut graph = Graph::new();
        let s = graph.create();
        let out = graph.update(s, |_, value| Ok(value)).unwrap();
        assert_eq!(graph.targets(s).len(), 1);

        graph.end(out).unwrap();
        assert!(graph.targets(s).is_empty());
    }
}
