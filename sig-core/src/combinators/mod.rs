//! Combinators
//!
//! Derived operators built only from the public graph primitives: `each`,
//! `map`, `limit` and friends for single inputs, `any`/`all`/`merge` for
//! collections of signals, and `update`/`append` for signals of signals.
//!
//! Every combinator returns a new signal connected downstream of its
//! input(s). Like any other signal it starts paused.

mod fan_in;
mod switch;
mod transform;
