//! The readiness-backend façade: `prepare`, `initialize_monitor`, `await_ready`,
//! and `test_monitor`, plus the begin/end/start/finish hooks that bracket
//! an operation's lifetime.
//!
//! Exactly one of these modules is compiled in, selected the same way
//! the teacher crate swaps its own `sys::unix`/`sys::windows` (a cfg'd
//! `pub use`, not a `dyn Trait`): there is only ever one backend per
//! compiled binary, so runtime polymorphism buys nothing here. This is
//! the Rust-idiomatic reading of Design Note 2's "small trait with
//! default no-op hooks, selected at compile time by backend" - the
//! trait is structural (every backend module exposes the same function
//! names and signatures) rather than a `dyn` object.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use self::unix::*;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub(crate) use self::windows::*;
