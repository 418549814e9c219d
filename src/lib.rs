//! A single-threaded, cooperative multiplexer for asynchronous reads,
//! writes, and one-shot alarms on slow, character-oriented device
//! channels - serial ports, pseudo-terminals, named pipes, and the like.
//!
//! [`Engine`] is the core type: it owns a registry of in-flight
//! operations keyed by `(`[`Descriptor`]`, direction)` and a queue of
//! pending alarms, and [`Engine::wait`] drives both to completion,
//! invoking callbacks as descriptors become ready and alarms come due.
//! [`global`] offers the same surface as free functions against a
//! lazily-built per-thread `Engine`, for callers who don't want to carry
//! one explicitly.
//!
//! # Example
//!
//! ```no_run
//! use evio::Engine;
//!
//! let mut engine = Engine::new();
//! # let fd: std::os::unix::io::RawFd = 0;
//!
//! engine.async_read(fd, 256, |event| {
//!     println!("read {} bytes", event.length);
//!     event.length
//! }).unwrap();
//!
//! engine.wait(1_000).unwrap();
//! ```
//!
//! # Readiness backends
//!
//! One of three backends is compiled in, selected by target and Cargo
//! feature:
//!
//! - Windows: overlapped I/O with per-function event handles.
//! - Unix, default: `poll(2)`.
//! - Unix, with the `select-backend` feature: `select(2)`, for targets
//!   whose `poll(2)` is missing or unreliable on character devices.
//!
//! # Non-goals
//!
//! This crate does not do buffered or line-oriented I/O, protocol
//! framing, TLS, or multi-threaded dispatch - it is strictly a readiness
//! and completion multiplexer. Pair it with your own framing layer the
//! same way the original BRLTTY engine this is modeled on is paired with
//! higher-level braille-display drivers.

/// Expands to `log::warn!` when the (default-on) `log` feature is
/// enabled, and to nothing otherwise - keeps the `sys` backends from
/// having a hard dependency on the `log` crate being present.
#[cfg(feature = "log")]
macro_rules! backend_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}
#[cfg(not(feature = "log"))]
macro_rules! backend_warn {
    ($($arg:tt)*) => {};
}
pub(crate) use backend_warn;

mod alarm;
mod descriptor;
mod engine;
mod error;
pub mod global;
mod handle;
mod operation;
mod queue;
mod sys;
mod time;
mod transfer;

pub use crate::descriptor::Descriptor;
pub use crate::engine::Engine;
pub use crate::error::SubmitError;
pub use crate::handle::Handle;
pub use crate::time::WallTime;
pub use crate::transfer::{InputEvent, OutputEvent};
