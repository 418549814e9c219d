//! A thread-local convenience wrapper around [`Engine`] for callers who
//! only want one multiplexer per thread and would rather not carry one
//! through every function signature.
//!
//! This mirrors what the original C engine did for free by virtue of
//! its file-scope statics, without actually bringing back process-wide
//! state: each thread gets its own lazily-built `Engine`, so two threads
//! calling these functions never contend or interfere with each other.
//! Anything that wants multiple independent engines on one thread, or
//! to move an engine across threads under its own synchronization,
//! should use [`Engine`] directly instead.

use std::cell::RefCell;

use crate::descriptor::Descriptor;
use crate::engine::Engine;
use crate::error::SubmitError;
use crate::handle::Handle;
use crate::time::WallTime;
use crate::transfer::{InputEvent, OutputEvent};

thread_local! {
    static ENGINE: RefCell<Engine> = RefCell::new(Engine::new());
}

/// Submits an asynchronous read on this thread's engine. See [`Engine::async_read`].
pub fn async_read<D, F>(descriptor: D, size: usize, callback: F) -> Result<Handle, SubmitError>
where
    D: Into<Descriptor>,
    F: FnMut(&InputEvent) -> usize + 'static,
{
    ENGINE.with(|engine| engine.borrow_mut().async_read(descriptor, size, callback))
}

/// Submits an asynchronous write on this thread's engine. See [`Engine::async_write`].
pub fn async_write<D, F>(descriptor: D, data: &[u8], callback: F) -> Result<Handle, SubmitError>
where
    D: Into<Descriptor>,
    F: FnMut(&OutputEvent) + 'static,
{
    ENGINE.with(|engine| engine.borrow_mut().async_write(descriptor, data, callback))
}

/// Schedules an absolute alarm on this thread's engine. See [`Engine::async_absolute_alarm`].
pub fn async_absolute_alarm<F>(time: WallTime, callback: F) -> Handle
where
    F: FnMut() + 'static,
{
    ENGINE.with(|engine| engine.borrow_mut().async_absolute_alarm(time, callback))
}

/// Schedules a relative alarm on this thread's engine. See [`Engine::async_relative_alarm`].
pub fn async_relative_alarm<F>(millis: i64, callback: F) -> Handle
where
    F: FnMut() + 'static,
{
    ENGINE.with(|engine| engine.borrow_mut().async_relative_alarm(millis, callback))
}

/// Cancels a pending operation or alarm on this thread's engine. See [`Engine::async_cancel`].
pub fn async_cancel(handle: Handle) -> bool {
    ENGINE.with(|engine| engine.borrow_mut().async_cancel(handle))
}

/// Drives this thread's engine. See [`Engine::wait`].
pub fn async_wait(duration_ms: i64) -> std::io::Result<()> {
    ENGINE.with(|engine| engine.borrow_mut().wait(duration_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn relative_alarm_fires_from_the_global_engine() {
        let fired = Rc::new(Cell::new(false));

        let flag = fired.clone();
        async_relative_alarm(0, move || flag.set(true));
        async_wait(50).expect("wait should not fail");

        assert!(fired.get());
    }
}
