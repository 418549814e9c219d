//! `poll(2)`-based readiness backend. The default on Unix.

use std::io;

use crate::descriptor::Descriptor;
use crate::operation::OperationEntry;
use crate::transfer::DirectionKind;

use super::unix_finish_operation;

/// Nothing engine-wide to track: each `pollfd` is self-contained.
pub(crate) struct BackendState;

pub(crate) struct FunctionState {
    events: libc::c_short,
}

pub(crate) type Monitor = libc::pollfd;

pub(crate) fn new_backend_state() -> BackendState {
    BackendState
}

pub(crate) fn begin_function(_state: &mut BackendState, _descriptor: Descriptor, kind: DirectionKind) -> io::Result<FunctionState> {
    let events = match kind {
        DirectionKind::Input => libc::POLLIN,
        DirectionKind::Output => libc::POLLOUT,
    };
    Ok(FunctionState { events })
}

pub(crate) fn end_function(_state: &mut BackendState, _function: &mut FunctionState) {}

/// `poll` has no issue-ahead-of-time notion: a read/write only happens
/// once the descriptor is reported ready, in [`finish_operation`].
pub(crate) fn start_operation(
    _state: &mut BackendState,
    _descriptor: Descriptor,
    _kind: DirectionKind,
    _function: &mut FunctionState,
    _operation: &mut OperationEntry,
) {
}

pub(crate) fn finish_operation(
    descriptor: Descriptor,
    kind: DirectionKind,
    _function: &mut FunctionState,
    operation: &mut OperationEntry,
) {
    unix_finish_operation(descriptor, kind, operation);
}

pub(crate) fn prepare(_state: &mut BackendState) {}

pub(crate) fn initialize_monitor(_state: &mut BackendState, monitor: &mut Monitor, descriptor: Descriptor, function: &FunctionState) {
    monitor.fd = descriptor.raw();
    monitor.events = function.events;
    monitor.revents = 0;
}

/// Blocks in `poll(2)` for at most `timeout_ms`, or indefinitely when
/// `timeout_ms` is negative (`poll`'s own infinite-timeout sentinel is
/// also `-1`, so the negative duration passed down from `Engine::wait`
/// threads straight through unchanged). An empty monitor array is a
/// legal `poll` call with `nfds == 0`, which simply sleeps for the
/// timeout - the same trick the original relies on for "no descriptors
/// registered, just wait for the next alarm."
pub(crate) fn await_ready(_state: &mut BackendState, monitors: &mut [Monitor], timeout_ms: i64) -> bool {
    let timeout = if timeout_ms < 0 { -1 } else { timeout_ms.clamp(0, i32::MAX as i64) as libc::c_int };

    let result = unsafe { libc::poll(monitors.as_mut_ptr(), monitors.len() as libc::nfds_t, timeout) };

    if result > 0 {
        return true;
    }

    if result < 0 {
        let error = io::Error::last_os_error();
        if error.kind() != io::ErrorKind::Interrupted {
            crate::backend_warn!("poll failed: {error}");
        }
    }

    false
}

pub(crate) fn test_monitor(_state: &BackendState, monitor: &Monitor) -> bool {
    monitor.revents != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe() -> (libc::c_int, libc::c_int) {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    #[test]
    fn await_ready_reports_a_writable_pipe_immediately() {
        let (_reader, writer) = pipe();
        let mut state = new_backend_state();
        let function = begin_function(&mut state, writer.into(), DirectionKind::Output).unwrap();

        let mut monitor: Monitor = unsafe { std::mem::zeroed() };
        initialize_monitor(&mut state, &mut monitor, writer.into(), &function);

        assert!(await_ready(&mut state, std::slice::from_mut(&mut monitor), 1_000));
        assert!(test_monitor(&state, &monitor));

        unsafe {
            libc::close(writer);
            libc::close(_reader);
        }
    }

    #[test]
    fn await_ready_times_out_on_an_empty_drained_pipe() {
        let (reader, writer) = pipe();
        let mut state = new_backend_state();
        let function = begin_function(&mut state, reader.into(), DirectionKind::Input).unwrap();

        let mut monitor: Monitor = unsafe { std::mem::zeroed() };
        initialize_monitor(&mut state, &mut monitor, reader.into(), &function);

        assert!(!await_ready(&mut state, std::slice::from_mut(&mut monitor), 50));

        unsafe {
            libc::close(reader);
            libc::close(writer);
        }
    }
}
