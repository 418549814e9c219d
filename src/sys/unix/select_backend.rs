//! `select(2)`-based readiness backend, enabled by the `select-backend`
//! feature for targets without a usable `poll(2)`.
//!
//! Unlike the original's file-scope `fd_set` statics, the read/write
//! bitmasks live inside [`BackendState`], which the engine owns - an
//! extension of Design Note 3's "no process-wide globals" to the
//! backend layer.

use std::io;
use std::mem::MaybeUninit;
use std::ptr;

use crate::descriptor::Descriptor;
use crate::operation::OperationEntry;
use crate::transfer::DirectionKind;

use super::unix_finish_operation;

pub(crate) struct BackendState {
    read_fds: libc::fd_set,
    write_fds: libc::fd_set,
    has_read: bool,
    has_write: bool,
    max_fd: libc::c_int,
}

pub(crate) struct FunctionState {
    is_write: bool,
}

pub(crate) struct Monitor {
    fd: libc::c_int,
    is_write: bool,
}

pub(crate) fn new_backend_state() -> BackendState {
    let mut state = BackendState {
        read_fds: unsafe { MaybeUninit::zeroed().assume_init() },
        write_fds: unsafe { MaybeUninit::zeroed().assume_init() },
        has_read: false,
        has_write: false,
        max_fd: 0,
    };
    prepare(&mut state);
    state
}

pub(crate) fn begin_function(_state: &mut BackendState, _descriptor: Descriptor, kind: DirectionKind) -> io::Result<FunctionState> {
    Ok(FunctionState { is_write: kind == DirectionKind::Output })
}

pub(crate) fn end_function(_state: &mut BackendState, _function: &mut FunctionState) {}

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

/// Clears both bitmasks ahead of rebuilding them from the current set
/// of non-finished heads, matching `asyncWait`'s per-iteration
/// `FD_ZERO` calls.
pub(crate) fn prepare(state: &mut BackendState) {
    unsafe {
        libc::FD_ZERO(&mut state.read_fds);
        libc::FD_ZERO(&mut state.write_fds);
    }
    state.has_read = false;
    state.has_write = false;
    state.max_fd = 0;
}

pub(crate) fn initialize_monitor(state: &mut BackendState, monitor: &mut Monitor, descriptor: Descriptor, function: &FunctionState) {
    let fd = descriptor.raw();

    unsafe {
        if function.is_write {
            libc::FD_SET(fd, &mut state.write_fds);
            state.has_write = true;
        } else {
            libc::FD_SET(fd, &mut state.read_fds);
            state.has_read = true;
        }
    }

    if fd >= state.max_fd {
        state.max_fd = fd + 1;
    }

    *monitor = Monitor { fd, is_write: function.is_write };
}

/// Blocks in `select(2)` for at most `timeout_ms`, or indefinitely when
/// `timeout_ms` is negative - `select` treats a `NULL` timeout pointer
/// as "block until something's ready", so a negative duration skips
/// building a `timeval` at all rather than clamping to a `{0, 0}` one
/// that would make this a non-blocking poll.
pub(crate) fn await_ready(state: &mut BackendState, monitors: &mut [Monitor], timeout_ms: i64) -> bool {
    let _ = monitors;

    let mut timeout = libc::timeval {
        tv_sec: (timeout_ms.max(0) / 1000) as libc::time_t,
        tv_usec: ((timeout_ms.max(0) % 1000) * 1000) as libc::suseconds_t,
    };
    let timeout_ptr: *mut libc::timeval = if timeout_ms < 0 { ptr::null_mut() } else { &mut timeout };

    let read_ptr = if state.has_read { &mut state.read_fds as *mut _ } else { ptr::null_mut() };
    let write_ptr = if state.has_write { &mut state.write_fds as *mut _ } else { ptr::null_mut() };

    let result = unsafe { libc::select(state.max_fd, read_ptr, write_ptr, ptr::null_mut(), timeout_ptr) };

    if result > 0 {
        return true;
    }

    if result < 0 {
        let error = io::Error::last_os_error();
        if error.kind() != io::ErrorKind::Interrupted {
            crate::backend_warn!("select failed: {error}");
        }
    }

    false
}

pub(crate) fn test_monitor(state: &BackendState, monitor: &Monitor) -> bool {
    unsafe {
        if monitor.is_write {
            libc::FD_ISSET(monitor.fd, &state.write_fds)
        } else {
            libc::FD_ISSET(monitor.fd, &state.read_fds)
        }
    }
}
