//! Overlapped-I/O readiness backend for Windows. Each pending operation
//! owns an auto-reset event and an `OVERLAPPED` it's embedded in;
//! `start_operation` issues the `ReadFile`/`WriteFile` immediately
//! (instead of waiting for a separate readiness notification the way
//! `poll`/`select` do), and the event becomes signaled when the
//! operation completes. Grounded in the original's
//! `allocateWindowsResources` / `setWindowsTransferResult` /
//! `beginWindowsFunction` / `startWindowsRead` / `startWindowsWrite` /
//! `finishWindowsTransferOperation`.

use std::io;
use std::ptr;

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_BROKEN_PIPE, ERROR_HANDLE_EOF, ERROR_IO_PENDING, FALSE, HANDLE, TRUE, WAIT_FAILED, WAIT_OBJECT_0,
};
use windows_sys::Win32::Storage::FileSystem::{ReadFile, WriteFile};
use windows_sys::Win32::System::Threading::{CreateEventW, WaitForMultipleObjects, WaitForSingleObject, INFINITE};
use windows_sys::Win32::System::IO::{GetOverlappedResult, OVERLAPPED};

use crate::descriptor::Descriptor;
use crate::operation::OperationEntry;
use crate::transfer::{Direction, DirectionKind};

pub(crate) struct BackendState;

/// Owns the `OVERLAPPED` a pending transfer was issued with and the
/// event handle it signals on completion. Boxed so the `OVERLAPPED`'s
/// address is stable across moves of the owning [`crate::operation::FunctionEntry`]
/// (the kernel holds a pointer to it for the lifetime of the I/O).
pub(crate) struct FunctionState {
    overlapped: Box<OVERLAPPED>,
    event: HANDLE,
}

impl FunctionState {
    /// Allocates the auto-reset event a registered (descriptor, direction)
    /// pair will signal on every completed transfer. Allocated once per
    /// function, up front, so a resource-exhaustion failure surfaces at
    /// submit time (as a [`crate::error::SubmitError`]) rather than being
    /// silently swallowed the first time an operation becomes head.
    fn new() -> io::Result<FunctionState> {
        let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { std::mem::zeroed() });

        let handle = unsafe { CreateEventW(ptr::null(), TRUE, FALSE, ptr::null()) };
        if handle == 0 {
            return Err(io::Error::last_os_error());
        }
        overlapped.hEvent = handle;

        Ok(FunctionState { overlapped, event: handle })
    }
}

impl Drop for FunctionState {
    fn drop(&mut self) {
        if self.event != 0 {
            unsafe {
                CloseHandle(self.event);
            }
        }
    }
}

pub(crate) type Monitor = HANDLE;

pub(crate) fn new_backend_state() -> BackendState {
    BackendState
}

pub(crate) fn begin_function(_state: &mut BackendState, _descriptor: Descriptor, _kind: DirectionKind) -> io::Result<FunctionState> {
    FunctionState::new()
}

pub(crate) fn end_function(_state: &mut BackendState, _function: &mut FunctionState) {}

/// Issues the `ReadFile`/`WriteFile` right away; `poll`/`select` defer
/// the syscall to `finish_operation` once told the descriptor is
/// ready, but overlapped I/O has no separate readiness step to wait
/// for - the event itself *is* the readiness notification.
pub(crate) fn start_operation(
    _state: &mut BackendState,
    descriptor: Descriptor,
    kind: DirectionKind,
    function: &mut FunctionState,
    operation: &mut OperationEntry,
) {
    let handle = descriptor.raw() as HANDLE;
    let slice = operation.extension.remaining_mut();
    let mut transferred: u32 = 0;

    let success = unsafe {
        match kind {
            DirectionKind::Input => ReadFile(handle, slice.as_mut_ptr(), slice.len() as u32, &mut transferred, function.overlapped.as_mut()),
            DirectionKind::Output => WriteFile(handle, slice.as_ptr(), slice.len() as u32, &mut transferred, function.overlapped.as_mut()),
        }
    };

    apply_transfer_result(operation, success != 0, transferred);
}

pub(crate) fn finish_operation(
    descriptor: Descriptor,
    _kind: DirectionKind,
    function: &mut FunctionState,
    operation: &mut OperationEntry,
) {
    let handle = descriptor.raw() as HANDLE;
    let mut transferred: u32 = 0;

    let success = unsafe { GetOverlappedResult(handle, function.overlapped.as_ref(), &mut transferred, FALSE) };

    apply_transfer_result(operation, success != 0, transferred);
}

/// Normalizes a `ReadFile`/`WriteFile`/`GetOverlappedResult` outcome
/// into the operation's length/end/error fields. `ERROR_IO_PENDING`
/// leaves the operation unfinished (it's still in flight, not a
/// failure); `ERROR_HANDLE_EOF`/`ERROR_BROKEN_PIPE` are end-of-stream,
/// not errors, matching `setWindowsTransferResult`.
fn apply_transfer_result(operation: &mut OperationEntry, success: bool, transferred: u32) {
    if success {
        operation.extension.length += transferred as usize;
        operation.finished = true;
        return;
    }

    let error = unsafe { GetLastError() };

    if error == ERROR_IO_PENDING {
        return;
    }

    if error == ERROR_HANDLE_EOF || error == ERROR_BROKEN_PIPE {
        if let Direction::Input { end, .. } = &mut operation.extension.direction {
            *end = true;
        }
    } else {
        operation.error = Some(io::Error::from_raw_os_error(error as i32));
    }

    operation.finished = true;
}

pub(crate) fn prepare(_state: &mut BackendState) {}

pub(crate) fn initialize_monitor(_state: &mut BackendState, monitor: &mut Monitor, _descriptor: Descriptor, function: &FunctionState) {
    *monitor = function.event;
}

/// An empty monitor array means no operation is in flight; there's
/// nothing for `WaitForMultipleObjects` to wait on, so fall back to a
/// plain sleep for the timeout, same as the poll/select backends'
/// zero-fd case. A negative `timeout_ms` (block indefinitely) has no
/// finite sleep to fall back to, so it sleeps in a very long chunk
/// rather than `max(0)`-clamping to an immediate return, which would
/// busy-loop the caller at 100% CPU instead of idling.
pub(crate) fn await_ready(_state: &mut BackendState, monitors: &mut [Monitor], timeout_ms: i64) -> bool {
    if monitors.is_empty() {
        let millis = if timeout_ms < 0 { u64::MAX } else { timeout_ms as u64 };
        std::thread::sleep(std::time::Duration::from_millis(millis));
        return false;
    }

    let timeout = if timeout_ms < 0 { INFINITE } else { timeout_ms as u32 };

    let result = unsafe { WaitForMultipleObjects(monitors.len() as u32, monitors.as_ptr(), FALSE, timeout) };

    if result >= WAIT_OBJECT_0 && result < WAIT_OBJECT_0 + monitors.len() as u32 {
        return true;
    }

    if result == WAIT_FAILED {
        crate::backend_warn!("WaitForMultipleObjects failed: {}", io::Error::last_os_error());
    }

    false
}

pub(crate) fn test_monitor(_state: &BackendState, monitor: &Monitor) -> bool {
    unsafe { WaitForSingleObject(*monitor, 0) == WAIT_OBJECT_0 }
}
