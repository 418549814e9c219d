//! Unix readiness backends: `poll(2)` by default, `select(2)` when the
//! `select-backend` feature is enabled. Mirrors the original engine's
//! `HAVE_SYS_POLL_H` fallback - some of the embedded targets this engine
//! ends up cross-compiled for either lack a working `poll` or have one
//! that misbehaves on character devices, so the choice is load-bearing
//! enough to keep as a real (if rarely touched) feature rather than
//! deleting the losing backend outright.

#[cfg(not(feature = "select-backend"))]
mod poll_backend;
#[cfg(not(feature = "select-backend"))]
pub(crate) use self::poll_backend::*;

#[cfg(feature = "select-backend")]
mod select_backend;
#[cfg(feature = "select-backend")]
pub(crate) use self::select_backend::*;

use std::io;

use crate::descriptor::Descriptor;
use crate::operation::OperationEntry;
use crate::transfer::{Direction, DirectionKind};

/// `read(2)`/`write(2)` on whichever descriptor just reported ready,
/// and the bookkeeping shared by both Unix backends once the syscall
/// returns. Neither backend special-cases `EAGAIN`/`EWOULDBLOCK` here,
/// matching the original's `finishUnixRead`/`finishUnixWrite`/
/// `setUnixTransferResult`, which record it as an ordinary error rather
/// than treating it as a spurious wake - a transfer-level surprise is
/// the readiness backend's problem to avoid, not this layer's to paper
/// over.
pub(crate) fn unix_finish_operation(descriptor: Descriptor, kind: DirectionKind, operation: &mut OperationEntry) {
    let fd = descriptor.raw();
    let slice = operation.extension.remaining_mut();

    let result: isize = unsafe {
        match kind {
            DirectionKind::Input => libc::read(fd, slice.as_mut_ptr() as *mut libc::c_void, slice.len()) as isize,
            DirectionKind::Output => libc::write(fd, slice.as_ptr() as *const libc::c_void, slice.len()) as isize,
        }
    };

    if result < 0 {
        operation.error = Some(io::Error::last_os_error());
    } else if result == 0 {
        if let Direction::Input { end, .. } = &mut operation.extension.direction {
            *end = true;
        }
    } else {
        operation.extension.length += result as usize;
    }

    operation.finished = true;
}
