//! Error types for submit-time failures.
//!
//! Transfer-time failures (a `read`/`write` returning an error, a
//! readiness primitive failing) are not modeled here: per §7 of the
//! spec they are normalized into the callback's `error` field rather
//! than propagated as a `Result`, exactly as the original engine never
//! aborts on an I/O error. This module only covers the synchronous,
//! submit-time half of the taxonomy: resource-allocation failure, which
//! is surfaced immediately and prevents the callback from ever firing.

use std::fmt;
use std::io;

/// Failure to submit an operation. Currently this can only originate
/// from the handle-event backend failing to allocate the overlapped
/// event handle a new [`crate::Engine::async_read`]/[`crate::Engine::async_write`]
/// needs; the poll and select backends have no submit-time failure mode
/// of their own and this type exists so adding one later isn't a
/// breaking change.
#[derive(Debug)]
pub struct SubmitError {
    source: io::Error,
}

impl SubmitError {
    pub(crate) fn new(source: io::Error) -> SubmitError {
        SubmitError { source }
    }
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to submit asynchronous operation: {}", self.source)
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

impl From<SubmitError> for io::Error {
    fn from(error: SubmitError) -> io::Error {
        error.source
    }
}
