//! Per-descriptor operation queues and the entries inside them.

use std::io;

use crate::descriptor::Descriptor;
use crate::handle::Handle;
use crate::queue::Queue;
use crate::sys;
use crate::transfer::{Direction, DirectionKind, InputEvent, OutputEvent, TransferExtension};

/// One queued asynchronous request: the head of its [`FunctionEntry`]'s
/// queue is the only operation ever in flight (§4.4's at-most-one
/// invariant).
pub(crate) struct OperationEntry {
    pub(crate) handle: Handle,
    pub(crate) extension: TransferExtension,
    pub(crate) finished: bool,
    pub(crate) error: Option<io::Error>,
}

impl OperationEntry {
    pub(crate) fn new(handle: Handle, extension: TransferExtension) -> OperationEntry {
        OperationEntry { handle, extension, finished: false, error: None }
    }

    /// Runs the terminal callback and reports whether the operation
    /// should retire (`true`) or remain as head for another readiness
    /// cycle (`false`), per the re-drive rules in §4.5.
    pub(crate) fn invoke_callback(&mut self) -> bool {
        let error_ref = self.error.as_ref();
        let has_error = self.error.is_some();
        let TransferExtension { size, length, buffer, direction } = &mut self.extension;

        match direction {
            Direction::Input { callback, end } => {
                let consumed = {
                    let event = InputEvent {
                        buffer: &buffer[..*length],
                        size: *size,
                        length: *length,
                        error: error_ref,
                        end: *end,
                    };
                    callback(&event)
                }
                .min(*length);

                buffer.copy_within(consumed..*length, 0);
                *length -= consumed;

                has_error || *length == 0
            }
            Direction::Output { callback } => {
                let event = OutputEvent {
                    buffer: &buffer[..*size],
                    size: *size,
                    error: error_ref,
                    count: *length,
                };
                callback(&event);

                has_error || *length == *size
            }
        }
    }
}

/// The per-(descriptor, direction) record owning an operation FIFO plus
/// whatever state the active readiness backend needs to monitor it.
pub(crate) struct FunctionEntry {
    pub(crate) descriptor: Descriptor,
    pub(crate) kind: DirectionKind,
    pub(crate) operations: Queue<OperationEntry>,
    pub(crate) backend: sys::FunctionState,
}

impl FunctionEntry {
    pub(crate) fn new(descriptor: Descriptor, kind: DirectionKind, backend: sys::FunctionState) -> FunctionEntry {
        FunctionEntry { descriptor, kind, operations: Queue::new(), backend }
    }

    pub(crate) fn matches(&self, descriptor: Descriptor, kind: DirectionKind) -> bool {
        self.descriptor == descriptor && self.kind == kind
    }
}
