//! The multiplexer: a function registry, an alarm queue, and the
//! `wait` drive loop that ties them to a single readiness backend.

use std::io;

use crate::alarm::{new_alarm_queue, AlarmEntry};
use crate::descriptor::Descriptor;
use crate::error::SubmitError;
use crate::handle::{Handle, HandleAllocator};
use crate::operation::{FunctionEntry, OperationEntry};
use crate::queue::Queue;
use crate::sys;
use crate::time::{Stopwatch, WallTime};
use crate::transfer::{DirectionKind, InputCallback, InputEvent, OutputCallback, OutputEvent, TransferExtension};

/// Owns every pending operation and alarm for one multiplexer instance.
///
/// `Engine` is deliberately not process-wide state (Design Note 3): the
/// original C engine kept its function table and alarm list in file-scope
/// statics, which makes two independent event loops in the same process
/// impossible. Threading an `Engine` explicitly costs a parameter on every
/// call; [`crate::global`] trades that back for convenience when a caller
/// only ever wants one multiplexer per thread.
///
/// Neither `Send` nor `Sync`: every callback captured in a submitted
/// operation runs on whatever thread calls [`Engine::wait`], and the
/// backend state (an overlapped-I/O event handle, a `select` bitmask) is
/// only ever touched from that one thread.
pub struct Engine {
    functions: Queue<FunctionEntry>,
    alarms: Queue<AlarmEntry>,
    handles: HandleAllocator,
    backend: sys::BackendState,
}

impl Engine {
    /// Builds an empty multiplexer: no registered descriptors, no
    /// pending alarms.
    pub fn new() -> Engine {
        Engine {
            functions: Queue::new(),
            alarms: new_alarm_queue(),
            handles: HandleAllocator::default(),
            backend: sys::new_backend_state(),
        }
    }

    /// Submits an asynchronous read. `callback` is invoked with up to
    /// `size` bytes each time the descriptor has data (or has reached
    /// end-of-stream, or has failed); per §4.5 it retires the operation
    /// whenever it consumes everything offered and the descriptor isn't
    /// already at end-of-stream, and unconditionally on error or EOF.
    pub fn async_read<D, F>(&mut self, descriptor: D, size: usize, callback: F) -> Result<Handle, SubmitError>
    where
        D: Into<Descriptor>,
        F: FnMut(&InputEvent) -> usize + 'static,
    {
        let extension = TransferExtension::new_input(size, Box::new(callback) as InputCallback);
        self.submit(descriptor.into(), DirectionKind::Input, extension)
    }

    /// Submits an asynchronous write of the full contents of `data`.
    /// `callback` is invoked once the write completes (fully, partially
    /// with more to come, or with an error); per §4.5 the operation
    /// retires once every byte has been written, or on error.
    pub fn async_write<D, F>(&mut self, descriptor: D, data: &[u8], callback: F) -> Result<Handle, SubmitError>
    where
        D: Into<Descriptor>,
        F: FnMut(&OutputEvent) + 'static,
    {
        let extension = TransferExtension::new_output(data, Box::new(callback) as OutputCallback);
        self.submit(descriptor.into(), DirectionKind::Output, extension)
    }

    /// Schedules `callback` to run once, the first time [`Engine::wait`]
    /// is called at or after `time`.
    pub fn async_absolute_alarm<F>(&mut self, time: WallTime, callback: F) -> Handle
    where
        F: FnMut() + 'static,
    {
        let handle = self.handles.allocate();
        self.alarms.push_back(AlarmEntry { handle, time, callback: Box::new(callback) });
        handle
    }

    /// Schedules `callback` to run once, no sooner than `millis`
    /// milliseconds from now. Delegates to [`Engine::async_absolute_alarm`]
    /// after resolving `millis` against [`WallTime::now`].
    pub fn async_relative_alarm<F>(&mut self, millis: i64, callback: F) -> Handle
    where
        F: FnMut() + 'static,
    {
        self.async_absolute_alarm(WallTime::now().plus_millis(millis), callback)
    }

    /// Cancels a still-pending operation or alarm without invoking its
    /// callback. Returns `false` if `handle` has already fired, already
    /// retired, or was never valid - cancellation is a best-effort race
    /// against the drive loop, not a guarantee.
    ///
    /// Cancelling the head of a `FunctionEntry`'s queue is treated the
    /// same as normal retirement (§4.8): the new head, if any, has
    /// `start_operation` invoked on it immediately.
    pub fn async_cancel(&mut self, handle: Handle) -> bool {
        if let Some(index) = self.alarms.position(|entry| entry.handle == handle) {
            self.alarms.remove_at(index);
            return true;
        }

        for function_index in 0..self.functions.len() {
            let function = self.functions.get_mut(function_index).expect("index in range");
            let operation_index = match function.operations.position(|op| op.handle == handle) {
                Some(index) => index,
                None => continue,
            };

            let was_head = operation_index == 0;
            function.operations.remove_at(operation_index);

            if was_head {
                let function = self.functions.get_mut(function_index).expect("index in range");
                if function.operations.is_empty() {
                    sys::end_function(&mut self.backend, &mut function.backend);
                    self.functions.remove_at(function_index);
                } else {
                    self.start_head(function_index);
                }
            }

            return true;
        }

        false
    }

    fn submit(&mut self, descriptor: Descriptor, kind: DirectionKind, extension: TransferExtension) -> Result<Handle, SubmitError> {
        let function_index = match self.functions.position(|f| f.matches(descriptor, kind)) {
            Some(index) => index,
            None => {
                let backend = sys::begin_function(&mut self.backend, descriptor, kind).map_err(SubmitError::new)?;
                self.functions.push_back(FunctionEntry::new(descriptor, kind, backend));
                self.functions.len() - 1
            }
        };

        let handle = self.handles.allocate();
        let becomes_head = self.functions.get_mut(function_index).expect("index in range").operations.is_empty();
        self.functions
            .get_mut(function_index)
            .expect("index in range")
            .operations
            .push_back(OperationEntry::new(handle, extension));

        if becomes_head {
            self.start_head(function_index);
        }

        Ok(handle)
    }

    fn start_head(&mut self, function_index: usize) {
        let function = self.functions.get_mut(function_index).expect("index in range");
        let descriptor = function.descriptor;
        let kind = function.kind;
        if let Some(operation) = function.operations.front_mut() {
            sys::start_operation(&mut self.backend, descriptor, kind, &mut function.backend, operation);
        }
    }

    /// Fires every alarm due at or before `reference`, earliest first,
    /// popping each one before invoking its callback so a callback that
    /// schedules a new alarm can't be seen by this same pass.
    fn fire_due_alarms(&mut self, reference: WallTime) {
        loop {
            let due = match self.alarms.front() {
                Some(entry) => entry.time.is_due(reference),
                None => false,
            };
            if !due {
                break;
            }
            let mut entry = self.alarms.pop_front().expect("front() returned Some");
            (entry.callback)();
        }
    }

    /// Runs the multiplexer for up to `duration_ms` milliseconds,
    /// servicing alarms and I/O as they become ready. Returns once
    /// `duration_ms` has elapsed; a `duration_ms` of `0` polls once
    /// without blocking, and a negative value blocks indefinitely until
    /// something happens.
    ///
    /// Structured as a do-while, matching the reference engine's
    /// `do { ... } while (elapsed < duration)`: the body below always
    /// runs once before the elapsed check, so `wait(0)` still services
    /// one due alarm or dispatches one ready descriptor instead of
    /// returning without having done anything.
    ///
    /// Per iteration: fire every due alarm, then build the backend's
    /// monitor array from every non-finished head (stopping early if a
    /// head already completed synchronously, e.g. a Windows overlapped
    /// read that finished immediately), then block in the backend for
    /// whatever time remains (a negative `duration_ms` is threaded
    /// through to the backend as an infinite timeout rather than
    /// clamped to zero), then dispatch exactly one ready
    /// `FunctionEntry`, retiring or re-driving its head and always
    /// issuing `start_operation` on whichever operation is now the head,
    /// matching the reference engine's unconditional per-iteration call.
    pub fn wait(&mut self, duration_ms: i64) -> io::Result<()> {
        let stopwatch = Stopwatch::start();

        loop {
            self.fire_due_alarms(WallTime::now());

            let remaining = if duration_ms < 0 { -1 } else { (duration_ms - stopwatch.elapsed_ms()).max(0) };
            let timeout_ms = match self.alarms.front() {
                Some(entry) => {
                    let until_alarm = WallTime::now().millis_until(entry.time).max(0);
                    if remaining < 0 {
                        until_alarm
                    } else {
                        remaining.min(until_alarm)
                    }
                }
                None => remaining,
            };

            self.dispatch_one(timeout_ms);

            if duration_ms >= 0 && stopwatch.elapsed_ms() >= duration_ms {
                return Ok(());
            }
        }
    }

    /// One readiness cycle: build the monitor array, block for up to
    /// `timeout_ms`, and dispatch at most one ready function. Returns
    /// `true` if a function was dispatched.
    fn dispatch_one(&mut self, timeout_ms: i64) -> bool {
        sys::prepare(&mut self.backend);

        let mut monitors = Vec::with_capacity(self.functions.len());
        let mut monitor_indices = Vec::with_capacity(self.functions.len());
        let mut synchronous_index = None;

        for index in 0..self.functions.len() {
            let function = self.functions.get_mut(index).expect("index in range");
            let finished = match function.operations.front() {
                Some(operation) => operation.finished,
                None => continue,
            };
            if finished {
                synchronous_index = Some(index);
                break;
            }

            let mut monitor = unsafe { std::mem::zeroed() };
            sys::initialize_monitor(&mut self.backend, &mut monitor, function.descriptor, &function.backend);
            monitors.push(monitor);
            monitor_indices.push(index);
        }

        let dispatch_index = match synchronous_index {
            Some(index) => Some(index),
            None => {
                if !sys::await_ready(&mut self.backend, &mut monitors, timeout_ms) {
                    return false;
                }
                monitor_indices
                    .into_iter()
                    .zip(monitors.iter())
                    .find(|(_, monitor)| sys::test_monitor(&self.backend, monitor))
                    .map(|(index, _)| index)
            }
        };

        let Some(index) = dispatch_index else { return false };
        self.dispatch(index);
        true
    }

    /// Finishes the head operation of `self.functions[index]`'s transfer,
    /// invokes its callback, retires or re-drives it, moves the function
    /// to the tail of the registry for round-robin fairness, and issues
    /// `start_operation` on whatever is now the head.
    fn dispatch(&mut self, index: usize) {
        {
            let function = self.functions.get_mut(index).expect("index in range");
            let descriptor = function.descriptor;
            let kind = function.kind;
            if let Some(operation) = function.operations.front_mut() {
                if !operation.finished {
                    sys::finish_operation(descriptor, kind, &mut function.backend, operation);
                }
            }
        }

        let retire = {
            let function = self.functions.get_mut(index).expect("index in range");
            match function.operations.front_mut() {
                Some(operation) => {
                    let retire = operation.invoke_callback();
                    operation.finished = false;
                    retire
                }
                None => false,
            }
        };

        if retire {
            let function = self.functions.get_mut(index).expect("index in range");
            function.operations.pop_front();
        }

        self.functions.move_to_back(index);
        let new_index = self.functions.len() - 1;
        let function = self.functions.get_mut(new_index).expect("index in range");
        if function.operations.is_empty() {
            sys::end_function(&mut self.backend, &mut function.backend);
            self.functions.remove_at(new_index);
        } else {
            self.start_head(new_index);
        }
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}
