//! The read/write transfer state machine shared by both directions.
//!
//! A single [`TransferExtension`] carries the buffer and bookkeeping for
//! either a read or a write. Direction-specific behavior (what the
//! callback sees, whether end-of-stream is tracked) lives in the
//! [`Direction`] enum rather than in a pair of near-duplicate structs
//! (the Rust replacement for the original's vtable-selected union -
//! Design Note 1: the vtable and the variant always agree by
//! construction, since `async_read` and `async_write` are each hard-wired
//! to build exactly one variant).

/// Which half of a [`TransferExtension`] is live, matching which of
/// [`crate::Engine::async_read`] or [`crate::Engine::async_write`] created it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub(crate) enum DirectionKind {
    Input,
    Output,
}

pub(crate) type InputCallback = Box<dyn FnMut(&InputEvent) -> usize>;
pub(crate) type OutputCallback = Box<dyn FnMut(&OutputEvent)>;

pub(crate) enum Direction {
    Input { callback: InputCallback, end: bool },
    Output { callback: OutputCallback },
}

impl Direction {
    pub(crate) fn kind(&self) -> DirectionKind {
        match self {
            Direction::Input { .. } => DirectionKind::Input,
            Direction::Output { .. } => DirectionKind::Output,
        }
    }
}

/// What an input (read) callback sees.
pub struct InputEvent<'a> {
    /// The bytes read so far and not yet consumed: `buffer[..length]`.
    pub buffer: &'a [u8],
    /// The capacity the operation was submitted with.
    pub size: usize,
    /// How many leading bytes of `buffer` are valid.
    pub length: usize,
    /// Set if the underlying `read` failed; the operation retires either way.
    pub error: Option<&'a std::io::Error>,
    /// Set once the descriptor has reached end-of-stream.
    pub end: bool,
}

/// What an output (write) callback sees.
pub struct OutputEvent<'a> {
    /// The full buffer that was submitted for writing.
    pub buffer: &'a [u8],
    /// The capacity (and original length) of `buffer`.
    pub size: usize,
    /// Set if the underlying `write` failed; the operation retires either way.
    pub error: Option<&'a std::io::Error>,
    /// How many bytes have been written so far.
    pub count: usize,
}

pub(crate) struct TransferExtension {
    pub(crate) size: usize,
    pub(crate) length: usize,
    pub(crate) buffer: Vec<u8>,
    pub(crate) direction: Direction,
}

impl TransferExtension {
    pub(crate) fn new_input(size: usize, callback: InputCallback) -> TransferExtension {
        TransferExtension {
            size,
            length: 0,
            buffer: vec![0u8; size],
            direction: Direction::Input { callback, end: false },
        }
    }

    pub(crate) fn new_output(data: &[u8], callback: OutputCallback) -> TransferExtension {
        TransferExtension {
            size: data.len(),
            length: 0,
            buffer: data.to_vec(),
            direction: Direction::Output { callback },
        }
    }

    /// The window `finish_operation` should read into (input) or write
    /// from (output): always `buffer[length..size]`.
    pub(crate) fn remaining_mut(&mut self) -> &mut [u8] {
        let length = self.length;
        let size = self.size;
        &mut self.buffer[length..size]
    }
}
