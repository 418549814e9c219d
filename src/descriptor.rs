//! The opaque OS handle type operations are registered against.

#[cfg(unix)]
use std::os::unix::io::{AsRawFd, RawFd};
#[cfg(windows)]
use std::os::windows::io::{AsRawHandle, RawHandle};

#[cfg(unix)]
pub(crate) type RawDescriptor = RawFd;
#[cfg(windows)]
pub(crate) type RawDescriptor = RawHandle;

/// A registered byte-stream endpoint: a Unix file descriptor or a Windows
/// handle. Comparable by equality, as the spec requires, and cheap to
/// copy around - the engine never owns the underlying resource, it only
/// ever borrows it for the lifetime of the registered operations.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Descriptor(RawDescriptor);

impl Descriptor {
    pub(crate) fn raw(self) -> RawDescriptor {
        self.0
    }
}

#[cfg(unix)]
impl From<RawFd> for Descriptor {
    fn from(raw: RawFd) -> Descriptor {
        Descriptor(raw)
    }
}

#[cfg(unix)]
impl<T: AsRawFd> From<&T> for Descriptor {
    fn from(source: &T) -> Descriptor {
        Descriptor(source.as_raw_fd())
    }
}

#[cfg(windows)]
impl From<RawHandle> for Descriptor {
    fn from(raw: RawHandle) -> Descriptor {
        Descriptor(raw)
    }
}

#[cfg(windows)]
impl<T: AsRawHandle> From<&T> for Descriptor {
    fn from(source: &T) -> Descriptor {
        Descriptor(source.as_raw_handle())
    }
}
