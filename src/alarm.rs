//! One-shot, absolute-time alarms.

use crate::handle::Handle;
use crate::queue::Queue;
use crate::time::WallTime;

pub(crate) type AlarmCallback = Box<dyn FnMut()>;

pub(crate) struct AlarmEntry {
    pub(crate) handle: Handle,
    pub(crate) time: WallTime,
    pub(crate) callback: AlarmCallback,
}

/// Builds the earliest-first priority queue used for pending alarms.
/// Comparator treats `(sec, usec)` lexicographically, matching the
/// original's `compareAlarmEntries`.
pub(crate) fn new_alarm_queue() -> Queue<AlarmEntry> {
    Queue::with_comparator(|a: &AlarmEntry, b: &AlarmEntry| a.time.cmp(&b.time))
}
