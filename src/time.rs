//! Wall-clock and monotonic time helpers used by the alarm scheduler and
//! the drive loop.
//!
//! Alarms are scheduled against wall-clock time (a caller may ask for
//! "2025-01-01T00:00:00Z", which only makes sense relative to
//! [`SystemTime`]). Bounding how long [`crate::Engine::wait`] may run is a
//! monotonic-duration question instead, so it uses [`Instant`] and never
//! touches the wall clock. Mixing the two up is the kind of bug that only
//! shows up when the system clock steps backwards mid-wait.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock time split into whole seconds and microseconds, mirroring
/// the C engine's `struct timeval` so alarm arithmetic is exact rather
/// than routed through an opaque monotonic representation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct WallTime {
    secs: i64,
    micros: u32,
}

impl WallTime {
    /// The current wall-clock time.
    pub fn now() -> WallTime {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        WallTime {
            secs: since_epoch.as_secs() as i64,
            micros: since_epoch.subsec_micros(),
        }
    }

    /// Builds a `WallTime` from a seconds/microseconds pair, normalizing
    /// so that `0 <= micros < 1_000_000`.
    pub fn from_parts(secs: i64, micros: i64) -> WallTime {
        let mut time = WallTime { secs, micros: 0 };
        time.add_micros(micros);
        time
    }

    fn add_micros(&mut self, micros: i64) {
        let total = self.micros as i64 + micros;
        let carry = total.div_euclid(1_000_000);
        let remainder = total.rem_euclid(1_000_000);
        self.secs += carry;
        self.micros = remainder as u32;
    }

    /// Returns the time `millis` milliseconds after `self` (or before, for
    /// a negative value).
    pub fn plus_millis(mut self, millis: i64) -> WallTime {
        self.add_micros(millis * 1000);
        self
    }

    /// Milliseconds from `self` until `other`; negative if `other` is in
    /// the past relative to `self`.
    pub fn millis_until(self, other: WallTime) -> i64 {
        (other.secs - self.secs) * 1000 + (other.micros as i64 - self.micros as i64) / 1000
    }

    /// Whether `self` is due relative to `reference`, i.e. `self <= reference`.
    pub fn is_due(self, reference: WallTime) -> bool {
        self <= reference
    }
}

/// A simple monotonic stopwatch used to bound [`crate::Engine::wait`] to
/// its requested duration regardless of wall-clock adjustments.
pub(crate) struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    pub fn start() -> Stopwatch {
        Stopwatch { start: Instant::now() }
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::WallTime;

    #[test]
    fn normalizes_overflowing_micros() {
        let t = WallTime::from_parts(10, 1_500_000);
        assert_eq!(t, WallTime::from_parts(11, 500_000));
    }

    #[test]
    fn normalizes_negative_micros() {
        let t = WallTime::from_parts(10, -200_000);
        assert_eq!(t, WallTime::from_parts(9, 800_000));
    }

    #[test]
    fn plus_millis_round_trips() {
        let t = WallTime::from_parts(100, 0);
        let later = t.plus_millis(1_500);
        assert_eq!(t.millis_until(later), 1_500);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = WallTime::from_parts(5, 999_999);
        let b = WallTime::from_parts(6, 0);
        assert!(a < b);
    }
}
