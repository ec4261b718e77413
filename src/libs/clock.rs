//! Time sources for the break core.
//!
//! Timers measure intervals on a monotonic clock and evaluate reset rules on
//! the wall clock. Both readings come from a [`Clock`], which is either the
//! real system clock or a [`SimulatedTime`] that tests advance by hand.

use chrono::{FixedOffset, Local, Offset, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

const MICROS_PER_SEC: i64 = 1_000_000;

/// Shared handle to a time source.
///
/// Cloning is cheap; every component of one scheduler must share clones of
/// the same clock so that their readings agree.
#[derive(Clone, Debug)]
pub struct Clock {
    source: Source,
}

#[derive(Clone, Debug)]
enum Source {
    System,
    Simulated(Arc<SimulatedTime>),
}

impl Clock {
    pub fn system() -> Self {
        PROCESS_START.get_or_init(Instant::now);
        Self { source: Source::System }
    }

    pub fn simulated(time: Arc<SimulatedTime>) -> Self {
        Self {
            source: Source::Simulated(time),
        }
    }

    /// Monotonic time in microseconds. Only differences are meaningful.
    pub fn monotonic_micros(&self) -> i64 {
        match &self.source {
            Source::System => {
                let start = PROCESS_START.get_or_init(Instant::now);
                start.elapsed().as_micros() as i64
            }
            Source::Simulated(time) => time.monotonic_micros.load(Ordering::SeqCst),
        }
    }

    /// Monotonic time in whole seconds.
    pub fn monotonic_secs(&self) -> i64 {
        self.monotonic_micros() / MICROS_PER_SEC
    }

    /// Wall-clock time as seconds since the Unix epoch.
    pub fn real_secs(&self) -> i64 {
        match &self.source {
            Source::System => Utc::now().timestamp(),
            Source::Simulated(time) => time.real_base_secs + time.monotonic_micros.load(Ordering::SeqCst) / MICROS_PER_SEC,
        }
    }

    /// Local UTC offset in effect at the given wall-clock instant.
    pub fn local_offset(&self, at_secs: i64) -> FixedOffset {
        match &self.source {
            Source::System => match Local.timestamp_opt(at_secs, 0).earliest() {
                Some(local) => local.offset().fix(),
                None => Utc.fix(),
            },
            Source::Simulated(time) => time.offset,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

/// Manually driven time for tests and replays.
///
/// The wall clock moves in lockstep with the monotonic clock, starting at
/// `real_base_secs` when the monotonic reading is zero.
#[derive(Debug)]
pub struct SimulatedTime {
    monotonic_micros: AtomicI64,
    real_base_secs: i64,
    offset: FixedOffset,
}

impl SimulatedTime {
    pub fn new(real_start_secs: i64) -> Arc<Self> {
        Self::with_offset(real_start_secs, Utc.fix())
    }

    pub fn with_offset(real_start_secs: i64, offset: FixedOffset) -> Arc<Self> {
        Arc::new(Self {
            monotonic_micros: AtomicI64::new(0),
            real_base_secs: real_start_secs,
            offset,
        })
    }

    pub fn advance_secs(&self, secs: i64) {
        self.monotonic_micros.fetch_add(secs * MICROS_PER_SEC, Ordering::SeqCst);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.monotonic_micros.fetch_add(millis * 1000, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_clock_moves_both_readings() {
        let time = SimulatedTime::new(1_700_000_000);
        let clock = Clock::simulated(time.clone());
        assert_eq!(clock.monotonic_secs(), 0);
        assert_eq!(clock.real_secs(), 1_700_000_000);

        time.advance_secs(90);
        time.advance_millis(500);
        assert_eq!(clock.monotonic_secs(), 90);
        assert_eq!(clock.monotonic_micros(), 90_500_000);
        assert_eq!(clock.real_secs(), 1_700_000_090);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = Clock::system();
        let first = clock.monotonic_micros();
        let second = clock.monotonic_micros();
        assert!(second >= first);
    }
}
