//! Wall-clock time source for the timer engine.
//!
//! The engine never reads the system clock on its own. Commands that need to
//! stamp `last_tick_epoch` ask the injected [`TimeSource`], and ticks receive
//! `now` explicitly from the host scheduler, so every transition can be
//! replayed in tests with a [`ManualTimeSource`].

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Unix epoch seconds (UTC).
///
/// Local wall-clock strings are never stored, so elapsed-time arithmetic is
/// unaffected by timezone or DST changes.
pub type Timestamp = i64;

/// Provides the current instant.
pub trait TimeSource: Send + Sync {
    /// Returns the current Unix epoch second.
    fn now(&self) -> Timestamp;
}

/// Reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp()
    }
}

/// A settable clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: AtomicI64,
}

impl ManualTimeSource {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Moves the clock to an absolute instant.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Moves the clock forward and returns the new instant.
    pub fn advance(&self, seconds: i64) -> Timestamp {
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
