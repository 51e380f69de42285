//! Per-line elapsed time accumulation
//!
//! The accumulator keeps lines in the order they first received time, which is
//! the order the report prints them in.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::location::LineId;

/// Source of monotonic timestamps for a session
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Useful for exercising attribution without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    /// Total time the clock has been advanced
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Cumulative elapsed time per line, in first-seen order
#[derive(Debug, Default, Clone)]
pub struct TimingAccumulator {
    entries: Vec<(LineId, Duration)>,
    index: HashMap<LineId, usize>,
}

impl TimingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` to the running total for `id`, creating the entry if absent
    pub fn add(&mut self, id: &LineId, elapsed: Duration) {
        match self.index.get(id) {
            Some(&slot) => self.entries[slot].1 += elapsed,
            None => {
                self.index.insert(id.clone(), self.entries.len());
                self.entries.push((id.clone(), elapsed));
            }
        }
    }

    /// Accumulated time for `id`, if any was attributed
    pub fn get(&self, id: &LineId) -> Option<Duration> {
        self.index.get(id).map(|&slot| self.entries[slot].1)
    }

    /// Sum of all accumulated time
    pub fn total(&self) -> Duration {
        self.entries.iter().map(|(_, elapsed)| *elapsed).sum()
    }

    /// Entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&LineId, Duration)> {
        self.entries.iter().map(|(id, elapsed)| (id, *elapsed))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}
