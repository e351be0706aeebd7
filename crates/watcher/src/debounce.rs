//! Coalescing queue with a debounced flush
//!
//! Each queue is a small state machine: `Idle` until the first event after a
//! flush arrives, then `Pending(deadline)` until the flush drains it. Events
//! arriving while pending only join the batch, so a burst produces exactly
//! one flush per quiet interval.

use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;

/// Flush scheduling state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    Pending { deadline: Instant },
}

/// Pending paths plus their flush state
#[derive(Debug)]
pub struct CoalescingQueue {
    pending: Vec<PathBuf>,
    state: FlushState,
    interval: Duration,
}

impl CoalescingQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            pending: Vec::new(),
            state: FlushState::Idle,
            interval,
        }
    }

    /// Add a path
    ///
    /// Returns the deadline of a newly requested flush, or `None` if one is
    /// already pending and the path just joins it.
    pub fn enqueue(&mut self, path: PathBuf, now: Instant) -> Option<Instant> {
        self.pending.push(path);
        match self.state {
            FlushState::Pending { .. } => None,
            FlushState::Idle => {
                let deadline = now + self.interval;
                self.state = FlushState::Pending { deadline };
                Some(deadline)
            }
        }
    }

    /// Take everything queued so far and go back to idle
    ///
    /// The swap happens under the caller's lock, so no path enqueued
    /// concurrently can fall between the read and the clear.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        self.state = FlushState::Idle;
        prepare_batch(std::mem::take(&mut self.pending))
    }

    /// Drain only if `deadline` is the flush currently pending
    ///
    /// A timer whose cycle was already drained (manual flush) finds a
    /// different state and does nothing.
    pub fn drain_due(&mut self, deadline: Instant) -> Option<Vec<PathBuf>> {
        match self.state {
            FlushState::Pending { deadline: pending } if pending == deadline => Some(self.drain()),
            _ => None,
        }
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Sort lexicographically and collapse duplicates
pub fn prepare_batch(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    paths.dedup();
    paths
}
