// Aggregate counters - per-state job counts and overall byte totals
//
// Both halves live behind one lock so a state change is a single
// detach+attach and readers never see a job counted twice or not at all.

use crate::WipeState;
use serde::Serialize;
use std::sync::{Mutex, PoisonError};

/// Number of jobs currently in each state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateCounts {
    pub pending: usize,
    pub processing: usize,
    pub pausing: usize,
    pub finished: usize,
    pub canceled: usize,
    pub failed: usize,
    pub missing: usize,
    pub unknown: usize,
}

impl StateCounts {
    pub fn get(&self, state: WipeState) -> usize {
        match state {
            WipeState::Pending => self.pending,
            WipeState::Processing => self.processing,
            WipeState::Pausing => self.pausing,
            WipeState::Finished => self.finished,
            WipeState::Canceled => self.canceled,
            WipeState::Failed => self.failed,
            WipeState::Missing => self.missing,
            WipeState::Unknown => self.unknown,
        }
    }

    fn slot(&mut self, state: WipeState) -> &mut usize {
        match state {
            WipeState::Pending => &mut self.pending,
            WipeState::Processing => &mut self.processing,
            WipeState::Pausing => &mut self.pausing,
            WipeState::Finished => &mut self.finished,
            WipeState::Canceled => &mut self.canceled,
            WipeState::Failed => &mut self.failed,
            WipeState::Missing => &mut self.missing,
            WipeState::Unknown => &mut self.unknown,
        }
    }

    pub fn total(&self) -> usize {
        WipeState::ALL.iter().map(|s| self.get(*s)).sum()
    }

    /// Jobs that still keep the scheduler busy
    pub fn busy(&self) -> usize {
        self.pending + self.processing + self.pausing
    }

    pub fn is_idle(&self) -> bool {
        self.busy() == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ByteCounters {
    /// Sizes of all files still expected to be fully wiped
    pub total_file_size: u64,
    /// Sizes of files that finished
    pub wiped_file_size: u64,
    /// Bytes written for finished files, all passes and repeats included
    pub total_wiped_size: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub states: StateCounts,
    pub bytes: ByteCounters,
}

#[derive(Debug, Default)]
pub struct AggregateCounters {
    inner: Mutex<CounterSnapshot>,
}

impl AggregateCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F: FnOnce(&mut CounterSnapshot)>(&self, f: F) -> CounterSnapshot {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
        *guard
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count a newly submitted job. Its size joins the total unless it is
    /// already abandoned.
    pub fn attach(&self, state: WipeState, size: u64) -> CounterSnapshot {
        self.update(|c| {
            *c.states.slot(state) += 1;
            if !state.is_abandoned() {
                c.bytes.total_file_size += size;
            }
        })
    }

    /// Move one job from `from` to `to` in a single step
    pub fn transition(&self, from: WipeState, to: WipeState) -> CounterSnapshot {
        self.update(|c| {
            let slot = c.states.slot(from);
            debug_assert!(*slot > 0, "No job counted as {}", from);
            *slot = slot.saturating_sub(1);
            *c.states.slot(to) += 1;
        })
    }

    /// Apply a job's terminal outcome to the byte totals. Callers guarantee
    /// this runs once per job.
    pub fn settle(&self, terminal: WipeState, size: u64, written: u64) -> CounterSnapshot {
        self.update(|c| {
            if terminal == WipeState::Finished {
                c.bytes.wiped_file_size += size;
                c.bytes.total_wiped_size += written;
            } else if terminal.is_abandoned() {
                c.bytes.total_file_size = c.bytes.total_file_size.saturating_sub(size);
            }
        })
    }
}
