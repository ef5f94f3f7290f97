// Allow complex types where needed for observer registration and shared state
#![allow(clippy::type_complexity)]

pub mod algorithms;
pub mod cleaner;
pub mod counters;
pub mod crypto;
pub mod diagnostics;
pub mod error;
pub mod job;
pub mod relaunch;
pub mod renamer;
pub mod scheduler;
pub mod settings;
pub mod ui;

// Re-export the main scheduler surface for convenience
pub use algorithms::{AlgorithmKind, AlgorithmSelection, OverwritePattern};
pub use cleaner::{CleanReport, FolderCleaner};
pub use counters::{AggregateCounters, ByteCounters, CounterSnapshot, StateCounts};
pub use error::{ErrorContext, FailureKind, JobFailure};
pub use job::{JobHandle, JobId, WipeJob};
pub use relaunch::{FailedJob, Privileges, RelaunchRequest};
pub use renamer::EntryRenamer;
pub use scheduler::{Scheduler, WipeEvent, WipeObserver};
pub use settings::{ThrottleSettings, WipeSettings};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

// Global flag for handling Ctrl+C interrupts
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Set the interrupt flag (called by signal handler)
pub fn set_interrupted() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Check if an interrupt has been received
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Reset the interrupt flag (primarily for testing)
pub fn reset_interrupted() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

#[derive(Error, Debug)]
pub enum WipeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad path: {}", path.display())]
    BadPath { path: PathBuf },

    #[error("Invalid buffer length requested: {0}")]
    InvalidBufferLength(usize),

    #[error("Entropy source failed: {0}")]
    Entropy(String),

    #[error("No free replacement name found for {}", path.display())]
    NameExhausted { path: PathBuf },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Wipe worker panicked: {0}")]
    WorkerPanicked(String),
}

// Manual Clone implementation because std::io::Error doesn't implement Clone
impl Clone for WipeError {
    fn clone(&self) -> Self {
        match self {
            WipeError::Io(e) => WipeError::Io(std::io::Error::new(e.kind(), e.to_string())),
            WipeError::BadPath { path } => WipeError::BadPath { path: path.clone() },
            WipeError::InvalidBufferLength(n) => WipeError::InvalidBufferLength(*n),
            WipeError::Entropy(s) => WipeError::Entropy(s.clone()),
            WipeError::NameExhausted { path } => WipeError::NameExhausted { path: path.clone() },
            WipeError::InvalidSettings(s) => WipeError::InvalidSettings(s.clone()),
            WipeError::WorkerPanicked(s) => WipeError::WorkerPanicked(s.clone()),
        }
    }
}

pub type WipeResult<T> = Result<T, WipeError>;

/// Lifecycle state of a single wipe job.
///
/// `Pausing` is a sub-state of `Processing` entered while the scheduler is
/// suspended. `Missing` and `Unknown` absorb jobs whose file was gone before
/// processing or whose worker ended without reporting an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WipeState {
    Pending,
    Processing,
    Pausing,
    Finished,
    Canceled,
    Failed,
    Missing,
    Unknown,
}

impl WipeState {
    pub const ALL: [WipeState; 8] = [
        WipeState::Pending,
        WipeState::Processing,
        WipeState::Pausing,
        WipeState::Finished,
        WipeState::Canceled,
        WipeState::Failed,
        WipeState::Missing,
        WipeState::Unknown,
    ];

    /// Terminal states remove a job from every queue
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WipeState::Finished
                | WipeState::Canceled
                | WipeState::Failed
                | WipeState::Missing
                | WipeState::Unknown
        )
    }

    /// States that keep the scheduler busy
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WipeState::Pending | WipeState::Processing | WipeState::Pausing
        )
    }

    /// Abnormal endings whose size is no longer expected to be wiped
    pub fn is_abandoned(&self) -> bool {
        self.is_terminal() && *self != WipeState::Finished
    }
}

impl std::fmt::Display for WipeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WipeState::Pending => "Pending",
            WipeState::Processing => "Processing",
            WipeState::Pausing => "Pausing",
            WipeState::Finished => "Finished",
            WipeState::Canceled => "Canceled",
            WipeState::Failed => "Failed",
            WipeState::Missing => "Missing",
            WipeState::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod lib_tests;
