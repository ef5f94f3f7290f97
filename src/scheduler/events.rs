// Scheduler notifications and the dispatcher that delivers them
//
// Emitters only push onto a channel. A single dispatcher thread calls the
// observers, so no observer ever runs on a worker's stack or while the
// scheduler lock is held.

use super::Shared;
use crate::cleaner::CleanReport;
use crate::counters::CounterSnapshot;
use crate::job::JobId;
use crate::relaunch::{FailedJob, RelaunchRequest};
use crate::WipeState;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Weak;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WipeEvent {
    JobStateChanged {
        job: JobId,
        path: PathBuf,
        from: WipeState,
        to: WipeState,
    },
    JobProgress {
        job: JobId,
        written: u64,
        expected: u64,
    },
    /// A running job stopped at its pause gate
    JobSuspended { job: JobId },
    JobContinued { job: JobId },
    /// The job will not report progress any more
    ProgressClosed { job: JobId },
    CountersChanged(CounterSnapshot),
    /// No job is pending, processing or pausing
    Inactive,
    FoldersCleaned(CleanReport),
    RelaunchRequested(RelaunchRequest),
    FailuresReported { failures: Vec<FailedJob> },
    /// Cleanup and fault handling are done for this batch
    Drained {
        canceled: bool,
        failed: usize,
        auto_close: bool,
    },
}

/// Receives scheduler events on the dispatcher thread
pub trait WipeObserver: Send + Sync {
    fn on_event(&self, event: &WipeEvent);
}

impl<F> WipeObserver for F
where
    F: Fn(&WipeEvent) + Send + Sync,
{
    fn on_event(&self, event: &WipeEvent) {
        self(event)
    }
}

pub(crate) enum Message {
    Event(WipeEvent),
    /// Counters reached idle; run cleanup and fault handling
    Inactive,
    Shutdown,
}

pub(crate) fn dispatch_loop(receiver: Receiver<Message>, shared: Weak<Shared>) {
    for message in receiver {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        match message {
            Message::Event(event) => shared.notify(&event),
            Message::Inactive => shared.finish_drain(),
            Message::Shutdown => break,
        }
    }
    tracing::trace!("Event dispatcher stopped");
}
