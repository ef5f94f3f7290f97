// Worker side of the scheduler: thread entry, pause gate and cancel checks
//
// Workers block only at the per-block checkpoint. The pause gate waits on a
// condition variable with a timeout no longer than the configured poll
// interval, so a missed wakeup still resumes within that interval.

use super::{Shared, WorkerOutcome};
use crate::job::{self, BlockControl, JobControl, JobHandle, WipeJob};
use crate::settings::WipeSettings;
use crate::{WipeError, WipeState};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::thread;

pub(super) struct WorkerControl<'a> {
    shared: &'a Shared,
}

impl JobControl for WorkerControl<'_> {
    fn checkpoint(&self, job: &WipeJob) -> BlockControl {
        if job.is_cancel_requested() {
            return BlockControl::Abort;
        }

        let mut state = self.shared.lock_state();
        if state.is_pausing {
            let interval = state.settings.pause_poll_interval();
            self.shared.move_job(job, WipeState::Pausing);
            self.shared.emit(super::WipeEvent::JobSuspended { job: job.id() });
            tracing::debug!(job = %job.id(), "Job suspended");

            while state.is_pausing && !job.is_cancel_requested() {
                let (guard, _) = self
                    .shared
                    .pause_cv
                    .wait_timeout(state, interval)
                    .unwrap_or_else(PoisonError::into_inner);
                state = guard;
            }

            self.shared.move_job(job, WipeState::Processing);
            self.shared.emit(super::WipeEvent::JobContinued { job: job.id() });
            tracing::debug!(job = %job.id(), "Job continued");
        }
        drop(state);

        if job.is_cancel_requested() {
            BlockControl::Abort
        } else {
            BlockControl::Continue
        }
    }

    fn progressed(&self, job: &WipeJob) {
        self.shared.emit(super::WipeEvent::JobProgress {
            job: job.id(),
            written: job.bytes_written(),
            expected: job.expected_bytes(),
        });
    }

    fn ui_visible(&self) -> bool {
        self.shared.ui_visible.load(Ordering::Relaxed)
    }
}

/// Start a worker thread for `job` with its own settings snapshot
pub(super) fn spawn_worker(
    shared: &Arc<Shared>,
    job: JobHandle,
    settings: WipeSettings,
) -> std::io::Result<()> {
    let shared = Arc::clone(shared);
    let name = format!("wipe-{}", &job.id().simple().to_string()[..8]);

    thread::Builder::new().name(name).spawn(move || {
        let outcome = run_worker(&shared, &job, &settings);
        shared.complete(&job, outcome);
    })?;
    Ok(())
}

fn run_worker(shared: &Shared, job: &WipeJob, settings: &WipeSettings) -> WorkerOutcome {
    let control = WorkerControl { shared };
    tracing::info!(job = %job.id(), path = %job.path().display(), algorithm = %settings.algorithm, "Job started");

    match panic::catch_unwind(AssertUnwindSafe(|| job::execute(job, settings, &control))) {
        Ok(Ok(state)) => WorkerOutcome::Reported(state),
        Ok(Err(failure)) => WorkerOutcome::Failed(failure),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            WorkerOutcome::Panicked(WipeError::WorkerPanicked(message))
        }
    }
}
