// Wipe job - one file's lifecycle from submission to rename+delete
//
// A job is shared between the scheduler and the worker running it. The
// scheduler owns every state transition; the worker only reports progress
// and the outcome of `execute`.

use crate::algorithms::OverwritePattern;
use crate::diagnostics;
use crate::error::{ErrorContext, JobFailure};
use crate::renamer::EntryRenamer;
use crate::settings::WipeSettings;
use crate::{WipeResult, WipeState};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

pub type JobId = Uuid;

/// Shared handle returned to collaborators
pub type JobHandle = Arc<WipeJob>;

#[derive(Debug)]
pub struct WipeJob {
    id: JobId,
    path: PathBuf,
    size: u64,
    state: Mutex<WipeState>,
    written: AtomicU64,
    expected: AtomicU64,
    cancel_requested: AtomicBool,
    failure: Mutex<Option<JobFailure>>,
}

impl WipeJob {
    pub(crate) fn new(path: PathBuf, size: u64, state: WipeState) -> Self {
        Self {
            id: Uuid::new_v4(),
            path,
            size,
            state: Mutex::new(state),
            written: AtomicU64::new(0),
            expected: AtomicU64::new(0),
            cancel_requested: AtomicBool::new(false),
            failure: Mutex::new(None),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size captured at submission
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn state(&self) -> WipeState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the previous state
    pub(crate) fn set_state(&self, state: WipeState) -> WipeState {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, state)
    }

    /// Bytes written so far, across all passes and repeats
    pub fn bytes_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Bytes this job will write if it runs to completion
    pub fn expected_bytes(&self) -> u64 {
        self.expected.load(Ordering::Relaxed)
    }

    pub fn percentage(&self) -> f64 {
        let expected = self.expected_bytes();
        if expected == 0 {
            return if self.state() == WipeState::Finished {
                100.0
            } else {
                0.0
            };
        }
        (self.bytes_written() as f64 / expected as f64 * 100.0).min(100.0)
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    /// Failure captured when the job ended as Failed or Unknown
    pub fn failure(&self) -> Option<JobFailure> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_failure(&self, failure: JobFailure) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(failure);
    }

    fn record_progress(&self, delta: u64) -> u64 {
        self.written.fetch_add(delta, Ordering::Relaxed) + delta
    }
}

/// Decision taken before every block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockControl {
    Continue,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverwriteOutcome {
    Completed { written: u64 },
    Aborted { written: u64 },
}

/// Overwrite the first `len` bytes of `stream` `repeats` times.
///
/// `checkpoint` runs before every block and may stop the loop. Writes are
/// clamped to the bytes remaining even when the pattern returns a longer
/// buffer. When the pattern asks for it, the stream goes back to the start
/// of the block so the next buffer overlaps the one just written.
pub fn overwrite_stream<S, C, P>(
    stream: &mut S,
    len: u64,
    pattern: &mut OverwritePattern,
    repeats: u32,
    block_size: usize,
    mut checkpoint: C,
    mut on_progress: P,
) -> WipeResult<OverwriteOutcome>
where
    S: Write + Seek,
    C: FnMut() -> BlockControl,
    P: FnMut(u64),
{
    let block_size = block_size.max(1) as u64;
    let mut written = 0u64;

    for _ in 0..repeats {
        stream.seek(SeekFrom::Start(0))?;
        let mut position = 0u64;

        while position < len {
            if checkpoint() == BlockControl::Abort {
                stream.flush()?;
                return Ok(OverwriteOutcome::Aborted { written });
            }

            let remaining = len - position;
            let buf = pattern.generate(remaining.min(block_size) as usize)?;
            let chunk = (buf.len() as u64).min(remaining);

            stream.write_all(&buf[..chunk as usize])?;
            written += chunk;
            on_progress(chunk);

            if pattern.rewind_after_write() {
                stream.seek(SeekFrom::Start(position))?;
            } else {
                position += chunk;
            }
        }
    }

    stream.flush()?;
    Ok(OverwriteOutcome::Completed { written })
}

/// Hooks a running job uses to talk back to whoever runs it
pub(crate) trait JobControl {
    /// Pause and cancel gate, called before every block
    fn checkpoint(&self, job: &WipeJob) -> BlockControl;

    /// Called after every block with the job's running total already updated
    fn progressed(&self, job: &WipeJob);

    fn ui_visible(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Prepare,
    Open,
    Overwrite,
    Rename,
    Delete,
}

impl Stage {
    fn as_str(&self) -> &'static str {
        match self {
            Stage::Prepare => "prepare",
            Stage::Open => "open",
            Stage::Overwrite => "overwrite",
            Stage::Rename => "rename",
            Stage::Delete => "delete",
        }
    }
}

/// Run the job to completion and report its terminal state.
///
/// `Missing` means the file was gone when the worker got to it and
/// `Canceled` means the loop was aborted. Nothing is deleted in either case.
pub(crate) fn execute(
    job: &WipeJob,
    settings: &WipeSettings,
    control: &dyn JobControl,
) -> Result<WipeState, JobFailure> {
    if fs::symlink_metadata(job.path()).is_err() {
        tracing::info!(job = %job.id(), path = %job.path().display(), "File vanished before processing");
        return Ok(WipeState::Missing);
    }

    let selection = settings.selection();
    let mut pattern = selection.instantiate();
    let repeats = selection.repeats();
    job.expected.store(
        job.size() * u64::from(repeats) * pattern.passes_per_round(),
        Ordering::Relaxed,
    );

    let mut stage = Stage::Prepare;
    let mut captured = BTreeMap::new();

    let result = run(
        job,
        settings,
        control,
        &mut pattern,
        repeats,
        &mut stage,
        &mut captured,
    );

    result.map_err(|error| {
        let mut context = ErrorContext::new(stage.as_str(), job.path())
            .with_metadata("Algorithm", selection.kind().to_string())
            .with_metadata("Repeats", repeats.to_string());
        context.absorb(&captured);
        JobFailure::new(error, context)
    })
}

fn run(
    job: &WipeJob,
    settings: &WipeSettings,
    control: &dyn JobControl,
    pattern: &mut OverwritePattern,
    repeats: u32,
    stage: &mut Stage,
    captured: &mut BTreeMap<String, String>,
) -> WipeResult<WipeState> {
    let path = job.path();

    if diagnostics::clear_readonly(path)? {
        tracing::debug!(path = %path.display(), "Cleared read-only attribute");
    }

    match diagnostics::capture(path) {
        Ok(data) => *captured = data,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to capture diagnostics")
        }
    }

    *stage = Stage::Open;
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();

    *stage = Stage::Overwrite;
    let outcome = overwrite_stream(
        &mut file,
        len,
        pattern,
        repeats,
        settings.block_size,
        || {
            let decision = control.checkpoint(job);
            if decision == BlockControl::Continue {
                // UI visibility may change while the job runs
                let delay = settings
                    .throttle
                    .delay(settings.use_full_resources, control.ui_visible());
                match delay {
                    Some(d) => std::thread::sleep(d),
                    None => std::thread::yield_now(),
                }
            }
            decision
        },
        |delta| {
            job.record_progress(delta);
            control.progressed(job);
        },
    )?;

    if let OverwriteOutcome::Aborted { written } = outcome {
        tracing::info!(job = %job.id(), path = %path.display(), written, "Overwrite aborted");
        return Ok(WipeState::Canceled);
    }

    file.sync_all()?;
    drop(file);

    *stage = Stage::Rename;
    let renamed = EntryRenamer::new().wipe_entry_repeatedly(path, repeats)?;

    *stage = Stage::Delete;
    fs::remove_file(&renamed)?;

    tracing::info!(
        job = %job.id(),
        path = %path.display(),
        written = job.bytes_written(),
        "File wiped"
    );
    Ok(WipeState::Finished)
}
