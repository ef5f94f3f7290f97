// Scheduler - bounded-concurrency wipe engine
//
// Submitted paths are expanded into jobs and queued FIFO. At most
// `max_parallel` jobs run at once, each on its own worker thread. Queues,
// flags and settings share one lock; every job state change happens under
// it so the counters never disagree with the queues.

mod control;
mod events;

#[cfg(test)]
mod scheduler_tests;

pub use events::{WipeEvent, WipeObserver};

use crate::cleaner::FolderCleaner;
use crate::counters::{AggregateCounters, CounterSnapshot, StateCounts};
use crate::error::JobFailure;
use crate::job::{JobHandle, WipeJob};
use crate::relaunch::{FailedJob, Privileges, RelaunchRequest};
use crate::settings::WipeSettings;
use crate::{WipeError, WipeResult, WipeState};
use events::Message;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// How a worker ended, before routing into a terminal state
pub(crate) enum WorkerOutcome {
    Reported(WipeState),
    Failed(JobFailure),
    Panicked(WipeError),
}

#[derive(Debug)]
pub(crate) struct SchedulerState {
    pending: VecDeque<JobHandle>,
    active: Vec<JobHandle>,
    failed: Vec<JobHandle>,
    /// Dedupe keys of jobs not yet terminal
    tracked: HashSet<String>,
    pending_base_folders: BTreeSet<PathBuf>,
    is_pausing: bool,
    is_canceling: bool,
    is_canceled: bool,
    /// An inactivity message is queued or being handled
    drain_pending: bool,
    /// Bumped by every submit that queued work
    generation: u64,
    settings: WipeSettings,
}

pub(crate) struct Shared {
    state: Mutex<SchedulerState>,
    pause_cv: Condvar,
    drained_cv: Condvar,
    counters: AggregateCounters,
    observers: RwLock<Vec<Arc<dyn WipeObserver>>>,
    sender: Sender<Message>,
    ui_visible: AtomicBool,
    privileges: Privileges,
}

pub struct Scheduler {
    shared: Arc<Shared>,
}

/// A path ready to become a job
struct Candidate {
    path: PathBuf,
    size: u64,
    exists: bool,
}

impl Scheduler {
    pub fn new(settings: WipeSettings) -> WipeResult<Self> {
        Self::with_privileges(settings, Privileges::current())
    }

    /// Scheduler that assumes `privileges` instead of probing the process
    pub fn with_privileges(settings: WipeSettings, privileges: Privileges) -> WipeResult<Self> {
        settings.validate()?;
        let (sender, receiver) = mpsc::channel();

        let shared = Arc::new(Shared {
            state: Mutex::new(SchedulerState {
                pending: VecDeque::new(),
                active: Vec::new(),
                failed: Vec::new(),
                tracked: HashSet::new(),
                pending_base_folders: BTreeSet::new(),
                is_pausing: false,
                is_canceling: false,
                is_canceled: false,
                drain_pending: false,
                generation: 0,
                settings,
            }),
            pause_cv: Condvar::new(),
            drained_cv: Condvar::new(),
            counters: AggregateCounters::new(),
            observers: RwLock::new(Vec::new()),
            sender,
            ui_visible: AtomicBool::new(false),
            privileges,
        });

        let weak = Arc::downgrade(&shared);
        thread::Builder::new()
            .name("wipe-events".to_string())
            .spawn(move || events::dispatch_loop(receiver, weak))?;

        Ok(Self { shared })
    }

    pub fn add_observer<O: WipeObserver + 'static>(&self, observer: O) {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    /// Expand, dedupe and queue `paths`; returns the jobs created.
    ///
    /// Directories are expanded to the files below them. Paths that do not
    /// exist become `Missing` jobs straight away.
    pub fn submit<I, P>(&self, paths: I) -> Vec<JobHandle>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let (candidates, base_folders) = expand(paths);
        let shared = &self.shared;
        let mut state = shared.lock_state();

        state.is_canceled = false;
        let include_folders = state.settings.include_folder_names;

        let mut created = Vec::new();
        for candidate in candidates {
            let key = dedupe_key(&candidate.path);
            if state.tracked.contains(&key) {
                tracing::debug!(path = %candidate.path.display(), "Already queued, skipping");
                continue;
            }

            if !candidate.exists {
                tracing::warn!(path = %candidate.path.display(), "Submitted path does not exist");
                let job = Arc::new(WipeJob::new(candidate.path, 0, WipeState::Missing));
                shared.emit(WipeEvent::CountersChanged(
                    shared.counters.attach(WipeState::Missing, 0),
                ));
                created.push(job);
                continue;
            }

            state.tracked.insert(key);
            let job = Arc::new(WipeJob::new(candidate.path, candidate.size, WipeState::Pending));
            shared.emit(WipeEvent::CountersChanged(
                shared.counters.attach(WipeState::Pending, job.size()),
            ));
            state.pending.push_back(Arc::clone(&job));
            created.push(job);
        }

        let mut folders_added = false;
        if include_folders {
            for folder in base_folders {
                folders_added |= state.pending_base_folders.insert(folder);
            }
        }

        tracing::info!(jobs = created.len(), pending = state.pending.len(), "Paths submitted");

        Shared::try_start(shared, &mut state);
        if !created.is_empty() || folders_added {
            state.generation += 1;
            shared.check_inactive(&mut state);
        }
        created
    }

    pub fn suspend(&self) {
        let mut state = self.shared.lock_state();
        if !state.is_pausing {
            state.is_pausing = true;
            tracing::info!(active = state.active.len(), "Wiping suspended");
        }
    }

    pub fn resume(&self) {
        let mut state = self.shared.lock_state();
        if state.is_pausing {
            state.is_pausing = false;
            tracing::info!("Wiping resumed");
        }
        self.shared.pause_cv.notify_all();
        Shared::try_start(&self.shared, &mut state);
    }

    /// Cancel one job. A pending job is canceled on the spot; a running one
    /// stops at its next block.
    pub fn cancel(&self, job: &JobHandle) {
        let shared = &self.shared;
        let mut state = shared.lock_state();

        if let Some(index) = state.pending.iter().position(|j| Arc::ptr_eq(j, job)) {
            state.pending.remove(index);
            shared.finalize(&mut state, job, WipeState::Canceled);
        } else if job.state().is_busy() {
            job.request_cancel();
            shared.pause_cv.notify_all();
        }

        shared.emit(WipeEvent::ProgressClosed { job: job.id() });
        tracing::info!(job = %job.id(), path = %job.path().display(), "Job cancel requested");
        shared.check_inactive(&mut state);
    }

    /// Cancel everything queued or running
    pub fn cancel_all(&self) {
        let shared = &self.shared;
        let mut state = shared.lock_state();

        let pending: Vec<JobHandle> = state.pending.drain(..).collect();
        let active: Vec<JobHandle> = std::mem::take(&mut state.active);
        state.failed.clear();
        state.is_canceling = true;

        for job in &pending {
            shared.finalize(&mut state, job, WipeState::Canceled);
            shared.emit(WipeEvent::ProgressClosed { job: job.id() });
        }
        for job in &active {
            job.request_cancel();
            shared.emit(WipeEvent::ProgressClosed { job: job.id() });
        }
        shared.pause_cv.notify_all();

        state.is_canceled = true;
        state.is_canceling = false;
        tracing::info!(pending = pending.len(), active = active.len(), "All jobs canceled");

        shared.check_inactive(&mut state);
    }

    pub fn state_counts(&self) -> StateCounts {
        self.shared.counters.snapshot().states
    }

    pub fn counters(&self) -> CounterSnapshot {
        self.shared.counters.snapshot()
    }

    pub fn is_pausing(&self) -> bool {
        self.shared.lock_state().is_pausing
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.lock_state().is_canceled
    }

    pub fn pending_len(&self) -> usize {
        self.shared.lock_state().pending.len()
    }

    pub fn active_len(&self) -> usize {
        self.shared.lock_state().active.len()
    }

    pub fn failed_len(&self) -> usize {
        self.shared.lock_state().failed.len()
    }

    pub fn settings(&self) -> WipeSettings {
        self.shared.lock_state().settings.clone()
    }

    /// Whether a UI is showing progress; selects the slower throttle
    pub fn set_ui_visible(&self, visible: bool) {
        self.shared.ui_visible.store(visible, Ordering::Relaxed);
    }

    /// Replace the settings. Running jobs keep the snapshot they started with.
    pub fn update_settings(&self, settings: WipeSettings) -> WipeResult<()> {
        settings.validate()?;
        let mut state = self.shared.lock_state();
        state.settings = settings;
        Shared::try_start(&self.shared, &mut state);
        Ok(())
    }

    /// Block until all work has drained and cleanup has run, or `timeout`
    /// passes. Returns whether the scheduler drained.
    pub fn wait_for_drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock_state();
        loop {
            if self.shared.is_idle(&state) && !state.drain_pending {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .shared
                .drained_cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let _ = self.shared.sender.send(Message::Shutdown);
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: WipeEvent) {
        if self.sender.send(Message::Event(event)).is_err() {
            tracing::trace!("Event dropped, dispatcher gone");
        }
    }

    fn notify(&self, event: &WipeEvent) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_event(event);
        }
    }

    fn is_idle(&self, state: &SchedulerState) -> bool {
        state.pending.is_empty() && state.active.is_empty() && self.counters.snapshot().states.is_idle()
    }

    /// Change a live job's state. Caller holds the state lock.
    fn move_job(&self, job: &WipeJob, to: WipeState) {
        let from = job.set_state(to);
        if from == to {
            return;
        }
        self.emit(WipeEvent::JobStateChanged {
            job: job.id(),
            path: job.path().to_path_buf(),
            from,
            to,
        });
        self.emit(WipeEvent::CountersChanged(self.counters.transition(from, to)));
    }

    /// Move a job into its terminal state and settle its size. Runs once
    /// per job; later calls are ignored.
    fn finalize(&self, state: &mut SchedulerState, job: &JobHandle, terminal: WipeState) {
        debug_assert!(terminal.is_terminal());
        if job.state().is_terminal() {
            return;
        }

        self.move_job(job, terminal);
        state.tracked.remove(&dedupe_key(job.path()));
        self.emit(WipeEvent::CountersChanged(self.counters.settle(
            terminal,
            job.size(),
            job.bytes_written(),
        )));

        match terminal {
            WipeState::Finished => {
                tracing::info!(job = %job.id(), path = %job.path().display(), "Job finished")
            }
            WipeState::Failed | WipeState::Unknown => tracing::warn!(
                job = %job.id(),
                path = %job.path().display(),
                state = %terminal,
                "Job did not complete"
            ),
            _ => tracing::info!(job = %job.id(), state = %terminal, "Job ended"),
        }
    }

    /// Start pending jobs while capacity allows
    fn try_start(shared: &Arc<Shared>, state: &mut SchedulerState) {
        while !state.is_pausing && !state.is_canceling && state.active.len() < state.settings.max_parallel() {
            let Some(job) = state.pending.pop_front() else {
                break;
            };

            state.active.push(Arc::clone(&job));
            shared.move_job(&job, WipeState::Processing);

            if let Err(e) = control::spawn_worker(shared, Arc::clone(&job), state.settings.clone()) {
                tracing::error!(job = %job.id(), error = %e, "Failed to spawn wipe worker");
                state.active.retain(|j| !Arc::ptr_eq(j, &job));
                let failure = JobFailure::new(
                    WipeError::Io(e),
                    crate::error::ErrorContext::new("spawn", job.path()),
                );
                job.set_failure(failure);
                state.failed.push(Arc::clone(&job));
                shared.finalize(state, &job, WipeState::Failed);
            }
        }
    }

    /// Worker completion: route the outcome, refill capacity, check idle
    fn complete(self: &Arc<Self>, job: &JobHandle, outcome: WorkerOutcome) {
        let mut state = self.lock_state();
        state.active.retain(|j| !Arc::ptr_eq(j, job));

        let terminal = match outcome {
            WorkerOutcome::Reported(WipeState::Finished) => WipeState::Finished,
            _ if job.is_cancel_requested() => WipeState::Canceled,
            WorkerOutcome::Reported(reported) if reported.is_terminal() => reported,
            WorkerOutcome::Reported(_) => WipeState::Unknown,
            WorkerOutcome::Failed(failure) => {
                tracing::warn!(path = %job.path().display(), error = %failure, "Wipe failed");
                job.set_failure(failure);
                state.failed.push(Arc::clone(job));
                WipeState::Failed
            }
            WorkerOutcome::Panicked(error) => {
                tracing::error!(path = %job.path().display(), error = %error, "Wipe worker panicked");
                let context = crate::error::ErrorContext::new("worker", job.path());
                job.set_failure(JobFailure::new(error, context));
                WipeState::Unknown
            }
        };

        self.finalize(&mut state, job, terminal);
        self.emit(WipeEvent::ProgressClosed { job: job.id() });
        Shared::try_start(self, &mut state);
        self.check_inactive(&mut state);
    }

    /// Queue an inactivity message once the counters show nothing busy
    fn check_inactive(&self, state: &mut SchedulerState) {
        if state.drain_pending || !self.is_idle(state) {
            return;
        }
        state.drain_pending = true;
        if self.sender.send(Message::Inactive).is_err() {
            state.drain_pending = false;
        }
    }

    /// Runs on the dispatcher thread after an inactivity message
    fn finish_drain(&self) {
        let (folders, settings, canceled, generation) = {
            let mut state = self.lock_state();
            if !self.is_idle(&state) {
                state.drain_pending = false;
                return;
            }
            (
                std::mem::take(&mut state.pending_base_folders),
                state.settings.clone(),
                state.is_canceled,
                state.generation,
            )
        };

        self.notify(&WipeEvent::Inactive);

        let mut remaining_folders: Vec<PathBuf> = folders.into_iter().collect();
        if settings.include_folder_names && !canceled && !remaining_folders.is_empty() {
            let report = FolderCleaner::new(settings.selection().repeats()).clean(&remaining_folders);
            remaining_folders.retain(|folder| folder.exists());
            self.notify(&WipeEvent::FoldersCleaned(report));
        }

        let failed: Vec<FailedJob> = {
            let mut state = self.lock_state();
            std::mem::take(&mut state.failed)
                .iter()
                .map(|job| FailedJob::from_job(job))
                .collect()
        };

        if !failed.is_empty() {
            if settings.allow_auto_relaunch && !self.privileges.is_elevated() && !canceled {
                tracing::info!(failed = failed.len(), "Requesting elevated relaunch");
                self.notify(&WipeEvent::RelaunchRequested(RelaunchRequest::new(
                    remaining_folders,
                    &failed,
                )));
            } else {
                self.notify(&WipeEvent::FailuresReported {
                    failures: failed.clone(),
                });
            }
        }

        self.notify(&WipeEvent::Drained {
            canceled,
            failed: failed.len(),
            auto_close: settings.allow_auto_close,
        });

        let mut state = self.lock_state();
        state.drain_pending = false;
        // Work submitted while this drain ran needs a drain of its own
        if state.generation != generation {
            self.check_inactive(&mut state);
        }
        self.drained_cv.notify_all();
    }
}

/// Resolve `paths` into file candidates and the directories among them
fn expand<I, P>(paths: I) -> (Vec<Candidate>, Vec<PathBuf>)
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut candidates = Vec::new();
    let mut folders = Vec::new();

    for path in paths {
        let path = resolve(path.as_ref());
        let metadata = match fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(_) => {
                candidates.push(Candidate {
                    path,
                    size: 0,
                    exists: false,
                });
                continue;
            }
        };

        if metadata.is_file() {
            candidates.push(Candidate {
                path,
                size: metadata.len(),
                exists: true,
            });
        } else if metadata.is_dir() {
            for entry in WalkDir::new(&path).follow_links(false) {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                        candidates.push(Candidate {
                            path: entry.into_path(),
                            size,
                            exists: true,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(base = %path.display(), error = %e, "Skipping unreadable entry")
                    }
                }
            }
            folders.push(path);
        } else {
            tracing::warn!(path = %path.display(), "Skipping symlink or special file");
        }
    }

    (candidates, folders)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Absolute path with `.` and `..` resolved.
///
/// Only the parent is canonicalized, so a symlink in the last component
/// stays a symlink and is still skipped. Paths whose parent does not exist
/// are normalized lexically.
fn resolve(path: &Path) -> PathBuf {
    let path = absolute(path);
    let resolved = match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => fs::canonicalize(parent).map(|parent| parent.join(name)),
        // Ends in `..` or is a root
        _ => fs::canonicalize(&path),
    };
    resolved.unwrap_or_else(|_| normalize(&path))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Full-path dedupe key; case-insensitive where the filesystem usually is
fn dedupe_key(path: &Path) -> String {
    let text = path.to_string_lossy();
    if cfg!(any(windows, target_os = "macos")) {
        text.to_lowercase()
    } else {
        text.into_owned()
    }
}
