// Tests for scheduler internals
//
// Tests cover: path expansion, dedupe keys, queue bookkeeping under
// suspend, settings updates and inactivity signaling.

use super::*;
use crate::algorithms::AlgorithmKind;
use std::sync::Mutex as StdMutex;
use tempfile::tempdir;

fn quick_settings() -> WipeSettings {
    WipeSettings {
        algorithm: AlgorithmKind::Zero,
        repeats: 1,
        use_full_resources: true,
        block_size: 4096,
        pause_poll_ms: 10,
        ..Default::default()
    }
}

// ==================== EXPANSION TESTS ====================

#[test]
fn test_expand_file_and_missing() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"hello").unwrap();
    let missing = dir.path().join("nope.txt");

    let (candidates, folders) = expand([&file, &missing]);

    assert!(folders.is_empty());
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].path, fs::canonicalize(&file).unwrap());
    assert_eq!(candidates[0].size, 5);
    assert!(candidates[0].exists);
    assert!(!candidates[1].exists);
    assert_eq!(candidates[1].size, 0);
}

#[test]
fn test_expand_directory_recurses() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("base");
    fs::create_dir_all(base.join("x/y")).unwrap();
    fs::write(base.join("one"), b"1").unwrap();
    fs::write(base.join("x/two"), b"22").unwrap();
    fs::write(base.join("x/y/three"), b"333").unwrap();

    let base = fs::canonicalize(&base).unwrap();
    let (candidates, folders) = expand([&base]);

    assert_eq!(folders, vec![base.clone()]);
    let mut sizes: Vec<u64> = candidates.iter().map(|c| c.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![1, 2, 3]);
    assert!(candidates.iter().all(|c| c.path.starts_with(&base)));
}

#[test]
fn test_expand_relative_path_becomes_absolute() {
    let (candidates, _) = expand(["definitely-not-here-7f3a.bin"]);
    assert!(candidates[0].path.is_absolute());
}

#[cfg(unix)]
#[test]
fn test_expand_skips_symlinks() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target");
    fs::write(&target, b"data").unwrap();
    let link = dir.path().join("link");
    std::os::unix::fs::symlink(&target, &link).unwrap();

    let (candidates, folders) = expand([&link]);
    assert!(candidates.is_empty());
    assert!(folders.is_empty());
}

#[test]
fn test_expand_resolves_dot_segments() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let file = sub.join("f.bin");
    fs::write(&file, b"data").unwrap();

    let (candidates, _) = expand([
        file.clone(),
        sub.join(".").join("f.bin"),
        sub.join("..").join("sub").join("f.bin"),
    ]);

    let canonical = fs::canonicalize(&file).unwrap();
    assert_eq!(candidates.len(), 3);
    assert!(candidates.iter().all(|c| c.path == canonical));
}

#[test]
fn test_normalize_missing_parent() {
    let base = PathBuf::from("/data/wipe");
    assert_eq!(normalize(&base.join("gone/../x.bin")), base.join("x.bin"));
    assert_eq!(normalize(&base.join("./a/./b")), base.join("a/b"));
    assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
}

#[test]
fn test_dedupe_key() {
    let upper = dedupe_key(Path::new("/Data/File.TXT"));
    let lower = dedupe_key(Path::new("/data/file.txt"));
    if cfg!(any(windows, target_os = "macos")) {
        assert_eq!(upper, lower);
    } else {
        assert_ne!(upper, lower);
    }
}

// ==================== QUEUE TESTS ====================

#[test]
fn test_submit_while_suspended_only_queues() {
    let dir = tempdir().unwrap();
    let files: Vec<PathBuf> = (0..3)
        .map(|i| {
            let p = dir.path().join(format!("{}.bin", i));
            fs::write(&p, vec![1u8; 100]).unwrap();
            p
        })
        .collect();

    let scheduler = Scheduler::new(quick_settings()).unwrap();
    scheduler.suspend();
    let jobs = scheduler.submit(&files);

    assert_eq!(jobs.len(), 3);
    assert_eq!(scheduler.pending_len(), 3);
    assert_eq!(scheduler.active_len(), 0);
    assert_eq!(scheduler.state_counts().pending, 3);
    assert_eq!(scheduler.counters().bytes.total_file_size, 300);
    assert!(jobs.iter().all(|j| j.state() == WipeState::Pending));

    let state = scheduler.shared.lock_state();
    assert_eq!(state.tracked.len(), 3);
    assert!(!state.drain_pending);
}

#[test]
fn test_aliased_spellings_become_one_job() {
    let dir = tempdir().unwrap();
    let sub = dir.path().join("sub");
    fs::create_dir(&sub).unwrap();
    let file = sub.join("f.bin");
    fs::write(&file, vec![7u8; 1000]).unwrap();

    let mut settings = quick_settings();
    settings.max_threads = 4;
    let scheduler = Scheduler::new(settings).unwrap();
    scheduler.suspend();
    let jobs = scheduler.submit([
        file.clone(),
        sub.join(".").join("f.bin"),
        sub.join("..").join("sub").join("f.bin"),
        dir.path().join(".").join("sub").join("f.bin"),
    ]);

    assert_eq!(jobs.len(), 1, "One physical file is one job");
    assert_eq!(scheduler.pending_len(), 1);
    assert_eq!(scheduler.counters().bytes.total_file_size, 1000);

    scheduler.resume();
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));
    let counts = scheduler.state_counts();
    assert_eq!(counts.finished, 1);
    assert_eq!(counts.failed, 0);
    assert_eq!(counts.missing, 0);
    assert!(!file.exists());
}

#[test]
fn test_terminal_jobs_release_dedupe_key() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("again.bin");
    fs::write(&file, b"abc").unwrap();

    let scheduler = Scheduler::new(quick_settings()).unwrap();
    scheduler.suspend();
    let jobs = scheduler.submit([&file]);
    scheduler.cancel(&jobs[0]);
    assert_eq!(jobs[0].state(), WipeState::Canceled);

    let again = scheduler.submit([&file]);
    assert_eq!(again.len(), 1, "Canceled path may be submitted again");
    scheduler.resume();
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));
    assert_eq!(again[0].state(), WipeState::Finished);
}

#[test]
fn test_update_settings_raises_parallelism() {
    let dir = tempdir().unwrap();
    let files: Vec<PathBuf> = (0..3)
        .map(|i| {
            let p = dir.path().join(format!("{}.bin", i));
            fs::write(&p, vec![1u8; 10]).unwrap();
            p
        })
        .collect();

    let mut settings = quick_settings();
    settings.parallel_enabled = false;
    let scheduler = Scheduler::new(settings.clone()).unwrap();
    scheduler.suspend();
    scheduler.submit(&files);

    settings.parallel_enabled = true;
    settings.max_threads = 3;
    scheduler.update_settings(settings).unwrap();
    assert_eq!(scheduler.settings().max_parallel(), 3);
    assert_eq!(scheduler.active_len(), 0, "Still suspended");

    scheduler.resume();
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));
    assert_eq!(scheduler.state_counts().finished, 3);
}

#[test]
fn test_invalid_settings_rejected() {
    let mut settings = quick_settings();
    settings.repeats = 0;
    assert!(matches!(
        Scheduler::new(settings.clone()),
        Err(WipeError::InvalidSettings(_))
    ));

    let scheduler = Scheduler::new(quick_settings()).unwrap();
    assert!(scheduler.update_settings(settings).is_err());
    assert_eq!(scheduler.settings().repeats, 1);
}

// ==================== INACTIVITY TESTS ====================

#[test]
fn test_missing_only_submission_still_drains() {
    let dir = tempdir().unwrap();
    let events = Arc::new(StdMutex::new(Vec::new()));
    let sink = Arc::clone(&events);

    let scheduler = Scheduler::new(quick_settings()).unwrap();
    scheduler.add_observer(move |e: &WipeEvent| sink.lock().unwrap().push(e.clone()));

    let jobs = scheduler.submit([dir.path().join("ghost")]);
    assert_eq!(jobs[0].state(), WipeState::Missing);
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));

    let events = events.lock().unwrap();
    assert!(events.iter().any(|e| matches!(e, WipeEvent::Inactive)));
    assert!(events
        .iter()
        .any(|e| matches!(e, WipeEvent::Drained { failed: 0, .. })));
}

#[test]
fn test_duplicate_only_submission_does_not_drain_again() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("one.bin");
    fs::write(&file, b"x").unwrap();

    let drained = Arc::new(StdMutex::new(0usize));
    let sink = Arc::clone(&drained);
    let scheduler = Scheduler::new(quick_settings()).unwrap();
    scheduler.add_observer(move |e: &WipeEvent| {
        if matches!(e, WipeEvent::Drained { .. }) {
            *sink.lock().unwrap() += 1;
        }
    });

    scheduler.suspend();
    scheduler.submit([&file]);
    assert!(scheduler.submit([&file]).is_empty());
    scheduler.resume();
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));
    assert_eq!(*drained.lock().unwrap(), 1);
}

#[test]
fn test_cancel_all_when_idle_marks_canceled() {
    let scheduler = Scheduler::new(quick_settings()).unwrap();
    scheduler.cancel_all();
    assert!(scheduler.is_canceled());
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));

    let dir = tempdir().unwrap();
    let file = dir.path().join("after.bin");
    fs::write(&file, b"x").unwrap();
    scheduler.submit([&file]);
    assert!(!scheduler.is_canceled(), "Submit clears the canceled flag");
    assert!(scheduler.wait_for_drain(Duration::from_secs(10)));
}
