/// Common test helper functions

use sayonara_shred::{AlgorithmKind, JobId, ThrottleSettings, WipeEvent, WipeSettings, WipeState};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Drain timeout generous enough for slow CI machines
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Write a file of `size` bytes filled with 0xA5
pub fn create_test_file(dir: &Path, name: &str, size: usize) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, vec![0xA5u8; size]).unwrap();
    path
}

/// Settings that run as fast as possible
pub fn fast_settings(algorithm: AlgorithmKind, repeats: u32) -> WipeSettings {
    WipeSettings {
        algorithm,
        repeats,
        parallel_enabled: true,
        max_threads: 4,
        include_folder_names: true,
        use_full_resources: true,
        allow_auto_relaunch: false,
        allow_auto_close: false,
        block_size: 64 * 1024,
        pause_poll_ms: 20,
        throttle: ThrottleSettings::default(),
    }
}

/// Settings where every 1 KiB block waits `delay_ms` while the UI is visible
pub fn slow_settings(max_threads: usize, delay_ms: u64) -> WipeSettings {
    WipeSettings {
        algorithm: AlgorithmKind::Zero,
        repeats: 1,
        max_threads,
        use_full_resources: false,
        block_size: 1024,
        throttle: ThrottleSettings {
            hidden_delay_ms: delay_ms,
            visible_delay_ms: delay_ms,
        },
        ..fast_settings(AlgorithmKind::Zero, 1)
    }
}

/// Observer that keeps every event it sees
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<WipeEvent>>>,
}

impl EventLog {
    pub fn observer(&self) -> impl Fn(&WipeEvent) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |event: &WipeEvent| events.lock().unwrap().push(event.clone())
    }

    pub fn events(&self) -> Vec<WipeEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Target states of a job in the order they were reported
    pub fn transitions(&self, id: JobId) -> Vec<WipeState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                WipeEvent::JobStateChanged { job, to, .. } if job == id => Some(to),
                _ => None,
            })
            .collect()
    }

    /// Index of the first state change of `id` into `state`
    pub fn position_of(&self, id: JobId, state: WipeState) -> Option<usize> {
        self.events().iter().position(|e| {
            matches!(e, WipeEvent::JobStateChanged { job, to, .. } if *job == id && *to == state)
        })
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_test_file() {
        let dir = tempdir().unwrap();
        let path = create_test_file(dir.path(), "nested/a.bin", 10);
        assert_eq!(fs::read(&path).unwrap(), vec![0xA5u8; 10]);
    }

    #[test]
    fn test_wait_until_times_out() {
        assert!(!wait_until(Duration::from_millis(20), || false));
        assert!(wait_until(Duration::from_millis(20), || true));
    }
}
