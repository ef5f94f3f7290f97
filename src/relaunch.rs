// Privilege probe and relaunch request for failed jobs
//
// The core never elevates anything itself. When failures remain after a
// drain it hands the collaborator everything needed to restart with more
// rights and resubmit the leftovers.

use crate::error::JobFailure;
use crate::job::WipeJob;
use serde::Serialize;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Privileges {
    Standard,
    Elevated,
}

impl Privileges {
    /// Probe the current process
    #[cfg(unix)]
    pub fn current() -> Self {
        if nix::unistd::Uid::effective().is_root() {
            Privileges::Elevated
        } else {
            Privileges::Standard
        }
    }

    /// Probe the current process. `net session` only succeeds for administrators.
    #[cfg(windows)]
    pub fn current() -> Self {
        match Command::new("net").arg("session").output() {
            Ok(output) if output.status.success() => Privileges::Elevated,
            _ => Privileges::Standard,
        }
    }

    #[cfg(not(any(unix, windows)))]
    pub fn current() -> Self {
        Privileges::Standard
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, Privileges::Elevated)
    }
}

/// A job that ended as Failed, as reported at drain time
#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub path: PathBuf,
    pub size: u64,
    pub failure: Option<JobFailure>,
}

impl FailedJob {
    pub fn from_job(job: &WipeJob) -> Self {
        Self {
            path: job.path().to_path_buf(),
            size: job.size(),
            failure: job.failure(),
        }
    }

    /// Whether restarting elevated could get this one through
    pub fn elevation_may_help(&self) -> bool {
        self.failure
            .as_ref()
            .map(|f| f.kind.elevation_may_help())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelaunchRequest {
    pub base_folders: Vec<PathBuf>,
    pub failed_paths: Vec<PathBuf>,
}

impl RelaunchRequest {
    pub fn new(base_folders: Vec<PathBuf>, failed: &[FailedJob]) -> Self {
        Self {
            base_folders,
            failed_paths: failed.iter().map(|f| f.path.clone()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base_folders.is_empty() && self.failed_paths.is_empty()
    }

    /// Arguments for resubmission: remaining base folders, then failed files
    pub fn arguments(&self) -> Vec<OsString> {
        self.base_folders
            .iter()
            .chain(self.failed_paths.iter())
            .map(|p| p.clone().into_os_string())
            .collect()
    }

    /// Command restarting the current executable with `extra_args` and the
    /// resubmission arguments. On unix the restart goes through `sudo`.
    pub fn command(&self, extra_args: &[OsString]) -> io::Result<Command> {
        let exe = std::env::current_exe()?;

        #[cfg(unix)]
        let mut command = {
            let mut c = Command::new("sudo");
            c.arg(exe);
            c
        };
        #[cfg(not(unix))]
        let mut command = Command::new(exe);

        command.args(extra_args).arg("--").args(self.arguments());
        Ok(command)
    }
}
