/// Failure classification for per-job wipe errors
///
/// Each failure is sorted into a kind that tells the collaborator whether a
/// restart with elevated rights could help. The context carries the
/// diagnostic metadata that was captured before any destructive step.
use crate::WipeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Classification of a job failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// File is held open or locked by another process
    Locked,

    /// Access denied; elevated rights may succeed
    AccessDenied,

    /// File disappeared while the job was running
    Vanished,

    /// Anything else
    Other,
}

impl FailureKind {
    /// Get human-readable description of the failure kind
    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::Locked => "File is in use by another process",
            FailureKind::AccessDenied => "Access to the file was denied",
            FailureKind::Vanished => "File disappeared during wiping",
            FailureKind::Other => "Unexpected error",
        }
    }

    /// Whether restarting with elevated rights could fix it
    pub fn elevation_may_help(&self) -> bool {
        matches!(self, FailureKind::AccessDenied)
    }

    /// Classify a wipe error
    pub fn classify(error: &WipeError) -> Self {
        match error {
            WipeError::Io(io_err) => Self::classify_io_error(io_err),
            WipeError::BadPath { .. } => FailureKind::Vanished,
            _ => FailureKind::Other,
        }
    }

    fn classify_io_error(io_err: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        match io_err.kind() {
            ErrorKind::PermissionDenied => FailureKind::AccessDenied,
            ErrorKind::NotFound => FailureKind::Vanished,
            ErrorKind::WouldBlock => FailureKind::Locked,
            _ => match io_err.raw_os_error() {
                // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
                #[cfg(windows)]
                Some(32) | Some(33) => FailureKind::Locked,
                // EBUSY, ETXTBSY
                #[cfg(unix)]
                Some(16) | Some(26) => FailureKind::Locked,
                _ => FailureKind::Other,
            },
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Locked => write!(f, "Locked"),
            FailureKind::AccessDenied => write!(f, "AccessDenied"),
            FailureKind::Vanished => write!(f, "Vanished"),
            FailureKind::Other => write!(f, "Other"),
        }
    }
}

/// Context information about where and when an error occurred
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Operation name (e.g., "overwrite", "rename", "delete")
    pub operation: String,

    /// File the job was working on
    pub path: PathBuf,

    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,

    /// Diagnostic metadata (attributes, owner, permission entries)
    pub metadata: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(operation: impl Into<String>, path: impl AsRef<Path>) -> Self {
        Self {
            operation: operation.into(),
            path: path.as_ref().to_path_buf(),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    /// Add metadata to the context
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merge a captured diagnostic map; existing keys win
    pub fn absorb(&mut self, metadata: &BTreeMap<String, String>) {
        for (key, value) in metadata {
            self.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// A failed job's error with its diagnostic context
#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    /// Display form of the original error
    pub message: String,

    /// Classification
    pub kind: FailureKind,

    /// Context about where the error occurred
    pub context: ErrorContext,

    #[serde(skip)]
    pub error: WipeError,
}

impl JobFailure {
    pub fn new(error: WipeError, context: ErrorContext) -> Self {
        Self {
            message: error.to_string(),
            kind: FailureKind::classify(&error),
            context,
            error,
        }
    }
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error in {} on {}: {}",
            self.kind,
            self.context.operation,
            self.context.path.display(),
            self.message
        )
    }
}

impl std::error::Error for JobFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
