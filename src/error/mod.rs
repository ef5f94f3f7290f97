/// Error reporting for wipe jobs
///
/// Job-level failures never stop the scheduler. They are captured on the
/// job together with diagnostic metadata collected before the destructive
/// phase, and surfaced as a batch once all work has drained.
pub mod classification;

// Re-export main types for convenience
pub use classification::{ErrorContext, FailureKind, JobFailure};
