/// Common test utilities
///
/// This module provides shared functionality for integration tests including:
/// - Scratch file creation
/// - Event recording observers
/// - Polling helpers for asynchronous scheduler state
pub mod test_helpers;
