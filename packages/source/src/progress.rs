//! Progress reporting for long-running load phases.
//!
//! [`ProgressCallback`] decouples the loader from any rendering backend;
//! the CLI supplies an `indicatif` implementation while tests and library
//! callers use [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from a load or mining run.
///
/// Implementations must be `Send + Sync` because the conforming pass
/// reports from `rayon` worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores every progress update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
