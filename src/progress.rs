//! Batch state and progress-callback trait.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] into the
//! [`crate::batch::BatchOrchestrator`] to receive events as each file of a
//! batch is converted. The CLI forwards them to an `indicatif` bar, the
//! server to `tracing` via [`LogProgressCallback`].
//!
//! # Example
//!
//! ```rust
//! use drop2md::{BatchProgressCallback, BatchState};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Counter(AtomicUsize);
//!
//! impl BatchProgressCallback for Counter {
//!     fn on_progress(&self, state: &BatchState) {
//!         if let BatchState::Running { completed, .. } = state {
//!             self.0.store(*completed, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Where a batch is in its life cycle.
///
/// `Pending → Running(0/n) → … → Running(n/n) → Completed`, or
/// `Running(i-1/n) → Failed { at: i }` on the first failure.
/// `Pending` is reported before validation; a rejected batch reports
/// nothing after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Pending,
    Running { completed: usize, total: usize },
    Completed { total: usize },
    /// `at` is the 1-based index of the file that failed.
    Failed { at: usize, total: usize },
}

impl BatchState {
    /// Completed fraction in `[0.0, 1.0]`.
    ///
    /// A failed batch reports the fraction reached before the failure.
    pub fn fraction(&self) -> f64 {
        match *self {
            BatchState::Pending => 0.0,
            BatchState::Running { completed, total } => ratio(completed, total),
            BatchState::Completed { .. } => 1.0,
            BatchState::Failed { at, total } => ratio(at.saturating_sub(1), total),
        }
    }
}

fn ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        done as f64 / total as f64
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchState::Pending => write!(f, "pending"),
            BatchState::Running { completed, total } => write!(f, "running {completed}/{total}"),
            BatchState::Completed { total } => write!(f, "completed {total}/{total}"),
            BatchState::Failed { at, total } => write!(f, "failed at {at}/{total}"),
        }
    }
}

/// Called by the batch orchestrator as it works through the files.
///
/// All methods default to no-ops so callers only override what they use.
/// Files are processed one at a time, so calls never overlap within a batch.
pub trait BatchProgressCallback: Send + Sync {
    /// Called on every state transition, including the first `Running(0/n)`.
    fn on_progress(&self, state: &BatchState) {
        let _ = state;
    }

    /// Called before a file is staged and handed to the converter.
    ///
    /// # Arguments
    /// * `index` — 1-based position in the batch
    /// * `total` — number of files in the batch
    /// * `name`  — uploaded file name
    fn on_file_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a file converted successfully.
    fn on_file_complete(&self, index: usize, total: usize, name: &str, char_count: usize) {
        let _ = (index, total, name, char_count);
    }

    /// Called when a file failed; the batch stops right after.
    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }
}

/// Forwards progress events to `tracing`.
pub struct LogProgressCallback;

impl BatchProgressCallback for LogProgressCallback {
    fn on_file_complete(&self, index: usize, total: usize, name: &str, char_count: usize) {
        info!("Converted {}/{} '{}' ({} chars)", index, total, name, char_count);
    }

    fn on_file_error(&self, index: usize, total: usize, name: &str, error: &str) {
        warn!("Conversion of {}/{} '{}' failed: {}", index, total, name, error);
    }
}

/// Convenience alias for the type held by the orchestrator.
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
