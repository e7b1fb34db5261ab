//! Progress-callback trait for extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to be told
//! when each content unit is sent to the model and when relevance filtering
//! begins. The pipeline is sequential, so events arrive in order on the
//! calling task.
//!
//! # Example
//!
//! ```rust
//! use edgequake_keywords::{ExtractionConfig, ExtractionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_unit_complete(&self, unit: usize, total: usize, keywords: usize) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("chunk {unit}/{total}: {keywords} candidates");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it moves through its stages.
///
/// All methods have no-op defaults so implementors only override what they
/// care about. Unit numbers are 1-indexed.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once after the input was loaded, before any model call.
    fn on_extraction_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// Called just before the prompt for a unit is sent.
    fn on_unit_start(&self, unit: usize, total_units: usize) {
        let _ = (unit, total_units);
    }

    /// Called when the model answered for a unit.
    ///
    /// `keywords` is the number of candidate strings parsed from the answer
    /// (before deduplication).
    fn on_unit_complete(&self, unit: usize, total_units: usize, keywords: usize) {
        let _ = (unit, total_units, keywords);
    }

    /// Called once before the embedding model is loaded.
    fn on_filter_start(&self, candidates: usize) {
        let _ = candidates;
    }

    /// Called once when the keyword line is ready.
    fn on_extraction_complete(&self, kept: usize, candidates: usize) {
        let _ = (kept, candidates);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        total: AtomicUsize,
        starts: AtomicUsize,
        keywords: AtomicUsize,
        kept: AtomicUsize,
    }

    impl ExtractionProgressCallback for TrackingCallback {
        fn on_extraction_start(&self, total_units: usize) {
            self.total.store(total_units, Ordering::SeqCst);
        }

        fn on_unit_start(&self, _unit: usize, _total_units: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_complete(&self, _unit: usize, _total_units: usize, keywords: usize) {
            self.keywords.fetch_add(keywords, Ordering::SeqCst);
        }

        fn on_extraction_complete(&self, kept: usize, _candidates: usize) {
            self.kept.store(kept, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_extraction_start(3);
        cb.on_unit_start(1, 3);
        cb.on_unit_complete(1, 3, 7);
        cb.on_filter_start(7);
        cb.on_extraction_complete(4, 7);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_extraction_start(2);
        tracker.on_unit_start(1, 2);
        tracker.on_unit_complete(1, 2, 3);
        tracker.on_unit_start(2, 2);
        tracker.on_unit_complete(2, 2, 5);
        tracker.on_filter_start(6);
        tracker.on_extraction_complete(4, 6);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.keywords.load(Ordering::SeqCst), 8);
        assert_eq!(tracker.kept.load(Ordering::SeqCst), 4);
    }
}
