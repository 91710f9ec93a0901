//! Progress and log callbacks for conversion runs.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! percent-complete updates and human-readable status lines as the pipeline
//! moves through each file.
//!
//! Hosts that only need the two plain callbacks (an integer percent and a
//! status string) can wrap closures in [`FnProgressCallback`].
//!
//! # Example
//!
//! ```rust
//! use sheet2geo::{ConversionConfig, FnProgressCallback, ProgressCallback};
//! use std::sync::Arc;
//!
//! let cb = FnProgressCallback::new(
//!     |percent| eprintln!("{percent}%"),
//!     |message| eprintln!("{message}"),
//! );
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(cb) as ProgressCallback)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the conversion pipeline as it processes files.
///
/// Implementations must be `Send + Sync` so a host can run the conversion on
/// a worker thread and marshal events back to its UI thread. All methods have
/// default no-op implementations so callers only override what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Overall percent complete, in `[0, 100]`, non-decreasing within a run.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// A human-readable status or warning line.
    fn on_log(&self, message: &str) {
        let _ = message;
    }

    /// Called before a file is loaded.
    ///
    /// # Arguments
    /// * `file_index`: 1-indexed position in the batch
    /// * `total_files`: batch size (1 in single-file mode)
    fn on_file_start(&self, file_index: usize, total_files: usize, path: &Path) {
        let _ = (file_index, total_files, path);
    }

    /// Called when every output of a file has been written.
    ///
    /// # Arguments
    /// * `tables`: number of tables converted from the file
    fn on_file_complete(&self, file_index: usize, total_files: usize, tables: usize) {
        let _ = (file_index, total_files, tables);
    }

    /// Called when a file fails and the batch moves on.
    fn on_file_error(&self, file_index: usize, total_files: usize, error: &str) {
        let _ = (file_index, total_files, error);
    }

    /// Called once after every file of a folder has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Adapter turning a percent closure and a log closure into a callback.
pub struct FnProgressCallback<P, L> {
    progress: P,
    log: L,
}

impl<P, L> FnProgressCallback<P, L>
where
    P: Fn(u8) + Send + Sync,
    L: Fn(&str) + Send + Sync,
{
    pub fn new(progress: P, log: L) -> Self {
        Self { progress, log }
    }
}

impl<P, L> ConversionProgressCallback for FnProgressCallback<P, L>
where
    P: Fn(u8) + Send + Sync,
    L: Fn(&str) + Send + Sync,
{
    fn on_progress(&self, percent: u8) {
        (self.progress)(percent);
    }

    fn on_log(&self, message: &str) {
        (self.log)(message);
    }
}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

// ── Aggregation ──────────────────────────────────────────────────────────

/// Per-file milestones, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Loaded,
    Normalized,
    ImagesExtracted,
    GeoJsonWritten,
    ShapefileWritten,
}

impl Milestone {
    /// Per-file percent reached at this milestone.
    pub fn percent(self) -> u8 {
        match self {
            Milestone::Loaded => 20,
            Milestone::Normalized => 40,
            Milestone::ImagesExtracted => 60,
            Milestone::GeoJsonWritten => 80,
            Milestone::ShapefileWritten => 100,
        }
    }
}

/// Maps `(file_index, total_files, file_percent)` to an overall percent.
///
/// For file `i` (1-indexed) of `n` at per-file percent `p` the overall value
/// is `round(((i - 1 + p / 100) / n) * 100)`. Reported values are clamped to
/// never go backwards.
#[derive(Debug, Clone)]
pub struct ProgressAggregator {
    total_files: usize,
    last: u8,
}

impl ProgressAggregator {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files: total_files.max(1),
            last: 0,
        }
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    /// Overall percent for the given position, without side effects.
    pub fn overall(&self, file_index: usize, file_percent: u8) -> u8 {
        let i = file_index.clamp(1, self.total_files) as f64;
        let p = f64::from(file_percent.min(100)) / 100.0;
        let overall = ((i - 1.0 + p) / self.total_files as f64) * 100.0;
        overall.round().clamp(0.0, 100.0) as u8
    }

    /// Record a position and return the value to report (monotone).
    pub fn advance(&mut self, file_index: usize, file_percent: u8) -> u8 {
        self.last = self.last.max(self.overall(file_index, file_percent));
        self.last
    }
}

/// Fans pipeline events out to the configured callback.
pub(crate) struct Reporter<'a> {
    callback: Option<&'a ProgressCallback>,
    aggregator: ProgressAggregator,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(callback: Option<&'a ProgressCallback>, total_files: usize) -> Self {
        Self {
            callback,
            aggregator: ProgressAggregator::new(total_files),
        }
    }

    pub(crate) fn total_files(&self) -> usize {
        self.aggregator.total_files()
    }

    pub(crate) fn milestone(&mut self, file_index: usize, milestone: Milestone) {
        let percent = self.aggregator.advance(file_index, milestone.percent());
        if let Some(cb) = self.callback {
            cb.on_progress(percent);
        }
    }

    pub(crate) fn log(&self, message: &str) {
        if let Some(cb) = self.callback {
            cb.on_log(message);
        }
    }

    pub(crate) fn callback(&self) -> Option<&'a ProgressCallback> {
        self.callback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        percents: Mutex<Vec<u8>>,
        lines: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for Recorder {
        fn on_progress(&self, percent: u8) {
            self.percents.lock().unwrap().push(percent);
        }

        fn on_log(&self, message: &str) {
            self.lines.lock().unwrap().push(message.to_string());
        }
    }

    const MILESTONES: [Milestone; 5] = [
        Milestone::Loaded,
        Milestone::Normalized,
        Milestone::ImagesExtracted,
        Milestone::GeoJsonWritten,
        Milestone::ShapefileWritten,
    ];

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_progress(20);
        cb.on_log("Processing file: a.xlsx");
        cb.on_file_start(1, 1, Path::new("a.xlsx"));
        cb.on_file_complete(1, 1, 2);
        cb.on_file_error(1, 1, "boom");
        cb.on_batch_complete(1, 0);
    }

    #[test]
    fn single_file_maps_identity() {
        let agg = ProgressAggregator::new(1);
        for m in MILESTONES {
            assert_eq!(agg.overall(1, m.percent()), m.percent());
        }
    }

    #[test]
    fn batch_formula_matches_examples() {
        let agg = ProgressAggregator::new(3);
        assert_eq!(agg.overall(1, 20), 7);
        assert_eq!(agg.overall(1, 100), 33);
        assert_eq!(agg.overall(2, 50), 50);
        assert_eq!(agg.overall(3, 100), 100);
    }

    #[test]
    fn batch_of_three_is_monotonic_and_ends_at_100() {
        let recorder = Arc::new(Recorder::default());
        let cb: ProgressCallback = recorder.clone();
        let mut reporter = Reporter::new(Some(&cb), 3);
        for file in 1..=3 {
            for m in MILESTONES {
                reporter.milestone(file, m);
            }
        }
        let seen = recorder.percents.lock().unwrap().clone();
        assert_eq!(seen.len(), 15);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "got {seen:?}");
        assert_eq!(*seen.last().unwrap(), 100);
    }

    #[test]
    fn advance_never_goes_backwards() {
        let mut agg = ProgressAggregator::new(2);
        assert_eq!(agg.advance(2, 40), 70);
        assert_eq!(agg.advance(1, 100), 70);
        assert_eq!(agg.advance(2, 100), 100);
    }

    #[test]
    fn zero_files_treated_as_one() {
        let agg = ProgressAggregator::new(0);
        assert_eq!(agg.total_files(), 1);
        assert_eq!(agg.overall(1, 60), 60);
    }

    #[test]
    fn fn_callback_forwards_both_channels() {
        let percents = Arc::new(Mutex::new(Vec::new()));
        let lines = Arc::new(Mutex::new(Vec::new()));
        let (p, l) = (percents.clone(), lines.clone());
        let cb = FnProgressCallback::new(
            move |v| p.lock().unwrap().push(v),
            move |m: &str| l.lock().unwrap().push(m.to_string()),
        );
        cb.on_progress(40);
        cb.on_log("Conversion completed");
        assert_eq!(*percents.lock().unwrap(), vec![40]);
        assert_eq!(*lines.lock().unwrap(), vec!["Conversion completed".to_string()]);
    }

    #[test]
    fn reporter_without_callback_is_silent() {
        let mut reporter = Reporter::new(None, 2);
        reporter.milestone(1, Milestone::Loaded);
        reporter.log("ignored");
        assert_eq!(reporter.total_files(), 2);
    }
}
