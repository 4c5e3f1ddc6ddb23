use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::models::MediaRecord;

/// Cooperative stop flag shared between the scan worker and its controller.
/// Checked between files only; a probe in flight always finishes.
#[derive(Clone, Debug, Default)]
pub struct ScanCancelToken {
    cancelled: Arc<AtomicBool>,
}

impl ScanCancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanProgress {
    pub processed: u64,
    pub total: u64,
    pub bytes_processed: u64,
    pub current_path: Option<PathBuf>,
}

impl ScanProgress {
    pub fn percent(&self) -> f64 {
        percent(self.processed, self.total)
    }
}

/// `processed / total` as a percentage in `[0, 100]`. An empty run is
/// complete from the start.
pub fn percent(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (processed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

pub struct ProgressReporter<'a, F> {
    cancel: Option<&'a ScanCancelToken>,
    on_progress: F,
    current: ScanProgress,
}

impl<'a, F> ProgressReporter<'a, F>
where
    F: FnMut(&ScanProgress),
{
    pub fn new(cancel: Option<&'a ScanCancelToken>, on_progress: F) -> Self {
        Self {
            cancel,
            on_progress,
            current: ScanProgress::default(),
        }
    }

    /// Announces the expected number of files before any is processed.
    pub fn start(&mut self, total: u64) {
        self.update(0, total);
    }

    pub fn update(&mut self, processed: u64, total: u64) {
        self.current.processed = processed;
        // Files created after the prescan can push the count past the total.
        self.current.total = total.max(processed);
        (self.on_progress)(&self.current);
    }

    /// Call once per file, after its record exists.
    pub fn file_done(&mut self, record: &MediaRecord) {
        self.current.bytes_processed = self
            .current
            .bytes_processed
            .saturating_add(record.size_bytes);
        self.current.current_path = Some(record.path.clone());
        let processed = self.current.processed + 1;
        self.update(processed, self.current.total);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(ScanCancelToken::is_cancelled)
    }

    pub fn percent(&self) -> f64 {
        self.current.percent()
    }
}
