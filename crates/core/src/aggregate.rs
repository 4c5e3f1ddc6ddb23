use std::path::PathBuf;

use crate::models::{MediaRecord, ScanResult};

/// Accumulates records in fold order. Consumed by [`finalize`], after which
/// the result can no longer change.
///
/// [`finalize`]: AggregationEngine::finalize
#[derive(Debug)]
pub struct AggregationEngine {
    root: PathBuf,
    records: Vec<MediaRecord>,
    total_size_bytes: u64,
}

impl AggregationEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: Vec::new(),
            total_size_bytes: 0,
        }
    }

    pub fn fold(&mut self, record: MediaRecord) {
        self.total_size_bytes += record.size_bytes;
        self.records.push(record);
    }

    pub fn total_files(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.total_size_bytes
    }

    pub fn finalize(self, cancelled: bool) -> ScanResult {
        ScanResult {
            root: self.root,
            total_files: self.records.len() as u64,
            total_size_bytes: self.total_size_bytes,
            records: self.records,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn fold_keeps_order_and_sums_sizes() {
        let mut engine = AggregationEngine::new("/media");
        engine.fold(MediaRecord::from_fs("/media/b.mp3", MediaKind::Audio, 7, None));
        let mut failed = MediaRecord::from_fs("/media/a.mp4", MediaKind::Video, 5, None);
        failed.error = Some("truncated".into());
        engine.fold(failed);
        assert_eq!(engine.total_files(), 2);
        assert_eq!(engine.total_size_bytes(), 12);

        let result = engine.finalize(false);
        assert_eq!(result.total_files, 2);
        assert_eq!(result.total_size_bytes, 12);
        assert_eq!(result.failed_files(), 1);
        assert!(!result.cancelled);
        let names: Vec<_> = result.records.iter().map(|r| r.file_name()).collect();
        assert_eq!(names, vec!["b.mp3", "a.mp4"]);
    }

    #[test]
    fn empty_engine_finalizes_to_empty_result() {
        let result = AggregationEngine::new("/empty").finalize(true);
        assert_eq!(result.total_files, 0);
        assert_eq!(result.total_size_bytes, 0);
        assert!(result.records.is_empty());
        assert!(result.cancelled);
        assert_eq!(result.root, std::path::PathBuf::from("/empty"));
    }
}
