//! The hand-off point between a finished scan and whatever renders it.
//!
//! Exporters receive the finalized [`ScanResult`] exactly once per run. The
//! helpers here are the presentation conversions every exporter needs; none
//! of them is stored back into the model.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::models::{MediaRecord, ScanResult};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

pub trait ExportAdapter {
    type Error: std::error::Error + Send + Sync + 'static;

    fn export(&mut self, result: &ScanResult) -> Result<(), Self::Error>;
}

/// Renders seconds as `HH:MM:SS`, dropping the fractional part. Hours are not
/// wrapped at 24.
pub fn format_hms(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// Groups records by parent folder. Folders come out in path order and
/// records inside each folder are sorted by file name.
pub fn group_by_folder(records: &[MediaRecord]) -> BTreeMap<PathBuf, Vec<&MediaRecord>> {
    let mut grouped: BTreeMap<PathBuf, Vec<&MediaRecord>> = BTreeMap::new();
    for record in records {
        let folder = record
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        grouped.entry(folder).or_default().push(record);
    }
    for records in grouped.values_mut() {
        records.sort_by_key(|record| record.file_name());
    }
    grouped
}
