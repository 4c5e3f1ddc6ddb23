use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use mediameta_core::export::{bytes_to_gb, bytes_to_mb, format_hms, group_by_folder, ExportAdapter};
use mediameta_core::{ExtraValue, MediaRecord, ScanResult};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct RecordDto {
    filename: String,
    path: String,
    kind: &'static str,
    size_bytes: u64,
    size_mb: f64,
    modified_unix: Option<f64>,
    modified_date: Option<String>,
    duration_seconds: Option<f64>,
    duration: Option<String>,
    resolution: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<f64>,
    codec: Option<String>,
    pixel_format: Option<String>,
    bit_depth: Option<u32>,
    rotation: Option<i32>,
    bitrate: Option<u64>,
    color_space: Option<String>,
    extra: BTreeMap<String, ExtraValue>,
    error: Option<String>,
}

impl From<&MediaRecord> for RecordDto {
    fn from(record: &MediaRecord) -> Self {
        Self {
            filename: record.file_name(),
            path: record.path.display().to_string(),
            kind: record.kind.as_str(),
            size_bytes: record.size_bytes,
            size_mb: round2(bytes_to_mb(record.size_bytes)),
            modified_unix: record.modified_at.and_then(unix_seconds),
            modified_date: record.modified_at.map(local_date),
            duration_seconds: record.duration_seconds.map(round2),
            duration: record.duration_seconds.map(format_hms),
            resolution: record.resolution.map(|(w, h)| format!("{w}x{h}")),
            width: record.resolution.map(|(w, _)| w),
            height: record.resolution.map(|(_, h)| h),
            fps: record.fps.map(round2),
            codec: record.codec.clone(),
            pixel_format: record.pixel_format.clone(),
            bit_depth: record.bit_depth,
            rotation: record.rotation,
            bitrate: record.bitrate,
            color_space: record.color_space.clone(),
            extra: record.extra.clone(),
            error: record.error.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScanDocument {
    root: String,
    total_files: u64,
    total_size_bytes: u64,
    total_size_gb: f64,
    failed_files: u64,
    cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<Vec<RecordDto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folders: Option<BTreeMap<String, Vec<RecordDto>>>,
}

/// Writes the scan as pretty-printed JSON, either as one flat list in scan
/// order or grouped by parent folder.
pub struct JsonExporter<W> {
    writer: W,
    group_by_folder: bool,
}

impl<W: Write> JsonExporter<W> {
    pub fn new(writer: W, group_by_folder: bool) -> Self {
        Self {
            writer,
            group_by_folder,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ExportAdapter for JsonExporter<W> {
    type Error = io::Error;

    fn export(&mut self, result: &ScanResult) -> io::Result<()> {
        let mut doc = ScanDocument {
            root: result.root.display().to_string(),
            total_files: result.total_files,
            total_size_bytes: result.total_size_bytes,
            total_size_gb: round2(bytes_to_gb(result.total_size_bytes)),
            failed_files: result.failed_files(),
            cancelled: result.cancelled,
            records: None,
            folders: None,
        };
        if self.group_by_folder {
            doc.folders = Some(
                group_by_folder(&result.records)
                    .into_iter()
                    .map(|(folder, records)| {
                        let rows = records.into_iter().map(RecordDto::from).collect();
                        (folder.display().to_string(), rows)
                    })
                    .collect(),
            );
        } else {
            doc.records = Some(result.records.iter().map(RecordDto::from).collect());
        }

        serde_json::to_writer_pretty(&mut self.writer, &doc)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Human-readable totals for the terminal.
pub struct SummaryExporter<W> {
    writer: W,
}

impl<W: Write> SummaryExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ExportAdapter for SummaryExporter<W> {
    type Error = io::Error;

    fn export(&mut self, result: &ScanResult) -> io::Result<()> {
        writeln!(self.writer, "Scanned {}", result.root.display())?;
        writeln!(
            self.writer,
            "Found {} media files ({:.2} GB)",
            result.total_files,
            bytes_to_gb(result.total_size_bytes)
        )?;
        let failed = result.failed_files();
        if failed > 0 {
            writeln!(self.writer, "{failed} files could not be probed")?;
        }
        if result.cancelled {
            writeln!(self.writer, "Scan cancelled; results are partial")?;
        }
        Ok(())
    }
}

pub fn record_json(record: &MediaRecord) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&RecordDto::from(record))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn unix_seconds(time: SystemTime) -> Option<f64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs_f64())
}

fn local_date(time: SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
