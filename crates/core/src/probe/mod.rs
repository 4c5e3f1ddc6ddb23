//! Per-file metadata probing.
//!
//! [`MetadataProbe`] owns a [`MediaProber`] backend and turns whatever the
//! backend reports, including failures, into exactly one [`MediaRecord`].

pub mod audio;
pub mod ffprobe;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ProbeError;
use crate::models::{ExtraValue, MediaKind, MediaRecord};

pub use audio::SymphoniaProber;
pub use ffprobe::FfprobeProber;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Header-derived facts about one file, as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub duration_seconds: Option<f64>,
    pub resolution: Option<(u32, u32)>,
    pub fps: Option<f64>,
    pub codec: Option<String>,
    pub pixel_format: Option<String>,
    pub color_space: Option<String>,
    pub bit_depth: Option<u32>,
    pub bitrate: Option<u64>,
    pub rotation: Option<i32>,
    pub extra: BTreeMap<String, ExtraValue>,
}

pub trait MediaProber {
    fn name(&self) -> &'static str;

    fn probe(&self, path: &Path, kind: MediaKind) -> Result<ProbeReport, ProbeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeBackend {
    /// ffprobe when it can be found, the pure-Rust audio prober otherwise.
    #[default]
    Auto,
    Ffprobe,
    Native,
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub backend: ProbeBackend,
    pub ffprobe_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            backend: ProbeBackend::Auto,
            ffprobe_path: None,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

pub struct MetadataProbe {
    prober: Box<dyn MediaProber>,
}

impl std::fmt::Debug for MetadataProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataProbe")
            .field("backend", &self.prober.name())
            .finish()
    }
}

impl MetadataProbe {
    pub fn new(prober: impl MediaProber + 'static) -> Self {
        Self {
            prober: Box::new(prober),
        }
    }

    /// Picks a backend according to `config`. Selecting ffprobe explicitly
    /// when it is missing still yields a probe; every file then records the
    /// missing-tool error.
    pub fn detect(config: &ProbeConfig) -> Self {
        let located = match config.backend {
            ProbeBackend::Native => None,
            ProbeBackend::Auto | ProbeBackend::Ffprobe => {
                FfprobeProber::locate(config.ffprobe_path.as_deref(), config.timeout)
            }
        };

        let probe = match (config.backend, located) {
            (_, Some(ffprobe)) => Self::new(ffprobe),
            (ProbeBackend::Ffprobe, None) => Self::new(FfprobeProber::new(
                config
                    .ffprobe_path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(ffprobe::FFPROBE)),
                config.timeout,
            )),
            _ => Self::new(SymphoniaProber),
        };
        tracing::info!(backend = probe.backend_name(), "metadata probe ready");
        probe
    }

    pub fn backend_name(&self) -> &'static str {
        self.prober.name()
    }

    /// Produces the record for one file. Never fails: problems end up in
    /// `MediaRecord::error`.
    pub fn probe(&self, path: &Path, kind: MediaKind) -> MediaRecord {
        let md = match fs::metadata(path) {
            Ok(md) => md,
            Err(err) => return Self::failed(path, kind, ProbeError::Io(err)),
        };
        let mut record = MediaRecord::from_fs(path, kind, md.len(), md.modified().ok());

        if md.len() == 0 {
            record.error = Some(ProbeError::Empty.to_string());
            return record;
        }

        if let Ok(Some(sniffed)) = infer::get_from_path(path) {
            record
                .extra
                .insert("mime_type".to_string(), sniffed.mime_type().into());
        }

        match self.prober.probe(path, kind) {
            Ok(report) => apply_report(&mut record, report),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "probe failed");
                record.error = Some(err.to_string());
            }
        }
        record
    }

    /// Record for a file that could not even be stat-ed.
    pub fn failed(path: &Path, kind: MediaKind, err: ProbeError) -> MediaRecord {
        let mut record = MediaRecord::from_fs(path, kind, 0, None);
        record.error = Some(err.to_string());
        record
    }
}

fn apply_report(record: &mut MediaRecord, report: ProbeReport) {
    record.duration_seconds = report
        .duration_seconds
        .filter(|secs| secs.is_finite() && *secs >= 0.0);
    record.codec = report.codec;
    record.bit_depth = report.bit_depth;
    record.bitrate = report.bitrate;
    record.extra.extend(report.extra);

    if record.kind == MediaKind::Video {
        record.resolution = report.resolution;
        record.fps = report.fps.filter(|fps| fps.is_finite() && *fps > 0.0);
        record.pixel_format = report.pixel_format;
        record.color_space = report.color_space;
        record.rotation = report.rotation;
    }
}
