use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// A scalar value in a record's format-specific `extra` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for ExtraValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtraValue::Bool(v) => write!(f, "{v}"),
            ExtraValue::Integer(v) => write!(f, "{v}"),
            ExtraValue::Float(v) => write!(f, "{v}"),
            ExtraValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for ExtraValue {
    fn from(value: &str) -> Self {
        ExtraValue::Text(value.to_string())
    }
}

impl From<String> for ExtraValue {
    fn from(value: String) -> Self {
        ExtraValue::Text(value)
    }
}

impl From<i64> for ExtraValue {
    fn from(value: i64) -> Self {
        ExtraValue::Integer(value)
    }
}

impl From<u32> for ExtraValue {
    fn from(value: u32) -> Self {
        ExtraValue::Integer(i64::from(value))
    }
}

impl From<f64> for ExtraValue {
    fn from(value: f64) -> Self {
        ExtraValue::Float(value)
    }
}

impl From<bool> for ExtraValue {
    fn from(value: bool) -> Self {
        ExtraValue::Bool(value)
    }
}

/// One row of scan output. Produced for every accepted candidate file, even
/// when probing failed; in that case `error` is set and only the
/// filesystem-derived fields are guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: Option<SystemTime>,
    pub kind: MediaKind,
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
    pub error: Option<String>,
}

impl MediaRecord {
    /// A record carrying only what the filesystem knows about the file.
    pub fn from_fs(
        path: impl Into<PathBuf>,
        kind: MediaKind,
        size_bytes: u64,
        modified_at: Option<SystemTime>,
    ) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            modified_at,
            kind,
            duration_seconds: None,
            resolution: None,
            fps: None,
            codec: None,
            pixel_format: None,
            color_space: None,
            bit_depth: None,
            bitrate: None,
            rotation: None,
            extra: BTreeMap::new(),
            error: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub records: Vec<MediaRecord>,
    pub total_files: u64,
    pub total_size_bytes: u64,
    pub cancelled: bool,
}

impl ScanResult {
    pub fn failed_files(&self) -> u64 {
        self.records.iter().filter(|r| !r.is_ok()).count() as u64
    }
}
