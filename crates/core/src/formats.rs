use std::path::Path;

use crate::models::MediaKind;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mkv", "mov"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    Video,
    Audio,
    Unsupported,
}

impl FileClass {
    pub fn media_kind(self) -> Option<MediaKind> {
        match self {
            FileClass::Video => Some(MediaKind::Video),
            FileClass::Audio => Some(MediaKind::Audio),
            FileClass::Unsupported => None,
        }
    }
}

/// Classifies a path by its extension alone. Never touches the filesystem.
pub fn classify(path: &Path) -> FileClass {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return FileClass::Unsupported;
    };
    let ext = ext.to_ascii_lowercase();
    if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        FileClass::Video
    } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        FileClass::Audio
    } else {
        FileClass::Unsupported
    }
}
