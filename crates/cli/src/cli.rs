use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use mediameta_core::probe::ProbeBackend;

#[derive(Parser)]
#[command(name = "mediameta")]
#[command(author, version, about = "Catalog technical metadata of video and audio files")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a folder tree and export one record per media file
    Scan {
        /// Folder to scan (defaults to the last scanned folder)
        root: Option<PathBuf>,

        /// Where to write the JSON export (defaults to <root>/media_metadata.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Group records by parent folder in the export
        #[arg(long)]
        group_by_folder: bool,

        /// Metadata backend
        #[arg(long, value_enum, default_value_t = Backend::Auto)]
        backend: Backend,

        /// Path to the ffprobe executable
        #[arg(long, env = "MEDIAMETA_FFPROBE")]
        ffprobe: Option<PathBuf>,

        /// Seconds to wait for a single probe before giving up on the file
        #[arg(long, env = "MEDIAMETA_PROBE_TIMEOUT", default_value_t = 30)]
        timeout: u64,

        /// Do not draw a progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Probe a single media file and display its metadata
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Metadata backend
        #[arg(long, value_enum, default_value_t = Backend::Auto)]
        backend: Backend,

        /// Path to the ffprobe executable
        #[arg(long, env = "MEDIAMETA_FFPROBE")]
        ffprobe: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// ffprobe when installed, otherwise the built-in audio reader
    Auto,
    Ffprobe,
    /// Built-in audio reader; video files are recorded as unsupported
    Native,
}

impl From<Backend> for ProbeBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Auto => ProbeBackend::Auto,
            Backend::Ffprobe => ProbeBackend::Ffprobe,
            Backend::Native => ProbeBackend::Native,
        }
    }
}
