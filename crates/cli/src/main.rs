mod cli;
mod export;
mod prefs;
mod runner;

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mediameta_core::export::ExportAdapter;
use mediameta_core::formats::classify;
use mediameta_core::probe::{MetadataProbe, ProbeConfig, DEFAULT_PROBE_TIMEOUT};
use mediameta_core::scan::{resolve_root, ScanConfig};

use crate::cli::{Backend, Cli, Commands};
use crate::export::{JsonExporter, SummaryExporter};
use crate::prefs::LastRootStore;

const DEFAULT_EXPORT_NAME: &str = "media_metadata.json";

fn main() {
    if let Err(err) = real_main() {
        eprintln!("error: {err:#}");
        std::process::exit(2);
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Scan {
            root,
            output,
            group_by_folder,
            backend,
            ffprobe,
            timeout,
            no_progress,
        } => {
            let probe = probe_config(backend, ffprobe, Duration::from_secs(timeout.max(1)));
            run_scan(root, output, group_by_folder, probe, !no_progress)
        }
        Commands::Probe {
            file,
            backend,
            ffprobe,
            json,
        } => {
            let probe = probe_config(backend, ffprobe, DEFAULT_PROBE_TIMEOUT);
            probe_file(&file, probe, json)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "mediameta=debug,mediameta_core=debug"
    } else {
        "mediameta=warn,mediameta_core=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn probe_config(backend: Backend, ffprobe: Option<PathBuf>, timeout: Duration) -> ProbeConfig {
    ProbeConfig {
        backend: backend.into(),
        ffprobe_path: ffprobe,
        timeout,
    }
}

fn run_scan(
    root: Option<PathBuf>,
    output: Option<PathBuf>,
    group_by_folder: bool,
    probe: ProbeConfig,
    show_progress: bool,
) -> Result<()> {
    let store = LastRootStore::default_location();
    let root = match root {
        Some(root) => root,
        None => store
            .load()
            .context("no folder given and no previous scan to reuse")?,
    };
    let root = resolve_root(&root)?;
    if let Err(err) = store.save(&root) {
        tracing::warn!(file = %store.path().display(), %err, "could not remember scanned folder");
    }

    let output = output.unwrap_or_else(|| root.join(DEFAULT_EXPORT_NAME));
    let mut config = ScanConfig::for_folder(&root);
    config.probe = probe;

    let result = runner::run_scan(config, show_progress)?;

    let file = File::create(&output)
        .with_context(|| format!("cannot create {}", output.display()))?;
    JsonExporter::new(BufWriter::new(file), group_by_folder)
        .export(&result)
        .with_context(|| format!("cannot write {}", output.display()))?;

    SummaryExporter::new(io::stdout().lock()).export(&result)?;
    println!("Wrote {}", output.display());
    Ok(())
}

fn probe_file(file: &Path, config: ProbeConfig, json: bool) -> Result<()> {
    if !file.is_file() {
        bail!("not a file: {}", file.display());
    }
    let Some(kind) = classify(file).media_kind() else {
        bail!("not a recognized media file: {}", file.display());
    };

    let record = MetadataProbe::detect(&config).probe(file, kind);
    if json {
        println!("{}", export::record_json(&record)?);
        return Ok(());
    }

    println!("{} ({})", record.path.display(), record.kind.as_str());
    println!("  size: {} bytes", record.size_bytes);
    if let Some(secs) = record.duration_seconds {
        println!("  duration: {}", mediameta_core::export::format_hms(secs));
    }
    if let Some((w, h)) = record.resolution {
        println!("  resolution: {w}x{h}");
    }
    if let Some(fps) = record.fps {
        println!("  fps: {fps:.3}");
    }
    if let Some(codec) = &record.codec {
        println!("  codec: {codec}");
    }
    if let Some(bitrate) = record.bitrate {
        println!("  bitrate: {bitrate} bit/s");
    }
    for (key, value) in &record.extra {
        println!("  {key}: {value}");
    }
    if let Some(error) = &record.error {
        println!("  error: {error}");
    }
    Ok(())
}
