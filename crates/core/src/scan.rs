use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::AggregationEngine;
use crate::error::{Error, ProbeError, Result};
use crate::formats::classify;
use crate::models::ScanResult;
use crate::probe::{MetadataProbe, ProbeConfig};
use crate::progress::{ProgressReporter, ScanCancelToken, ScanProgress};
use crate::walk::{DirectoryWalker, WalkEntry};

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub root: PathBuf,
    pub probe: ProbeConfig,
}

impl ScanConfig {
    pub fn for_folder(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            probe: ProbeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanTotals {
    pub files: u64,
    pub bytes: u64,
}

pub fn scan(config: &ScanConfig) -> Result<ScanResult> {
    scan_with_progress(config, None, |_| {})
}

pub fn scan_with_progress<F>(
    config: &ScanConfig,
    cancel: Option<&ScanCancelToken>,
    on_progress: F,
) -> Result<ScanResult>
where
    F: FnMut(&ScanProgress),
{
    let root = resolve_root(&config.root)?;
    let probe = MetadataProbe::detect(&config.probe);
    scan_root(&root, &probe, cancel, on_progress)
}

/// Runs one scan with an explicit probe. Files are probed one at a time in
/// walk order; the cancel token is consulted before each candidate.
pub fn scan_with_probe<F>(
    config: &ScanConfig,
    probe: &MetadataProbe,
    cancel: Option<&ScanCancelToken>,
    on_progress: F,
) -> Result<ScanResult>
where
    F: FnMut(&ScanProgress),
{
    let root = resolve_root(&config.root)?;
    scan_root(&root, probe, cancel, on_progress)
}

fn scan_root<F>(
    root: &Path,
    probe: &MetadataProbe,
    cancel: Option<&ScanCancelToken>,
    on_progress: F,
) -> Result<ScanResult>
where
    F: FnMut(&ScanProgress),
{
    let mut engine = AggregationEngine::new(root);
    let mut reporter = ProgressReporter::new(cancel, on_progress);

    let totals = match count_candidates(root, cancel) {
        Ok(totals) => totals,
        Err(Error::Cancelled) => {
            tracing::info!(root = %root.display(), "scan cancelled during prescan");
            return Ok(engine.finalize(true));
        }
        Err(err) => return Err(err),
    };
    tracing::info!(
        root = %root.display(),
        candidates = totals.files,
        bytes = totals.bytes,
        backend = probe.backend_name(),
        "starting scan"
    );
    reporter.start(totals.files);

    let mut entries = DirectoryWalker::new(root).walk();
    let mut cancelled = false;
    loop {
        if reporter.is_cancelled() {
            cancelled = true;
            break;
        }
        let Some(entry) = entries.next() else {
            break;
        };
        let Some(kind) = classify(entry.path()).media_kind() else {
            if let WalkEntry::Failed { path, error } = &entry {
                tracing::warn!(path = %path.display(), %error, "skipping unreadable entry");
            }
            continue;
        };

        let record = match entry {
            WalkEntry::File(path) => {
                tracing::debug!(path = %path.display(), "probing");
                probe.probe(&path, kind)
            }
            WalkEntry::Failed { path, error } => {
                MetadataProbe::failed(&path, kind, ProbeError::Io(error))
            }
        };
        if let Some(error) = &record.error {
            tracing::warn!(path = %record.path.display(), %error, "metadata unavailable");
        }

        reporter.file_done(&record);
        engine.fold(record);
    }

    let result = engine.finalize(cancelled);
    tracing::info!(
        files = result.total_files,
        bytes = result.total_size_bytes,
        failed = result.failed_files(),
        cancelled = result.cancelled,
        "scan finished"
    );
    Ok(result)
}

/// Counts candidate files and their bytes without probing anything.
pub fn prescan(config: &ScanConfig, cancel: Option<&ScanCancelToken>) -> Result<ScanTotals> {
    let root = resolve_root(&config.root)?;
    count_candidates(&root, cancel)
}

fn count_candidates(root: &Path, cancel: Option<&ScanCancelToken>) -> Result<ScanTotals> {
    let mut totals = ScanTotals::default();
    for entry in DirectoryWalker::new(root).candidates() {
        if cancel.is_some_and(ScanCancelToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        totals.files += 1;
        if let Ok(md) = fs::metadata(entry.path()) {
            totals.bytes = totals.bytes.saturating_add(md.len());
        }
    }
    Ok(totals)
}

pub fn validate_root(root: &Path) -> Result<()> {
    if !root.exists() {
        return Err(Error::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }
    Ok(())
}

/// Validates `root` and makes it absolute against the working directory.
/// Symlinks are left alone so record paths stay under the root as given.
pub fn resolve_root(root: &Path) -> Result<PathBuf> {
    validate_root(root)?;
    let absolute = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    Ok(absolute.components().collect())
}
