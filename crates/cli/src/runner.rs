use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use mediameta_core::probe::MetadataProbe;
use mediameta_core::progress::{ScanCancelToken, ScanProgress};
use mediameta_core::scan::{scan_with_probe, ScanConfig};
use mediameta_core::ScanResult;
use tokio::sync::watch;

const BAR_TEMPLATE: &str = "{spinner} [{bar:40}] {pos}/{len} ({percent}%) {wide_msg}";

/// Runs one scan on a blocking worker while the foreground renders progress
/// and listens for Ctrl-C.
pub fn run_scan(config: ScanConfig, show_progress: bool) -> Result<ScanResult> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run_scan_async(config, show_progress))
}

async fn run_scan_async(config: ScanConfig, show_progress: bool) -> Result<ScanResult> {
    let cancel = ScanCancelToken::new();
    let (progress_tx, mut progress_rx) = watch::channel(ScanProgress::default());

    let worker_cancel = cancel.clone();
    let mut worker = tokio::task::spawn_blocking(move || {
        let probe = MetadataProbe::detect(&config.probe);
        scan_with_probe(&config, &probe, Some(&worker_cancel), |progress| {
            let _ = progress_tx.send(progress.clone());
        })
    });

    let bar = progress_bar(show_progress);
    let mut progress_open = true;
    let mut interrupted = false;

    let joined = loop {
        tokio::select! {
            joined = &mut worker => break joined,
            changed = progress_rx.changed(), if progress_open => {
                if changed.is_err() {
                    progress_open = false;
                    continue;
                }
                let progress = progress_rx.borrow_and_update().clone();
                render(&bar, &progress);
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                match signal {
                    Ok(()) => {
                        cancel.cancel();
                        bar.println("cancelling: waiting for current file to finish");
                    }
                    Err(err) => tracing::warn!(%err, "cannot listen for ctrl-c"),
                }
            }
        }
    };
    bar.finish_and_clear();

    let result = joined.context("scan worker failed")??;
    Ok(result)
}

fn progress_bar(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar
}

fn render(bar: &ProgressBar, progress: &ScanProgress) {
    bar.set_length(progress.total);
    bar.set_position(progress.processed);
    if let Some(path) = &progress.current_path {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        bar.set_message(name);
    }
}
