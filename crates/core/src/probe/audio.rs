//! Pure-Rust audio probing via Symphonia. Used when ffprobe is unavailable.

use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, Value};
use symphonia::core::probe::Hint;

use super::{MediaProber, ProbeReport};
use crate::error::ProbeError;
use crate::models::MediaKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProber;

impl MediaProber for SymphoniaProber {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn probe(&self, path: &Path, kind: MediaKind) -> Result<ProbeReport, ProbeError> {
        if kind == MediaKind::Video {
            return Err(ProbeError::Unsupported(
                "video probing requires ffprobe".into(),
            ));
        }

        let file = File::open(path)?;
        let size_bytes = file.metadata().map(|md| md.len()).ok();
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProbeError::Decode(e.to_string()))?;

        let params = probed
            .format
            .default_track()
            .map(|track| track.codec_params.clone())
            .ok_or_else(|| ProbeError::Unsupported("no audio track found".into()))?;

        let mut report = ProbeReport::default();

        if let (Some(time_base), Some(n_frames)) = (params.time_base, params.n_frames) {
            let time = time_base.calc_time(n_frames);
            report.duration_seconds = Some(time.seconds as f64 + time.frac);
        }

        report.codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|descriptor| descriptor.short_name.to_string());
        report.bit_depth = params.bits_per_sample;

        if let (Some(size), Some(secs)) = (size_bytes, report.duration_seconds) {
            if secs > 0.0 {
                report.bitrate = Some((size as f64 * 8.0 / secs).round() as u64);
            }
        }

        if let Some(rate) = params.sample_rate {
            report.extra.insert("sample_rate".into(), rate.into());
        }
        if let Some(channels) = params.channels {
            report
                .extra
                .insert("channels".into(), (channels.count() as u32).into());
        }

        if let Some(log) = probed.metadata.get() {
            if let Some(revision) = log.current() {
                collect_tags(revision, &mut report);
            }
        }
        let container_tags = probed.format.metadata();
        if let Some(revision) = container_tags.current() {
            collect_tags(revision, &mut report);
        }

        Ok(report)
    }
}

fn collect_tags(revision: &MetadataRevision, report: &mut ProbeReport) {
    for tag in revision.tags() {
        if let Value::String(text) = &tag.value {
            if !text.is_empty() {
                report
                    .extra
                    .insert(format!("tag:{}", tag.key), text.as_str().into());
            }
        }
    }
}
