//! ffprobe-backed probing.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use wait_timeout::ChildExt;

use super::{MediaProber, ProbeReport};
use crate::error::ProbeError;
use crate::models::{ExtraValue, MediaKind};

pub const FFPROBE: &str = "ffprobe";

#[derive(Debug, Default, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    format_long_name: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    profile: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    color_space: Option<String>,
    bits_per_raw_sample: Option<String>,
    bits_per_sample: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    bit_rate: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    channel_layout: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FfprobeProber {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Finds ffprobe, preferring a configured path over a PATH lookup.
    pub fn locate(configured: Option<&Path>, timeout: Duration) -> Option<Self> {
        if let Some(path) = configured {
            if path.is_file() {
                return Some(Self::new(path, timeout));
            }
            tracing::warn!(path = %path.display(), "configured ffprobe not found");
        }
        which::which(FFPROBE).ok().map(|path| Self::new(path, timeout))
    }

    fn run(&self, path: &Path) -> Result<Vec<u8>, ProbeError> {
        let mut child = Command::new(&self.program)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::ToolNotFound(FFPROBE.to_string())
                } else {
                    ProbeError::Io(err)
                }
            })?;

        // The child stalls once a pipe fills, so both are drained off-thread.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Timeout {
                    tool: FFPROBE.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let stdout = stdout.map(join_drain).unwrap_or_default();
        let stderr = stderr.map(join_drain).unwrap_or_default();

        if !status.success() {
            let message = String::from_utf8_lossy(&stderr).trim().to_string();
            let message = if message.is_empty() {
                format!("exited with {status}")
            } else {
                message
            };
            return Err(ProbeError::tool_failed(FFPROBE, message));
        }
        Ok(stdout)
    }
}

impl MediaProber for FfprobeProber {
    fn name(&self) -> &'static str {
        FFPROBE
    }

    fn probe(&self, path: &Path, kind: MediaKind) -> Result<ProbeReport, ProbeError> {
        let stdout = self.run(path)?;
        let output: FfprobeOutput = serde_json::from_slice(&stdout)?;
        report_from_output(output, kind)
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join_drain(handle: thread::JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

pub(crate) fn parse_report(json: &str, kind: MediaKind) -> Result<ProbeReport, ProbeError> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    report_from_output(output, kind)
}

fn report_from_output(output: FfprobeOutput, kind: MediaKind) -> Result<ProbeReport, ProbeError> {
    if output.streams.is_empty() {
        return Err(ProbeError::Unsupported("no media streams found".into()));
    }

    let format = output.format.unwrap_or_default();
    let video = first_stream(&output.streams, "video");
    let audio = first_stream(&output.streams, "audio");
    let primary = match kind {
        MediaKind::Video => video.or(audio),
        MediaKind::Audio => audio,
    };

    let mut report = ProbeReport {
        duration_seconds: parse_f64(format.duration.as_deref())
            .or_else(|| primary.and_then(|s| parse_f64(s.duration.as_deref()))),
        bitrate: parse_u64(format.bit_rate.as_deref())
            .or_else(|| primary.and_then(|s| parse_u64(s.bit_rate.as_deref()))),
        ..ProbeReport::default()
    };

    if let Some(stream) = primary {
        report.codec = stream.codec_name.clone();
        report.bit_depth = parse_u32(stream.bits_per_raw_sample.as_deref())
            .or(stream.bits_per_sample)
            .filter(|depth| *depth > 0);
        if let Some(profile) = &stream.profile {
            report.extra.insert("profile".into(), profile.as_str().into());
        }
    }

    if kind == MediaKind::Video {
        if let Some(stream) = video {
            report.resolution = stream.width.zip(stream.height);
            report.fps = stream
                .avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate));
            report.pixel_format = stream.pix_fmt.clone();
            report.color_space = stream.color_space.clone();
            report.rotation = rotation(stream);
        }
        if let Some(stream) = audio {
            if let Some(codec) = &stream.codec_name {
                report.extra.insert("audio_codec".into(), codec.as_str().into());
            }
        }
    }

    if let Some(stream) = audio {
        if let Some(rate) = parse_u32(stream.sample_rate.as_deref()) {
            report.extra.insert("sample_rate".into(), rate.into());
        }
        if let Some(channels) = stream.channels {
            report.extra.insert("channels".into(), channels.into());
        }
        if let Some(layout) = &stream.channel_layout {
            report.extra.insert("channel_layout".into(), layout.as_str().into());
        }
    }

    if let Some(name) = format.format_name {
        report.extra.insert("format_name".into(), name.into());
    }
    if let Some(name) = format.format_long_name {
        report.extra.insert("format_long_name".into(), name.into());
    }
    for codec_type in ["video", "audio", "subtitle"] {
        let count = output
            .streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some(codec_type))
            .count();
        report
            .extra
            .insert(format!("{codec_type}_streams"), ExtraValue::Integer(count as i64));
    }
    for (key, value) in format.tags {
        report.extra.insert(format!("tag:{key}"), value.into());
    }

    Ok(report)
}

fn first_stream<'a>(streams: &'a [FfprobeStream], codec_type: &str) -> Option<&'a FfprobeStream> {
    streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some(codec_type))
}

/// Clockwise rotation in `[0, 360)`. The legacy `rotate` tag is clockwise;
/// display-matrix side data is counter-clockwise.
fn rotation(stream: &FfprobeStream) -> Option<i32> {
    let degrees = match stream.tags.get("rotate").and_then(|v| v.trim().parse::<i32>().ok()) {
        Some(rotate) => rotate,
        None => stream
            .side_data_list
            .iter()
            .find_map(|sd| sd.rotation)
            .filter(|deg| deg.is_finite())
            .map(|deg| -(deg.round() as i32))?,
    };
    Some(degrees.rem_euclid(360))
}

fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_u64(value: Option<&str>) -> Option<u64> {
    value?.trim().parse().ok()
}

fn parse_u32(value: Option<&str>) -> Option<u32> {
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEO_JSON: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "h264",
                "profile": "High",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "pix_fmt": "yuv420p",
                "color_space": "bt709",
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30/1",
                "bits_per_raw_sample": "8",
                "bit_rate": "3800000",
                "duration": "10.000000",
                "side_data_list": [
                    { "side_data_type": "Display Matrix", "rotation": -90 }
                ]
            },
            {
                "index": 1,
                "codec_name": "aac",
                "codec_type": "audio",
                "sample_rate": "48000",
                "channels": 2,
                "channel_layout": "stereo",
                "bits_per_sample": 0
            }
        ],
        "format": {
            "filename": "a.mp4",
            "nb_streams": 2,
            "format_name": "mov,mp4,m4a,3gp,3g2,mj2",
            "format_long_name": "QuickTime / MOV",
            "duration": "10.010000",
            "size": "5000000",
            "bit_rate": "3996003",
            "tags": { "major_brand": "isom", "encoder": "Lavf60.3.100" }
        }
    }"#;

    const AUDIO_JSON: &str = r#"{
        "streams": [
            {
                "codec_name": "mp3",
                "codec_type": "audio",
                "sample_rate": "44100",
                "channels": 2,
                "channel_layout": "stereo",
                "bit_rate": "320000",
                "duration": "60.029388"
            },
            {
                "codec_name": "mjpeg",
                "codec_type": "video",
                "width": 500,
                "height": 500,
                "avg_frame_rate": "0/0",
                "r_frame_rate": "90000/1"
            }
        ],
        "format": {
            "format_name": "mp3",
            "duration": "60.029388",
            "tags": { "title": "Song" }
        }
    }"#;

    #[test]
    fn video_fields_come_from_first_video_stream() {
        let report = parse_report(VIDEO_JSON, MediaKind::Video).unwrap();
        assert_eq!(report.duration_seconds, Some(10.01));
        assert_eq!(report.resolution, Some((1920, 1080)));
        assert_eq!(report.fps, Some(30.0));
        assert_eq!(report.codec.as_deref(), Some("h264"));
        assert_eq!(report.pixel_format.as_deref(), Some("yuv420p"));
        assert_eq!(report.color_space.as_deref(), Some("bt709"));
        assert_eq!(report.bit_depth, Some(8));
        assert_eq!(report.bitrate, Some(3_996_003));
        assert_eq!(report.rotation, Some(90));
        assert_eq!(report.extra["profile"], ExtraValue::from("High"));
        assert_eq!(report.extra["audio_codec"], ExtraValue::from("aac"));
        assert_eq!(report.extra["sample_rate"], ExtraValue::Integer(48000));
        assert_eq!(report.extra["video_streams"], ExtraValue::Integer(1));
        assert_eq!(report.extra["subtitle_streams"], ExtraValue::Integer(0));
        assert_eq!(report.extra["tag:major_brand"], ExtraValue::from("isom"));
    }

    #[test]
    fn audio_kind_ignores_cover_art_stream() {
        let report = parse_report(AUDIO_JSON, MediaKind::Audio).unwrap();
        assert_eq!(report.codec.as_deref(), Some("mp3"));
        assert_eq!(report.duration_seconds, Some(60.029388));
        assert_eq!(report.bitrate, Some(320_000));
        assert_eq!(report.resolution, None);
        assert_eq!(report.fps, None);
        assert_eq!(report.bit_depth, None);
        assert_eq!(report.extra["channels"], ExtraValue::Integer(2));
        assert_eq!(report.extra["tag:title"], ExtraValue::from("Song"));
    }

    #[test]
    fn rotate_tag_wins_over_side_data() {
        let json = r#"{"streams":[{"codec_type":"video","tags":{"rotate":"180"},
            "side_data_list":[{"rotation":90}]}],"format":{}}"#;
        let report = parse_report(json, MediaKind::Video).unwrap();
        assert_eq!(report.rotation, Some(180));
    }

    #[test]
    fn rotate_tag_and_display_matrix_agree() {
        let tagged = r#"{"streams":[{"codec_type":"video","tags":{"rotate":"90"}}],"format":{}}"#;
        let matrix = r#"{"streams":[{"codec_type":"video",
            "side_data_list":[{"side_data_type":"Display Matrix","rotation":-90}]}],"format":{}}"#;
        let tagged = parse_report(tagged, MediaKind::Video).unwrap();
        let matrix = parse_report(matrix, MediaKind::Video).unwrap();
        assert_eq!(tagged.rotation, Some(90));
        assert_eq!(matrix.rotation, tagged.rotation);

        let ccw = r#"{"streams":[{"codec_type":"video",
            "side_data_list":[{"rotation":90}]}],"format":{}}"#;
        assert_eq!(parse_report(ccw, MediaKind::Video).unwrap().rotation, Some(270));
        let negative_tag = r#"{"streams":[{"codec_type":"video","tags":{"rotate":"-90"}}],"format":{}}"#;
        assert_eq!(
            parse_report(negative_tag, MediaKind::Video).unwrap().rotation,
            Some(270)
        );
    }

    #[test]
    fn empty_report_is_unsupported() {
        let err = parse_report(r#"{"streams":[],"format":{}}"#, MediaKind::Video).unwrap_err();
        assert!(matches!(err, ProbeError::Unsupported(_)));
        let err = parse_report("{}", MediaKind::Audio).unwrap_err();
        assert!(matches!(err, ProbeError::Unsupported(_)));
    }

    #[test]
    fn garbage_output_is_a_parse_error() {
        let err = parse_report("not json", MediaKind::Video).unwrap_err();
        assert!(matches!(err, ProbeError::Parse { .. }));
    }

    #[test]
    fn frame_rates() {
        assert_eq!(parse_frame_rate("24000/1001"), Some(23.976023976023978));
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("invalid"), None);
    }

    #[test]
    fn missing_binary_reports_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("a.mp4");
        std::fs::write(&media, b"data").unwrap();
        let prober = FfprobeProber::new(dir.path().join("no-such-ffprobe"), Duration::from_secs(1));
        let err = prober.probe(&media, MediaKind::Video).unwrap_err();
        assert!(matches!(err, ProbeError::ToolNotFound(_)));
    }
}
