// ============================================================================
// rotobox-core/src/external/ffprobe.rs
// ============================================================================
//
// FFPROBE: Container metadata via `ffprobe -print_format json`
//
// ffprobe reports numbers as strings and omits fields it cannot determine, so
// every field is optional here and gaps are filled with fixed fallbacks:
// duration 1 s, frame rate 30/1, size and bitrate 0.
//
// Width and height are reported as displayed: a stream carrying a quarter-turn
// rotation (display matrix side data or the legacy `rotate` tag) has its coded
// dimensions swapped, matching what the autorotating decoder emits.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;

use super::command::run_with_timeout;
use super::{ContainerMetadata, MetadataProbe};
use crate::config::DEFAULT_STAGE_TIMEOUT_SECS;
use crate::error::{CoreError, CoreResult, Stage};
use crate::utils::parse_frame_rate;

const FFPROBE_BIN: &str = "ffprobe";

const FALLBACK_DURATION_SECS: f64 = 1.0;
const FALLBACK_FRAME_RATE: (u32, u32) = (30, 1);

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    size: Option<String>,
    duration: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

impl ProbeStream {
    /// Display rotation in degrees; side data wins over the tag.
    fn rotation(&self) -> f64 {
        self.side_data_list
            .iter()
            .find_map(|d| d.rotation)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse::<f64>().ok()))
            .filter(|r| r.is_finite())
            .unwrap_or(0.0)
    }

    /// Frame size after applying the display rotation.
    fn display_size(&self) -> (u32, u32) {
        let (width, height) = (self.width.unwrap_or(0), self.height.unwrap_or(0));
        let quarter_turns = (self.rotation() / 90.0).round() as i64;
        if quarter_turns.rem_euclid(2) == 1 {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Builds the ffprobe argument list for `path`.
pub fn build_probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "quiet".into(),
        "-print_format".into(),
        "json".into(),
        "-show_format".into(),
        "-show_streams".into(),
        path.to_string_lossy().into_owned(),
    ]
}

/// Parses ffprobe's JSON report.
pub fn parse_probe_output(json: &str) -> CoreResult<ContainerMetadata> {
    let report: ProbeOutput = serde_json::from_str(json)?;
    let format = &report.format;

    let video = report
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = report
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let duration_secs = format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or(FALLBACK_DURATION_SECS);

    let (frame_rate_num, frame_rate_den) = video
        .and_then(|v| v.r_frame_rate.as_deref())
        .and_then(parse_frame_rate)
        .unwrap_or(FALLBACK_FRAME_RATE);
    let (width, height) = video.map(ProbeStream::display_size).unwrap_or((0, 0));

    Ok(ContainerMetadata {
        size_bytes: parse_u64(format.size.as_deref()).unwrap_or(0),
        duration_secs,
        bit_rate: parse_u64(format.bit_rate.as_deref()).unwrap_or(0),
        frame_rate_num,
        frame_rate_den,
        width,
        height,
        nb_frames: video.and_then(|v| parse_u64(v.nb_frames.as_deref())),
        has_audio,
    })
}

fn parse_u64(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

/// [`MetadataProbe`] backed by the ffprobe binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    timeout: Duration,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS))
    }
}

impl FfprobeProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl MetadataProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> CoreResult<ContainerMetadata> {
        let mut cmd = Command::new(FFPROBE_BIN);
        cmd.args(build_probe_args(path));

        let output = run_with_timeout(&mut cmd, self.timeout, Stage::Probe)?;
        if !output.status.success() {
            return Err(CoreError::Probe(format!(
                "ffprobe exited with {} for {}: {}",
                output.status,
                path.display(),
                output.stderr_tail(3)
            )));
        }

        parse_probe_output(&output.stdout).map_err(|e| {
            CoreError::Probe(format!("unreadable ffprobe report for {}: {e}", path.display()))
        })
    }
}
