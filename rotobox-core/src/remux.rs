// ============================================================================
// rotobox-core/src/remux.rs
// ============================================================================
//
// REMUX: Quality-pass re-encode with original audio
//
// The render loop writes a fast, silent intermediate. This stage re-encodes
// it with libx264 at the configured CRF and preset and, when the source has
// an audio track, copies that track unmodified into the final container. The
// output ends with the shorter of the two inputs.

use std::path::PathBuf;

use crate::config::OverlayConfig;

/// Inputs and quality settings of one remux.
#[derive(Debug, Clone, PartialEq)]
pub struct RemuxRequest {
    /// Silent intermediate produced by the render loop.
    pub intermediate: PathBuf,
    /// Original source, used only for its audio track.
    pub original: PathBuf,
    /// Final container to create (overwritten if present).
    pub output: PathBuf,
    /// Whether the original carries an audio track to copy.
    pub include_audio: bool,
    pub crf: u8,
    pub preset: String,
}

impl RemuxRequest {
    pub fn new(
        intermediate: PathBuf,
        original: PathBuf,
        output: PathBuf,
        include_audio: bool,
        config: &OverlayConfig,
    ) -> Self {
        Self {
            intermediate,
            original,
            output,
            include_audio,
            crf: config.final_crf,
            preset: config.final_preset.clone(),
        }
    }
}

/// Builds the ffmpeg argument list (without the program name) for `request`.
pub fn build_remux_args(request: &RemuxRequest) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-y".into(),
        "-i".into(),
        request.intermediate.to_string_lossy().into_owned(),
    ];

    if request.include_audio {
        args.extend([
            "-i".into(),
            request.original.to_string_lossy().into_owned(),
            "-map".into(),
            "0:v:0".into(),
            "-map".into(),
            "1:a".into(),
            "-c:a".into(),
            "copy".into(),
            "-shortest".into(),
        ]);
    } else {
        args.extend(["-map".into(), "0:v:0".into(), "-an".into()]);
    }

    args.extend([
        "-c:v".into(),
        "libx264".into(),
        "-crf".into(),
        request.crf.to_string(),
        "-preset".into(),
        request.preset.clone(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        "-movflags".into(),
        "+faststart".into(),
        request.output.to_string_lossy().into_owned(),
    ]);
    args
}
