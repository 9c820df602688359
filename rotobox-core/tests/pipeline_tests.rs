// rotobox-core/tests/pipeline_tests.rs

mod common;

use common::{BACKGROUND, FakeBackend, metadata};
use rotobox_core::config::{JobConfig, JobConfigBuilder};
use rotobox_core::error::{CoreError, ErrorCategory};
use rotobox_core::pipeline::{RenderProgress, render_overlay};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn job(output_dir: &Path) -> JobConfig {
    JobConfigBuilder::new()
        .input_path(output_dir.join("input.mp4"))
        .output_dir(output_dir.join("out"))
        .build()
        .unwrap()
}

fn csv_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn renders_every_frame_and_writes_outputs() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let job = job(dir.path());
    let backend = FakeBackend::new(metadata(320, 240, 25, 40, true));

    let outcome = render_overlay(&backend, &job, |_| {})?;

    assert_eq!(outcome.frames_rendered, 40);
    assert_eq!(outcome.output_path, job.output_dir.join("overlay_video.mp4"));
    assert!(outcome.output_path.is_file());
    assert!(outcome.audio_copied);
    assert_eq!(backend.record.frames_written.borrow().len(), 40);
    assert!(backend.record.sink_finished.get());

    let lines = csv_lines(&outcome.telemetry_path);
    assert_eq!(lines.len(), 41);
    assert_eq!(
        lines[0],
        "frame_number,timestamp_sec,center_x,center_y,angle_degrees,velocity_x,velocity_y"
    );
    assert_eq!(lines[1], "0,0.0,165.0,123.0,0.0,5.0,3.0");
    assert_eq!(lines[2], "1,0.04,170.0,126.0,2.88,5.0,3.0");
    // 240 - 111.8 = 128.2 is the lowest allowed center: the third frame bounces.
    assert_eq!(lines[3], "2,0.08,175.0,128.2,5.76,5.0,-3.0");
    Ok(())
}

#[test]
fn intermediate_encode_uses_source_geometry_and_fast_preset() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let backend = FakeBackend::new(metadata(320, 240, 25, 3, false));

    render_overlay(&backend, &job, |_| {}).unwrap();

    let targets = backend.record.sink_targets.borrow();
    assert_eq!(targets.len(), 1);
    assert_eq!((targets[0].width, targets[0].height), (320, 240));
    assert_eq!(targets[0].fps, 25.0);
    assert_eq!(targets[0].rate, Some((25, 1)));
    assert_eq!(targets[0].preset, "ultrafast");
    // The scratch directory holding the intermediate is gone afterwards.
    assert!(!targets[0].output_path.parent().unwrap().exists());
}

#[test]
fn remux_copies_audio_only_when_present() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());

    let with_audio = FakeBackend::new(metadata(320, 240, 25, 2, true));
    render_overlay(&with_audio, &job, |_| {}).unwrap();
    let request = with_audio.record.remux_requests.borrow()[0].clone();
    assert!(request.include_audio);
    assert_eq!(request.original, job.input_path);
    assert_eq!(request.crf, 18);
    assert_eq!(request.preset, "medium");

    let silent = FakeBackend::new(metadata(320, 240, 25, 2, false));
    let outcome = render_overlay(&silent, &job, |_| {}).unwrap();
    assert!(!silent.record.remux_requests.borrow()[0].include_audio);
    assert!(!outcome.audio_copied);
}

#[test]
fn rectangle_is_composited_into_written_frames() {
    let dir = tempdir().unwrap();
    let job = JobConfigBuilder::new()
        .input_path(dir.path().join("input.mp4"))
        .output_dir(dir.path().join("out"))
        .opacity(1.0)
        .color([0, 255, 0])
        .build()
        .unwrap();
    let backend = FakeBackend::new(metadata(320, 240, 25, 1, false));

    render_overlay(&backend, &job, |_| {}).unwrap();

    let frames = backend.record.frames_written.borrow();
    // Frame 0: center (165, 123), unrotated.
    assert_eq!(frames[0].get_pixel(165, 123).0, [0, 255, 0]);
    assert_eq!(frames[0].get_pixel(0, 0).0, BACKGROUND);
    assert_eq!(frames[0].get_pixel(319, 239).0, BACKGROUND);
}

#[test]
fn progress_is_reported_per_frame() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let backend = FakeBackend::new(metadata(320, 240, 30, 5, false));

    let mut seen: Vec<RenderProgress> = Vec::new();
    render_overlay(&backend, &job, |p| seen.push(p)).unwrap();

    assert_eq!(seen.len(), 5);
    assert_eq!(seen[0], RenderProgress { frame: 1, total: Some(5) });
    assert_eq!(seen[4], RenderProgress { frame: 5, total: Some(5) });
}

#[test]
fn decode_error_aborts_without_output() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let mut backend = FakeBackend::new(metadata(320, 240, 25, 10, true));
    backend.fail_decode_at = Some(4);

    let err = render_overlay(&backend, &job, |_| {}).unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Source);
    assert_eq!(backend.record.frames_written.borrow().len(), 4);
    assert!(!backend.record.sink_finished.get());
    assert!(backend.record.remux_requests.borrow().is_empty());
    assert!(!job.final_output_path().exists());
    assert!(!job.telemetry_path().exists());
}

#[test]
fn remux_failure_fails_the_job_and_keeps_telemetry() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let mut backend = FakeBackend::new(metadata(320, 240, 25, 6, true));
    backend.remux_error = Some("muxer rejected stream".to_string());

    let err = render_overlay(&backend, &job, |_| {}).unwrap_err();

    assert!(matches!(err, CoreError::Remux(ref msg) if msg.contains("muxer rejected")));
    assert!(!job.final_output_path().exists());
    assert_eq!(csv_lines(&job.telemetry_path()).len(), 7);

    let leftovers: Vec<_> = fs::read_dir(&job.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(leftovers, vec!["rectangle_log.csv".to_string()]);
}

#[test]
fn probe_failure_is_a_source_error() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let mut backend = FakeBackend::new(metadata(320, 240, 25, 6, true));
    backend.probe_error = Some("moov atom not found".to_string());

    let err = render_overlay(&backend, &job, |_| {}).unwrap_err();
    assert!(matches!(err, CoreError::Source(_)));
    assert!(backend.record.sink_targets.borrow().is_empty());
}

#[test]
fn missing_video_stream_is_a_source_error() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let backend = FakeBackend::new(metadata(0, 0, 25, 6, true));

    let err = render_overlay(&backend, &job, |_| {}).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Source);
}

#[test]
fn empty_stream_is_a_source_error() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let backend = FakeBackend::new(metadata(320, 240, 25, 0, false));

    let err = render_overlay(&backend, &job, |_| {}).unwrap_err();
    assert!(matches!(err, CoreError::Source(_)));
    assert!(backend.record.remux_requests.borrow().is_empty());
}

#[test]
fn invalid_configuration_fails_before_probing() {
    let dir = tempdir().unwrap();
    let mut job = job(dir.path());
    job.overlay.opacity = 1.5;
    let backend = FakeBackend::new(metadata(320, 240, 25, 6, false));

    let err = render_overlay(&backend, &job, |_| {}).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(backend.record.probes.get(), 0);
}

#[test]
fn unknown_frame_rate_uses_configured_default() {
    let dir = tempdir().unwrap();
    let job = job(dir.path());
    let mut backend = FakeBackend::new(metadata(320, 240, 25, 2, false));
    backend.reported_fps = Some(0.0);

    let outcome = render_overlay(&backend, &job, |_| {}).unwrap();
    assert_eq!(outcome.geometry.fps, 30.0);
    // The container's 25/1 no longer describes the frames being encoded.
    assert_eq!(backend.record.sink_targets.borrow()[0].rate, None);
    let lines = csv_lines(&outcome.telemetry_path);
    assert!(lines[2].starts_with("1,0.0333,"));
}

#[test]
fn identical_runs_produce_identical_telemetry() {
    let run = || {
        let dir = tempdir().unwrap();
        let job = job(dir.path());
        let backend = FakeBackend::new(metadata(640, 360, 30, 300, true));
        let outcome = render_overlay(&backend, &job, |_| {}).unwrap();
        fs::read_to_string(outcome.telemetry_path).unwrap()
    };
    assert_eq!(run(), run());
}
