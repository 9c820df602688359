// rotobox-core/tests/comparator_tests.rs

mod common;

use common::{TableProbe, metadata};
use rotobox_core::comparator::{compare, get_metrics, write_comparison};
use rotobox_core::error::{CoreError, ErrorCategory};
use std::path::Path;
use tempfile::tempdir;

fn sized(size: u64, bit_rate: u64) -> rotobox_core::ContainerMetadata {
    let mut m = metadata(1920, 1080, 30, 300, true);
    m.size_bytes = size;
    m.bit_rate = bit_rate;
    m.duration_secs = 10.0;
    m
}

#[test]
fn compares_original_and_modified() {
    let probe = TableProbe::default()
        .with("/v/original.mp4", sized(10_000_000, 8_000_000))
        .with("/v/overlay_video.mp4", sized(10_500_000, 8_400_000));

    let result = compare(&probe, Path::new("/v/original.mp4"), Path::new("/v/overlay_video.mp4")).unwrap();

    assert_eq!(result.original.file_size_bytes, 10_000_000.0);
    assert_eq!(result.modified.avg_bitrate_kbps, 8400.0);
    assert_eq!(result.delta.file_size_bytes.absolute, 500_000.0);
    assert_eq!(result.delta.file_size_bytes.percent, 5.0);
    assert_eq!(result.delta.avg_bitrate_kbps.percent, 5.0);
    // 10 s at 30 fps: 300 frames.
    assert_eq!(result.original.avg_frame_size_bytes, 33_333.33);
    assert_eq!(result.modified.avg_frame_size_bytes, 35_000.0);
    assert_eq!(probe.calls.lock().unwrap().len(), 2);
}

#[test]
fn zero_baseline_yields_zero_percent() {
    let probe = TableProbe::default()
        .with("/v/a.mp4", sized(0, 0))
        .with("/v/b.mp4", sized(4_096, 1_000));

    let result = compare(&probe, Path::new("/v/a.mp4"), Path::new("/v/b.mp4")).unwrap();
    assert_eq!(result.delta.file_size_bytes.percent, 0.0);
    assert_eq!(result.delta.avg_bitrate_kbps.percent, 0.0);
    assert_eq!(result.delta.file_size_bytes.absolute, 4_096.0);
}

#[test]
fn missing_file_is_reported_as_probe_error() {
    let probe = TableProbe::default().with("/v/a.mp4", sized(1, 1));
    let err = compare(&probe, Path::new("/v/a.mp4"), Path::new("/v/missing.mp4")).unwrap_err();
    assert!(matches!(err, CoreError::Probe(_)));
    assert_eq!(err.category(), ErrorCategory::Probe);
}

#[test]
fn unknown_frame_rate_estimates_with_default() {
    let mut m = sized(3_000, 0);
    m.frame_rate_num = 0;
    m.frame_rate_den = 0;
    m.duration_secs = 1.0;
    let probe = TableProbe::default().with("/v/a.mp4", m);

    let metrics = get_metrics(&probe, Path::new("/v/a.mp4")).unwrap();
    assert_eq!(metrics.avg_frame_size_bytes, 100.0);
}

#[test]
fn comparison_record_round_trips_through_disk() {
    let dir = tempdir().unwrap();
    let probe = TableProbe::default()
        .with("/v/a.mp4", sized(1_000, 2_000))
        .with("/v/b.mp4", sized(1_100, 2_000));
    let result = compare(&probe, Path::new("/v/a.mp4"), Path::new("/v/b.mp4")).unwrap();

    let path = write_comparison(dir.path(), &result).unwrap();
    let text = std::fs::read_to_string(path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();

    for key in ["original", "modified", "delta"] {
        assert!(value.get(key).is_some(), "missing {key}");
    }
    assert_eq!(value["delta"]["file_size_bytes"]["percent"], 10.0);
    assert_eq!(value["delta"]["avg_bitrate_kbps"]["absolute"], 0.0);
}
