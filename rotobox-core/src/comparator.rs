// ============================================================================
// rotobox-core/src/comparator.rs
// ============================================================================
//
// COMPRESSION COMPARATOR: Container-level before/after metrics
//
// Three metrics are compared for the original and the modified file:
//
// - file_size_bytes:       container size
// - avg_bitrate_kbps:      overall bitrate / 1000
// - avg_frame_size_bytes:  size / max(1, round(duration * frame_rate))
//
// The frame size is an estimate from container metadata, not a measurement
// of encoded frame sizes. All values and deltas are rounded to 2 decimals.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::COMPARISON_FILENAME;
use crate::error::CoreResult;
use crate::external::{ContainerMetadata, MetadataProbe};
use crate::utils::round_to;

/// Metrics of one finished file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetricSet {
    pub file_size_bytes: f64,
    pub avg_bitrate_kbps: f64,
    /// Estimated as size over `duration * frame_rate`.
    pub avg_frame_size_bytes: f64,
}

impl CompressionMetricSet {
    pub fn from_metadata(metadata: &ContainerMetadata) -> Self {
        let size = metadata.size_bytes as f64;
        Self {
            file_size_bytes: size,
            avg_bitrate_kbps: round_to(metadata.bit_rate as f64 / 1000.0, 2),
            avg_frame_size_bytes: round_to(size / metadata.estimated_frame_count() as f64, 2),
        }
    }
}

/// Change of one metric from original to modified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub absolute: f64,
    /// Percent of the original; 0 when the original is 0.
    pub percent: f64,
}

impl MetricDelta {
    pub fn between(original: f64, modified: f64) -> Self {
        let diff = modified - original;
        let percent = if original != 0.0 {
            round_to(diff / original * 100.0, 2)
        } else {
            0.0
        };
        Self {
            absolute: round_to(diff, 2),
            percent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionDelta {
    pub file_size_bytes: MetricDelta,
    pub avg_bitrate_kbps: MetricDelta,
    pub avg_frame_size_bytes: MetricDelta,
}

/// The comparison record written to `compression_comparison.json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionComparison {
    pub original: CompressionMetricSet,
    pub modified: CompressionMetricSet,
    pub delta: CompressionDelta,
}

/// Reads the metrics of `path` through `probe`.
pub fn get_metrics<P: MetadataProbe + ?Sized>(probe: &P, path: &Path) -> CoreResult<CompressionMetricSet> {
    let metadata = probe.probe(path)?;
    log::debug!("Metrics source for {}: {:?}", path.display(), metadata);
    Ok(CompressionMetricSet::from_metadata(&metadata))
}

/// Pure comparison of two metric sets.
pub fn compare_metrics(original: CompressionMetricSet, modified: CompressionMetricSet) -> CompressionComparison {
    CompressionComparison {
        original,
        modified,
        delta: CompressionDelta {
            file_size_bytes: MetricDelta::between(original.file_size_bytes, modified.file_size_bytes),
            avg_bitrate_kbps: MetricDelta::between(original.avg_bitrate_kbps, modified.avg_bitrate_kbps),
            avg_frame_size_bytes: MetricDelta::between(
                original.avg_frame_size_bytes,
                modified.avg_frame_size_bytes,
            ),
        },
    }
}

/// Probes both files concurrently and compares them.
pub fn compare<P: MetadataProbe + Sync + ?Sized>(
    probe: &P,
    original: &Path,
    modified: &Path,
) -> CoreResult<CompressionComparison> {
    let (original_metrics, modified_metrics) =
        rayon::join(|| get_metrics(probe, original), || get_metrics(probe, modified));
    let comparison = compare_metrics(original_metrics?, modified_metrics?);

    log::info!(
        "File size: {:+.2}% | bitrate: {:+.2}% | avg frame size: {:+.2}%",
        comparison.delta.file_size_bytes.percent,
        comparison.delta.avg_bitrate_kbps.percent,
        comparison.delta.avg_frame_size_bytes.percent
    );
    Ok(comparison)
}

/// Writes `comparison` as pretty JSON into `output_dir`. Returns the file path.
pub fn write_comparison(output_dir: &Path, comparison: &CompressionComparison) -> CoreResult<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(COMPARISON_FILENAME);
    let json = serde_json::to_string_pretty(comparison)?;
    fs::write(&path, json)?;
    log::info!("Saved {COMPARISON_FILENAME}");
    Ok(path)
}
