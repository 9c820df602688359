//! Implementation of the `compare` subcommand.

use anyhow::Context;
use log::info;
use std::path::Path;
use std::time::Duration;

use rotobox_core::config::DEFAULT_STAGE_TIMEOUT_SECS;
use rotobox_core::external::check_dependency;
use rotobox_core::{
    CompressionComparison, FfprobeProbe, compare, format_bytes, validate_input_video,
    write_comparison,
};

use crate::cli::CompareArgs;
use crate::error::CliResult;

/// Entry point for `rotobox compare`. Prints the comparison as JSON on stdout.
pub fn run_compare(args: &CompareArgs) -> CliResult<CompressionComparison> {
    validate_input_video(&args.original)?;
    validate_input_video(&args.modified)?;
    check_dependency("ffprobe")?;

    let timeout = Duration::from_secs(args.timeout.unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS));
    let comparison = compare_files(&FfprobeProbe::new(timeout), &args.original, &args.modified)?;

    if let Some(dir) = &args.output_dir {
        let path = write_comparison(dir, &comparison)?;
        info!("Comparison record: {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(comparison)
}

/// Probes and compares, attaching file names to any failure.
pub fn compare_files(
    probe: &FfprobeProbe,
    original: &Path,
    modified: &Path,
) -> CliResult<CompressionComparison> {
    compare(probe, original, modified).with_context(|| {
        format!(
            "Failed to compare '{}' with '{}'",
            original.display(),
            modified.display()
        )
    })
}

/// Human-readable summary lines for a comparison.
pub fn summary_lines(comparison: &CompressionComparison) -> Vec<String> {
    let delta = &comparison.delta;
    vec![
        format!(
            "  Original size: {}",
            format_bytes(comparison.original.file_size_bytes as u64)
        ),
        format!(
            "  Overlay size:  {}",
            format_bytes(comparison.modified.file_size_bytes as u64)
        ),
        format!(
            "  File size:     {:+.2}% ({:+.0} bytes)",
            delta.file_size_bytes.percent, delta.file_size_bytes.absolute
        ),
        format!(
            "  Bitrate:       {:+.2}% ({:.2} -> {:.2} kbps)",
            delta.avg_bitrate_kbps.percent,
            comparison.original.avg_bitrate_kbps,
            comparison.modified.avg_bitrate_kbps
        ),
        format!(
            "  Frame size:    {:+.2}% (estimated from duration x frame rate)",
            delta.avg_frame_size_bytes.percent
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotobox_core::{CompressionMetricSet, compare_metrics};

    #[test]
    fn summary_reports_sizes_and_percentages() {
        let comparison = compare_metrics(
            CompressionMetricSet {
                file_size_bytes: 1_048_576.0,
                avg_bitrate_kbps: 1000.0,
                avg_frame_size_bytes: 4000.0,
            },
            CompressionMetricSet {
                file_size_bytes: 1_101_004.8,
                avg_bitrate_kbps: 1050.0,
                avg_frame_size_bytes: 4200.0,
            },
        );
        let lines = summary_lines(&comparison);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "  Original size: 1.00 MiB");
        assert!(lines[2].contains("+5.00%"), "{}", lines[2]);
        assert!(lines[3].contains("1000.00 -> 1050.00 kbps"), "{}", lines[3]);
        assert!(lines[4].starts_with("  Frame size:    +5.00%"));
    }
}
