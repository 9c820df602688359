//! Per-frame rectangle telemetry.
//!
//! One row is appended for every rendered frame, in render order, and the
//! whole log is written to CSV once after the render loop. Values are rounded
//! when the row is recorded so the file is reproducible across runs.

use std::path::Path;

use serde::Serialize;

use crate::error::CoreResult;
use crate::physics::{FrameGeometry, RectangleState};
use crate::utils::round_to;

/// One line of `rectangle_log.csv`. Field order defines the CSV header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderLogRow {
    pub frame_number: u64,
    pub timestamp_sec: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub angle_degrees: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
}

impl RenderLogRow {
    /// Builds a row with the recorded precision: timestamp to 4 decimals,
    /// center and velocity to 1, angle to 2.
    pub fn record(frame_number: u64, geometry: &FrameGeometry, state: &RectangleState) -> Self {
        Self {
            frame_number,
            timestamp_sec: round_to(geometry.timestamp(frame_number), 4),
            center_x: round_to(state.center_x, 1),
            center_y: round_to(state.center_y, 1),
            angle_degrees: round_to(state.angle_degrees, 2),
            velocity_x: round_to(state.velocity_x, 1),
            velocity_y: round_to(state.velocity_y, 1),
        }
    }
}

/// Ordered, in-memory telemetry for one render job.
#[derive(Debug, Default, Clone)]
pub struct TelemetryLog {
    rows: Vec<RenderLogRow>,
}

impl TelemetryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: RenderLogRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Writes the log as CSV with a header line, replacing any existing file.
    ///
    /// An empty log still produces the header.
    pub fn write_csv(&self, path: &Path) -> CoreResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        writer.write_record(HEADER)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        log::info!(
            "Saved {} ({} rows)",
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default(),
            self.rows.len()
        );
        Ok(())
    }
}

/// Column names of the telemetry CSV.
pub const HEADER: [&str; 7] = [
    "frame_number",
    "timestamp_sec",
    "center_x",
    "center_y",
    "angle_degrees",
    "velocity_x",
    "velocity_y",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn state(cx: f64, cy: f64, angle: f64) -> RectangleState {
        RectangleState {
            center_x: cx,
            center_y: cy,
            angle_degrees: angle,
            velocity_x: -5.0,
            velocity_y: 3.0,
        }
    }

    #[test]
    fn row_values_are_rounded() {
        let geometry = FrameGeometry::new(1920, 1080, 29.97);
        let row = RenderLogRow::record(7, &geometry, &state(1808.196_601, 543.04, 16.816_816));
        assert_eq!(row.timestamp_sec, 0.2336);
        assert_eq!(row.center_x, 1808.2);
        assert_eq!(row.center_y, 543.0);
        assert_eq!(row.angle_degrees, 16.82);
    }

    #[test]
    fn csv_has_header_and_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rectangle_log.csv");
        let geometry = FrameGeometry::new(640, 480, 25.0);

        let mut log = TelemetryLog::new();
        log.push(RenderLogRow::record(0, &geometry, &state(325.0, 243.0, 0.0)));
        log.push(RenderLogRow::record(1, &geometry, &state(330.0, 246.0, 2.88)));
        log.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "frame_number,timestamp_sec,center_x,center_y,angle_degrees,velocity_x,velocity_y"
        );
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,0.0,325.0,243.0,0.0,"));
        assert!(lines[2].starts_with("1,0.04,330.0,246.0,2.88,"));
    }

    #[test]
    fn empty_log_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rectangle_log.csv");
        TelemetryLog::new().write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
