//! Persistence of the combined table and formatting of the console reports.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fmt::Write as _;
use std::fs::File;
use std::path::Path;
use thousands::Separable;
use tracing::{debug, info};

use crate::aggregate::OverallSummary;
use crate::heatmap::PeakHour;
use crate::stations::StationRecord;
use crate::types::{CombinedFrame, CountObservation};

/// Writes the combined table as CSV with a header row and no index column,
/// replacing any existing file.
#[tracing::instrument(skip(frame), fields(rows = frame.len()))]
pub fn write_combined(path: &Path, frame: &CombinedFrame) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for obs in &frame.observations {
        writer.serialize(obs)?;
    }
    writer.flush()?;

    info!(path = %path.display(), "Combined table saved");
    Ok(())
}

/// Reads a combined table previously written by [`write_combined`].
///
/// Counter values that are not numbers become `None`.
pub fn read_combined(path: &Path) -> Result<CombinedFrame> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut observations = Vec::new();
    for result in rdr.deserialize() {
        let record: CountObservation = result?;
        observations.push(record);
    }
    debug!(path = %path.display(), rows = observations.len(), "Combined table read");

    Ok(CombinedFrame { observations })
}

pub fn format_stations(stations: &[StationRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Available stations with 'Limmatquai' in name:");
    let _ = writeln!(out, "===========================================");
    let _ = writeln!(out, "{:>8}  {:<40}  {}", "id1", "bezeichnung", "abkuerzung");
    for s in stations {
        let _ = writeln!(
            out,
            "{:>8}  {:<40}  {}",
            s.id1,
            s.bezeichnung.as_deref().unwrap_or(""),
            s.abkuerzung.as_deref().unwrap_or("")
        );
    }
    out
}

pub fn format_peak_hours(peaks: &[PeakHour]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Peak Hours by Year:");
    let _ = writeln!(out, "==================");
    for peak in peaks {
        let _ = writeln!(
            out,
            "{}: {:02}:00 ({} pedestrians)",
            peak.season,
            peak.hour,
            (peak.pedestrians.trunc() as i64).separate_with_commas()
        );
    }
    out
}

pub fn format_summary(summary: &OverallSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall Summary:");
    let _ = writeln!(out, "===============");
    let _ = writeln!(
        out,
        "Years covered: {}-{}",
        summary.first_year, summary.last_year
    );
    let _ = writeln!(out, "Total records: {}", summary.records);
    let _ = writeln!(
        out,
        "Total pedestrian count: {}",
        (summary.total_pedestrians.trunc() as i64).separate_with_commas()
    );
    if let Some(busiest) = summary.busiest_hour {
        let _ = writeln!(
            out,
            "Busiest hour overall: {:02}:00 (average of {} pedestrians per year)",
            busiest.hour,
            busiest.average_per_year.separate_with_commas()
        );
    }
    out
}
