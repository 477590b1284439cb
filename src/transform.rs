//! Restricts a yearly raw file to the Limmatquai pedestrian stations and the
//! New Year's Eve window.

use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, error, info};

use crate::fetch::RawYearFile;
use crate::stations::StationCatalog;
use crate::types::{CountObservation, RawCountRecord, YearlyFrame, parse_datum};

/// Pedestrian counting stations on the Limmatquai.
pub const PEDESTRIAN_STATIONS: [&str; 2] = ["33", "3279"];

/// Dec 31 from 17:00, or Jan 1 up to and including 07:00.
pub fn in_new_year_window(ts: &NaiveDateTime) -> bool {
    let (month, day, hour) = (ts.month(), ts.day(), ts.hour());
    (month == 12 && day == 31 && hour >= 17) || (month == 1 && day == 1 && hour <= 7)
}

/// Parses and filters one year's download.
///
/// The catalog only names stations in the log; the station filter is always
/// [`PEDESTRIAN_STATIONS`]. Errors are logged and yield `None`. The raw file
/// is removed before this returns, on every path.
#[tracing::instrument(skip_all, fields(year = raw.year()))]
pub fn process_year(raw: RawYearFile, catalog: &StationCatalog) -> Option<YearlyFrame> {
    match load_year_frame(raw.year(), raw.path()) {
        Ok(frame) => {
            let mut per_station: BTreeMap<&str, usize> = BTreeMap::new();
            for obs in &frame.observations {
                *per_station.entry(obs.station_id.as_str()).or_default() += 1;
            }
            for (station, rows) in per_station {
                debug!(
                    station,
                    name = catalog.name(station).unwrap_or("unknown"),
                    rows,
                    "Station rows kept"
                );
            }
            info!(rows = frame.len(), "Year processed");
            Some(frame)
        }
        Err(e) => {
            error!(path = %raw.path().display(), error = %e, "Failed to process yearly file");
            None
        }
    }
}

/// Reads `path` and applies the station, window and pedestrian filters.
///
/// # Errors
///
/// Fails on malformed CSV or on an unparseable `DATUM` in a target station row.
pub fn load_year_frame(year: i32, path: &Path) -> Result<YearlyFrame> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut observations = Vec::new();
    for result in rdr.deserialize() {
        let record: RawCountRecord = result?;

        if !PEDESTRIAN_STATIONS.contains(&record.station_id.trim()) {
            continue;
        }

        let timestamp = parse_datum(&record.datum)
            .ok_or_else(|| anyhow!("unrecognized DATUM value {:?}", record.datum))?;

        if !in_new_year_window(&timestamp) || record.lacks_pedestrian_counts() {
            continue;
        }

        observations.push(CountObservation::from_raw(record, timestamp));
    }

    Ok(YearlyFrame { year, observations })
}
