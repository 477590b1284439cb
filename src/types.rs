//! Count records flowing through the pipeline.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Timestamp layouts seen in the city's yearly files and in combined tables.
const DATUM_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Text read as an absent counter: the usual CSV null spellings, including
/// the spreadsheet error forms that show up in older exports.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single row of a yearly raw file, fields kept as text.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCountRecord {
    #[serde(rename = "FK_STANDORT")]
    pub station_id: String,
    #[serde(rename = "DATUM")]
    pub datum: String,
    #[serde(rename = "FK_ZAEHLER", default)]
    pub counter_id: Option<String>,
    #[serde(rename = "VELO_IN", default)]
    pub velo_in: Option<String>,
    #[serde(rename = "VELO_OUT", default)]
    pub velo_out: Option<String>,
    #[serde(rename = "FUSS_IN", default)]
    pub fuss_in: Option<String>,
    #[serde(rename = "FUSS_OUT", default)]
    pub fuss_out: Option<String>,
    #[serde(rename = "OST", default)]
    pub east: Option<String>,
    #[serde(rename = "NORD", default)]
    pub north: Option<String>,
}

impl RawCountRecord {
    /// Both pedestrian counters absent.
    pub fn lacks_pedestrian_counts(&self) -> bool {
        is_missing(&self.fuss_in) && is_missing(&self.fuss_out)
    }
}

/// One parsed observation. Counters that were absent or non-numeric are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountObservation {
    #[serde(rename = "FK_ZAEHLER", default)]
    pub counter_id: Option<String>,
    #[serde(rename = "FK_STANDORT")]
    pub station_id: String,
    #[serde(rename = "DATUM", deserialize_with = "deserialize_datum")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "VELO_IN", default, deserialize_with = "csv::invalid_option")]
    pub velo_in: Option<f64>,
    #[serde(rename = "VELO_OUT", default, deserialize_with = "csv::invalid_option")]
    pub velo_out: Option<f64>,
    #[serde(rename = "FUSS_IN", default, deserialize_with = "csv::invalid_option")]
    pub fuss_in: Option<f64>,
    #[serde(rename = "FUSS_OUT", default, deserialize_with = "csv::invalid_option")]
    pub fuss_out: Option<f64>,
    #[serde(rename = "OST", default)]
    pub east: Option<String>,
    #[serde(rename = "NORD", default)]
    pub north: Option<String>,
}

impl CountObservation {
    /// Builds an observation from a raw row with an already parsed timestamp,
    /// coercing the counters to numbers.
    pub fn from_raw(raw: RawCountRecord, timestamp: NaiveDateTime) -> Self {
        Self {
            counter_id: raw.counter_id.filter(|s| !s.trim().is_empty()),
            station_id: raw.station_id.trim().to_string(),
            timestamp,
            velo_in: coerce_count(raw.velo_in.as_deref()),
            velo_out: coerce_count(raw.velo_out.as_deref()),
            fuss_in: coerce_count(raw.fuss_in.as_deref()),
            fuss_out: coerce_count(raw.fuss_out.as_deref()),
            east: raw.east.filter(|s| !s.trim().is_empty()),
            north: raw.north.filter(|s| !s.trim().is_empty()),
        }
    }

    /// Pedestrians in both directions, absent counters count as zero.
    pub fn pedestrians(&self) -> f64 {
        self.fuss_in.unwrap_or(0.0) + self.fuss_out.unwrap_or(0.0)
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Orders by station identifier, then timestamp.
///
/// Identifiers compare numerically when both parse as integers, so station 33
/// sorts before station 3279.
pub fn station_then_time(a: &CountObservation, b: &CountObservation) -> Ordering {
    compare_station_ids(&a.station_id, &b.station_id).then(a.timestamp.cmp(&b.timestamp))
}

pub fn compare_station_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn parse_datum(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATUM_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn deserialize_datum<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datum(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized DATUM value {raw:?}")))
}

fn is_missing(value: &Option<String>) -> bool {
    match value {
        None => true,
        Some(s) => MISSING_MARKERS.contains(&s.trim()),
    }
}

fn coerce_count(value: Option<&str>) -> Option<f64> {
    value
        .map(str::trim)
        .filter(|s| !MISSING_MARKERS.contains(s))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

/// Observations of one calendar year's file, restricted to the target
/// stations and the New Year's Eve window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearlyFrame {
    pub year: i32,
    pub observations: Vec<CountObservation>,
}

impl YearlyFrame {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

/// All yearly frames concatenated and sorted by station, then time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedFrame {
    pub observations: Vec<CountObservation>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn observation(station: &str, datum: &str, fuss_in: Option<f64>, fuss_out: Option<f64>) -> CountObservation {
        CountObservation {
            counter_id: None,
            station_id: station.to_string(),
            timestamp: parse_datum(datum).unwrap(),
            velo_in: None,
            velo_out: None,
            fuss_in,
            fuss_out,
            east: None,
            north: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(fuss_in: Option<&str>, fuss_out: Option<&str>) -> RawCountRecord {
        RawCountRecord {
            station_id: " 33 ".to_string(),
            datum: "2019-12-31T23:00".to_string(),
            counter_id: None,
            velo_in: Some("abc".to_string()),
            velo_out: Some("".to_string()),
            fuss_in: fuss_in.map(str::to_string),
            fuss_out: fuss_out.map(str::to_string),
            east: None,
            north: None,
        }
    }

    #[test]
    fn test_parse_datum_formats() {
        let expected = parse_datum("2019-12-31T23:00").unwrap();
        assert_eq!(parse_datum("2019-12-31T23:00:00"), Some(expected));
        assert_eq!(parse_datum("2019-12-31 23:00:00"), Some(expected));
        assert_eq!(parse_datum(" 2019-12-31 23:00 "), Some(expected));
        assert_eq!(parse_datum("31.12.2019 23:00"), None);
    }

    #[test]
    fn test_lacks_pedestrian_counts() {
        assert!(raw(None, None).lacks_pedestrian_counts());
        assert!(raw(Some(""), Some("NA")).lacks_pedestrian_counts());
        assert!(!raw(None, Some("5")).lacks_pedestrian_counts());
        assert!(!raw(Some("x"), None).lacks_pedestrian_counts());
    }

    #[test]
    fn test_spreadsheet_null_spellings_are_missing() {
        for marker in ["n/a", "N/A", "None", "#N/A", "<NA>", "-nan", "1.#QNAN"] {
            assert!(
                raw(Some(marker), Some(" NULL ")).lacks_pedestrian_counts(),
                "{marker} should count as missing"
            );
        }
        assert_eq!(coerce_count(Some("-NaN")), None);
        assert_eq!(coerce_count(Some("None")), None);
        assert_eq!(coerce_count(Some(" 4.5 ")), Some(4.5));
    }

    #[test]
    fn test_from_raw_coerces_counters() {
        let ts = parse_datum("2019-12-31T23:00").unwrap();
        let obs = CountObservation::from_raw(raw(Some("12"), Some("oops")), ts);

        assert_eq!(obs.station_id, "33");
        assert_eq!(obs.fuss_in, Some(12.0));
        assert_eq!(obs.fuss_out, None);
        assert_eq!(obs.velo_in, None);
        assert_eq!(obs.velo_out, None);
        assert_eq!(obs.pedestrians(), 12.0);
        assert_eq!(obs.hour(), 23);
    }

    #[test]
    fn test_station_ids_compare_numerically() {
        assert_eq!(compare_station_ids("33", "3279"), Ordering::Less);
        assert_eq!(compare_station_ids("3279", "33"), Ordering::Greater);
        assert_eq!(compare_station_ids("33", "abc"), Ordering::Less);
        assert_eq!(compare_station_ids("a", "b"), Ordering::Less);
    }
}
