//! Cross-year concatenation and the overall summary.

use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{CombinedFrame, YearlyFrame, station_then_time};

/// Concatenates yearly frames in the order given and sorts the result by
/// station, then timestamp. The sort is stable, so rows sharing a key keep
/// their original order.
///
/// Returns `None` when there are no rows at all.
#[tracing::instrument(skip_all, fields(frames = frames.len()))]
pub fn combine(frames: Vec<YearlyFrame>) -> Option<CombinedFrame> {
    let mut observations: Vec<_> = frames
        .into_iter()
        .flat_map(|frame| frame.observations)
        .collect();

    if observations.is_empty() {
        return None;
    }

    observations.sort_by(station_then_time);
    Some(CombinedFrame { observations })
}

/// Hour of day with the highest pedestrian total across all years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusiestHour {
    pub hour: u32,
    pub total: f64,
    /// `total` divided by the number of distinct calendar years, truncated.
    pub average_per_year: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverallSummary {
    pub first_year: i32,
    pub last_year: i32,
    pub records: usize,
    pub total_pedestrians: f64,
    pub busiest_hour: Option<BusiestHour>,
}

impl CombinedFrame {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct calendar years of the observation timestamps.
    pub fn years(&self) -> BTreeSet<i32> {
        self.observations
            .iter()
            .map(|o| o.timestamp.year())
            .collect()
    }

    /// Pedestrian totals per hour of day, absent counters counted as zero.
    pub fn hourly_totals(&self) -> BTreeMap<u32, f64> {
        let mut totals = BTreeMap::new();
        for obs in &self.observations {
            *totals.entry(obs.hour()).or_insert(0.0) += obs.pedestrians();
        }
        totals
    }

    /// `None` for an empty frame.
    pub fn summary(&self) -> Option<OverallSummary> {
        let years = self.years();
        let first_year = *years.first()?;
        let last_year = *years.last()?;

        let total_pedestrians = self.observations.iter().map(|o| o.pedestrians()).sum();

        // First maximum in ascending hour order.
        let busiest_hour = self
            .hourly_totals()
            .into_iter()
            .fold(None, |best: Option<(u32, f64)>, (hour, total)| match best {
                Some((_, best_total)) if best_total >= total => best,
                _ => Some((hour, total)),
            })
            .map(|(hour, total)| BusiestHour {
                hour,
                total,
                average_per_year: (total / years.len() as f64) as i64,
            });

        Some(OverallSummary {
            first_year,
            last_year,
            records: self.len(),
            total_pedestrians,
            busiest_hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::observation;

    #[test]
    fn test_combine_empty_is_none() {
        assert!(combine(vec![]).is_none());
        assert!(combine(vec![YearlyFrame::default()]).is_none());
    }

    #[test]
    fn test_combine_sorts_by_station_then_time() {
        let frames = vec![
            YearlyFrame {
                year: 2019,
                observations: vec![
                    observation("3279", "2019-12-31T18:00", Some(1.0), None),
                    observation("33", "2019-12-31T19:00", Some(2.0), None),
                ],
            },
            YearlyFrame {
                year: 2020,
                observations: vec![
                    observation("33", "2020-01-01T01:00", Some(3.0), None),
                    observation("33", "2019-12-31T17:00", Some(4.0), None),
                ],
            },
        ];

        let combined = combine(frames).unwrap();
        let order: Vec<(&str, f64)> = combined
            .observations
            .iter()
            .map(|o| (o.station_id.as_str(), o.pedestrians()))
            .collect();

        assert_eq!(
            order,
            vec![("33", 4.0), ("33", 2.0), ("33", 3.0), ("3279", 1.0)]
        );
    }

    #[test]
    fn test_single_row_summary() {
        let frames = vec![
            YearlyFrame {
                year: 2019,
                observations: vec![observation("33", "2019-12-31T23:00", Some(10.0), Some(5.0))],
            },
            YearlyFrame {
                year: 2020,
                observations: vec![],
            },
        ];

        let summary = combine(frames).unwrap().summary().unwrap();

        assert_eq!(summary.records, 1);
        assert_eq!(summary.total_pedestrians, 15.0);
        assert_eq!((summary.first_year, summary.last_year), (2019, 2019));
        let busiest = summary.busiest_hour.unwrap();
        assert_eq!(busiest.hour, 23);
        assert_eq!(busiest.average_per_year, 15);
    }

    #[test]
    fn test_busiest_hour_averages_over_distinct_years() {
        let combined = combine(vec![YearlyFrame {
            year: 0,
            observations: vec![
                observation("33", "2019-12-31T23:00", Some(10.0), None),
                observation("33", "2020-01-01T00:00", Some(40.0), Some(1.0)),
                observation("33", "2020-12-31T23:00", Some(20.0), None),
                observation("33", "2021-01-01T00:00", None, None),
            ],
        }])
        .unwrap();

        let summary = combined.summary().unwrap();

        assert_eq!((summary.first_year, summary.last_year), (2019, 2021));
        assert_eq!(summary.total_pedestrians, 71.0);
        // hour 0 = 41, hour 23 = 30; three calendar years
        let busiest = summary.busiest_hour.unwrap();
        assert_eq!(busiest.hour, 0);
        assert_eq!(busiest.total, 41.0);
        assert_eq!(busiest.average_per_year, 13);
    }

    #[test]
    fn test_busiest_hour_tie_prefers_earliest_hour() {
        let combined = combine(vec![YearlyFrame {
            year: 2019,
            observations: vec![
                observation("33", "2019-12-31T23:00", Some(5.0), None),
                observation("33", "2019-01-01T02:00", Some(5.0), None),
            ],
        }])
        .unwrap();

        assert_eq!(combined.summary().unwrap().busiest_hour.unwrap().hour, 2);
    }
}
