//! Hour-by-season pedestrian matrix for the New Year's Eve window.
//!
//! Seasons are labelled by the night they span (`2019-20` covers Dec 31 2019
//! and Jan 1 2020). Every season present gets all fifteen window hours, with
//! zero where nothing was counted.

mod render;

pub use render::{HeatmapRenderer, PlottersRenderer};

use chrono::{Datelike, NaiveDateTime};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::types::CombinedFrame;

pub const HOUR_SLOTS: usize = 15;

/// Window hours in display order: evening first, then past midnight.
pub const NYE_HOURS: [u32; HOUR_SLOTS] = [17, 18, 19, 20, 21, 22, 23, 0, 1, 2, 3, 4, 5, 6, 7];

/// Position of `hour` in [`NYE_HOURS`].
pub fn hour_slot(hour: u32) -> Option<usize> {
    NYE_HOURS.iter().position(|&h| h == hour)
}

/// The New Year's Eve a timestamp belongs to, identified by its starting year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeasonLabel {
    start_year: i32,
}

impl SeasonLabel {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// December belongs to the night starting that year, every other month to
    /// the night that started the year before.
    pub fn from_timestamp(ts: &NaiveDateTime) -> Self {
        if ts.month() == 12 {
            Self::new(ts.year())
        } else {
            Self::new(ts.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }
}

impl fmt::Display for SeasonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}",
            self.start_year,
            (self.start_year + 1).rem_euclid(100)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeakHour {
    pub season: SeasonLabel,
    pub hour: u32,
    pub pedestrians: f64,
}

/// Rows are seasons in chronological order, columns follow [`NYE_HOURS`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapMatrix {
    seasons: Vec<SeasonLabel>,
    values: Vec<[f64; HOUR_SLOTS]>,
}

impl HeatmapMatrix {
    /// Sums pedestrians per (season, hour) and lays them on the full grid of
    /// seasons present × window hours.
    #[tracing::instrument(skip_all, fields(rows = frame.observations.len()))]
    pub fn from_frame(frame: &CombinedFrame) -> Self {
        let mut sums: HashMap<(SeasonLabel, u32), f64> = HashMap::new();
        let mut seasons = BTreeSet::new();

        for obs in &frame.observations {
            let season = SeasonLabel::from_timestamp(&obs.timestamp);
            seasons.insert(season);
            *sums.entry((season, obs.hour())).or_insert(0.0) += obs.pedestrians();
        }

        let seasons: Vec<SeasonLabel> = seasons.into_iter().collect();
        let values = seasons
            .iter()
            .map(|season| NYE_HOURS.map(|hour| sums.get(&(*season, hour)).copied().unwrap_or(0.0)))
            .collect();

        Self { seasons, values }
    }

    pub fn seasons(&self) -> &[SeasonLabel] {
        &self.seasons
    }

    pub fn rows(&self) -> &[[f64; HOUR_SLOTS]] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    pub fn get(&self, season: SeasonLabel, hour: u32) -> Option<f64> {
        let row = self.seasons.iter().position(|s| *s == season)?;
        Some(self.values[row][hour_slot(hour)?])
    }

    /// Largest cell, used to scale the color map.
    pub fn max_value(&self) -> f64 {
        self.values
            .iter()
            .flat_map(|row| row.iter().copied())
            .fold(0.0, f64::max)
    }

    /// Busiest hour per season; ties go to the earlier hour in display order.
    pub fn peak_hours(&self) -> Vec<PeakHour> {
        self.seasons
            .iter()
            .zip(&self.values)
            .map(|(season, row)| {
                let mut best = 0;
                for (slot, value) in row.iter().enumerate() {
                    if *value > row[best] {
                        best = slot;
                    }
                }
                PeakHour {
                    season: *season,
                    hour: NYE_HOURS[best],
                    pedestrians: row[best],
                }
            })
            .collect()
    }
}
