//! Run configuration for the New Year's Eve pipeline.
//!
//! Values come from CLI arguments with environment overrides loaded by
//! `dotenvy` in `main`.

use chrono::{Datelike, Local};
use std::path::{Path, PathBuf};

/// Yearly counts download, `{year}` is substituted.
pub const DEFAULT_URL_TEMPLATE: &str = "https://data.stadt-zuerich.ch/dataset/ted_taz_verkehrszaehlungen_werte_fussgaenger_velo/download/{year}_verkehrszaehlungen_werte_fussgaenger_velo.csv";

pub const DEFAULT_STATIONS_PATH: &str = "taz.view_eco_standorte.csv";
pub const DEFAULT_OUTPUT_CSV: &str = "limmatquai_new_year_data.csv";
pub const DEFAULT_HEATMAP_PNG: &str = "limmatquai_hourly_heatmap.png";
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// First year the city publishes counts for.
pub const FIRST_YEAR: i32 = 2014;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub url_template: String,
    pub first_year: i32,
    pub last_year: i32,
    pub work_dir: PathBuf,
    pub stations_path: PathBuf,
    pub output_csv: PathBuf,
    pub heatmap_png: PathBuf,
    pub font_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            first_year: FIRST_YEAR,
            last_year: Local::now().year(),
            work_dir: PathBuf::from("."),
            stations_path: PathBuf::from(DEFAULT_STATIONS_PATH),
            output_csv: PathBuf::from(DEFAULT_OUTPUT_CSV),
            heatmap_png: PathBuf::from(DEFAULT_HEATMAP_PNG),
            font_path: PathBuf::from(DEFAULT_FONT_PATH),
        }
    }
}

impl PipelineConfig {
    /// Defaults with `COUNTS_URL_TEMPLATE` and `HEATMAP_FONT` applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(template) = std::env::var("COUNTS_URL_TEMPLATE") {
            config.url_template = template;
        }
        if let Ok(font) = std::env::var("HEATMAP_FONT") {
            config.font_path = PathBuf::from(font);
        }
        config
    }

    pub fn year_url(&self, year: i32) -> String {
        self.url_template.replace("{year}", &year.to_string())
    }

    /// Location of the transient raw download for `year`.
    pub fn raw_file_path(&self, year: i32) -> PathBuf {
        raw_file_path(&self.work_dir, year)
    }

    /// Inclusive year range; empty when `first_year > last_year`.
    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.first_year..=self.last_year
    }
}

pub fn raw_file_path(work_dir: &Path, year: i32) -> PathBuf {
    work_dir.join(format!("{year}_data.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_url_substitutes_year() {
        let config = PipelineConfig::default();
        let url = config.year_url(2019);
        assert!(url.ends_with("/2019_verkehrszaehlungen_werte_fussgaenger_velo.csv"));
        assert!(!url.contains("{year}"));
    }

    #[test]
    fn test_raw_file_path_is_named_after_year() {
        let path = raw_file_path(Path::new("/tmp/work"), 2021);
        assert_eq!(path, PathBuf::from("/tmp/work/2021_data.csv"));
    }

    #[test]
    fn test_default_years_start_at_first_published_year() {
        let config = PipelineConfig::default();
        assert_eq!(*config.years().start(), 2014);
        assert!(*config.years().end() >= 2024);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let config = PipelineConfig {
            first_year: 2020,
            last_year: 2019,
            ..Default::default()
        };
        assert_eq!(config.years().count(), 0);
    }
}
