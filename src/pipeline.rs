//! The year-by-year download and filter loop.

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::fetch::{HttpClient, fetch_year};
use crate::stations::StationCatalog;
use crate::transform::process_year;
use crate::types::YearlyFrame;

/// Fetches and filters every configured year in ascending order, one at a
/// time. A year's raw file is gone before the next download starts. Years
/// that fail or contain no matching rows are skipped.
#[tracing::instrument(skip_all, fields(first_year = config.first_year, last_year = config.last_year))]
pub async fn collect_yearly_frames<C: HttpClient>(
    client: &C,
    config: &PipelineConfig,
    catalog: &StationCatalog,
) -> Vec<YearlyFrame> {
    let mut frames = Vec::new();

    for year in config.years() {
        let url = config.year_url(year);
        let Some(raw) = fetch_year(client, &url, year, &config.work_dir).await else {
            continue;
        };

        match process_year(raw, catalog) {
            Some(frame) if !frame.is_empty() => frames.push(frame),
            Some(_) => info!(year, "No New Year's Eve rows"),
            None => warn!(year, "Year skipped"),
        }
    }

    info!(years = frames.len(), "Yearly collection finished");
    frames
}
