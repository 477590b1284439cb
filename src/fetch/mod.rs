//! Yearly download of the city's pedestrian and bicycle counts.

mod basic;
mod client;
mod raw_file;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use raw_file::RawYearFile;

use anyhow::Result;
use reqwest::StatusCode;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::raw_file_path;

/// Outcome of a single GET: status code and body.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<(StatusCode, Vec<u8>)> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    Ok((status, resp.bytes().await?.to_vec()))
}

/// Downloads `url` into `{year}_data.csv` under `work_dir`.
///
/// Prints a progress line for the year. Returns `None` on a non-200 status,
/// a transport error or a failed write; each case is logged and never retried.
#[tracing::instrument(skip(client, work_dir))]
pub async fn fetch_year<C: HttpClient>(
    client: &C,
    url: &str,
    year: i32,
    work_dir: &Path,
) -> Option<RawYearFile> {
    println!("Downloading data for {year}...");
    info!(year, "Downloading yearly counts");

    let bytes = match fetch_bytes(client, url).await {
        Ok((status, bytes)) if status == StatusCode::OK => bytes,
        Ok((status, _)) => {
            warn!(year, status = status.as_u16(), "Download failed");
            return None;
        }
        Err(e) => {
            error!(year, error = %e, "Download error");
            return None;
        }
    };

    // Adopt before writing so a partial file is cleaned up too.
    let raw = RawYearFile::adopt(year, raw_file_path(work_dir, year));
    if let Err(e) = std::fs::write(raw.path(), &bytes) {
        error!(year, path = %raw.path().display(), error = %e, "Failed to save download");
        return None;
    }

    info!(year, bytes = bytes.len(), "Download saved");
    Some(raw)
}
