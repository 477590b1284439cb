//! Optional upload of the run's artifacts to S3.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Object key and body for a local file, gzip-compressed when asked.
pub fn prepare_upload(path: &Path, gzip: bool) -> Result<(String, Vec<u8>)> {
    let contents =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no file name", path.display()))?;

    if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&contents)?;
        Ok((format!("{file_name}.gz"), encoder.finish()?))
    } else {
        Ok((file_name.to_string(), contents))
    }
}

/// Uploads the combined CSV (optionally gzipped) and the heatmap image if it
/// exists.
#[tracing::instrument(skip(client))]
pub async fn publish_artifacts(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    combined_csv: &Path,
    heatmap_png: &Path,
    gzip: bool,
) -> Result<()> {
    let mut upload_count = 0;

    let (key, body) = prepare_upload(combined_csv, gzip)?;
    put(client, bucket, &key, body, "text/csv").await?;
    upload_count += 1;

    if heatmap_png.exists() {
        let (key, body) = prepare_upload(heatmap_png, false)?;
        put(client, bucket, &key, body, "image/png").await?;
        upload_count += 1;
    }

    info!(upload_count, "S3 upload complete");
    Ok(())
}

async fn put(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: &str,
) -> Result<()> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(body))
        .content_type(content_type)
        .send()
        .await?;
    Ok(())
}
