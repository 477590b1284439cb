//! CLI entry point for the Limmatquai New Year's Eve counts tool.
//!
//! Downloads the yearly pedestrian counts, keeps the New Year's Eve window for
//! the two Limmatquai stations, writes the combined table and renders the
//! hourly heatmap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use limmatquai_nye::{
    aggregate::combine,
    config::PipelineConfig,
    fetch::BasicClient,
    heatmap::{HeatmapMatrix, HeatmapRenderer, PlottersRenderer},
    output::{format_peak_hours, format_stations, format_summary, read_combined, write_combined},
    pipeline::collect_yearly_frames,
    publish::publish_artifacts,
    stations::StationCatalog,
    types::CombinedFrame,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "limmatquai_nye")]
#[command(about = "New Year's Eve pedestrian counts at the Limmatquai, Zurich", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download all years, write the combined table and render the heatmap
    Run {
        /// Station reference table
        #[arg(long, default_value = limmatquai_nye::config::DEFAULT_STATIONS_PATH)]
        stations: PathBuf,

        /// First year to download
        #[arg(long, default_value_t = limmatquai_nye::config::FIRST_YEAR)]
        from_year: i32,

        /// Last year to download (defaults to the current year)
        #[arg(long)]
        to_year: Option<i32>,

        /// Directory for the transient yearly downloads
        #[arg(short, long, default_value = ".")]
        work_dir: PathBuf,

        /// Combined CSV output
        #[arg(short, long, default_value = limmatquai_nye::config::DEFAULT_OUTPUT_CSV)]
        output: PathBuf,

        /// Heatmap PNG output
        #[arg(long, default_value = limmatquai_nye::config::DEFAULT_HEATMAP_PNG)]
        heatmap: PathBuf,

        /// TrueType font for heatmap text (overrides HEATMAP_FONT)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Optional: S3 bucket to upload the results to (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: Option<String>,

        /// Optional: Gzip compress the combined CSV before uploading to S3
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// List the Limmatquai stations in the reference table
    Stations {
        #[arg(long, default_value = limmatquai_nye::config::DEFAULT_STATIONS_PATH)]
        stations: PathBuf,
    },
    /// Render the heatmap and summaries from an existing combined CSV
    Heatmap {
        /// Combined CSV written by `run`
        #[arg(short, long, default_value = limmatquai_nye::config::DEFAULT_OUTPUT_CSV)]
        input: PathBuf,

        /// Heatmap PNG output
        #[arg(long, default_value = limmatquai_nye::config::DEFAULT_HEATMAP_PNG)]
        heatmap: PathBuf,

        /// TrueType font for heatmap text (overrides HEATMAP_FONT)
        #[arg(long)]
        font: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/limmatquai_nye.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("limmatquai_nye.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::from_env();

    match cli.command {
        Commands::Run {
            stations,
            from_year,
            to_year,
            work_dir,
            output,
            heatmap,
            font,
            s3_bucket,
            gzip,
        } => {
            config.stations_path = stations;
            config.first_year = from_year;
            if let Some(to_year) = to_year {
                config.last_year = to_year;
            }
            config.work_dir = work_dir;
            config.output_csv = output;
            config.heatmap_png = heatmap;
            if let Some(font) = font {
                config.font_path = font;
            }
            run(&config, s3_bucket, gzip).await?;
        }
        Commands::Stations { stations } => {
            let catalog = StationCatalog::load(&stations)?;
            println!("\n{}", format_stations(catalog.limmatquai_stations()));
        }
        Commands::Heatmap {
            input,
            heatmap,
            font,
        } => {
            config.heatmap_png = heatmap;
            if let Some(font) = font {
                config.font_path = font;
            }
            let combined = read_combined(&input)?;
            if combined.is_empty() {
                println!("\nNo data found for any year.");
            } else {
                report(&combined, &config);
            }
        }
    }

    Ok(())
}

/// Full download, combine, render and report run.
#[tracing::instrument(skip_all, fields(first_year = config.first_year, last_year = config.last_year))]
async fn run(config: &PipelineConfig, s3_bucket: Option<String>, gzip: bool) -> Result<()> {
    let catalog = StationCatalog::load(&config.stations_path)?;
    println!("\n{}", format_stations(catalog.limmatquai_stations()));
    info!(
        limmatquai_ids = ?catalog.limmatquai_ids(),
        "Limmatquai stations in catalog"
    );

    let client = BasicClient::new();
    let frames = collect_yearly_frames(&client, config, &catalog).await;

    let Some(combined) = combine(frames) else {
        println!("\nNo data found for any year.");
        return Ok(());
    };

    write_combined(&config.output_csv, &combined)?;
    println!("\nData saved to {}", config.output_csv.display());

    report(&combined, config);

    if let Some(bucket) = s3_bucket {
        let s3_config = aws_config::load_from_env().await;
        let s3 = aws_sdk_s3::Client::new(&s3_config);
        info!(bucket = %bucket, gzip, "S3 upload enabled");

        if let Err(e) =
            publish_artifacts(&s3, &bucket, &config.output_csv, &config.heatmap_png, gzip).await
        {
            error!(error = %e, "Failed to upload results to S3");
        }
    }

    Ok(())
}

/// Renders the heatmap and prints the peak-hour and overall summaries.
fn report(combined: &CombinedFrame, config: &PipelineConfig) {
    let matrix = HeatmapMatrix::from_frame(combined);
    let renderer = PlottersRenderer::new(&config.font_path);
    match renderer.render(&matrix, &config.heatmap_png) {
        Ok(()) => println!("\nPlot saved as '{}'", config.heatmap_png.display()),
        Err(e) => error!(error = %e, "Failed to render heatmap"),
    }

    let peaks = matrix.peak_hours();
    println!("\n{}", format_peak_hours(&peaks));

    if let Some(overall) = combined.summary() {
        println!("\n{}", format_summary(&overall));
    }
}
