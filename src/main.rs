//! CLI entry point for the COVID-19 state × week panel builder.
//!
//! `run` builds and publishes the output tables; `check` only verifies that
//! every input can be read and its columns resolved.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use covid_panel::config::PipelineConfig;
use covid_panel::pipeline::{check, execute};
use covid_panel::schema::CandidateResolver;
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
#[command(name = "covid_panel")]
#[command(about = "Build a state × week COVID-19 panel from public CSV extracts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the panel and publish the output tables
    Run {
        /// JSON config file; every field is optional
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory holding the input CSVs (overrides CSV_DIR and the config)
        #[arg(long, value_name = "DIR")]
        csv_dir: Option<PathBuf>,

        /// Directory to publish outputs into (overrides OUTPUT_DIR and the config)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// First week-ending date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last week-ending date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Write gzip-compressed .csv.gz files
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Write the JSON run report to this file
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Resolve every input column without writing anything
    Check {
        /// JSON config file; every field is optional
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Directory holding the input CSVs (overrides CSV_DIR and the config)
        #[arg(long, value_name = "DIR")]
        csv_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/covid_panel.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("covid_panel.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            csv_dir,
            output_dir,
            start,
            end,
            gzip,
            report,
        } => {
            let mut config = load_config(config.as_deref(), csv_dir)?;
            if let Some(dir) = output_dir.or_else(|| env_path("OUTPUT_DIR")) {
                config.output_dir = dir;
            }
            if let Some(start) = start {
                config.start_date = start;
            }
            if let Some(end) = end {
                config.end_date = end;
            }
            config.gzip |= gzip;

            info!(
                csv_dir = %config.csv_dir.display(),
                output_dir = %config.output_dir.display(),
                start = %config.start_date,
                end = %config.end_date,
                gzip = config.gzip,
                "Starting pipeline run"
            );
            let run_report = match execute(&config, &CandidateResolver) {
                Ok(r) => r,
                Err(e) => {
                    error!(error = %e, "Pipeline failed, no outputs were published");
                    return Err(e).context("pipeline run failed");
                }
            };

            if let Some(path) = report {
                let json = run_report.to_json()?;
                std::fs::write(&path, json)
                    .with_context(|| format!("failed to write report to {}", path.display()))?;
                info!(path = %path.display(), "Run report written");
            }
        }
        Commands::Check { config, csv_dir } => {
            let config = load_config(config.as_deref(), csv_dir)?;
            let checks = check(&config, &CandidateResolver).context("input check failed")?;
            let optional_missing = checks.iter().filter(|c| c.header.is_none()).count();
            info!(
                fields = checks.len(),
                optional_missing,
                "All required columns resolved"
            );
        }
    }

    Ok(())
}

/// Config file (or defaults), then `CSV_DIR`, then the `--csv-dir` flag.
fn load_config(path: Option<&Path>, csv_dir: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(dir) = csv_dir.or_else(|| env_path("CSV_DIR")) {
        config.csv_dir = dir;
    }
    config.validate()?;
    Ok(config)
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}
