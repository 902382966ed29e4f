//! latencia CLI - LLM provider latency dashboards
//!
//! # Commands
//!
//! - `snapshot` - Fetch one range and one date, print both charts
//! - `dashboard` - Interactive terminal dashboard
//! - `metrics` - List known metric types
//! - `serve-demo` - Serve synthetic data (feature `demo-server`)
//! - `info` - Show version info
//!
//! Exit status is 0 on success, 2 when the backend answered but had nothing
//! to plot, and 1 for every other failure.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use latencia::{
    catalog::TimeRange,
    cli::{self, Overrides},
    client::DateParam,
    config::{AppConfig, LogFormat},
    error::{FailureKind, Result},
    session::DashboardSession,
};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// latencia - latency distributions and trends for LLM providers
#[derive(Parser)]
#[command(name = "latencia")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Metrics backend URL (overrides `backend.base_url`)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Metric key, e.g. timetofirsttoken, response_times, tps
    #[arg(short, long, global = true)]
    metric: Option<String>,

    /// Date range: week, month or three-month
    #[arg(short, long, global = true)]
    range: Option<TimeRange>,

    /// Use end-to-end instead of streaming measurements
    #[arg(long, global = true)]
    end_to_end: bool,

    /// Plot aggregates on a log10 axis
    #[arg(long, global = true)]
    log_scale: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a range and one date, then print both charts
    ///
    /// Examples:
    ///   latencia snapshot
    ///   latencia snapshot --date latest --format json
    ///   latencia --range week snapshot --date 2024-03-02
    Snapshot {
        /// Date to chart (`latest` or YYYY-MM-DD); first date of the range if omitted
        #[arg(short, long)]
        date: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Interactive terminal dashboard
    Dashboard,
    /// List known metric types
    Metrics,
    /// Serve deterministic synthetic metrics on both endpoints
    #[cfg(feature = "demo-server")]
    ServeDemo {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Most recent day with data (YYYY-MM-DD), today if omitted
        #[arg(long)]
        anchor: Option<String>,
    },
    /// Show version info
    Info,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.kind() == FailureKind::EmptyResult => {
            eprintln!("{e}");
            ExitCode::from(2)
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

async fn run(args: Cli) -> Result<()> {
    let overrides = Overrides {
        base_url: args.url,
        metric_type: args.metric,
        time_range: args.range,
        end_to_end: args.end_to_end,
        log_scale: args.log_scale,
    };
    let config = cli::load_config(args.config.as_deref(), &overrides)?;
    let interactive = matches!(args.command, Commands::Dashboard);
    init_logging(&config, interactive)?;

    match args.command {
        Commands::Snapshot { date, format } => {
            let client = Arc::new(cli::build_client(&config)?);
            let date = date.as_deref().map(DateParam::from);
            let snapshot = cli::run_snapshot(client, config.pipeline_config(), date)
                .await?
                .ensure_data()?;
            if format == "json" {
                let json = serde_json::to_string_pretty(&snapshot).map_err(|e| {
                    latencia::LatenciaError::fault(format!("snapshot is not serializable: {e}"))
                })?;
                println!("{json}");
            } else {
                print!("{}", snapshot.summary());
            }
        },
        Commands::Dashboard => {
            let client = Arc::new(cli::build_client(&config)?);
            let session = DashboardSession::new(client, config.pipeline_config());
            cli::run_dashboard(session).await?;
        },
        Commands::Metrics => print!("{}", cli::metrics_listing()),
        #[cfg(feature = "demo-server")]
        Commands::ServeDemo { host, port, anchor } => {
            cli::serve_demo(&host, port, anchor.as_deref()).await?;
        },
        Commands::Info => cli::print_info(),
    }

    Ok(())
}

/// Install the global subscriber
///
/// The dashboard owns the terminal, so without a log file its output is
/// discarded instead of written to stderr.
fn init_logging(config: &AppConfig, interactive: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let (writer, ansi) = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        },
        None if interactive => (BoxMakeWriter::new(std::io::sink), false),
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(writer))
                .init();
        },
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_ansi(ansi).with_writer(writer))
                .init();
        },
    }
    Ok(())
}
