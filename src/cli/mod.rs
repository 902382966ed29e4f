//! CLI command implementations
//!
//! This module contains the business logic for CLI commands,
//! kept out of main.rs for testability.

// CLI glue code - relaxed lint requirements
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]

use std::fmt::Write as _;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::{metric_title, metrics_on, MetricPage, TimeRange};
use crate::chart::{distribution_chart, trend_chart, ChartSpec, SeriesData};
use crate::client::{DateParam, DateQuery, MetricsClient, MetricsSource};
use crate::config::AppConfig;
use crate::distribution::cdf_series;
use crate::error::{FailureKind, LatenciaError, Result};
use crate::orchestrator::{FetchFailure, PipelineConfig};
use crate::session::DashboardSession;
use crate::tui::{self, KeyAction};

/// Delay between dashboard frames
const FRAME: Duration = Duration::from_millis(50);

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--url`
    pub base_url: Option<String>,
    /// `--metric`
    pub metric_type: Option<String>,
    /// `--range`
    pub time_range: Option<TimeRange>,
    /// `--end-to-end`
    pub end_to_end: bool,
    /// `--log-scale`
    pub log_scale: bool,
}

/// Load the config file (defaults when `path` is `None`) and apply overrides
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    if let Some(url) = &overrides.base_url {
        config.backend.base_url.clone_from(url);
    }
    if let Some(metric) = &overrides.metric_type {
        config.dashboard.metric_type.clone_from(metric);
    }
    if let Some(range) = overrides.time_range {
        config.dashboard.default_range = range;
    }
    if overrides.end_to_end {
        config.dashboard.streaming = false;
    }
    if overrides.log_scale {
        config.dashboard.log_scale = true;
    }

    config.validate()?;
    Ok(config)
}

/// HTTP client for the configured backend
pub fn build_client(config: &AppConfig) -> Result<MetricsClient> {
    MetricsClient::with_timeout(&config.backend.base_url, config.backend.timeout_secs)
}

/// Both charts for one range and date, as produced by a one-shot run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// Metric key
    pub metric_type: String,
    /// Streaming or end-to-end measurements
    pub streaming: bool,
    /// Range of the trend chart
    pub time_range: TimeRange,
    /// Date of the distribution chart, `None` if the range had no dates
    pub date: Option<String>,
    /// Aggregate trend
    pub trend: ChartSpec,
    /// Latency CDF for `date`
    pub distribution: Option<ChartSpec>,
}

impl Snapshot {
    /// True if either chart has something to draw
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.trend.is_blank() || self.distribution.as_ref().is_some_and(|c| !c.is_blank())
    }

    /// Turn "nothing to plot" into an `EmptyResult` error
    pub fn ensure_data(self) -> Result<Self> {
        if self.has_data() {
            Ok(self)
        } else {
            Err(LatenciaError::EmptyResult {
                what: format!(
                    "{} ({}) over {}",
                    metric_title(&self.metric_type),
                    if self.streaming { "streaming" } else { "end-to-end" },
                    self.time_range.label().to_lowercase()
                ),
            })
        }
    }

    /// Plain-text report of both charts
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.trend.title);
        let _ = writeln!(out, "  {}", self.trend.subtitle);
        let days = self.trend.x_axis.tick_labels().len();
        for series in &self.trend.series {
            if let SeriesData::Categories(values) = &series.data {
                let present = values.iter().filter(|v| v.is_some()).count();
                let latest = values
                    .iter()
                    .rev()
                    .find_map(|v| *v)
                    .map_or_else(|| "-".to_string(), |v| self.trend.y_axis.labels.format(v));
                let _ = writeln!(
                    out,
                    "  {:<24} {present:>3}/{days} days  latest {latest}",
                    series.name
                );
            }
        }

        let Some(dist) = &self.distribution else {
            return out;
        };
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{} on {}",
            dist.title,
            self.date.as_deref().unwrap_or("-")
        );
        let _ = writeln!(out, "  {}", dist.subtitle);
        for series in &dist.series {
            if let SeriesData::Points(points) = &series.data {
                let p50 = quantile(points, 0.5).map(|x| dist.x_axis.labels.format(x));
                let max = points.last().map(|p| dist.x_axis.labels.format(p[0]));
                let _ = writeln!(
                    out,
                    "  {:<32} p50 {:>14}  max {:>14}",
                    series.name,
                    p50.as_deref().unwrap_or("-"),
                    max.as_deref().unwrap_or("-")
                );
            }
        }
        out
    }
}

/// First x whose cumulative fraction reaches `q`
fn quantile(points: &[[f64; 2]], q: f64) -> Option<f64> {
    points.iter().find(|p| p[1] >= q).map(|p| p[0])
}

/// Error carrying the same taxonomy bucket as a recorded failure
fn failure_error(failure: &FetchFailure) -> LatenciaError {
    match failure.kind {
        FailureKind::NetworkFailure => LatenciaError::ConnectionError(failure.message.clone()),
        FailureKind::TransformFault => LatenciaError::fault(failure.message.clone()),
        FailureKind::EmptyResult => LatenciaError::EmptyResult {
            what: failure.message.clone(),
        },
        FailureKind::Other => LatenciaError::InvalidSelection {
            reason: failure.message.clone(),
        },
    }
}

/// Fetch the range, then one date, and build both charts
///
/// With `date = None` the first date of the range is used, exactly as the
/// dashboard does on load. A concrete date must be on the range's date axis;
/// [`DateParam::Latest`] is passed to the backend as-is.
pub async fn run_snapshot<S: MetricsSource + 'static>(
    source: Arc<S>,
    pipeline: PipelineConfig,
    date: Option<DateParam>,
) -> Result<Snapshot> {
    let palette = pipeline.palette.clone();
    let mut session = DashboardSession::new(Arc::clone(&source), pipeline);
    session.mount();
    session.settle().await;

    if let Some(DateParam::On(day)) = &date {
        if session.view().error.is_none() {
            session.select_date(day)?;
            session.settle().await;
        }
    }

    let view = session.view();
    if let Some(failure) = view.error {
        return Err(failure_error(failure));
    }
    let range = view.range.ok_or_else(|| LatenciaError::EmptyResult {
        what: format!("{} range", view.time_range),
    })?;

    let trend = trend_chart(
        view.metric_type,
        range.time_range,
        &range.trend,
        &range.date_axis,
        range.scale,
    );

    let (date, distribution) = if date == Some(DateParam::Latest) {
        let query = DateQuery {
            date: DateParam::Latest,
            metric_type: view.metric_type.to_string(),
            streaming: view.streaming,
        };
        let payload = source.fetch_date(&query).await?;
        payload.validate()?;
        let series = cdf_series(&payload.metrics, view.metric_type, &palette)?;
        (
            Some(DateParam::Latest.to_string()),
            Some(distribution_chart(view.metric_type, &series)),
        )
    } else {
        (
            view.distribution.map(|d| d.date.clone()),
            view.distribution
                .map(|d| distribution_chart(view.metric_type, &d.series)),
        )
    };

    info!(
        metric = view.metric_type,
        range = %view.time_range,
        date = date.as_deref().unwrap_or("-"),
        "snapshot complete"
    );

    Ok(Snapshot {
        metric_type: view.metric_type.to_string(),
        streaming: view.streaming,
        time_range: view.time_range,
        date,
        trend,
        distribution,
    })
}

/// Catalog listing, grouped by dashboard page
#[must_use]
pub fn metrics_listing() -> String {
    let mut out = String::new();
    for page in [
        MetricPage::TimeToFirstToken,
        MetricPage::ResponseTimes,
        MetricPage::TimeBetweenTokens,
        MetricPage::Throughput,
    ] {
        let _ = writeln!(out, "{}", page.title());
        for metric in metrics_on(page) {
            let _ = writeln!(out, "  {:<26} {}", metric.key, metric.title);
        }
    }
    out
}

/// Print info about latencia
pub fn print_info() {
    println!("latencia v{}", crate::VERSION);
    println!("Latency distributions and trends for LLM providers");
    println!();
    println!("Endpoints consumed:");
    println!("  GET /metrics/period?timeRange=..&metricType=..&streaming=..");
    println!("  GET /metrics/date?date=..&metricType=..&streaming=..");
}

/// Run the interactive terminal dashboard until the user quits
pub async fn run_dashboard<S: MetricsSource + 'static>(mut session: DashboardSession<S>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = dashboard_loop(&mut terminal, &mut session).await;

    // Restore terminal even if the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn dashboard_loop<S: MetricsSource + 'static>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut DashboardSession<S>,
) -> Result<()> {
    let mut tick = 0_usize;
    session.mount();

    loop {
        session.pump_ready();
        terminal.draw(|frame| tui::draw(frame, &session.view(), tick))?;
        tick = tick.wrapping_add(1);

        while event::poll(Duration::ZERO)? {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match tui::key_action(key.code) {
                Some(KeyAction::Quit) => return Ok(()),
                Some(KeyAction::SelectRange(range)) => session.select_range(range),
                Some(KeyAction::StepDate(delta)) => {
                    if let Err(e) = session.step_date(delta) {
                        debug!("date step ignored: {e}");
                    }
                },
                Some(KeyAction::Retry) => {
                    let range = session.orchestrator().time_range();
                    session.select_range(range);
                },
                None => {},
            }
        }

        // Yields to the spawned fetch tasks
        tokio::time::sleep(FRAME).await;
    }
}

/// Serve the fixture backend until interrupted
#[cfg(feature = "demo-server")]
pub async fn serve_demo(host: &str, port: u16, anchor: Option<&str>) -> Result<()> {
    use crate::demo::{self, DemoData};

    let data = match anchor {
        Some(text) => {
            let day = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
                LatenciaError::InvalidConfiguration(format!("anchor {text:?} is not YYYY-MM-DD: {e}"))
            })?;
            DemoData::new(day)
        },
        None => DemoData::today(),
    };
    let addr: std::net::SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| LatenciaError::InvalidConfiguration(format!("Invalid address: {e}")))?;

    println!("Demo metrics backend on http://{addr}");
    println!("  GET /metrics/period");
    println!("  GET /metrics/date");
    demo::serve(addr, data).await
}

#[cfg(test)]
mod tests;
