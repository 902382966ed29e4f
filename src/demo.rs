//! Fixture backend serving the two metrics endpoints
//!
//! Responses are synthetic and deterministic: the same anchor date, range and
//! metric always produce the same payload. Cloudflare skips every fourth day
//! so the trend chart shows gaps, and `date=latest` answers for the anchor.
//!
//! ```bash
//! latencia serve-demo --port 8000
//! latencia --url http://127.0.0.1:8000 dashboard
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::TimeRange;
use crate::client::DateParam;
use crate::error::{LatenciaError, Result};
use crate::types::{
    AggregateSeries, DailyAggregate, DateAxis, DatePayload, LatencyDistribution, PeriodPayload,
    ProviderMetricSet,
};

/// Samples per synthetic distribution
const SAMPLES: usize = 24;

/// Providers, their models, and a baseline time to first token in ms
const FLEET: &[(&str, &[&str], f64)] = &[
    ("Anthropic", &["claude-3-5-sonnet"], 610.0),
    ("Cloudflare", &["llama-3.1-8b-instruct"], 340.0),
    ("Groq", &["llama-3.1-70b-versatile"], 180.0),
    ("OpenAI", &["gpt-4o", "gpt-4o-mini"], 420.0),
];

/// Synthetic data anchored on one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoData {
    anchor: NaiveDate,
}

impl DemoData {
    /// Data whose most recent day is `anchor`
    #[must_use]
    pub fn new(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    /// Data anchored on the local date
    #[must_use]
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// Most recent day with data
    #[must_use]
    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    /// Days covered by `range`, oldest first
    #[must_use]
    pub fn dates(&self, range: TimeRange) -> Vec<NaiveDate> {
        let days: i64 = match range {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::ThreeMonth => 90,
        };
        (0..days)
            .rev()
            .map(|back| self.anchor - Duration::days(back))
            .collect()
    }

    /// Answer for `/metrics/period`
    #[must_use]
    pub fn period(&self, range: TimeRange, metric_type: &str, streaming: bool) -> PeriodPayload {
        let dates = self.dates(range);
        let mut aggregates = AggregateSeries::new();

        for (slot, (provider, _, base)) in FLEET.iter().enumerate() {
            let days = dates
                .iter()
                .filter(|day| !has_gap(provider, **day))
                .map(|day| {
                    let value = base * metric_factor(metric_type, streaming) * wave(*day, slot);
                    DailyAggregate::new(iso(*day), Some(round2(value)))
                })
                .collect();
            aggregates.insert(*provider, days);
        }

        PeriodPayload {
            aggregated_metrics: aggregates,
            date_array: DateAxis::from_dates(dates.into_iter().map(iso)),
        }
    }

    /// Answer for `/metrics/date`
    ///
    /// # Errors
    /// Returns `InvalidSelection` for a date that is not `YYYY-MM-DD` or lies
    /// after the anchor.
    pub fn date(&self, date: &DateParam, metric_type: &str, streaming: bool) -> Result<DatePayload> {
        let day = match date {
            DateParam::Latest => self.anchor,
            DateParam::On(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
                LatenciaError::InvalidSelection {
                    reason: format!("{text} is not a YYYY-MM-DD date: {e}"),
                }
            })?,
        };
        if day > self.anchor {
            return Err(LatenciaError::InvalidSelection {
                reason: format!("no runs recorded after {}", iso(self.anchor)),
            });
        }

        let mut metrics = ProviderMetricSet::new();
        for (slot, (provider, models, base)) in FLEET.iter().enumerate() {
            for (m, model) in models.iter().enumerate() {
                let median = base
                    * metric_factor(metric_type, streaming)
                    * wave(day, slot + m)
                    * (1.0 - 0.2 * m as f64);
                metrics.insert(*provider, *model, metric_type, distribution(median)?);
            }
        }
        Ok(DatePayload { metrics })
    }
}

/// Skewed latency sample whose CDF passes 0.5 near `median`
fn distribution(median: f64) -> Result<LatencyDistribution> {
    let (latencies, cdf) = (1..=SAMPLES)
        .map(|i| {
            let q = i as f64 / SAMPLES as f64;
            // Long right tail: p99 lands around 3x the median
            let spread = 0.55 + 0.9 * q + 1.6 * q.powi(6);
            (round2(median * spread), q)
        })
        .unzip();
    LatencyDistribution::new(latencies, cdf)
}

/// Scale relative to time to first token
fn metric_factor(metric_type: &str, streaming: bool) -> f64 {
    let base = match metric_type {
        "response_times" => 5.5,
        "timebetweentokens" => 0.06,
        "timebetweentokens_median" => 0.05,
        "timebetweentokens_p95" => 0.11,
        "totaltokens" => 1.2,
        "tps" => 0.25,
        _ => 1.0,
    };
    if streaming {
        base
    } else {
        base * 2.5
    }
}

/// Slow day-to-day drift in [0.85, 1.15]
fn wave(day: NaiveDate, slot: usize) -> f64 {
    let phase = f64::from(day.num_days_from_ce()) * 0.7 + slot as f64;
    1.0 + 0.15 * phase.sin()
}

fn has_gap(provider: &str, day: NaiveDate) -> bool {
    provider == "Cloudflare" && day.num_days_from_ce() % 4 == 0
}

fn iso(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Query string of `/metrics/period`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodParams {
    #[serde(default)]
    time_range: TimeRange,
    metric_type: String,
    #[serde(default = "streaming_default")]
    streaming: bool,
}

/// Query string of `/metrics/date`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateParams {
    date: String,
    metric_type: String,
    #[serde(default = "streaming_default")]
    streaming: bool,
}

fn streaming_default() -> bool {
    true
}

/// Error body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Router serving `data`
pub fn create_router(data: DemoData) -> Router {
    Router::new()
        .route("/metrics/period", get(period_handler))
        .route("/metrics/date", get(date_handler))
        .with_state(Arc::new(data))
}

async fn period_handler(
    State(data): State<Arc<DemoData>>,
    Query(params): Query<PeriodParams>,
) -> Json<PeriodPayload> {
    debug!(range = %params.time_range, metric = %params.metric_type, "period request");
    Json(data.period(params.time_range, &params.metric_type, params.streaming))
}

async fn date_handler(
    State(data): State<Arc<DemoData>>,
    Query(params): Query<DateParams>,
) -> std::result::Result<Json<DatePayload>, (StatusCode, Json<ErrorResponse>)> {
    debug!(date = %params.date, metric = %params.metric_type, "date request");
    data.date(
        &DateParam::from(params.date.as_str()),
        &params.metric_type,
        params.streaming,
    )
    .map(Json)
    .map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })
}

/// Bind `addr` and serve until the task is dropped
///
/// # Errors
/// Returns `IoError` if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, data: DemoData) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| LatenciaError::IoError {
            message: format!("Failed to bind {addr}: {e}"),
        })?;
    info!(%addr, anchor = %iso(data.anchor()), "demo metrics backend listening");
    serve_on(listener, data).await
}

/// Serve on an already bound listener
///
/// # Errors
/// Returns `IoError` if the server fails.
pub async fn serve_on(listener: tokio::net::TcpListener, data: DemoData) -> Result<()> {
    axum::serve(listener, create_router(data))
        .await
        .map_err(|e| LatenciaError::IoError {
            message: format!("Server error: {e}"),
        })
}
