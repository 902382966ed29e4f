//! HTTP client for the metrics backend
//!
//! Two read-only endpoints are consumed:
//!
//! - `GET /metrics/period?timeRange=..&metricType=..&streaming=..` → [`PeriodPayload`]
//! - `GET /metrics/date?date=..&metricType=..&streaming=..` → [`DatePayload`]
//!
//! Transport failures and non-2xx answers become
//! [`LatenciaError::ConnectionError`]. A body that does not decode into the
//! expected shape becomes [`LatenciaError::TransformFault`]. Nothing is retried.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::TimeRange;
use crate::error::{LatenciaError, Result};
use crate::types::{DatePayload, PeriodPayload};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parameters of a `/metrics/period` request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeriodQuery {
    /// Requested range
    pub time_range: TimeRange,
    /// Metric key
    pub metric_type: String,
    /// Streaming or end-to-end measurements
    pub streaming: bool,
}

impl PeriodQuery {
    /// Query-string pairs in wire naming
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("timeRange", self.time_range.as_query().to_string()),
            ("metricType", self.metric_type.clone()),
            ("streaming", self.streaming.to_string()),
        ]
    }
}

/// Date argument of `/metrics/date`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateParam {
    /// Most recent run the backend has
    Latest,
    /// A specific calendar date
    On(String),
}

impl DateParam {
    /// The concrete date, if any
    #[must_use]
    pub fn as_date(&self) -> Option<&str> {
        match self {
            Self::Latest => None,
            Self::On(date) => Some(date),
        }
    }
}

impl fmt::Display for DateParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::On(date) => f.write_str(date),
        }
    }
}

impl From<&str> for DateParam {
    fn from(value: &str) -> Self {
        if value == "latest" {
            Self::Latest
        } else {
            Self::On(value.to_string())
        }
    }
}

/// Parameters of a `/metrics/date` request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateQuery {
    /// Requested date
    pub date: DateParam,
    /// Metric key
    pub metric_type: String,
    /// Streaming or end-to-end measurements
    pub streaming: bool,
}

impl DateQuery {
    /// Query-string pairs in wire naming
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("date", self.date.to_string()),
            ("metricType", self.metric_type.clone()),
            ("streaming", self.streaming.to_string()),
        ]
    }
}

/// Anything that can answer the two metrics queries
///
/// Implemented by [`MetricsClient`] for the real backend; tests substitute
/// in-memory sources.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Fetch aggregates and the date axis for a range
    async fn fetch_period(&self, query: &PeriodQuery) -> Result<PeriodPayload>;

    /// Fetch per-provider distributions for one date
    async fn fetch_date(&self, query: &DateQuery) -> Result<DatePayload>;
}

/// reqwest-backed [`MetricsSource`]
#[derive(Debug, Clone)]
pub struct MetricsClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl MetricsClient {
    /// Client with the default timeout
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for an empty URL or if the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    /// Client with a custom timeout
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for an empty URL, a zero timeout, or if
    /// the HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(LatenciaError::InvalidConfiguration(
                "backend base URL is empty".to_string(),
            ));
        }
        if timeout_secs == 0 {
            return Err(LatenciaError::InvalidConfiguration(
                "request timeout must be at least one second".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                LatenciaError::InvalidConfiguration(format!("Failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            timeout_secs,
        })
    }

    /// Backend root without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Configured timeout
    #[must_use]
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?params, "requesting metrics");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, "metrics request failed: {e}");
                LatenciaError::ConnectionError(format!("HTTP request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%url, %status, "metrics backend returned an error status");
            return Err(LatenciaError::ConnectionError(format!(
                "HTTP {status} from {url}: {body}"
            )));
        }

        let body = response.bytes().await.map_err(|e| {
            LatenciaError::ConnectionError(format!("Failed to read response from {url}: {e}"))
        })?;

        serde_json::from_slice(&body)
            .map_err(|e| LatenciaError::fault(format!("{path} response does not match schema: {e}")))
    }
}

#[async_trait]
impl MetricsSource for MetricsClient {
    async fn fetch_period(&self, query: &PeriodQuery) -> Result<PeriodPayload> {
        self.get_json("/metrics/period", &query.params()).await
    }

    async fn fetch_date(&self, query: &DateQuery) -> Result<DatePayload> {
        self.get_json("/metrics/date", &query.params()).await
    }
}
