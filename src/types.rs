//! Metric data shapes shared by the fetch layer and the transformers
//!
//! These mirror the JSON served by the metrics backend:
//!
//! ```text
//! /metrics/date   -> { "metrics": { provider: { model: { metric: { latencies, cdf } } } } }
//! /metrics/period -> { "aggregated_metrics": { provider: [ { date, aggregated_metric } ] },
//!                      "date_array": [ date, ... ] }
//! ```
//!
//! The backend persists floats as strings, so every numeric field accepts
//! either a JSON number or a numeric string. Decoding only checks shape;
//! the `validate` methods enforce the value invariants and report violations
//! as [`LatenciaError::TransformFault`].

use std::collections::{BTreeMap, HashSet};

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{LatenciaError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<E: de::Error>(value: NumberOrText) -> std::result::Result<f64, E> {
    match value {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| E::custom(format!("expected a number, found {s:?}"))),
    }
}

fn lenient_f64_vec<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<NumberOrText>::deserialize(deserializer)?
        .into_iter()
        .map(lenient_f64)
        .collect()
}

fn lenient_f64_opt<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<NumberOrText>::deserialize(deserializer)?
        .map(lenient_f64)
        .transpose()
}

/// Sorted latency samples (ms) paired with their cumulative fraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyDistribution {
    /// Latencies in milliseconds, non-decreasing
    #[serde(deserialize_with = "lenient_f64_vec")]
    pub latencies: Vec<f64>,
    /// Fraction of requests at or below each latency, non-decreasing in [0, 1]
    #[serde(deserialize_with = "lenient_f64_vec")]
    pub cdf: Vec<f64>,
}

impl LatencyDistribution {
    /// Build a distribution, rejecting anything that breaks the invariants
    ///
    /// # Errors
    /// Returns `TransformFault` if the arrays are empty, differ in length,
    /// or are not monotone within their ranges.
    pub fn new(latencies: Vec<f64>, cdf: Vec<f64>) -> Result<Self> {
        let dist = Self { latencies, cdf };
        dist.validate()?;
        Ok(dist)
    }

    /// Number of samples
    #[must_use]
    pub fn len(&self) -> usize {
        self.latencies.len()
    }

    /// True when there are no samples (never the case for a validated value)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.latencies.is_empty()
    }

    /// Check the distribution invariants
    ///
    /// # Errors
    /// Returns `TransformFault` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.latencies.len() != self.cdf.len() {
            return Err(LatenciaError::fault(format!(
                "latencies has {} points but cdf has {}",
                self.latencies.len(),
                self.cdf.len()
            )));
        }
        if self.latencies.is_empty() {
            return Err(LatenciaError::fault("distribution has no points"));
        }

        let mut prev_latency = 0.0_f64;
        let mut prev_cdf = 0.0_f64;
        for (i, (&latency, &fraction)) in self.latencies.iter().zip(&self.cdf).enumerate() {
            if !latency.is_finite() || latency < 0.0 {
                return Err(LatenciaError::fault(format!(
                    "latency[{i}] = {latency} is not a finite non-negative value"
                )));
            }
            if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
                return Err(LatenciaError::fault(format!(
                    "cdf[{i}] = {fraction} is outside [0, 1]"
                )));
            }
            if latency < prev_latency {
                return Err(LatenciaError::fault(format!(
                    "latencies decrease at index {i} ({prev_latency} -> {latency})"
                )));
            }
            if fraction < prev_cdf {
                return Err(LatenciaError::fault(format!(
                    "cdf decreases at index {i} ({prev_cdf} -> {fraction})"
                )));
            }
            prev_latency = latency;
            prev_cdf = fraction;
        }
        Ok(())
    }
}

/// Metric-type key → distribution for one model
pub type ModelMetrics = BTreeMap<String, LatencyDistribution>;

/// Provider → model → metric type → distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderMetricSet(pub BTreeMap<String, BTreeMap<String, ModelMetrics>>);

impl ProviderMetricSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) one distribution
    pub fn insert(
        &mut self,
        provider: impl Into<String>,
        model: impl Into<String>,
        metric_type: impl Into<String>,
        distribution: LatencyDistribution,
    ) {
        self.0
            .entry(provider.into())
            .or_default()
            .entry(model.into())
            .or_default()
            .insert(metric_type.into(), distribution);
    }

    /// Look up one distribution
    #[must_use]
    pub fn get(&self, provider: &str, model: &str, metric_type: &str) -> Option<&LatencyDistribution> {
        self.0.get(provider)?.get(model)?.get(metric_type)
    }

    /// Iterate `(provider, model, metrics)` in key order
    pub fn models(&self) -> impl Iterator<Item = (&str, &str, &ModelMetrics)> {
        self.0.iter().flat_map(|(provider, models)| {
            models
                .iter()
                .map(move |(model, metrics)| (provider.as_str(), model.as_str(), metrics))
        })
    }

    /// True when no provider reported anything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|models| models.values().all(BTreeMap::is_empty))
    }

    /// Number of distributions available for `metric_type`
    #[must_use]
    pub fn count_for(&self, metric_type: &str) -> usize {
        self.models()
            .filter(|(_, _, metrics)| metrics.contains_key(metric_type))
            .count()
    }

    /// Validate every distribution in the set
    ///
    /// # Errors
    /// Returns `TransformFault` naming the offending provider/model/metric.
    pub fn validate(&self) -> Result<()> {
        for (provider, model, metrics) in self.models() {
            for (metric_type, dist) in metrics {
                dist.validate().map_err(|e| match e {
                    LatenciaError::TransformFault { reason } => LatenciaError::fault(format!(
                        "{provider} / {model} / {metric_type}: {reason}"
                    )),
                    other => other,
                })?;
            }
        }
        Ok(())
    }
}

/// One provider's summary statistic for one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Calendar date as served by the backend (e.g. `2024-01-31`)
    pub date: String,
    /// Aggregate latency in ms; `None` means no data for that date
    #[serde(default, deserialize_with = "lenient_f64_opt")]
    pub aggregated_metric: Option<f64>,
}

impl DailyAggregate {
    /// Convenience constructor
    pub fn new(date: impl Into<String>, aggregated_metric: Option<f64>) -> Self {
        Self {
            date: date.into(),
            aggregated_metric,
        }
    }
}

/// Provider → daily aggregates, ascending by date, not aligned across providers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateSeries(pub BTreeMap<String, Vec<DailyAggregate>>);

impl AggregateSeries {
    /// Empty series
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the aggregates for one provider
    pub fn insert(&mut self, provider: impl Into<String>, days: Vec<DailyAggregate>) {
        self.0.insert(provider.into(), days);
    }

    /// Provider names in sorted order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when no provider has any non-null value
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0
            .values()
            .all(|days| days.iter().all(|d| d.aggregated_metric.is_none()))
    }

    /// Check that every date is present, every value finite, and no provider
    /// reports the same date twice
    ///
    /// # Errors
    /// Returns `TransformFault` naming the provider and date.
    pub fn validate(&self) -> Result<()> {
        for (provider, days) in &self.0 {
            let mut seen = HashSet::with_capacity(days.len());
            for day in days {
                if day.date.trim().is_empty() {
                    return Err(LatenciaError::fault(format!(
                        "{provider}: aggregate with an empty date"
                    )));
                }
                if !seen.insert(day.date.as_str()) {
                    return Err(LatenciaError::fault(format!(
                        "{provider}: date {} reported twice",
                        day.date
                    )));
                }
                if let Some(value) = day.aggregated_metric {
                    if !value.is_finite() {
                        return Err(LatenciaError::fault(format!(
                            "{provider}: aggregate on {} is {value}",
                            day.date
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Deduplicated, ordered list of x-axis dates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DateAxis(Vec<String>);

impl DateAxis {
    /// Build an axis, keeping the first occurrence of each date
    pub fn from_dates<I, S>(dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut axis = Vec::new();
        for date in dates {
            let date = date.into();
            if seen.insert(date.clone()) {
                axis.push(date);
            }
        }
        Self(axis)
    }

    /// Number of dates
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty axis
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First date, the default selection
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Membership test by exact string equality
    #[must_use]
    pub fn contains(&self, date: &str) -> bool {
        self.0.iter().any(|d| d == date)
    }

    /// Index of `date` on the axis
    #[must_use]
    pub fn position(&self, date: &str) -> Option<usize> {
        self.0.iter().position(|d| d == date)
    }

    /// Date at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// Dates as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterate dates in axis order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<Vec<String>> for DateAxis {
    fn from(dates: Vec<String>) -> Self {
        Self::from_dates(dates)
    }
}

impl From<DateAxis> for Vec<String> {
    fn from(axis: DateAxis) -> Self {
        axis.0
    }
}

/// Body of `GET /metrics/period`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodPayload {
    /// Per-provider daily aggregates
    pub aggregated_metrics: AggregateSeries,
    /// Dates covered by the requested range
    pub date_array: DateAxis,
}

impl PeriodPayload {
    /// Validate the aggregates
    ///
    /// # Errors
    /// Returns `TransformFault` if any aggregate is malformed.
    pub fn validate(&self) -> Result<()> {
        self.aggregated_metrics.validate()
    }
}

/// Body of `GET /metrics/date`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatePayload {
    /// Per-provider distributions for the requested date
    pub metrics: ProviderMetricSet,
}

impl DatePayload {
    /// Validate every distribution
    ///
    /// # Errors
    /// Returns `TransformFault` if any distribution is malformed.
    pub fn validate(&self) -> Result<()> {
        self.metrics.validate()
    }
}
