use async_trait::async_trait;

use crate::cli::*;
use crate::client::PeriodQuery;
use crate::types::{
    AggregateSeries, DailyAggregate, DateAxis, DatePayload, LatencyDistribution, PeriodPayload,
    ProviderMetricSet,
};

/// Backend answering from fixed payloads
struct FixedSource {
    period: Result<PeriodPayload>,
    latest_model: &'static str,
}

impl FixedSource {
    fn healthy() -> Self {
        let mut aggregates = AggregateSeries::new();
        aggregates.insert(
            "OpenAI",
            vec![
                DailyAggregate::new("2024-01-01", Some(120.0)),
                DailyAggregate::new("2024-01-03", Some(95.5)),
            ],
        );
        Self {
            period: Ok(PeriodPayload {
                aggregated_metrics: aggregates,
                date_array: DateAxis::from_dates(["2024-01-01", "2024-01-02", "2024-01-03"]),
            }),
            latest_model: "llama-latest",
        }
    }
}

#[async_trait]
impl MetricsSource for FixedSource {
    async fn fetch_period(&self, _query: &PeriodQuery) -> Result<PeriodPayload> {
        self.period.clone()
    }

    async fn fetch_date(&self, query: &DateQuery) -> Result<DatePayload> {
        let model = match &query.date {
            DateParam::Latest => self.latest_model.to_string(),
            DateParam::On(day) => format!("llama-{day}"),
        };
        let mut metrics = ProviderMetricSet::new();
        metrics.insert(
            "Groq",
            model,
            query.metric_type.clone(),
            LatencyDistribution::new(vec![10.0, 100.0, 1000.0], vec![0.25, 0.5, 1.0])?,
        );
        Ok(DatePayload { metrics })
    }
}

fn pipeline() -> PipelineConfig {
    PipelineConfig::new("timetofirsttoken")
}

// -------------------------------------------------------------------------
// Config Tests
// -------------------------------------------------------------------------

#[test]
fn test_load_config_applies_overrides() {
    let overrides = Overrides {
        base_url: Some("http://example.test:9000".to_string()),
        metric_type: Some("tps".to_string()),
        time_range: Some(TimeRange::Week),
        end_to_end: true,
        log_scale: true,
    };
    let config = load_config(None, &overrides).expect("config");
    assert_eq!(config.backend.base_url, "http://example.test:9000");
    assert_eq!(config.dashboard.metric_type, "tps");
    assert_eq!(config.dashboard.default_range, TimeRange::Week);
    assert!(!config.dashboard.streaming);
    assert!(config.dashboard.log_scale);

    let client = build_client(&config).expect("client");
    assert_eq!(client.base_url(), "http://example.test:9000");
}

#[test]
fn test_load_config_validates_after_overrides() {
    let overrides = Overrides {
        metric_type: Some(String::new()),
        ..Overrides::default()
    };
    assert!(matches!(
        load_config(None, &overrides),
        Err(LatenciaError::InvalidConfiguration(_))
    ));
}

// -------------------------------------------------------------------------
// Snapshot Tests
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_snapshot_uses_first_date() {
    let snapshot = run_snapshot(Arc::new(FixedSource::healthy()), pipeline(), None)
        .await
        .expect("snapshot");
    assert_eq!(snapshot.date.as_deref(), Some("2024-01-01"));
    assert!(snapshot.has_data());
    let dist = snapshot.distribution.as_ref().expect("distribution");
    assert_eq!(dist.series[0].name, "Groq - llama-2024-01-01");
}

#[tokio::test]
async fn test_snapshot_explicit_date_must_be_on_axis() {
    let source = Arc::new(FixedSource::healthy());
    let snapshot = run_snapshot(
        Arc::clone(&source),
        pipeline(),
        Some(DateParam::On("2024-01-03".to_string())),
    )
    .await
    .expect("snapshot");
    assert_eq!(snapshot.date.as_deref(), Some("2024-01-03"));

    let err = run_snapshot(source, pipeline(), Some(DateParam::On("2023-12-31".to_string())))
        .await
        .unwrap_err();
    assert!(matches!(err, LatenciaError::InvalidSelection { .. }));
}

#[tokio::test]
async fn test_snapshot_latest_goes_to_backend() {
    let snapshot = run_snapshot(
        Arc::new(FixedSource::healthy()),
        pipeline(),
        Some(DateParam::Latest),
    )
    .await
    .expect("snapshot");
    assert_eq!(snapshot.date.as_deref(), Some("latest"));
    let dist = snapshot.distribution.expect("distribution");
    assert_eq!(dist.series[0].name, "Groq - llama-latest");
}

#[tokio::test]
async fn test_snapshot_keeps_failure_kind() {
    let source = FixedSource {
        period: Err(LatenciaError::ConnectionError("HTTP 502".to_string())),
        latest_model: "unused",
    };
    let err = run_snapshot(Arc::new(source), pipeline(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NetworkFailure);
}

#[tokio::test]
async fn test_empty_snapshot_is_empty_result() {
    let source = FixedSource {
        period: Ok(PeriodPayload::default()),
        latest_model: "unused",
    };
    let snapshot = run_snapshot(Arc::new(source), pipeline(), None)
        .await
        .expect("snapshot");
    assert!(!snapshot.has_data());
    assert_eq!(snapshot.date, None);
    let err = snapshot.ensure_data().unwrap_err();
    assert_eq!(err.kind(), FailureKind::EmptyResult);
}

#[tokio::test]
async fn test_summary_reports_both_charts() {
    let snapshot = run_snapshot(Arc::new(FixedSource::healthy()), pipeline(), None)
        .await
        .expect("snapshot");
    let text = snapshot.summary();
    assert!(text.contains("Aggregated Metrics for Time to First Token"));
    assert!(text.contains("2/3 days"));
    assert!(text.contains("latest 95.50 ms"));
    assert!(text.contains("Groq - llama-2024-01-01"));
    assert!(text.contains(" 100.000 ms"));
    assert!(text.contains(" 1000.000 ms"));
}

#[test]
fn test_quantile_picks_first_crossing() {
    let points = [[1.0, 0.25], [2.0, 0.5], [3.0, 1.0]];
    assert_eq!(quantile(&points, 0.5), Some(2.0));
    assert_eq!(quantile(&points, 0.1), Some(1.0));
    assert_eq!(quantile(&[], 0.5), None);
}

#[test]
fn test_metrics_listing_groups_by_page() {
    let listing = metrics_listing();
    assert!(listing.starts_with("Time to First Token\n"));
    assert!(listing.contains("  timebetweentokens_p95"));
    assert!(listing.contains("Tokens per Second"));
}
