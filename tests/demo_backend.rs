//! End-to-end tests against the fixture backend
//!
//! Each test binds the demo router on an ephemeral port and talks to it over
//! real HTTP with `MetricsClient`.

#![cfg(feature = "demo-server")]

use std::sync::Arc;

use chrono::NaiveDate;
use latencia::{
    catalog::TimeRange,
    cli::run_snapshot,
    client::{DateParam, DateQuery, MetricsClient, MetricsSource, PeriodQuery},
    demo::{self, DemoData},
    error::FailureKind,
    orchestrator::{FetchState, PipelineConfig},
    session::DashboardSession,
    LatenciaError,
};

const METRIC: &str = "timetofirsttoken";

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
}

/// Start the demo backend and return a client pointed at it
async fn start_backend() -> MetricsClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(demo::serve_on(listener, DemoData::new(anchor())));
    MetricsClient::with_timeout(&format!("http://{addr}"), 5).unwrap()
}

// =============================================================================
// Wire decoding
// =============================================================================

#[tokio::test]
async fn test_period_decodes_over_http() {
    let client = start_backend().await;
    let payload = client
        .fetch_period(&PeriodQuery {
            time_range: TimeRange::Month,
            metric_type: METRIC.to_string(),
            streaming: true,
        })
        .await
        .unwrap();

    assert_eq!(payload.date_array.len(), 30);
    assert_eq!(payload.date_array.get(29), Some("2024-03-31"));
    assert!(payload.validate().is_ok());
    assert_eq!(payload.aggregated_metrics.0["OpenAI"].len(), 30);
    // Cloudflare skips days, the axis does not
    assert!(payload.aggregated_metrics.0["Cloudflare"].len() < 30);
}

#[tokio::test]
async fn test_date_decodes_over_http() {
    let client = start_backend().await;
    let payload = client
        .fetch_date(&DateQuery {
            date: DateParam::On("2024-03-30".to_string()),
            metric_type: METRIC.to_string(),
            streaming: true,
        })
        .await
        .unwrap();

    assert!(payload.validate().is_ok());
    assert_eq!(payload.metrics.count_for(METRIC), 5);
    assert!(payload.metrics.get("OpenAI", "gpt-4o-mini", METRIC).is_some());
}

#[tokio::test]
async fn test_latest_matches_anchor() {
    let client = start_backend().await;
    let query = |date| DateQuery {
        date,
        metric_type: METRIC.to_string(),
        streaming: false,
    };
    let latest = client.fetch_date(&query(DateParam::Latest)).await.unwrap();
    let anchored = client
        .fetch_date(&query(DateParam::On("2024-03-31".to_string())))
        .await
        .unwrap();
    assert_eq!(latest, anchored);
}

#[tokio::test]
async fn test_future_date_is_network_failure() {
    let client = start_backend().await;
    let err = client
        .fetch_date(&DateQuery {
            date: DateParam::On("2024-04-01".to_string()),
            metric_type: METRIC.to_string(),
            streaming: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LatenciaError::ConnectionError(ref m) if m.contains("400")));
    assert_eq!(err.kind(), FailureKind::NetworkFailure);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = MetricsClient::with_timeout(&format!("http://{addr}"), 2).unwrap();
    let err = client
        .fetch_period(&PeriodQuery {
            time_range: TimeRange::Week,
            metric_type: METRIC.to_string(),
            streaming: true,
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::NetworkFailure);
}

// =============================================================================
// Full pipeline
// =============================================================================

#[tokio::test]
async fn test_session_reaches_date_ready() {
    let client = Arc::new(start_backend().await);
    let mut session = DashboardSession::new(client, PipelineConfig::new(METRIC));
    session.mount();
    session.settle().await;

    assert_eq!(session.orchestrator().state(), &FetchState::DateReady);
    assert_eq!(session.orchestrator().selected_date(), Some("2024-01-02"));

    let view = session.view();
    let range = view.range.expect("range");
    assert_eq!(range.date_axis.len(), 90);
    let cloudflare = range
        .trend
        .iter()
        .find(|s| s.name == "Cloudflare")
        .expect("cloudflare");
    assert!(cloudflare.values.iter().any(Option::is_none));
    assert_eq!(view.distribution.expect("distribution").series.len(), 5);

    session.select_range(TimeRange::Week);
    session.settle().await;
    assert_eq!(session.orchestrator().selected_date(), Some("2024-03-25"));

    session.step_date(3).unwrap();
    session.settle().await;
    assert_eq!(session.orchestrator().selected_date(), Some("2024-03-28"));
    assert_eq!(session.orchestrator().state(), &FetchState::DateReady);
}

#[tokio::test]
async fn test_snapshot_against_backend() {
    let client = Arc::new(start_backend().await);
    let config = PipelineConfig {
        default_range: TimeRange::Week,
        ..PipelineConfig::new(METRIC)
    };

    let snapshot = run_snapshot(
        Arc::clone(&client),
        config.clone(),
        Some(DateParam::On("2024-03-28".to_string())),
    )
    .await
    .unwrap();
    assert_eq!(snapshot.date.as_deref(), Some("2024-03-28"));
    assert!(snapshot.has_data());
    assert_eq!(snapshot.trend.series.len(), 4);

    let latest = run_snapshot(client, config, Some(DateParam::Latest))
        .await
        .unwrap();
    assert_eq!(latest.date.as_deref(), Some("latest"));
    assert_eq!(latest.distribution.expect("distribution").series.len(), 5);
}
