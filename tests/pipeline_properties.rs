//! Property-based tests for the transformers and the fetch state machine
//!
//! These tests use proptest to check the invariants the dashboard relies on:
//! point counts, CDF pass-through, log inversion, alignment and selection.

use latencia::{
    aggregate::align_aggregates,
    catalog::TimeRange,
    client::DateParam,
    distribution::{cdf_series, log_latency, LATENCY_FLOOR_MS},
    orchestrator::{FetchOutcome, FetchRequest, FetchState, MetricsOrchestrator, PipelineConfig},
    palette::Palette,
    series::ValueScale,
    types::{
        AggregateSeries, DailyAggregate, DateAxis, LatencyDistribution, PeriodPayload,
        ProviderMetricSet,
    },
};
use proptest::prelude::*;

const METRIC: &str = "timetofirsttoken";

/// Strategy for valid distributions: sorted latencies, sorted CDF in [0, 1]
fn distribution_strategy(max_len: usize) -> impl Strategy<Value = LatencyDistribution> {
    (1..=max_len).prop_flat_map(|len| {
        (
            prop::collection::vec(0.0f64..50_000.0, len),
            prop::collection::vec(0.0f64..=1.0, len),
        )
            .prop_map(|(mut latencies, mut cdf)| {
                latencies.sort_by(f64::total_cmp);
                cdf.sort_by(f64::total_cmp);
                LatencyDistribution::new(latencies, cdf).unwrap()
            })
    })
}

/// Strategy for a metric set of up to three providers with one or two models
fn metric_set_strategy() -> impl Strategy<Value = ProviderMetricSet> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["OpenAI", "Groq", "Anthropic", "NewVendor"]),
            prop::sample::select(vec!["small", "large"]),
            distribution_strategy(40),
            any::<bool>(),
        ),
        1..6,
    )
    .prop_map(|entries| {
        let mut set = ProviderMetricSet::new();
        for (provider, model, dist, has_metric) in entries {
            let metric = if has_metric { METRIC } else { "tps" };
            set.insert(provider, model, metric, dist);
        }
        set
    })
}

/// Strategy for a date axis of `1..=max` distinct days
fn axis_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    (1..=max).prop_map(|n| (0..n).map(|d| format!("2024-01-{:02}", d + 1)).collect())
}

/// Aggregates for a subset of `dates`; values may be zero, negative or absent
fn aggregates_strategy(
    dates: Vec<String>,
) -> impl Strategy<Value = (Vec<String>, Vec<Option<Option<f64>>>)> {
    let len = dates.len();
    let slot = prop_oneof![
        Just(None),
        Just(Some(None)),
        (-50.0f64..0.0).prop_map(|v| Some(Some(v))),
        Just(Some(Some(0.0))),
        (0.001f64..10_000.0).prop_map(|v| Some(Some(v))),
    ];
    prop::collection::vec(slot, len).prop_map(move |slots| (dates.clone(), slots))
}

fn single_provider(dates: &[String], slots: &[Option<Option<f64>>]) -> AggregateSeries {
    let days = dates
        .iter()
        .zip(slots)
        .filter_map(|(date, slot)| slot.map(|value| DailyAggregate::new(date.clone(), value)))
        .collect();
    let mut series = AggregateSeries::new();
    series.insert("OpenAI", days);
    series
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// One point per sample, CDF values copied unchanged
    #[test]
    fn test_cdf_points_match_input(set in metric_set_strategy()) {
        let series = cdf_series(&set, METRIC, &Palette::default()).unwrap();
        prop_assert_eq!(series.len(), set.count_for(METRIC));

        for s in &series {
            let dist = set.get(&s.provider, &s.model, METRIC).unwrap();
            prop_assert_eq!(s.points.len(), dist.len());
            for (point, (&latency, &cdf)) in s.points.iter().zip(dist.latencies.iter().zip(&dist.cdf)) {
                prop_assert_eq!(point.y, cdf);
                prop_assert!(point.x.is_finite());
                prop_assert_eq!(point.x, log_latency(latency));
            }
        }
    }

    /// Zero or tiny latencies land on the documented floor, never -inf
    #[test]
    fn test_floor_substitution(latency in 0.0f64..LATENCY_FLOOR_MS) {
        prop_assert_eq!(log_latency(latency), LATENCY_FLOOR_MS.log10());
    }

    /// 10^(log10(v)) recovers v
    #[test]
    fn test_log_roundtrip(v in 1e-6f64..1e9) {
        let back = ValueScale::Log10.inverse(ValueScale::Log10.forward(v));
        prop_assert!((back - v).abs() <= v * 1e-9, "{} -> {}", v, back);
    }

    /// Both transformers are pure
    #[test]
    fn test_transformers_are_idempotent(
        set in metric_set_strategy(),
        (dates, slots) in axis_strategy(30).prop_flat_map(aggregates_strategy),
        log in any::<bool>(),
    ) {
        let palette = Palette::default();
        prop_assert_eq!(
            cdf_series(&set, METRIC, &palette).unwrap(),
            cdf_series(&set, METRIC, &palette).unwrap()
        );

        let aggregates = single_provider(&dates, &slots);
        let axis = DateAxis::from_dates(dates);
        let scale = ValueScale::from_log_flag(log);
        prop_assert_eq!(
            align_aggregates(&aggregates, &axis, scale, &palette),
            align_aggregates(&aggregates, &axis, scale, &palette)
        );
    }

    /// Exactly N slots; None wherever the value is absent or not positive
    #[test]
    fn test_alignment_has_axis_length(
        (dates, slots) in axis_strategy(90).prop_flat_map(aggregates_strategy),
        log in any::<bool>(),
    ) {
        let aggregates = single_provider(&dates, &slots);
        let axis = DateAxis::from_dates(dates.clone());
        let scale = ValueScale::from_log_flag(log);
        let series = align_aggregates(&aggregates, &axis, scale, &Palette::default());

        prop_assert_eq!(series.len(), 1);
        prop_assert_eq!(series[0].values.len(), dates.len());
        for (plotted, slot) in series[0].values.iter().zip(&slots) {
            match slot {
                Some(Some(v)) if *v > 0.0 => {
                    let back = scale.inverse(plotted.unwrap());
                    prop_assert!((back - v).abs() <= v * 1e-9);
                },
                _ => prop_assert!(plotted.is_none()),
            }
        }
    }

    /// After a non-empty range resolves a date is always selected
    #[test]
    fn test_selection_never_null_after_range(
        dates in axis_strategy(60),
        range_index in 0usize..3,
        pick in any::<prop::sample::Index>(),
    ) {
        let config = PipelineConfig {
            default_range: TimeRange::ALL[range_index],
            ..PipelineConfig::new(METRIC)
        };
        let mut orch = MetricsOrchestrator::new(config);
        let Some(FetchRequest::Range(ticket)) = orch.mount() else {
            panic!("mount must fetch a range");
        };
        let payload = PeriodPayload {
            aggregated_metrics: AggregateSeries::new(),
            date_array: DateAxis::from_dates(dates.clone()),
        };
        let follow_up = orch.apply(FetchOutcome::Range(ticket, Ok(payload)));

        prop_assert_eq!(orch.selected_date(), Some(dates[0].as_str()));
        let is_date_fetch = matches!(
            follow_up,
            Some(FetchRequest::Distribution(ref t)) if t.query.date == DateParam::On(dates[0].clone())
        );
        prop_assert!(is_date_fetch);

        let chosen = pick.get(&dates).clone();
        let _ = orch.select_date(&chosen).unwrap();
        prop_assert_eq!(orch.selected_date(), Some(chosen.as_str()));
        prop_assert!(matches!(orch.state(), FetchState::FetchingDate(_)));
    }
}

#[test]
fn test_zero_latency_scenario() {
    let mut set = ProviderMetricSet::new();
    set.insert(
        "OpenAI",
        "gpt-4o",
        METRIC,
        LatencyDistribution::new(vec![0.0, 10.0, 100.0], vec![0.0, 0.5, 1.0]).unwrap(),
    );
    let series = cdf_series(&set, METRIC, &Palette::default()).unwrap();
    let xs: Vec<f64> = series[0].points.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![-3.0, 1.0, 2.0]);
}

#[test]
fn test_alignment_scenario() {
    let mut aggregates = AggregateSeries::new();
    aggregates.insert(
        "OpenAI",
        vec![
            DailyAggregate::new("2024-01-01", Some(120.0)),
            DailyAggregate::new("2024-01-03", Some(95.5)),
        ],
    );
    let axis = DateAxis::from_dates(["2024-01-01", "2024-01-02", "2024-01-03"]);
    let series = align_aggregates(&aggregates, &axis, ValueScale::Linear, &Palette::default());
    assert_eq!(series[0].values, vec![Some(120.0), None, Some(95.5)]);
}
