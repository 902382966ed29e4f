//! Benchmark suite for the chart transformers
//!
//! Measures CDF construction and date-axis alignment at dashboard sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use latencia::aggregate::align_aggregates;
use latencia::catalog::TimeRange;
use latencia::chart::{distribution_chart, trend_chart};
use latencia::distribution::cdf_series;
use latencia::palette::Palette;
use latencia::series::ValueScale;
use latencia::types::{
    AggregateSeries, DailyAggregate, DateAxis, LatencyDistribution, ProviderMetricSet,
};

const METRIC: &str = "timetofirsttoken";
const PROVIDERS: [&str; 6] = ["Anthropic", "Cloudflare", "Groq", "Mistral", "OpenAI", "Together"];

fn create_metric_set(samples: usize) -> ProviderMetricSet {
    let mut set = ProviderMetricSet::new();
    for (p, provider) in PROVIDERS.iter().enumerate() {
        for model in ["small", "large"] {
            let latencies: Vec<f64> = (0..samples).map(|i| (p * 50 + i) as f64 * 1.5).collect();
            let cdf: Vec<f64> = (1..=samples).map(|i| i as f64 / samples as f64).collect();
            set.insert(
                *provider,
                model,
                METRIC,
                LatencyDistribution::new(latencies, cdf).unwrap(),
            );
        }
    }
    set
}

fn create_aggregates(days: usize) -> (AggregateSeries, DateAxis) {
    let dates: Vec<String> = (0..days).map(|d| format!("day-{d:03}")).collect();
    let mut series = AggregateSeries::new();
    for (p, provider) in PROVIDERS.iter().enumerate() {
        let values = dates
            .iter()
            .enumerate()
            // Every provider misses a few days
            .filter(|(d, _)| (d + p) % 7 != 0)
            .map(|(d, date)| DailyAggregate::new(date.clone(), Some(100.0 + (d * p) as f64)))
            .collect();
        series.insert(*provider, values);
    }
    (series, DateAxis::from_dates(dates))
}

fn benchmark_cdf_series(c: &mut Criterion) {
    let palette = Palette::default();
    let mut group = c.benchmark_group("cdf_series");

    for samples in [10, 100, 1000].iter() {
        let set = create_metric_set(*samples);
        group.bench_with_input(BenchmarkId::from_parameter(samples), &set, |b, set| {
            b.iter(|| {
                let series = cdf_series(black_box(set), METRIC, &palette).unwrap();
                black_box(series)
            });
        });
    }

    group.finish();
}

fn benchmark_align_aggregates(c: &mut Criterion) {
    let palette = Palette::default();
    let mut group = c.benchmark_group("align_aggregates");

    for range in TimeRange::ALL {
        let days = match range {
            TimeRange::Week => 7,
            TimeRange::Month => 30,
            TimeRange::ThreeMonth => 90,
        };
        let (series, axis) = create_aggregates(days);
        for scale in [ValueScale::Linear, ValueScale::Log10] {
            let id = BenchmarkId::new(range.as_query(), format!("{scale:?}"));
            group.bench_with_input(id, &scale, |b, &scale| {
                b.iter(|| {
                    let trend = align_aggregates(black_box(&series), &axis, scale, &palette);
                    black_box(trend)
                });
            });
        }
    }

    group.finish();
}

fn benchmark_chart_specs(c: &mut Criterion) {
    let palette = Palette::default();
    let set = create_metric_set(100);
    let cdf = cdf_series(&set, METRIC, &palette).unwrap();
    let (series, axis) = create_aggregates(90);
    let trend = align_aggregates(&series, &axis, ValueScale::Linear, &palette);

    c.bench_function("distribution_chart_12_series", |b| {
        b.iter(|| black_box(distribution_chart(METRIC, black_box(&cdf))));
    });
    c.bench_function("trend_chart_90_days", |b| {
        b.iter(|| {
            black_box(trend_chart(
                METRIC,
                TimeRange::ThreeMonth,
                black_box(&trend),
                &axis,
                ValueScale::Linear,
            ))
        });
    });
}

criterion_group!(
    benches,
    benchmark_cdf_series,
    benchmark_align_aggregates,
    benchmark_chart_specs
);
criterion_main!(benches);
