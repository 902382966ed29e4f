//! Distribution transformer: per-date latency CDFs on a log10 latency axis
//!
//! Every `(provider, model)` pair that reported the requested metric becomes
//! one [`CdfSeries`] named `"<provider> - <model>"`. Pairs without the metric
//! are skipped, since providers do not all report every metric.
//!
//! # Zero latencies
//!
//! `log10(0)` is `-inf`. Latencies below [`LATENCY_FLOOR_MS`] are clamped to
//! the floor before the transform, so a zero sample is plotted at
//! `log10(LATENCY_FLOOR_MS) = -3` (shown as `0.001 ms`). The CDF value of the
//! clamped point is left untouched.

use tracing::error;

use crate::error::{LatenciaError, Result};
use crate::palette::Palette;
use crate::series::{CdfPoint, CdfSeries};
use crate::types::ProviderMetricSet;

/// Smallest latency plotted on the log axis (one microsecond)
pub const LATENCY_FLOOR_MS: f64 = 1e-3;

/// Latency → x coordinate, with zero clamped to [`LATENCY_FLOOR_MS`]
#[must_use]
pub fn log_latency(latency_ms: f64) -> f64 {
    latency_ms.max(LATENCY_FLOOR_MS).log10()
}

/// Build one CDF series per provider/model that has `metric_type`
///
/// Output follows the key order of `metric_set` (providers, then models,
/// both sorted), so identical inputs always give identical output.
///
/// # Errors
/// Returns `TransformFault` if any distribution used for the chart is
/// malformed. Nothing is partially rendered.
pub fn cdf_series(
    metric_set: &ProviderMetricSet,
    metric_type: &str,
    palette: &Palette,
) -> Result<Vec<CdfSeries>> {
    let mut out = Vec::new();

    for (provider, model, metrics) in metric_set.models() {
        let Some(dist) = metrics.get(metric_type) else {
            continue;
        };

        if let Err(LatenciaError::TransformFault { reason }) = dist.validate() {
            error!(%provider, %model, metric_type, "refusing malformed distribution: {reason}");
            return Err(LatenciaError::fault(format!(
                "{provider} / {model} / {metric_type}: {reason}"
            )));
        }

        let points = dist
            .latencies
            .iter()
            .zip(&dist.cdf)
            .map(|(&latency, &fraction)| CdfPoint {
                x: log_latency(latency),
                y: fraction,
            })
            .collect();

        out.push(CdfSeries {
            name: format!("{provider} - {model}"),
            provider: provider.to_string(),
            model: model.to_string(),
            color: palette.color_for(provider),
            points,
        });
    }

    Ok(out)
}
