//! Aggregate transformer: aligns per-provider daily aggregates onto one date axis
//!
//! Providers do not necessarily report the same dates. Each output series has
//! exactly one slot per axis date; a slot is `None` when the provider has no
//! aggregate for that date or the aggregate is not positive. `None` means
//! "no data", never "zero latency".

use std::collections::HashMap;

use crate::palette::Palette;
use crate::series::{TrendSeries, ValueScale};
use crate::types::{AggregateSeries, DateAxis};

/// Align every provider in `series` onto `axis`
///
/// Providers come out sorted by name. With [`ValueScale::Log10`] the positive
/// values are stored as `log10(v)`; use [`ValueScale::inverse`] to label them.
#[must_use]
pub fn align_aggregates(
    series: &AggregateSeries,
    axis: &DateAxis,
    scale: ValueScale,
    palette: &Palette,
) -> Vec<TrendSeries> {
    let mut providers: Vec<_> = series.0.iter().collect();
    providers.sort_by(|a, b| a.0.cmp(b.0));

    providers
        .into_iter()
        .map(|(provider, days)| {
            let mut by_date: HashMap<&str, Option<f64>> = HashMap::with_capacity(days.len());
            for day in days {
                by_date
                    .entry(day.date.as_str())
                    .or_insert(day.aggregated_metric);
            }

            let values = axis
                .iter()
                .map(|date| {
                    by_date
                        .get(date)
                        .copied()
                        .flatten()
                        .filter(|v| v.is_finite() && *v > 0.0)
                        .map(|v| scale.forward(v))
                })
                .collect();

            TrendSeries {
                name: provider.clone(),
                color: palette.color_for(provider),
                values,
            }
        })
        .collect()
}
