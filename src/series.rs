//! Plot-ready series produced by the transformers

use serde::{Deserialize, Serialize};

use crate::palette::Rgb;

/// Value transform applied before plotting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueScale {
    /// Values plotted as-is
    #[default]
    Linear,
    /// Values plotted as `log10(v)`; labels show `10^x`
    Log10,
}

impl ValueScale {
    /// `true` selects [`ValueScale::Log10`]
    #[must_use]
    pub fn from_log_flag(log_scale: bool) -> Self {
        if log_scale {
            Self::Log10
        } else {
            Self::Linear
        }
    }

    /// Map a raw value onto the plot axis
    #[must_use]
    pub fn forward(self, value: f64) -> f64 {
        match self {
            Self::Linear => value,
            Self::Log10 => value.log10(),
        }
    }

    /// Map a plotted value back to the raw unit
    #[must_use]
    pub fn inverse(self, plotted: f64) -> f64 {
        match self {
            Self::Linear => plotted,
            Self::Log10 => 10_f64.powf(plotted),
        }
    }
}

/// One point of a CDF series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CdfPoint {
    /// `log10` of the latency in ms
    pub x: f64,
    /// Cumulative fraction, copied unchanged from the input
    pub y: f64,
}

/// Latency CDF for one provider/model pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdfSeries {
    /// Legend label, `"<provider> - <model>"`
    pub name: String,
    /// Provider the series belongs to
    pub provider: String,
    /// Model the series belongs to
    pub model: String,
    /// Line color
    pub color: Rgb,
    /// One point per input sample
    pub points: Vec<CdfPoint>,
}

impl CdfSeries {
    /// Smallest and largest x value, `None` for an empty series
    #[must_use]
    pub fn x_range(&self) -> Option<(f64, f64)> {
        span(self.points.iter().map(|p| p.x))
    }
}

/// Daily aggregate line for one provider, aligned to the date axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    /// Legend label (the provider name)
    pub name: String,
    /// Line color
    pub color: Rgb,
    /// One slot per axis date; `None` means no data on that date
    pub values: Vec<Option<f64>>,
}

impl TrendSeries {
    /// Number of dates that carry a value
    #[must_use]
    pub fn present(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Smallest and largest plotted value
    #[must_use]
    pub fn y_range(&self) -> Option<(f64, f64)> {
        span(self.values.iter().flatten().copied())
    }
}

pub(crate) fn span(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
