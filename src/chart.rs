//! Chart adapters: plot-ready series → rendering vocabulary
//!
//! [`ChartSpec`] is what a chart surface consumes: titles, two axes with
//! their tick layout and label formatters, tooltip mode, stroke and marker
//! settings, and the series themselves. It serializes to JSON for the
//! one-shot snapshot and is drawn by the terminal dashboard.
//!
//! Adapters only copy and label. The series passed in are never modified.

use serde::{Deserialize, Serialize};

use crate::catalog::{metric_title, TimeRange};
use crate::palette::Rgb;
use crate::series::{span, CdfSeries, TrendSeries, ValueScale};
use crate::types::DateAxis;

/// Distribution x-axis tick count
pub const DISTRIBUTION_X_TICKS: usize = 10;
/// Distribution y-axis tick count
pub const DISTRIBUTION_Y_TICKS: usize = 5;
/// Trend line marker size
pub const TREND_MARKER_SIZE: u8 = 5;

/// How tick and tooltip values are turned into text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueFormat {
    /// Plotted value mapped back through `scale`, then `"<v> ms"`
    Milliseconds {
        /// Transform to invert before printing
        scale: ValueScale,
        /// Digits after the decimal point
        decimals: usize,
    },
    /// Plain number
    Fixed {
        /// Digits after the decimal point
        decimals: usize,
    },
    /// Category labels printed as-is
    Verbatim,
}

impl ValueFormat {
    /// Text for one plotted value
    #[must_use]
    pub fn format(&self, plotted: f64) -> String {
        match *self {
            Self::Milliseconds { scale, decimals } => {
                format!("{:.*} ms", decimals, scale.inverse(plotted))
            },
            Self::Fixed { decimals } => format!("{plotted:.decimals$}"),
            Self::Verbatim => plotted.to_string(),
        }
    }
}

/// Numeric or categorical axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AxisKind {
    /// Continuous numeric axis
    Linear,
    /// One slot per category label
    Category {
        /// Labels in display order
        categories: Vec<String>,
    },
}

/// One chart axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    /// Axis title
    pub title: String,
    /// Numeric or categorical
    pub kind: AxisKind,
    /// Plotted-value bounds; `None` lets the surface pick
    pub bounds: Option<(f64, f64)>,
    /// Number of ticks, `None` for one per category
    pub tick_count: Option<usize>,
    /// Label formatter
    pub labels: ValueFormat,
}

impl AxisSpec {
    /// Evenly spaced tick positions across `bounds`
    #[must_use]
    pub fn ticks(&self) -> Vec<f64> {
        match (self.bounds, self.tick_count) {
            (Some((lo, hi)), Some(count)) => tick_positions(lo, hi, count),
            _ => Vec::new(),
        }
    }

    /// Tick positions rendered through the label formatter
    #[must_use]
    pub fn tick_labels(&self) -> Vec<String> {
        match &self.kind {
            AxisKind::Category { categories } => categories.clone(),
            AxisKind::Linear => self
                .ticks()
                .into_iter()
                .map(|t| self.labels.format(t))
                .collect(),
        }
    }
}

/// Tooltip behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TooltipSpec {
    /// One tooltip lists every series at the hovered x
    pub shared: bool,
    /// Only trigger when directly over a point
    pub intersect: bool,
    /// Formatter for the x value
    pub x: ValueFormat,
    /// Formatter for each y value
    pub y: ValueFormat,
}

/// Line stroke
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeSpec {
    /// Curved interpolation between points
    pub smooth: bool,
    /// Width in pixels
    pub width: u8,
}

/// Series data, numeric pairs or one slot per category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesData {
    /// `[x, y]` pairs
    Points(Vec<[f64; 2]>),
    /// One value per category, `None` renders as a gap
    Categories(Vec<Option<f64>>),
}

/// One named, colored series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    /// Legend label
    pub name: String,
    /// Line color
    pub color: Rgb,
    /// Plot data
    pub data: SeriesData,
}

/// Everything a surface needs to draw one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Heading
    pub title: String,
    /// Secondary heading
    pub subtitle: String,
    /// Horizontal axis
    pub x_axis: AxisSpec,
    /// Vertical axis
    pub y_axis: AxisSpec,
    /// Tooltip mode
    pub tooltip: TooltipSpec,
    /// Line stroke
    pub stroke: StrokeSpec,
    /// Marker size, 0 for none
    pub marker_size: u8,
    /// Series in legend order
    pub series: Vec<SeriesSpec>,
}

impl ChartSpec {
    /// True if no series carries a single drawable value
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.series.iter().all(|s| match &s.data {
            SeriesData::Points(points) => points.is_empty(),
            SeriesData::Categories(values) => values.iter().all(Option::is_none),
        })
    }
}

/// Latency-vs-CDF chart for one date
#[must_use]
pub fn distribution_chart(metric_type: &str, series: &[CdfSeries]) -> ChartSpec {
    let latency = ValueFormat::Milliseconds {
        scale: ValueScale::Log10,
        decimals: 3,
    };
    let x_bounds = span(series.iter().filter_map(CdfSeries::x_range).flat_map(|(lo, hi)| [lo, hi]));

    ChartSpec {
        title: metric_title(metric_type),
        subtitle: "Latency vs CDF across all providers".to_string(),
        x_axis: AxisSpec {
            title: "Latency (ms)".to_string(),
            kind: AxisKind::Linear,
            bounds: x_bounds.map(pad_degenerate),
            tick_count: Some(DISTRIBUTION_X_TICKS),
            labels: latency,
        },
        y_axis: AxisSpec {
            title: "Portion of Requests (CDF)".to_string(),
            kind: AxisKind::Linear,
            bounds: Some((0.0, 1.0)),
            tick_count: Some(DISTRIBUTION_Y_TICKS),
            labels: ValueFormat::Fixed { decimals: 2 },
        },
        tooltip: TooltipSpec {
            shared: true,
            intersect: false,
            x: latency,
            y: ValueFormat::Fixed { decimals: 3 },
        },
        stroke: StrokeSpec {
            smooth: false,
            width: 2,
        },
        marker_size: 0,
        series: series
            .iter()
            .map(|s| SeriesSpec {
                name: s.name.clone(),
                color: s.color,
                data: SeriesData::Points(s.points.iter().map(|p| [p.x, p.y]).collect()),
            })
            .collect(),
    }
}

/// Daily aggregate trend chart over `axis`
#[must_use]
pub fn trend_chart(
    metric_type: &str,
    time_range: TimeRange,
    series: &[TrendSeries],
    axis: &DateAxis,
    scale: ValueScale,
) -> ChartSpec {
    let latency = ValueFormat::Milliseconds { scale, decimals: 2 };
    let y_bounds = span(series.iter().filter_map(TrendSeries::y_range).flat_map(|(lo, hi)| [lo, hi]));

    ChartSpec {
        title: format!("Aggregated Metrics for {}", metric_title(metric_type)),
        subtitle: format!("Aggregated Latency Metrics ({})", time_range.label()),
        x_axis: AxisSpec {
            title: "Date".to_string(),
            kind: AxisKind::Category {
                categories: axis.as_slice().to_vec(),
            },
            bounds: None,
            tick_count: None,
            labels: ValueFormat::Verbatim,
        },
        y_axis: AxisSpec {
            title: "Latency (ms)".to_string(),
            kind: AxisKind::Linear,
            bounds: y_bounds.map(pad_degenerate),
            tick_count: Some(DISTRIBUTION_Y_TICKS),
            labels: latency,
        },
        tooltip: TooltipSpec {
            shared: true,
            intersect: false,
            x: ValueFormat::Verbatim,
            y: latency,
        },
        stroke: StrokeSpec {
            smooth: true,
            width: 2,
        },
        marker_size: TREND_MARKER_SIZE,
        series: series
            .iter()
            .map(|s| SeriesSpec {
                name: s.name.clone(),
                color: s.color,
                data: SeriesData::Categories(s.values.clone()),
            })
            .collect(),
    }
}

/// `count` evenly spaced values from `lo` to `hi` inclusive
pub(crate) fn tick_positions(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let step = (hi - lo) / (count - 1) as f64;
            (0..count).map(|i| lo + step * i as f64).collect()
        },
    }
}

/// Widen a zero-width range so the surface has something to scale
fn pad_degenerate((lo, hi): (f64, f64)) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}
