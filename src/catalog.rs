//! Known metric types and date-range selector values

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LatenciaError;

/// Date-range selector for the aggregate chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeRange {
    /// Last 7 days
    #[serde(rename = "week")]
    Week,
    /// Last month
    #[serde(rename = "month")]
    Month,
    /// Last three months
    #[default]
    #[serde(rename = "three-month")]
    ThreeMonth,
}

impl TimeRange {
    /// All selector values in menu order
    pub const ALL: [TimeRange; 3] = [Self::Week, Self::Month, Self::ThreeMonth];

    /// Value of the `timeRange` query parameter
    #[must_use]
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::ThreeMonth => "three-month",
        }
    }

    /// Menu label
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Week => "Last week",
            Self::Month => "Last month",
            Self::ThreeMonth => "Last 3 months",
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query())
    }
}

impl FromStr for TimeRange {
    type Err = LatenciaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "three-month" => Ok(Self::ThreeMonth),
            other => Err(LatenciaError::InvalidConfiguration(format!(
                "unknown time range {other:?} (expected week, month or three-month)"
            ))),
        }
    }
}

/// Dashboard page a metric is shown on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricPage {
    /// Time to first token
    TimeToFirstToken,
    /// End-to-end response times
    ResponseTimes,
    /// Inter-token latency and its summaries
    TimeBetweenTokens,
    /// Token counts and throughput
    Throughput,
}

impl MetricPage {
    /// Page heading
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::TimeToFirstToken => "Time to First Token",
            Self::ResponseTimes => "Response Times",
            Self::TimeBetweenTokens => "Time Between Tokens",
            Self::Throughput => "Throughput",
        }
    }
}

/// A metric key the backend knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricKind {
    /// Key used in payloads and the `metricType` query parameter
    pub key: &'static str,
    /// Human-readable title
    pub title: &'static str,
    /// Page the metric belongs to
    pub page: MetricPage,
}

/// Metrics recorded by the benchmark runs
pub const METRICS: &[MetricKind] = &[
    MetricKind {
        key: "timetofirsttoken",
        title: "Time to First Token",
        page: MetricPage::TimeToFirstToken,
    },
    MetricKind {
        key: "response_times",
        title: "Response Times",
        page: MetricPage::ResponseTimes,
    },
    MetricKind {
        key: "timebetweentokens",
        title: "Time Between Tokens",
        page: MetricPage::TimeBetweenTokens,
    },
    MetricKind {
        key: "timebetweentokens_median",
        title: "Time Between Tokens Median",
        page: MetricPage::TimeBetweenTokens,
    },
    MetricKind {
        key: "timebetweentokens_p95",
        title: "Time Between Tokens P95",
        page: MetricPage::TimeBetweenTokens,
    },
    MetricKind {
        key: "totaltokens",
        title: "Total Tokens",
        page: MetricPage::Throughput,
    },
    MetricKind {
        key: "tps",
        title: "Tokens per Second",
        page: MetricPage::Throughput,
    },
];

/// Look up a metric by key
#[must_use]
pub fn metric(key: &str) -> Option<&'static MetricKind> {
    METRICS.iter().find(|m| m.key == key)
}

/// Display title for a metric key; unknown keys get `_` replaced by spaces
#[must_use]
pub fn metric_title(key: &str) -> String {
    metric(key).map_or_else(|| key.replace('_', " "), |m| m.title.to_string())
}

/// Metrics shown on `page`, in catalog order
pub fn metrics_on(page: MetricPage) -> impl Iterator<Item = &'static MetricKind> {
    METRICS.iter().filter(move |m| m.page == page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range_parse_and_display() {
        for range in TimeRange::ALL {
            assert_eq!(range.to_string().parse::<TimeRange>().unwrap(), range);
        }
        assert!("year".parse::<TimeRange>().is_err());
        assert_eq!(TimeRange::default(), TimeRange::ThreeMonth);
        assert_eq!(
            serde_json::to_string(&TimeRange::ThreeMonth).unwrap(),
            "\"three-month\""
        );
    }

    #[test]
    fn test_metric_titles() {
        assert_eq!(metric_title("timetofirsttoken"), "Time to First Token");
        assert_eq!(metric_title("queue_wait"), "queue wait");
    }

    #[test]
    fn test_time_between_tokens_page() {
        let keys: Vec<_> = metrics_on(MetricPage::TimeBetweenTokens).map(|m| m.key).collect();
        assert_eq!(
            keys,
            vec![
                "timebetweentokens",
                "timebetweentokens_median",
                "timebetweentokens_p95"
            ]
        );
    }
}
