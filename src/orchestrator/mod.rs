//! Metrics fetch orchestrator
//!
//! Explicit state machine that sequences the two dependent requests:
//!
//! ```text
//! Idle ──mount/range──▶ FetchingRange ──ok──▶ RangeReady ──auto-select──▶ FetchingDate ──ok──▶ DateReady
//!                            │                                 ▲               │
//!                            └──────────err──────▶ Error ◀─────┼───────err─────┘
//!                                                   │          │
//!                                                   └─range/date change─┘
//! ```
//!
//! The orchestrator performs no I/O. Every transition that needs data returns
//! a [`FetchRequest`] carrying a ticket; the caller executes it and feeds the
//! answer back through [`MetricsOrchestrator::apply`] as a [`FetchOutcome`]
//! holding the same ticket. An outcome is committed only if its ticket is the
//! one the current state is waiting for, so a response to a superseded range
//! or date is dropped no matter when it arrives.
//!
//! Payloads are validated before they reach the transformers; a malformed
//! payload moves the machine to [`FetchState::Error`] with
//! [`FailureKind::TransformFault`]. Failures are never retried automatically.

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::aggregate::align_aggregates;
use crate::catalog::TimeRange;
use crate::client::{DateParam, DateQuery, PeriodQuery};
use crate::distribution::cdf_series;
use crate::error::{FailureKind, LatenciaError, Result};
use crate::palette::Palette;
use crate::series::{CdfSeries, TrendSeries, ValueScale};
use crate::types::{AggregateSeries, DateAxis, DatePayload, PeriodPayload, ProviderMetricSet};

/// Generic notice shown for any failure
pub const FAILURE_NOTICE: &str = "Something went wrong while fetching metrics!";

/// Fixed inputs of one dashboard instance
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Metric key to chart
    pub metric_type: String,
    /// Streaming or end-to-end measurements
    pub streaming: bool,
    /// Range selected on mount
    pub default_range: TimeRange,
    /// Plot aggregates on a log10 axis
    pub log_scale: bool,
    /// Provider colors
    pub palette: Palette,
}

impl PipelineConfig {
    /// Config for `metric_type` with defaults for everything else
    pub fn new(metric_type: impl Into<String>) -> Self {
        Self {
            metric_type: metric_type.into(),
            streaming: true,
            default_range: TimeRange::default(),
            log_scale: false,
            palette: Palette::default(),
        }
    }
}

/// Identifies one outstanding `/metrics/period` request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeTicket {
    /// Monotonic request number
    pub seq: u64,
    /// Parameters sent
    pub query: PeriodQuery,
}

/// Identifies one outstanding `/metrics/date` request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTicket {
    /// Monotonic request number
    pub seq: u64,
    /// Parameters sent
    pub query: DateQuery,
}

/// Work the caller must perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRequest {
    /// Fetch aggregates and the date axis
    Range(RangeTicket),
    /// Fetch distributions for the selected date
    Distribution(DateTicket),
}

/// Result of a [`FetchRequest`], tagged with the ticket it answers
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Answer to [`FetchRequest::Range`]
    Range(RangeTicket, Result<PeriodPayload>),
    /// Answer to [`FetchRequest::Distribution`]
    Distribution(DateTicket, Result<DatePayload>),
}

/// Why the machine is in [`FetchState::Error`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    /// Taxonomy bucket
    pub kind: FailureKind,
    /// Detailed cause, for logs
    pub message: String,
}

impl FetchFailure {
    /// Message for the user; identical for every failure
    #[must_use]
    pub fn notice(&self) -> &'static str {
        FAILURE_NOTICE
    }
}

impl From<&LatenciaError> for FetchFailure {
    fn from(err: &LatenciaError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Fetch state, with the ticket or failure each state owns
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    /// Nothing requested yet
    Idle,
    /// Waiting for the aggregate range
    FetchingRange(RangeTicket),
    /// Range committed, no date fetch outstanding (empty date axis)
    RangeReady,
    /// Waiting for the distributions of the selected date
    FetchingDate(DateTicket),
    /// Both charts have data for the current selection
    DateReady,
    /// Last request failed; needs a new range or date selection
    Error(FetchFailure),
}

impl FetchState {
    /// True while a request is outstanding
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::FetchingRange(_) | Self::FetchingDate(_))
    }

    /// Short state name for logs and status lines
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingRange(_) => "fetching-range",
            Self::RangeReady => "range-ready",
            Self::FetchingDate(_) => "fetching-date",
            Self::DateReady => "date-ready",
            Self::Error(_) => "error",
        }
    }
}

/// Committed result of a range fetch
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSnapshot {
    /// Range the data belongs to
    pub time_range: TimeRange,
    /// Aggregates as received
    pub aggregates: AggregateSeries,
    /// X-axis categories
    pub date_axis: DateAxis,
    /// Aggregates aligned to `date_axis`
    pub trend: Vec<TrendSeries>,
    /// Scale applied to `trend`
    pub scale: ValueScale,
}

impl RangeSnapshot {
    /// True if any provider has a value on any date
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.trend.iter().any(|s| s.present() > 0)
    }
}

/// Committed result of a date fetch
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionSnapshot {
    /// Date the data belongs to
    pub date: String,
    /// Distributions as received
    pub metrics: ProviderMetricSet,
    /// CDF series for the configured metric
    pub series: Vec<CdfSeries>,
}

impl DistributionSnapshot {
    /// True if at least one provider reported the metric
    #[must_use]
    pub fn has_data(&self) -> bool {
        !self.series.is_empty()
    }
}

/// What the rendering layer should show overall
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Availability<'a> {
    /// A request is outstanding
    Loading,
    /// Show the generic failure notice
    Failed(&'a FetchFailure),
    /// Requests succeeded but nothing can be plotted
    NoData,
    /// At least one chart has data
    Ready,
}

/// Read-only snapshot handed to the rendering layer
#[derive(Debug, Clone, Copy)]
pub struct DashboardView<'a> {
    /// A request is outstanding
    pub loading: bool,
    /// Failure, if the machine is in the error state
    pub error: Option<&'a FetchFailure>,
    /// Metric being charted
    pub metric_type: &'a str,
    /// Streaming or end-to-end measurements
    pub streaming: bool,
    /// Current range selection
    pub time_range: TimeRange,
    /// Aggregate chart data (hidden on failure)
    pub range: Option<&'a RangeSnapshot>,
    /// Distribution chart data (hidden on failure)
    pub distribution: Option<&'a DistributionSnapshot>,
    /// Dates the user may select
    pub date_axis: &'a [String],
    /// Current date selection
    pub selected_date: Option<&'a str>,
}

impl DashboardView<'_> {
    /// Overall status, failures first
    #[must_use]
    pub fn availability(&self) -> Availability<'_> {
        if let Some(failure) = self.error {
            return Availability::Failed(failure);
        }
        if self.loading {
            return Availability::Loading;
        }
        let range = self.range.is_some_and(RangeSnapshot::has_data);
        let dist = self.distribution.is_some_and(DistributionSnapshot::has_data);
        if range || dist {
            Availability::Ready
        } else {
            Availability::NoData
        }
    }
}

/// Owner of all fetch state for one dashboard
#[derive(Debug)]
pub struct MetricsOrchestrator {
    config: PipelineConfig,
    time_range: TimeRange,
    selected_date: Option<String>,
    range: Option<RangeSnapshot>,
    distribution: Option<DistributionSnapshot>,
    state: FetchState,
    next_seq: u64,
}

impl MetricsOrchestrator {
    /// New orchestrator in [`FetchState::Idle`]
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            time_range: config.default_range,
            config,
            selected_date: None,
            range: None,
            distribution: None,
            state: FetchState::Idle,
            next_seq: 0,
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Fixed configuration
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Current range selection
    #[must_use]
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// Current date selection
    #[must_use]
    pub fn selected_date(&self) -> Option<&str> {
        self.selected_date.as_deref()
    }

    /// Date axis of the committed range (empty until the range resolves)
    #[must_use]
    pub fn date_axis(&self) -> &[String] {
        self.range
            .as_ref()
            .map_or(&[], |r| r.date_axis.as_slice())
    }

    /// Start the sequence; only acts from [`FetchState::Idle`]
    pub fn mount(&mut self) -> Option<FetchRequest> {
        match self.state {
            FetchState::Idle => Some(self.begin_range()),
            _ => None,
        }
    }

    /// Change the range selector
    ///
    /// Re-selecting the current range is a no-op unless the machine is idle
    /// or failed, in which case it acts as a retry trigger.
    pub fn select_range(&mut self, time_range: TimeRange) -> Option<FetchRequest> {
        let needs_trigger = matches!(self.state, FetchState::Idle | FetchState::Error(_));
        if time_range == self.time_range && !needs_trigger {
            return None;
        }
        self.time_range = time_range;
        Some(self.begin_range())
    }

    /// Change the date selector
    ///
    /// # Errors
    /// Returns `InvalidSelection` if no range is committed yet or `date` is
    /// not on the current date axis.
    pub fn select_date(&mut self, date: &str) -> Result<Option<FetchRequest>> {
        let Some(range) = self.range.as_ref() else {
            return Err(LatenciaError::InvalidSelection {
                reason: "the date list has not loaded yet".to_string(),
            });
        };
        if !range.date_axis.contains(date) {
            return Err(LatenciaError::InvalidSelection {
                reason: format!("{date} is not in the {} date range", self.time_range),
            });
        }

        let unchanged = self.selected_date.as_deref() == Some(date);
        if unchanged && matches!(self.state, FetchState::FetchingDate(_) | FetchState::DateReady) {
            return Ok(None);
        }

        self.selected_date = Some(date.to_string());
        Ok(Some(self.begin_date(date.to_string())))
    }

    /// Feed back the result of a request
    ///
    /// Returns the follow-up request, if the transition needs one.
    pub fn apply(&mut self, outcome: FetchOutcome) -> Option<FetchRequest> {
        match outcome {
            FetchOutcome::Range(ticket, result) => self.on_range(ticket, result),
            FetchOutcome::Distribution(ticket, result) => {
                self.on_distribution(ticket, result);
                None
            },
        }
    }

    /// Snapshot for the rendering layer; data is hidden while failed
    #[must_use]
    pub fn view(&self) -> DashboardView<'_> {
        let error = match &self.state {
            FetchState::Error(failure) => Some(failure),
            _ => None,
        };
        let visible = error.is_none();
        DashboardView {
            loading: self.state.is_loading(),
            error,
            metric_type: &self.config.metric_type,
            streaming: self.config.streaming,
            time_range: self.time_range,
            range: self.range.as_ref().filter(|_| visible),
            distribution: self.distribution.as_ref().filter(|_| visible),
            date_axis: self.date_axis(),
            selected_date: self.selected_date.as_deref(),
        }
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn begin_range(&mut self) -> FetchRequest {
        self.selected_date = None;
        self.range = None;
        self.distribution = None;

        let ticket = RangeTicket {
            seq: self.take_seq(),
            query: PeriodQuery {
                time_range: self.time_range,
                metric_type: self.config.metric_type.clone(),
                streaming: self.config.streaming,
            },
        };
        debug!(seq = ticket.seq, range = %self.time_range, "fetching aggregate range");
        self.state = FetchState::FetchingRange(ticket.clone());
        FetchRequest::Range(ticket)
    }

    fn begin_date(&mut self, date: String) -> FetchRequest {
        self.distribution = None;

        let ticket = DateTicket {
            seq: self.take_seq(),
            query: DateQuery {
                date: DateParam::On(date),
                metric_type: self.config.metric_type.clone(),
                streaming: self.config.streaming,
            },
        };
        debug!(seq = ticket.seq, date = %ticket.query.date, "fetching distributions");
        self.state = FetchState::FetchingDate(ticket.clone());
        FetchRequest::Distribution(ticket)
    }

    fn on_range(
        &mut self,
        ticket: RangeTicket,
        result: Result<PeriodPayload>,
    ) -> Option<FetchRequest> {
        if !matches!(&self.state, FetchState::FetchingRange(current) if *current == ticket) {
            debug!(seq = ticket.seq, range = %ticket.query.time_range, "discarding stale range response");
            return None;
        }

        let payload = match result.and_then(|p| p.validate().map(|()| p)) {
            Ok(payload) => payload,
            Err(e) => {
                self.fail(&e);
                return None;
            },
        };

        let scale = ValueScale::from_log_flag(self.config.log_scale);
        let trend = align_aggregates(
            &payload.aggregated_metrics,
            &payload.date_array,
            scale,
            &self.config.palette,
        );
        let first_date = payload.date_array.first().map(str::to_string);
        self.range = Some(RangeSnapshot {
            time_range: ticket.query.time_range,
            aggregates: payload.aggregated_metrics,
            date_axis: payload.date_array,
            trend,
            scale,
        });
        self.state = FetchState::RangeReady;

        match first_date {
            Some(date) => {
                self.selected_date = Some(date.clone());
                Some(self.begin_date(date))
            },
            None => {
                debug!(range = %ticket.query.time_range, "range has no dates; nothing to select");
                None
            },
        }
    }

    fn on_distribution(&mut self, ticket: DateTicket, result: Result<DatePayload>) {
        if !matches!(&self.state, FetchState::FetchingDate(current) if *current == ticket) {
            debug!(seq = ticket.seq, date = %ticket.query.date, "discarding stale distribution response");
            return;
        }

        let committed = result.and_then(|payload| {
            payload.validate()?;
            let series = cdf_series(&payload.metrics, &self.config.metric_type, &self.config.palette)?;
            Ok(DistributionSnapshot {
                date: ticket.query.date.to_string(),
                metrics: payload.metrics,
                series,
            })
        });

        match committed {
            Ok(snapshot) => {
                self.distribution = Some(snapshot);
                self.state = FetchState::DateReady;
            },
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, err: &LatenciaError) {
        match err.kind() {
            FailureKind::TransformFault => error!("metrics payload rejected: {err}"),
            _ => warn!("metrics fetch failed: {err}"),
        }
        self.distribution = None;
        self.state = FetchState::Error(FetchFailure::from(err));
    }
}
