//! Async driver for [`MetricsOrchestrator`]
//!
//! Requests emitted by the orchestrator are spawned as tasks on the current
//! tokio runtime; their outcomes come back over a channel and are applied one
//! at a time, so all state changes happen on the caller's task. User input may
//! arrive between outcomes; the orchestrator's tickets take care of responses
//! that were overtaken by a newer selection.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::catalog::TimeRange;
use crate::client::MetricsSource;
use crate::error::Result;
use crate::orchestrator::{DashboardView, FetchOutcome, FetchRequest, MetricsOrchestrator, PipelineConfig};

/// Orchestrator plus the machinery to execute its requests
pub struct DashboardSession<S: MetricsSource + 'static> {
    orchestrator: MetricsOrchestrator,
    source: Arc<S>,
    tx: mpsc::UnboundedSender<FetchOutcome>,
    rx: mpsc::UnboundedReceiver<FetchOutcome>,
    in_flight: usize,
}

impl<S: MetricsSource + 'static> DashboardSession<S> {
    /// New idle session
    pub fn new(source: Arc<S>, config: PipelineConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            orchestrator: MetricsOrchestrator::new(config),
            source,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Underlying state machine
    #[must_use]
    pub fn orchestrator(&self) -> &MetricsOrchestrator {
        &self.orchestrator
    }

    /// Snapshot for rendering
    #[must_use]
    pub fn view(&self) -> DashboardView<'_> {
        self.orchestrator.view()
    }

    /// Requests spawned but not yet applied (stale ones included)
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start the fetch sequence
    pub fn mount(&mut self) {
        if let Some(request) = self.orchestrator.mount() {
            self.dispatch(request);
        }
    }

    /// Range selector changed
    pub fn select_range(&mut self, time_range: TimeRange) {
        if let Some(request) = self.orchestrator.select_range(time_range) {
            self.dispatch(request);
        }
    }

    /// Date selector changed
    ///
    /// # Errors
    /// Returns `InvalidSelection` if `date` is not on the current date axis.
    pub fn select_date(&mut self, date: &str) -> Result<()> {
        if let Some(request) = self.orchestrator.select_date(date)? {
            self.dispatch(request);
        }
        Ok(())
    }

    /// Step the date selection by `delta` positions along the axis
    ///
    /// # Errors
    /// Returns `InvalidSelection` if no date list is loaded.
    pub fn step_date(&mut self, delta: isize) -> Result<()> {
        let axis = self.orchestrator.date_axis();
        let current = self
            .orchestrator
            .selected_date()
            .and_then(|d| axis.iter().position(|a| a == d))
            .unwrap_or(0);
        let last = axis.len().saturating_sub(1);
        let target = current.saturating_add_signed(delta).min(last);
        match axis.get(target).cloned() {
            Some(date) => self.select_date(&date),
            None => self.select_date(""),
        }
    }

    fn dispatch(&mut self, request: FetchRequest) {
        self.in_flight += 1;
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let outcome = match request {
                FetchRequest::Range(ticket) => {
                    let result = source.fetch_period(&ticket.query).await;
                    FetchOutcome::Range(ticket, result)
                },
                FetchRequest::Distribution(ticket) => {
                    let result = source.fetch_date(&ticket.query).await;
                    FetchOutcome::Distribution(ticket, result)
                },
            };
            // Receiver lives as long as the session; a send error means it is gone
            let _ = tx.send(outcome);
        });
    }

    fn apply(&mut self, outcome: FetchOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if let Some(next) = self.orchestrator.apply(outcome) {
            self.dispatch(next);
        }
        debug!(state = self.orchestrator.state().name(), in_flight = self.in_flight, "outcome applied");
    }

    /// Wait for one outcome and apply it; `false` if nothing is in flight
    pub async fn pump(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.rx.recv().await {
            Some(outcome) => {
                self.apply(outcome);
                true
            },
            None => false,
        }
    }

    /// Apply every outcome that is already available, without waiting
    pub fn pump_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.rx.try_recv() {
            self.apply(outcome);
            applied += 1;
        }
        applied
    }

    /// Apply outcomes until no request is in flight
    pub async fn settle(&mut self) {
        while self.pump().await {}
    }
}
