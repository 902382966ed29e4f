//! # latencia
//!
//! Latency distributions and daily trends for LLM service providers.
//!
//! latencia reads two endpoints of a benchmark backend, one with per-day
//! aggregates over a date range and one with per-request latency samples for a
//! single date. It turns them into plot-ready series and charts them in the
//! terminal or as JSON chart specifications.
//!
//! ## Pipeline
//!
//! ```text
//! MetricsSource ──▶ MetricsOrchestrator ──▶ align_aggregates ─▶ trend_chart ────────▶ tui / JSON
//!  (client)          (fetch state machine)  cdf_series ───────▶ distribution_chart ─▶
//! ```
//!
//! - The orchestrator only asks for a date's distribution once that date is
//!   on the date axis of the committed range, and drops responses that were
//!   overtaken by a newer selection.
//! - The transformers never coerce malformed input: mismatched arrays or a
//!   non-monotone CDF fail the whole fetch with `TransformFault`.
//! - Missing or non-positive aggregates become gaps, never zeros.
//!
//! ## Example
//!
//! ```rust
//! use latencia::aggregate::align_aggregates;
//! use latencia::palette::Palette;
//! use latencia::series::ValueScale;
//! use latencia::types::{AggregateSeries, DailyAggregate, DateAxis};
//!
//! let mut aggregates = AggregateSeries::new();
//! aggregates.insert(
//!     "OpenAI",
//!     vec![
//!         DailyAggregate::new("2024-01-01", Some(120.0)),
//!         DailyAggregate::new("2024-01-03", Some(95.5)),
//!     ],
//! );
//! let axis = DateAxis::from_dates(["2024-01-01", "2024-01-02", "2024-01-03"]);
//!
//! let series = align_aggregates(&aggregates, &axis, ValueScale::Linear, &Palette::default());
//! assert_eq!(series[0].values, vec![Some(120.0), None, Some(95.5)]);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
// Clippy allows (MUST come after deny/warn to override them)
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)] // usize -> f64 for tick and sample positions
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)] // Not all methods need #[must_use]
#![allow(clippy::doc_markdown)] // Allow technical terms without backticks
#![allow(clippy::uninlined_format_args)] // Prefer explicit format args
#![allow(clippy::single_match_else)] // Sometimes clearer than if-let
#![allow(clippy::missing_panics_doc)] // Allow missing Panics doc sections
#![allow(clippy::float_cmp)] // Allow float comparisons in tests

/// Aggregate transformer (daily values aligned to the date axis)
pub mod aggregate;
/// Metric catalog and range selector values
pub mod catalog;
/// Chart adapters producing serializable chart specifications
pub mod chart;
/// CLI command implementations (extracted for testability)
pub mod cli;
/// HTTP client for the metrics backend
pub mod client;
pub mod config;
/// In-process fixture backend
#[cfg(feature = "demo-server")]
pub mod demo;
/// Distribution transformer (latency CDFs on a log axis)
pub mod distribution;
pub mod error;
/// Fetch sequencing state machine
pub mod orchestrator;
pub mod palette;
pub mod series;
/// Async driver executing orchestrator requests on tokio
pub mod session;
pub mod tui;
pub mod types;

// Re-exports for convenience
pub use error::{LatenciaError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
