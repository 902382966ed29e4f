//! Terminal dashboard surface
//!
//! Draws a [`DashboardView`] with ratatui: a header with the range selector
//! and date picker, the aggregate trend chart, and the per-date latency CDF.
//! Both charts are drawn from [`ChartSpec`]s, so the terminal shows exactly
//! what the one-shot snapshot exports.
//!
//! # Layout
//!
//! ```text
//! ┌ latencia · Time to First Token (streaming) ───────────────────────┐
//! │ 1 Last week │ 2 Last month │ 3 Last 3 months      Date: 2024-03-02 │
//! └───────────────────────────────────────────────────────────────────┘
//! ┌ Aggregated Metrics for Time to First Token ───────────────────────┐
//! │ ⠤⠤⠒⠒⠉⠉⠒⠒⠤⠤                                          ── OpenAI     │
//! └───────────────────────────────────────────────────────────────────┘
//! ┌ Time to First Token · Latency vs CDF across all providers ────────┐
//! │        ⣀⡠⠤⠔⠒⠉⠉                                  ── Groq - llama   │
//! └───────────────────────────────────────────────────────────────────┘
//!  [1/2/3] range  [←/→] date  [r] retry  [q] quit
//! ```

use crossterm::event::KeyCode;
use ratatui::backend::TestBackend;
use ratatui::prelude::*;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph, Tabs, Wrap};
use ratatui::Terminal;

use crate::catalog::{metric_title, TimeRange};
use crate::chart::{distribution_chart, tick_positions, trend_chart, AxisKind, AxisSpec, ChartSpec, SeriesData};
use crate::error::Result;
use crate::orchestrator::{Availability, DashboardView};
use crate::palette::Rgb;

/// Text shown when requests succeeded but nothing can be plotted
pub const NO_DATA_TEXT: &str = "No data available";

/// Labels drawn on a numeric terminal axis
const TERMINAL_TICKS: usize = 5;

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// What a key press asks the dashboard to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Leave the dashboard
    Quit,
    /// Switch the range selector
    SelectRange(TimeRange),
    /// Move the date selection along the axis
    StepDate(isize),
    /// Re-request the current range
    Retry,
}

/// Map a key to a dashboard action
#[must_use]
pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char('1') => Some(KeyAction::SelectRange(TimeRange::Week)),
        KeyCode::Char('2') => Some(KeyAction::SelectRange(TimeRange::Month)),
        KeyCode::Char('3') => Some(KeyAction::SelectRange(TimeRange::ThreeMonth)),
        KeyCode::Left | KeyCode::Char('h') => Some(KeyAction::StepDate(-1)),
        KeyCode::Right | KeyCode::Char('l') => Some(KeyAction::StepDate(1)),
        KeyCode::Home => Some(KeyAction::StepDate(isize::MIN)),
        KeyCode::End => Some(KeyAction::StepDate(isize::MAX)),
        KeyCode::Char('r') => Some(KeyAction::Retry),
        _ => None,
    }
}

/// Draw the whole dashboard; `tick` drives the loading spinner
pub fn draw(frame: &mut Frame, view: &DashboardView<'_>, tick: usize) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header, view, tick);

    match view.availability() {
        Availability::Failed(failure) => {
            let notice = Paragraph::new(failure.notice())
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL).title("Error"));
            frame.render_widget(notice, body);
        },
        Availability::NoData => draw_placeholder(frame, body, NO_DATA_TEXT),
        Availability::Loading | Availability::Ready => draw_charts(frame, body, view, tick),
    }

    let help = Paragraph::new(" [1/2/3] range  [←/→] date  [r] retry  [q] quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, footer);
}

fn draw_header(frame: &mut Frame, area: Rect, view: &DashboardView<'_>, tick: usize) {
    let mode = if view.streaming { "streaming" } else { "end-to-end" };
    let mut title = format!(" latencia · {} ({mode}) ", metric_title(view.metric_type));
    if view.loading {
        title.push(SPINNER[tick % SPINNER.len()]);
        title.push(' ');
    }
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [tabs_area, date_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(32)]).areas(inner);

    let selected = TimeRange::ALL
        .iter()
        .position(|r| *r == view.time_range)
        .unwrap_or_default();
    let tabs = Tabs::new(
        TimeRange::ALL
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{} {}", i + 1, r.label())),
    )
    .select(selected)
    .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, tabs_area);

    frame.render_widget(
        Paragraph::new(date_label(view)).alignment(Alignment::Right),
        date_area,
    );
}

/// `Date: <selected> (i/n)` or a dash while nothing is selected
fn date_label(view: &DashboardView<'_>) -> String {
    match view.selected_date {
        Some(date) => {
            let pos = view
                .date_axis
                .iter()
                .position(|d| d == date)
                .map_or(0, |p| p + 1);
            format!("Date: {date} ({pos}/{})", view.date_axis.len())
        },
        None => "Date: -".to_string(),
    }
}

fn draw_charts(frame: &mut Frame, area: Rect, view: &DashboardView<'_>, tick: usize) {
    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let waiting = format!("{} Loading…", SPINNER[tick % SPINNER.len()]);

    match view.range {
        Some(range) if range.has_data() => {
            let spec = trend_chart(
                view.metric_type,
                range.time_range,
                &range.trend,
                &range.date_axis,
                range.scale,
            );
            draw_chart(frame, top, &spec);
        },
        Some(_) => draw_placeholder(frame, top, NO_DATA_TEXT),
        None => draw_placeholder(frame, top, &waiting),
    }

    match view.distribution {
        Some(dist) if dist.has_data() => {
            let spec = distribution_chart(view.metric_type, &dist.series);
            draw_chart(frame, bottom, &spec);
        },
        Some(_) => draw_placeholder(frame, bottom, NO_DATA_TEXT),
        None if view.loading => draw_placeholder(frame, bottom, &waiting),
        None => draw_placeholder(frame, bottom, NO_DATA_TEXT),
    }
}

fn draw_placeholder(frame: &mut Frame, area: Rect, text: &str) {
    let paragraph = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Render one [`ChartSpec`] as a braille line chart
pub fn draw_chart(frame: &mut Frame, area: Rect, spec: &ChartSpec) {
    // Datasets borrow their points, so the runs are materialized first
    let runs: Vec<(&str, Rgb, Vec<Vec<(f64, f64)>>)> = spec
        .series
        .iter()
        .map(|s| (s.name.as_str(), s.color, plot_runs(&s.data)))
        .collect();

    let mut datasets = Vec::new();
    for (name, color, segments) in &runs {
        for (i, segment) in segments.iter().enumerate() {
            let mut dataset = Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Rgb(color.r, color.g, color.b)))
                .data(segment);
            // One legend entry per series, not per gap-separated run
            if i == 0 {
                dataset = dataset.name(name.to_string());
            }
            datasets.push(dataset);
        }
    }

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} · {} ", spec.title, spec.subtitle)),
        )
        .x_axis(terminal_axis(&spec.x_axis, x_extent(spec)))
        .y_axis(terminal_axis(&spec.y_axis, None));
    frame.render_widget(chart, area);
}

/// Split series data into contiguous drawable runs; `None` slots break the line
fn plot_runs(data: &SeriesData) -> Vec<Vec<(f64, f64)>> {
    match data {
        SeriesData::Points(points) => vec![points.iter().map(|[x, y]| (*x, *y)).collect()],
        SeriesData::Categories(values) => {
            let mut runs = Vec::new();
            let mut current = Vec::new();
            for (i, value) in values.iter().enumerate() {
                match value {
                    Some(v) => current.push((i as f64, *v)),
                    None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
                    None => {},
                }
            }
            if !current.is_empty() {
                runs.push(current);
            }
            runs
        },
    }
}

/// Category axes carry no numeric bounds; use the slot indices
fn x_extent(spec: &ChartSpec) -> Option<(f64, f64)> {
    match &spec.x_axis.kind {
        AxisKind::Category { categories } if categories.len() > 1 => {
            Some((0.0, (categories.len() - 1) as f64))
        },
        AxisKind::Category { .. } => Some((-0.5, 0.5)),
        AxisKind::Linear => None,
    }
}

fn terminal_axis(spec: &AxisSpec, extent: Option<(f64, f64)>) -> Axis<'static> {
    let style = Style::default().fg(Color::Gray);
    let axis = Axis::default().title(spec.title.clone()).style(style);

    match &spec.kind {
        AxisKind::Category { categories } => {
            let (lo, hi) = extent.unwrap_or((0.0, 1.0));
            let labels = match categories.len() {
                0 => Vec::new(),
                1..=3 => categories.clone(),
                n => vec![
                    categories[0].clone(),
                    categories[n / 2].clone(),
                    categories[n - 1].clone(),
                ],
            };
            axis.bounds([lo, hi]).labels(labels)
        },
        AxisKind::Linear => {
            let Some((lo, hi)) = spec.bounds.or(extent) else {
                return axis;
            };
            let count = spec.tick_count.unwrap_or(TERMINAL_TICKS).min(TERMINAL_TICKS);
            let labels: Vec<String> = tick_positions(lo, hi, count)
                .into_iter()
                .map(|t| spec.labels.format(t))
                .collect();
            axis.bounds([lo, hi]).labels(labels)
        },
    }
}

/// Render the dashboard into an in-memory buffer and return its text
///
/// # Errors
/// Returns `IoError` if the in-memory terminal cannot be drawn.
pub fn render_to_string(view: &DashboardView<'_>, width: u16, height: u16) -> Result<String> {
    let mut terminal = Terminal::new(TestBackend::new(width, height))?;
    terminal.draw(|frame| draw(frame, view, 0))?;

    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    Ok(out)
}
