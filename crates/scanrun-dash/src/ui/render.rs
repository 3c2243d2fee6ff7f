//! Main render function for the dashboard.

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::Frame;

use scanrun_core::{RunResults, RunStatus};

use crate::app::UiState;
use crate::state::RunView;

/// Render the entire UI.
pub fn render(frame: &mut Frame, view: &RunView, ui: &UiState) {
    let results_height = if view.results.is_some() || view.results_error.is_some() {
        Constraint::Length(8)
    } else {
        Constraint::Length(0)
    };

    let [header_area, progress_area, logs_area, results_area, footer_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Fill(1),
        results_height,
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header_area, view, ui);
    render_progress(frame, progress_area, view);
    render_logs(frame, logs_area, view);
    render_results(frame, results_area, view);
    render_footer(frame, footer_area, view, ui);
}

/// One-line summary of the run: id, status and progress.
pub fn status_line(view: &RunView) -> String {
    let Some(run_id) = &view.run_id else {
        return match &view.error {
            Some(error) => format!("Failed to start: {}", error),
            None => "No active run".to_string(),
        };
    };

    let Some(state) = &view.state else {
        return format!("{} | waiting for status", run_id);
    };

    let mut line = format!(
        "{} | {} | {}% | {}",
        run_id,
        state.status,
        view.progress_percent(),
        state.progress.stage
    );
    if let Some(error) = &state.error {
        line.push_str(&format!(" | {}", error));
    }
    line
}

/// Human-readable summary of fetched results.
pub fn results_lines(results: &RunResults) -> Vec<String> {
    let summary = &results.summary;
    let mut lines = vec![
        format!("Endpoint:   {}", summary.endpoint),
        format!(
            "Queries:    {} candidates, {} mutations tried",
            summary.candidates, summary.executions
        ),
        format!(
            "Schema:     {} types, {} queries, {} mutations",
            summary.counts.types, summary.counts.queries, summary.counts.mutations
        ),
        format!("Issues:     {}", summary.issues),
    ];

    if let Some(text) = &summary.text {
        lines.push(text.clone());
    }
    if !results.artifacts.is_empty() {
        let names: Vec<&str> = results.artifacts.iter().map(|a| a.name.as_str()).collect();
        lines.push(format!("Artifacts:  {}", names.join(", ")));
    }
    lines
}

fn status_color(status: Option<RunStatus>) -> Color {
    match status {
        Some(RunStatus::Queued) => Color::Yellow,
        Some(RunStatus::Running) => Color::Cyan,
        Some(RunStatus::Done) => Color::Green,
        Some(RunStatus::Failed) | Some(RunStatus::Cancelled) => Color::Red,
        None => Color::Gray,
    }
}

/// Render the header with run identity and status.
fn render_header(frame: &mut Frame, area: Rect, view: &RunView, ui: &UiState) {
    let header = Paragraph::new(Line::from(Span::styled(
        status_line(view),
        Style::default()
            .fg(status_color(view.status()))
            .add_modifier(Modifier::BOLD),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" ScanRun - {} ", ui.backend_label))
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
    );

    frame.render_widget(header, area);
}

fn render_progress(frame: &mut Frame, area: Rect, view: &RunView) {
    let detail = view
        .state
        .as_ref()
        .and_then(|s| s.progress.detail.as_deref())
        .unwrap_or("");

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(Style::default().fg(status_color(view.status())))
        .percent(u16::from(view.progress_percent()))
        .label(format!("{}% {}", view.progress_percent(), detail));

    frame.render_widget(gauge, area);
}

/// Render the log tail, newest line at the bottom.
fn render_logs(frame: &mut Frame, area: Rect, view: &RunView) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = view.logs.len().saturating_sub(visible);

    let items: Vec<ListItem> = view
        .logs
        .iter()
        .skip(skip)
        .map(|line| ListItem::new(line.as_str()))
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Logs ({}) ", view.logs.len())),
    );

    frame.render_widget(list, area);
}

fn render_results(frame: &mut Frame, area: Rect, view: &RunView) {
    if area.height == 0 {
        return;
    }

    let lines: Vec<Line> = match (&view.results, &view.results_error) {
        (Some(results), _) => results_lines(results).into_iter().map(Line::from).collect(),
        (None, Some(error)) => vec![Line::from(Span::styled(
            format!("Results unavailable: {}", error),
            Style::default().fg(Color::Red),
        ))],
        (None, None) => Vec::new(),
    };

    let results = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Results ")
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(results, area);
}

/// Render the footer with status message and key help.
fn render_footer(frame: &mut Frame, area: Rect, view: &RunView, ui: &UiState) {
    let status = ui
        .status_message
        .as_deref()
        .or(view.error.as_deref())
        .unwrap_or("Ready");

    let help = if ui.can_cancel {
        " q: quit | c: cancel | n: new run "
    } else {
        " q: quit | n: new run "
    };

    let footer = Line::from(vec![
        Span::styled(status, Style::default().fg(Color::Green)),
        Span::raw(" | "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}
