use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::playback::{format_time, Level, PlaybackState, Speed};
use crate::tui::app::App;

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_playlist(frame, app, chunks[0]);
    draw_progress(frame, app, chunks[1]);
    frame.render_widget(status_line(app), chunks[2]);
    frame.render_widget(report_line(app), chunks[3]);
    frame.render_widget(help_line(app), chunks[4]);
}

fn draw_playlist(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let snapshot = &app.snapshot;
    let items: Vec<ListItem> = snapshot
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let marker = if Some(i) == snapshot.current_index { "▶ " } else { "  " };
            let style = if Some(i) == snapshot.current_index {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{}. {}", marker, i, entry.display_name())).style(style)
        })
        .collect();

    let title = format!(" Playlist ({}) ", snapshot.entries.len());
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !snapshot.entries.is_empty() {
        state.select(Some(app.selected));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_progress(frame: &mut Frame, app: &App, area: ratatui::layout::Rect) {
    let position = &app.snapshot.position;
    let progress = app.progress();
    let label = match app.scrub {
        Some(fraction) => {
            let target = (fraction * position.total_ms as f64) as u64;
            format!("seek to {} / {}", format_time(target), position.total_label())
        }
        None => position.label(),
    };
    let title = app
        .snapshot
        .current_entry()
        .map(|e| format!(" {} ", e.display_name()))
        .unwrap_or_default();

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(progress.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, area);
}

fn status_line(app: &App) -> Paragraph<'static> {
    let snapshot = &app.snapshot;
    let state_style = match snapshot.state {
        PlaybackState::Playing => Style::default().fg(Color::Green),
        PlaybackState::Error(_) => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::Yellow),
    };
    let mut spans = vec![
        Span::styled(snapshot.state.to_string(), state_style),
        Span::raw("  speed"),
    ];
    for speed in Speed::ALL {
        let style = if speed == snapshot.speed {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(speed.to_string(), style));
    }
    if snapshot.speed_pending {
        spans.push(Span::raw(" (on resume)"));
    }
    Paragraph::new(Line::from(spans))
}

fn report_line(app: &App) -> Paragraph<'static> {
    if app.confirm_clear {
        return Paragraph::new("Clear the playlist? (y/n)")
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    }
    match &app.snapshot.report {
        Some(report) => {
            let color = match report.level {
                Level::Info => Color::Gray,
                Level::Warning => Color::Yellow,
                Level::Error => Color::Red,
            };
            Paragraph::new(report.text.clone()).style(Style::default().fg(color))
        }
        None => Paragraph::new(""),
    }
}

fn help_line(app: &App) -> Paragraph<'static> {
    let controls = app.snapshot.controls();
    let key = |label: &'static str, enabled: bool| {
        let style = if enabled {
            Style::default()
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };
        Span::styled(label, style)
    };

    Paragraph::new(Line::from(vec![
        key("[p]lay ", controls.play),
        key("[space] pause ", controls.pause),
        key("[s]top ", controls.stop),
        key("[n]ext ", controls.next),
        key("[b]ack ", controls.previous),
        key("[c]lear ", controls.clear),
        Span::raw("[←→] seek [1248] speed [q]uit"),
    ]))
}
