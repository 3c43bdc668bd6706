use crate::app::{App, AppView};
use crate::report::{format_latency, format_rate, format_speed, gauge_scale};
use crate::settings::SettingsField;
use crate::speedtest::session::Session;
use crate::speedtest::TestPhase;
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, Gauge, GraphType, LineGauge, Paragraph},
    Frame,
};

const ACCENT: Color = Color::Rgb(100, 149, 237);
const DOWNLOAD: Color = Color::Rgb(134, 194, 156);
const UPLOAD: Color = Color::Rgb(147, 180, 220);
const LATENCY: Color = Color::Rgb(220, 180, 130);
const TEXT_PRIMARY: Color = Color::Rgb(230, 230, 230);
const TEXT_SECONDARY: Color = Color::Rgb(160, 160, 160);
const TEXT_MUTED: Color = Color::Rgb(100, 100, 100);
const BORDER: Color = Color::Rgb(60, 60, 65);
const BORDER_ACTIVE: Color = Color::Rgb(100, 100, 110);

pub fn draw_ui(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.view {
        AppView::Main => draw_main_view(frame, area, app),
        AppView::Settings => draw_settings_view(frame, area, app),
    }
}

fn draw_main_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(6),
        Constraint::Length(4),
        Constraint::Min(6),
        Constraint::Length(1),
    ])
    .split(area);

    draw_header(frame, chunks[0], &app.session);
    draw_speed(frame, chunks[1], &app.session);
    draw_results(frame, chunks[2], &app.session);
    draw_rate_chart(frame, chunks[3], &app.session);
    draw_help(frame, chunks[4], app);
}

fn draw_header(frame: &mut Frame, area: Rect, session: &Session) {
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::horizontal([
        Constraint::Length(12),
        Constraint::Min(10),
        Constraint::Length(24),
    ])
    .split(inner);

    frame.render_widget(
        Paragraph::new("speedgauge")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let (status, color) = match session.phase() {
        TestPhase::Idle => ("Ready", TEXT_MUTED),
        TestPhase::Latency => ("Measuring latency...", LATENCY),
        TestPhase::Download => ("Downloading data...", DOWNLOAD),
        TestPhase::Upload => ("Uploading data...", UPLOAD),
        TestPhase::Complete => ("Complete", ACCENT),
    };
    frame.render_widget(
        Paragraph::new(status)
            .style(Style::default().fg(color))
            .alignment(Alignment::Center),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(phase_trail(session.phase())).alignment(Alignment::Right),
        chunks[2],
    );
}

/// "latency / down / up", highlighting the running phase and dimming the rest.
fn phase_trail(phase: TestPhase) -> Line<'static> {
    let steps = [
        (TestPhase::Latency, "latency"),
        (TestPhase::Download, "down"),
        (TestPhase::Upload, "up"),
    ];
    let position = |p: TestPhase| steps.iter().position(|(s, _)| *s == p);
    let current = match phase {
        TestPhase::Complete => Some(steps.len()),
        other => position(other),
    };

    let mut spans = Vec::new();
    for (i, (_, label)) in steps.iter().enumerate() {
        let style = match current {
            Some(c) if c == i => Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            Some(c) if c > i => Style::default().fg(TEXT_SECONDARY),
            _ => Style::default().fg(TEXT_MUTED),
        };
        spans.push(Span::styled(*label, style));
        if i + 1 < steps.len() {
            spans.push(Span::styled(" / ", Style::default().fg(TEXT_MUTED)));
        }
    }
    Line::from(spans)
}

fn phase_color(phase: TestPhase) -> Color {
    match phase {
        TestPhase::Latency => LATENCY,
        TestPhase::Upload => UPLOAD,
        _ => DOWNLOAD,
    }
}

fn draw_speed(frame: &mut Frame, area: Rect, session: &Session) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Speed ", Style::default().fg(TEXT_SECONDARY)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .split(inner);

    let mbps = session.current_mbps();
    let color = phase_color(session.phase());
    frame.render_widget(
        Paragraph::new(format_speed(mbps))
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        rows[0],
    );

    let scale = gauge_scale(mbps);
    frame.render_widget(
        LineGauge::default()
            .filled_style(Style::default().fg(color))
            .unfilled_style(Style::default().fg(BORDER))
            .label(Span::styled(
                format!("0-{:.0}", scale),
                Style::default().fg(TEXT_MUTED),
            ))
            .ratio((mbps / scale).clamp(0.0, 1.0)),
        rows[1],
    );

    let progress = session.progress().clamp(0.0, 100.0);
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(ACCENT).bg(BORDER))
            .label(format!("{:.0}%", progress))
            .ratio(progress / 100.0),
        rows[2],
    );
}

fn draw_results(frame: &mut Frame, area: Rect, session: &Session) {
    let cards = Layout::horizontal([
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
        Constraint::Ratio(1, 4),
    ])
    .split(area);

    let result = session.result();
    let phase = session.phase();
    draw_result_card(frame, cards[0], "Ping", format_latency(result.ping_ms), LATENCY, phase == TestPhase::Latency);
    draw_result_card(frame, cards[1], "Jitter", format_latency(result.jitter_ms), LATENCY, phase == TestPhase::Latency);
    draw_result_card(frame, cards[2], "Download", format_rate(result.download_mbps), DOWNLOAD, phase == TestPhase::Download);
    draw_result_card(frame, cards[3], "Upload", format_rate(result.upload_mbps), UPLOAD, phase == TestPhase::Upload);
}

fn draw_result_card(frame: &mut Frame, area: Rect, title: &str, value: String, color: Color, active: bool) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if active { BORDER_ACTIVE } else { BORDER }))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(if active { color } else { TEXT_SECONDARY }),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    frame.render_widget(
        Paragraph::new(value)
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        inner,
    );
}

fn draw_rate_chart(frame: &mut Frame, area: Rect, session: &Session) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .title(Span::styled(" Rate ", Style::default().fg(TEXT_SECONDARY)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if session.chart().is_empty() {
        if session.phase().is_running() {
            frame.render_widget(
                Paragraph::new("waiting for samples")
                    .style(Style::default().fg(TEXT_MUTED))
                    .alignment(Alignment::Center),
                inner,
            );
        }
        return;
    }
    if session.chart().len() < 2 || inner.width < 10 || inner.height < 3 {
        return;
    }
    let points = session.chart().points();

    let x_min = points.first().map(|p| p.0).unwrap_or(0.0);
    let x_max = points.last().map(|p| p.0).unwrap_or(1.0).max(x_min + 0.1);
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max).max(1.0) * 1.1;

    let color = phase_color(session.phase());
    let datasets = vec![Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(&points)];

    let chart = Chart::new(datasets)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(BORDER))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::styled(format!("{:.1}s", x_min), Style::default().fg(TEXT_MUTED)),
                    Span::styled(format!("{:.1}s", x_max), Style::default().fg(TEXT_MUTED)),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(BORDER))
                .bounds([0.0, y_max])
                .labels(vec![
                    Span::styled("0", Style::default().fg(TEXT_MUTED)),
                    Span::styled(format!("{:.0} Mbps", y_max), Style::default().fg(TEXT_MUTED)),
                ]),
        );

    frame.render_widget(chart, inner);
}

fn draw_settings_view(frame: &mut Frame, area: Rect, app: &App) {
    let chunks = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(10),
        Constraint::Length(1),
    ])
    .split(area);

    let header_block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(BORDER));
    let header_inner = header_block.inner(chunks[0]);
    frame.render_widget(header_block, chunks[0]);
    frame.render_widget(
        Paragraph::new("Settings")
            .style(Style::default().fg(TEXT_PRIMARY).add_modifier(Modifier::BOLD)),
        header_inner,
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER));
    let inner = block.inner(chunks[1]);
    frame.render_widget(block, chunks[1]);

    let mut constraints: Vec<Constraint> =
        SettingsField::ALL.iter().map(|_| Constraint::Length(2)).collect();
    constraints.push(Constraint::Min(0));
    let rows = Layout::vertical(constraints).split(inner);

    for (row, field) in rows.iter().zip(SettingsField::ALL) {
        draw_setting_row(
            frame,
            *row,
            field.label(),
            &field.value(&app.settings),
            app.selected_setting == field,
        );
    }

    frame.render_widget(
        Paragraph::new("↑↓ select · ←→ adjust · enter done")
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        chunks[2],
    );
}

fn draw_setting_row(frame: &mut Frame, area: Rect, label: &str, value: &str, selected: bool) {
    let chunks = Layout::horizontal([Constraint::Length(20), Constraint::Min(10)]).split(area);

    let (label_style, value_text, value_style) = if selected {
        (
            Style::default().fg(ACCENT),
            format!("< {} >", value),
            Style::default().fg(TEXT_PRIMARY),
        )
    } else {
        (
            Style::default().fg(TEXT_SECONDARY),
            value.to_string(),
            Style::default().fg(TEXT_MUTED),
        )
    };

    frame.render_widget(Paragraph::new(format!(" {}", label)).style(label_style), chunks[0]);
    frame.render_widget(Paragraph::new(value_text).style(value_style), chunks[1]);
}

fn draw_help(frame: &mut Frame, area: Rect, app: &App) {
    let help = if app.is_testing() {
        "esc cancel · r restart · q quit"
    } else {
        "enter start · s settings · q quit"
    };

    frame.render_widget(
        Paragraph::new(help)
            .style(Style::default().fg(TEXT_MUTED))
            .alignment(Alignment::Center),
        area,
    );
}
