//! UI rendering for the script editor.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use super::app::{App, Status};

const KEYBINDINGS: &[(&str, &str)] = &[
    ("^E", "execute"),
    ("^O", "connect"),
    ("^D", "disconnect"),
    ("^L", "clear log"),
    ("^U", "clear script"),
    ("Esc", "quit"),
];

/// Render the UI.
pub fn render(frame: &mut Frame, app: &App) {
    let [script_area, log_area, status_area, help_area] = Layout::vertical([
        Constraint::Percentage(40),
        Constraint::Fill(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_script(frame, app, script_area);
    render_log(frame, app, log_area);
    render_status(frame, app, status_area);
    render_help(frame, help_area);
}

fn render_script(frame: &mut Frame, app: &App, area: Rect) {
    let title = app.command_endpoint.map_or_else(
        || " script ".to_string(),
        |endpoint| format!(" script → {endpoint} "),
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    // Show the tail so the cursor line stays visible.
    let visible = area.height.saturating_sub(2) as usize;
    let text = format!("{}▏", app.script.replace('\t', "    "));
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines.len().saturating_sub(visible);
    let shown: Vec<Line> = lines[start..].iter().map(|l| Line::raw(*l)).collect();

    frame.render_widget(Paragraph::new(shown).block(block), area);
}

fn render_log(frame: &mut Frame, app: &App, area: Rect) {
    let (title, color) = match app.listen_addr {
        Some(addr) if app.connected => (format!(" output ← {addr} "), Color::Green),
        _ => (" output (disconnected) ".to_string(), Color::DarkGray),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    // Scroll to the bottom, like a console.
    let visible = area.height.saturating_sub(2) as usize;
    let total = app.log.lines().count();
    let offset = total.saturating_sub(visible);
    let scroll = u16::try_from(offset).unwrap_or(u16::MAX);

    let paragraph = Paragraph::new(app.log.as_str())
        .block(block)
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.status {
        Status::Idle => Line::from("Ready").style(Style::default().fg(Color::DarkGray)),
        Status::Info(msg) => Line::from(msg.as_str()).style(Style::default().fg(Color::White)),
        Status::Error(msg) => {
            Line::from(format!("Error: {msg}")).style(Style::default().fg(Color::Red))
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let separator = Span::raw(" │ ");
    let spans: Vec<Span> = KEYBINDINGS
        .iter()
        .enumerate()
        .flat_map(|(i, (key, desc))| {
            let prefix = (i > 0).then(|| separator.clone());
            prefix.into_iter().chain([
                Span::styled(*key, Style::new().fg(Color::Cyan)),
                Span::raw(format!(": {desc}")),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
