use std::borrow::Cow;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use super::state::{filter_lines, InputMode, ViewState};
use crate::registry::{CommandRegistry, CommandStatus};

/// Render the whole dashboard: command sidebar on the left, the selected
/// command's log on the right, one-line status bar at the bottom. Pure
/// function of the view state and registry snapshots.
pub fn draw(f: &mut Frame, view: &ViewState, registry: &CommandRegistry) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(sidebar_width(f.area().width, view.min_sidebar_width)),
            Constraint::Min(0),
        ])
        .split(chunks[0]);

    draw_sidebar(f, view, registry, body[0]);
    draw_log_panel(f, view, registry, body[1]);
    draw_status_bar(f, view, chunks[1]);
}

fn sidebar_width(total: u16, min: u16) -> u16 {
    ((total as u32 * 4 / 15) as u16).max(min).min(total)
}

pub fn status_glyph(status: CommandStatus) -> (&'static str, Color) {
    match status {
        CommandStatus::Pending => ("○", Color::DarkGray),
        CommandStatus::Running => ("◐", Color::Yellow),
        CommandStatus::Success => ("●", Color::Green),
        CommandStatus::Failed => ("✗", Color::Red),
    }
}

fn draw_sidebar(f: &mut Frame, view: &ViewState, registry: &CommandRegistry, area: Rect) {
    // Borders take 2 columns; glyph + space take 2 more.
    let text_width = area.width.saturating_sub(4) as usize;
    let visible = area.height.saturating_sub(2) as usize;
    // Keep the selected row inside the window.
    let offset = (view.selected + 1).saturating_sub(visible);

    let lines: Vec<Line> = (0..registry.len())
        .skip(offset)
        .take(visible)
        .map(|i| {
            let (glyph, color) = status_glyph(registry.status(i));
            let name = truncate_with_ellipsis(&registry.spec(i).full_command, text_width);
            let row_style = if i == view.selected {
                Style::default()
                    .bg(Color::Indexed(62))
                    .fg(Color::Indexed(230))
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(glyph, Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(name.into_owned()),
            ])
            .style(row_style)
        })
        .collect();

    let block = Block::default()
        .title(" Commands ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Indexed(62)));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_log_panel(f: &mut Frame, view: &ViewState, registry: &CommandRegistry, area: Rect) {
    if registry.is_empty() {
        return;
    }
    let snapshot = registry.snapshot(view.selected);
    let filtered = filter_lines(&snapshot.output, &view.query);

    // Window to the most recent lines that fit.
    let visible = area.height.saturating_sub(2) as usize;
    let start = filtered.len().saturating_sub(visible);
    let max_width = area.width.saturating_sub(4) as usize;

    let lines: Vec<Line> = filtered[start..]
        .iter()
        .map(|l| Line::from(truncate_with_ellipsis(l, max_width).into_owned()))
        .collect();

    let title = format!(
        " {} ",
        truncate_with_ellipsis(&registry.spec(view.selected).full_command, max_width)
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Indexed(62)));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status_bar(f: &mut Frame, view: &ViewState, area: Rect) {
    let line = match view.mode {
        InputMode::Search => Line::from(vec![
            Span::styled(" Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(view.query.clone()),
        ]),
        InputMode::Normal => Line::from(Span::styled(
            " q: quit | ↑/↓: navigate | /: search",
            Style::default().fg(Color::Indexed(240)),
        )),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate_with_ellipsis("cargo test", 20), "cargo test");
    }

    #[test]
    fn truncate_long_string() {
        assert_eq!(truncate_with_ellipsis("cargo build --release", 8), "cargo...");
    }

    #[test]
    fn truncate_tiny_widths() {
        assert_eq!(truncate_with_ellipsis("hello", 3), "...");
        assert_eq!(truncate_with_ellipsis("hello", 2), "..");
        assert_eq!(truncate_with_ellipsis("hello", 0), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        // Multibyte chars must not be split mid-sequence.
        let s = "écho déjà vu encore";
        let out = truncate_with_ellipsis(s, 10);
        assert!(out.ends_with("..."));
        assert!(out.chars().count() <= 10);
    }

    #[test]
    fn sidebar_takes_four_fifteenths_with_floor() {
        assert_eq!(sidebar_width(150, 20), 40);
        assert_eq!(sidebar_width(30, 20), 20);
        // Never wider than the terminal itself.
        assert_eq!(sidebar_width(10, 20), 10);
    }

    #[test]
    fn each_status_has_a_distinct_glyph() {
        let glyphs = [
            status_glyph(CommandStatus::Pending).0,
            status_glyph(CommandStatus::Running).0,
            status_glyph(CommandStatus::Success).0,
            status_glyph(CommandStatus::Failed).0,
        ];
        for (i, a) in glyphs.iter().enumerate() {
            for b in glyphs.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
