//! TUI views
//!
//! Header with the current target, body with the display state's lines,
//! footer with key bindings. Drawing never changes state.

use chrono::Utc;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::trace;

use crate::reactor::DisplayState;
use crate::render::{ViewLine, view_lines};
use crate::status::FileState;

mod colors {
    use ratatui::style::Color;

    pub const WATCHING: Color = Color::Rgb(0, 255, 127); // Spring green
    pub const WARNING: Color = Color::Rgb(255, 215, 0); // Gold
    pub const DELETED: Color = Color::Rgb(220, 20, 60); // Crimson
    pub const MODIFIED: Color = Color::Rgb(255, 165, 0); // Orange
    pub const HEADER: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const KEYBIND: Color = Color::Rgb(0, 255, 255); // Cyan
    pub const COMMIT_ID: Color = Color::Rgb(255, 215, 0); // Gold
    pub const AGE: Color = Color::Rgb(100, 149, 237); // Cornflower blue
    pub const DIM: Color = Color::DarkGray;
}

/// Main render function
pub fn render(state: &DisplayState, frame: &mut Frame) {
    trace!(target = ?state.target(), "render: called");
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    render_header(state, frame, chunks[0]);
    render_body(state, frame, chunks[1]);
    render_footer(frame, chunks[2]);
}

fn render_header(state: &DisplayState, frame: &mut Frame, area: Rect) {
    let (indicator, color, label) = match state {
        DisplayState::Idle => ("○", colors::DIM, "idle".to_string()),
        DisplayState::Watching { target, .. } => ("●", colors::WATCHING, target.clone()),
        DisplayState::Unwatchable { target, .. } => ("✗", colors::WARNING, target.clone()),
    };

    let line = Line::from(vec![
        Span::styled(
            " commitwatch ",
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        ),
        Span::styled(indicator, Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(label, Style::default().fg(Color::White)),
    ]);

    let header = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_body(state: &DisplayState, frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = view_lines(state, Utc::now())
        .iter()
        // The header already names the watched target
        .filter(|line| !matches!(line, ViewLine::Target(_)))
        .map(styled_line)
        .collect();

    let body = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let footer = Line::from(vec![
        Span::styled(" q", Style::default().fg(colors::KEYBIND)),
        Span::styled("/", Style::default().fg(colors::DIM)),
        Span::styled("Esc", Style::default().fg(colors::KEYBIND)),
        Span::styled(" quit", Style::default().fg(colors::DIM)),
    ]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn file_color(state: FileState) -> Color {
    match state {
        FileState::Added => colors::WATCHING,
        FileState::Deleted | FileState::Conflicted => colors::DELETED,
        FileState::Untracked => colors::DIM,
        FileState::Modified | FileState::Renamed | FileState::Typechange => colors::MODIFIED,
    }
}

fn styled_line(line: &ViewLine) -> Line<'static> {
    match line {
        ViewLine::Welcome => Line::from(Span::styled(
            line.to_string(),
            Style::default().fg(colors::WATCHING).add_modifier(Modifier::BOLD),
        )),
        ViewLine::Hint(_) | ViewLine::Empty(_) => {
            Line::from(Span::styled(line.to_string(), Style::default().fg(colors::DIM)))
        }
        ViewLine::Warning(_) => Line::from(Span::styled(
            line.to_string(),
            Style::default().fg(colors::WARNING).add_modifier(Modifier::BOLD),
        )),
        ViewLine::Reason(_) => Line::from(Span::styled(line.to_string(), Style::default().fg(colors::WARNING))),
        ViewLine::Target(_) | ViewLine::Heading(_) => Line::from(Span::styled(
            line.to_string(),
            Style::default().fg(colors::HEADER).add_modifier(Modifier::BOLD),
        )),
        ViewLine::File { path, state } => Line::from(vec![
            Span::raw("  "),
            Span::styled(format!("{:<10}", state.to_string()), Style::default().fg(file_color(*state))),
            Span::raw(" "),
            Span::raw(path.clone()),
        ]),
        ViewLine::Branch(name) => Line::from(vec![
            Span::raw("  "),
            Span::styled(name.clone(), Style::default().fg(Color::Magenta)),
        ]),
        ViewLine::Commit {
            short_id,
            summary,
            age,
            author,
        } => Line::from(vec![
            Span::raw("  "),
            Span::styled(short_id.clone(), Style::default().fg(colors::COMMIT_ID)),
            Span::raw(" - "),
            Span::styled(summary.clone(), Style::default().fg(Color::White)),
            Span::raw(" "),
            Span::styled(format!("({})", age), Style::default().fg(colors::AGE)),
            Span::raw(" "),
            Span::styled(format!("[{}]", author), Style::default().fg(colors::DIM)),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{FileEntry, RepoStatus};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn draw(state: &DisplayState) -> String {
        let backend = TestBackend::new(80, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(state, frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_idle_screen_shows_welcome() {
        let screen = draw(&DisplayState::Idle);
        assert!(screen.contains("Welcome to commitwatch!"));
        assert!(screen.contains("quit"));
    }

    #[test]
    fn test_watching_screen_lists_files() {
        let state = DisplayState::Watching {
            target: "/repo".to_string(),
            status: RepoStatus {
                files: vec![FileEntry {
                    path: "src/main.rs".to_string(),
                    state: FileState::Modified,
                }],
                branches: vec!["main".to_string()],
                commits: Vec::new(),
            },
        };

        let screen = draw(&state);
        assert!(screen.contains("/repo"));
        assert!(screen.contains("src/main.rs"));
        assert!(screen.contains("Branches"));
    }

    #[test]
    fn test_unwatchable_screen_warns() {
        let state = DisplayState::Unwatchable {
            target: "/tmp/x".to_string(),
            reason: "/tmp/x is not a Git repository".to_string(),
        };
        assert!(draw(&state).contains("Cannot watch /tmp/x"));
    }
}
