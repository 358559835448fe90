//! LogPanel component: tails tui.log below the workspace.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_ERROR, C_MUTED, C_SECONDARY, C_TOAST_WARNING},
    widgets::pane_chrome::pane_chrome,
};

pub struct LogPanel {
    /// `None` follows the newest line.
    scroll: Option<usize>,
}

impl LogPanel {
    pub fn new() -> Self {
        Self { scroll: None }
    }

    fn scroll_by(&mut self, delta: isize, total: usize) {
        let current = self.scroll.unwrap_or(total);
        let next = current.saturating_add_signed(delta);
        self.scroll = if next >= total { None } else { Some(next) };
    }
}

impl Component for LogPanel {
    fn id(&self) -> ComponentId {
        ComponentId::LogPanel
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let total = state.tui_log_lines.len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1, total),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1, total),
            KeyCode::PageUp => self.scroll_by(-10, total),
            KeyCode::PageDown => self.scroll_by(10, total),
            KeyCode::Home | KeyCode::Char('g') => self.scroll = Some(0),
            KeyCode::End | KeyCode::Char('G') => self.scroll = None,
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, state: &AppState) -> Vec<Action> {
        let total = state.tui_log_lines.len();
        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by(-1, total),
            MouseEventKind::ScrollDown => self.scroll_by(1, total),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if area.height == 0 {
            return;
        }
        frame.render_widget(Clear, area);

        let block = pane_chrome("log", focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let logs = &state.tui_log_lines;
        if logs.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled("  no log entries yet", Style::default().fg(C_MUTED))),
                inner,
            );
            return;
        }

        let height = inner.height as usize;
        let max_start = logs.len().saturating_sub(height);
        let start = self.scroll.map_or(max_start, |s| s.min(max_start));

        let lines: Vec<Line> = logs
            .iter()
            .skip(start)
            .take(height)
            .map(|raw| {
                let line = compact_log_line(raw);
                let color = if line.contains(" ERROR ") {
                    C_ERROR
                } else if line.contains(" WARN ") {
                    C_TOAST_WARNING
                } else {
                    C_SECONDARY
                };
                Line::from(vec![Span::raw(" "), Span::styled(line, Style::default().fg(color))])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

// ── Log line formatting ───────────────────────────────────────────────────────

/// `2026-10-19T10:02:03.120Z  INFO tunedeck::app: msg` → `10:02:03 INFO msg`.
pub fn compact_log_line(raw: &str) -> String {
    let clean = strip_ansi(raw);
    let mut rest = clean.trim();
    let mut head: Vec<String> = Vec::new();

    if let Some((tok, rem)) = split_first_token(rest) {
        if let Some(ts) = compact_timestamp(tok) {
            head.push(ts);
            rest = rem.trim_start();
        }
    }

    if let Some((tok, rem)) = split_first_token(rest) {
        let upper = tok.to_ascii_uppercase();
        if matches!(upper.as_str(), "TRACE" | "DEBUG" | "INFO" | "WARN" | "ERROR") {
            head.push(upper);
            rest = rem.trim_start();
        }
    }

    if let Some((target, msg)) = rest.split_once(": ") {
        let is_target = !target.is_empty()
            && target.len() <= 48
            && target
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':'));
        if is_target {
            rest = msg.trim_start();
        }
    }

    match (head.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => head.join(" "),
        (false, false) => format!("{} {}", head.join(" "), rest),
    }
}

fn compact_timestamp(token: &str) -> Option<String> {
    let dt = chrono::DateTime::parse_from_rfc3339(token).ok()?;
    let local = dt.with_timezone(&chrono::Local);
    let fmt = if local.date_naive() == chrono::Local::now().date_naive() {
        "%H:%M:%S"
    } else {
        "%m-%d %H:%M"
    };
    Some(local.format(fmt).to_string())
}

fn split_first_token(s: &str) -> Option<(&str, &str)> {
    let mut parts = s.splitn(2, char::is_whitespace);
    let first = parts.next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some((first, parts.next().unwrap_or("")))
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for ch in s.chars() {
        if in_escape {
            if ('@'..='~').contains(&ch) && ch != '[' {
                in_escape = false;
            }
            continue;
        }
        if ch == '\u{1b}' {
            in_escape = true;
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_strips_level_and_target() {
        let line = compact_log_line("DEBUG tunedeck_proto::client: 200 /search");
        assert_eq!(line, "DEBUG 200 /search");
    }

    #[test]
    fn test_compact_keeps_plain_text() {
        assert_eq!(compact_log_line("  plain message  "), "plain message");
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\u{1b}[32mINFO\u{1b}[0m ok"), "INFO ok");
    }
}
