//! Transient status messages in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::theme::{C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_SUCCESS, C_TOAST_WARNING};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    fn lifetime(self) -> Duration {
        match self {
            Severity::Info | Severity::Success => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(4),
            Severity::Error => Duration::from_secs(5),
        }
    }
}

struct Toast {
    message: String,
    severity: Severity,
    expires: Instant,
}

/// Stays up until resolved; used while a search is in flight.
struct Spinner {
    message: String,
    frame: usize,
}

const SPINNER_FRAMES: &[&str] = &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];
const MAX_VISIBLE: usize = 4;

#[derive(Default)]
pub struct ToastManager {
    toasts: VecDeque<Toast>,
    spinner: Option<Spinner>,
}

impl ToastManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        self.push_at(severity, message, Instant::now());
    }

    fn push_at(&mut self, severity: Severity, message: impl Into<String>, now: Instant) {
        let message = message.into();
        self.toasts.retain(|t| t.message != message);
        self.toasts.push_back(Toast {
            message,
            severity,
            expires: now + severity.lifetime(),
        });
        while self.toasts.len() > MAX_VISIBLE * 2 {
            self.toasts.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Severity::Success, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    pub fn spinner(&mut self, message: impl Into<String>) {
        self.spinner = Some(Spinner {
            message: message.into(),
            frame: 0,
        });
    }

    pub fn dismiss_spinner(&mut self) {
        self.spinner = None;
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    fn tick_at(&mut self, now: Instant) {
        self.toasts.retain(|t| t.expires > now);
        if let Some(s) = self.spinner.as_mut() {
            s.frame = (s.frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty() && self.spinner.is_none()
    }

    fn rows(&self) -> impl Iterator<Item = (String, ratatui::style::Color)> + '_ {
        let spinner = self.spinner.iter().map(|s| {
            (
                format!(" {} {} ", SPINNER_FRAMES[s.frame], s.message),
                C_TOAST_INFO,
            )
        });
        let toasts = self.toasts.iter().rev().take(MAX_VISIBLE).map(|t| {
            let (icon, color) = match t.severity {
                Severity::Info => ("·", C_TOAST_INFO),
                Severity::Success => ("✓", C_TOAST_SUCCESS),
                Severity::Warning => ("!", C_TOAST_WARNING),
                Severity::Error => ("✗", C_TOAST_ERROR),
            };
            (format!(" {} {} ", icon, t.message), color)
        });
        spinner.chain(toasts)
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if self.is_empty() || area.height < 2 {
            return;
        }
        let max_width = (area.width / 2).clamp(30, 60).min(area.width);
        let bottom = area.y + area.height;

        for (y, (text, color)) in (area.y + 1..bottom).zip(self.rows()) {
            let w = (text.width() as u16).min(max_width);
            let toast_area = Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    text,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))),
                toast_area,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_messages_collapse() {
        let mut toasts = ToastManager::new();
        toasts.info("liked");
        toasts.info("liked");
        assert_eq!(toasts.rows().count(), 1);
    }

    #[test]
    fn test_toasts_expire_but_spinner_stays() {
        let t0 = Instant::now();
        let mut toasts = ToastManager::new();
        toasts.push_at(Severity::Error, "search failed", t0);
        toasts.spinner("searching");
        toasts.tick_at(t0 + Duration::from_secs(6));
        let rows: Vec<String> = toasts.rows().map(|(text, _)| text).collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].contains("searching"));
        toasts.dismiss_spinner();
        assert!(toasts.is_empty());
    }
}
