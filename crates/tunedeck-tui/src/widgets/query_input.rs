//! QueryInput: single-line text entry built on tui-input.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED};

pub enum InputOutcome {
    Edited,
    Submitted(String),
    Cancelled,
}

pub struct QueryInput {
    input: Input,
    active: bool,
    placeholder: String,
}

impl QueryInput {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    /// Esc on a non-empty line clears it; Esc on an empty line closes the input.
    pub fn handle_key(&mut self, key: KeyEvent) -> InputOutcome {
        match key.code {
            KeyCode::Esc if !self.input.value().is_empty() => {
                self.input = Input::default();
                InputOutcome::Edited
            }
            KeyCode::Esc => {
                self.deactivate();
                InputOutcome::Cancelled
            }
            KeyCode::Enter => {
                self.deactivate();
                InputOutcome::Submitted(self.input.value().to_string())
            }
            _ => {
                self.input.handle_event(&Event::Key(key));
                InputOutcome::Edited
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if area.height == 0 {
            return;
        }
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();
        let display = if value.is_empty() && !self.active {
            Span::styled(format!("/ {}", self.placeholder), Style::default().fg(C_MUTED))
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(format!("/ {}", visible), Style::default().fg(C_INPUT_FG))
        };

        frame.render_widget(
            Paragraph::new(Line::from(display)).style(Style::default().bg(C_INPUT_BG)),
            area,
        );

        if self.active {
            let cursor_x = area.x + 2 + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}
