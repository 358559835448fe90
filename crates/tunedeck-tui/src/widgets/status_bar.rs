//! Status bar: bottom line with mode and keybindings.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::Workspace;
use crate::theme::{C_MODE_NORMAL, C_MODE_SEARCH, C_MUTED};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Typing into the search box.
    Search,
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode, workspace: Workspace) {
    let (label, color) = match (mode, workspace) {
        (InputMode::Search, _) => ("SEARCH", C_MODE_SEARCH),
        (InputMode::Normal, Workspace::Search) => ("RESULTS", C_MODE_NORMAL),
        (InputMode::Normal, Workspace::Dashboard) => ("DASHBOARD", C_MODE_NORMAL),
    };

    let keys = match (mode, workspace) {
        (InputMode::Search, _) => " type query  Enter search  Esc clear/close  Tab next pane",
        (InputMode::Normal, Workspace::Search) => {
            " / search  F filter  ↑↓/jk select  Enter details  l like  y copy  Space pause  n/p track  +/- vol  T top  d dashboard  ? help  q quit"
        }
        (InputMode::Normal, Workspace::Dashboard) => {
            " r refresh  v chart  Space pause  n/p track  +/- vol  T top  d search  L logs  ? help  q quit"
        }
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
