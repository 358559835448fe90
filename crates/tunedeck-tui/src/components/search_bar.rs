//! SearchBar component: query line plus the active filter badge.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{layout::Rect, Frame};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_MODE_SEARCH, C_TAG},
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        query_input::{InputOutcome, QueryInput},
    },
};

pub struct SearchBar {
    input: QueryInput,
}

impl SearchBar {
    pub fn new() -> Self {
        Self {
            input: QueryInput::new("search songs, albums, artists"),
        }
    }
}

impl Component for SearchBar {
    fn id(&self) -> ComponentId {
        ComponentId::SearchBar
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if !self.input.is_active() {
            return match key.code {
                KeyCode::Enter | KeyCode::Char('i') => vec![Action::OpenInput],
                KeyCode::Down | KeyCode::Char('j') => vec![Action::FocusPane(ComponentId::Results)],
                _ => vec![],
            };
        }
        match self.input.handle_key(key) {
            InputOutcome::Edited => vec![],
            InputOutcome::Submitted(query) => vec![
                Action::CloseInput,
                Action::SubmitSearch(query.trim().to_string()),
                Action::FocusPane(ComponentId::Results),
            ],
            InputOutcome::Cancelled => vec![Action::CloseInput],
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) if !self.input.is_active() => {
                vec![Action::OpenInput]
            }
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        match action {
            Action::OpenInput => {
                self.input.set_value(&state.search.query);
                self.input.activate();
            }
            Action::CloseInput => self.input.deactivate(),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        if !self.input.is_active() && self.input.text() != state.search.query {
            self.input.set_value(&state.search.query);
        }
        let filter = state.search.filter.as_query().to_ascii_uppercase();
        let badge = Badge {
            text: &filter,
            color: if self.input.is_active() { C_MODE_SEARCH } else { C_TAG },
        };
        let block = pane_chrome("search", focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.input.draw(frame, inner);
    }
}
