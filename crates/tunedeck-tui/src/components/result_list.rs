//! ResultList component: ranked hits for the current query.

use std::time::Instant;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use tunedeck_proto::likes::LikeStore;
use tunedeck_proto::protocol::{Entity, EntityKind, SearchHit};

use crate::{
    action::{Action, ComponentId},
    app_state::{AppState, SearchStatus},
    component::Component,
    theme::{
        style_error, style_muted, style_selected, C_ALBUM, C_ARTIST, C_LIKED, C_MUTED, C_PRIMARY,
        C_SECONDARY, C_SONG, C_TOAST_INFO,
    },
    widgets::{
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

pub const NO_RESULTS: &str = "no results";

/// One rendered line of the result pane.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRow {
    /// Shown alone when a search returned nothing.
    Placeholder,
    Hit {
        /// Index into the hit list.
        index: usize,
        kind: EntityKind,
        title: String,
        subtitle: String,
        /// Only songs can be liked.
        liked: Option<bool>,
    },
}

pub fn result_rows(hits: &[SearchHit], likes: &LikeStore) -> Vec<ResultRow> {
    if hits.is_empty() {
        return vec![ResultRow::Placeholder];
    }
    hits.iter()
        .enumerate()
        .map(|(index, hit)| ResultRow::Hit {
            index,
            kind: hit.kind(),
            title: hit.title.clone(),
            subtitle: subtitle(hit),
            liked: (hit.kind() == EntityKind::Song).then(|| likes.is_liked(&hit.like_key())),
        })
        .collect()
}

fn subtitle(hit: &SearchHit) -> String {
    match &hit.entity {
        Entity::Song(song) => match &song.album_title {
            Some(album) => format!("{} · {}", hit.credited_name(), album),
            None => hit.credited_name().to_string(),
        },
        Entity::Album(album) => format!("by {}", album.by()),
        Entity::Artist(profile) if profile.is_member => "artist".to_string(),
        Entity::Artist(_) => "band".to_string(),
    }
}

pub struct ResultList {
    list: ScrollableList<ResultRow>,
    list_state: ListState,
    last_click: Option<(usize, Instant)>,
}

impl ResultList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(),
            list_state: ListState::default(),
            last_click: None,
        }
    }

    fn sync(&mut self, state: &AppState) {
        self.list
            .set_items(result_rows(&state.search.hits, &state.likes));
    }

    fn selected_hit(&self) -> Option<usize> {
        match self.list.selected_item() {
            Some(ResultRow::Hit { index, .. }) => Some(*index),
            _ => None,
        }
    }
}

impl Component for ResultList {
    fn id(&self) -> ComponentId {
        ComponentId::Results
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        self.sync(state);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                if self.list.selected == 0 {
                    return vec![Action::FocusPane(ComponentId::SearchBar)];
                }
                self.list.select_up(1);
            }
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Enter => {
                if let Some(index) = self.selected_hit() {
                    return vec![Action::OpenDetails(index)];
                }
            }
            KeyCode::Char('l') => {
                if let Some(ResultRow::Hit {
                    index,
                    liked: Some(_),
                    ..
                }) = self.list.selected_item()
                {
                    return vec![Action::ToggleLike(*index)];
                }
            }
            KeyCode::Char('y') => {
                if let Some(hit) = self.selected_hit().and_then(|i| state.hit(i)) {
                    return vec![Action::CopyToClipboard(hit.like_key())];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, state: &AppState) -> Vec<Action> {
        self.sync(state);
        let rel_row = event.row.saturating_sub(area.y + 1) as usize;
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                let now = Instant::now();
                let is_double = self
                    .last_click
                    .is_some_and(|(row, t)| row == rel_row && now.duration_since(t).as_millis() < 400);
                if self.list.handle_click(rel_row) && is_double {
                    self.last_click = None;
                    if let Some(index) = self.selected_hit() {
                        return vec![Action::OpenDetails(index)];
                    }
                } else {
                    self.last_click = Some((rel_row, now));
                }
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if let Action::SubmitSearch(_) | Action::CycleFilter = action {
            self.list.reset();
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let count = state.search.hits.len().to_string();
        let badge = match &state.search.status {
            SearchStatus::Searching => Some(Badge {
                text: "searching…",
                color: C_TOAST_INFO,
            }),
            _ if state.search.has_results => Some(Badge {
                text: &count,
                color: C_SECONDARY,
            }),
            _ => None,
        };
        let block = pane_chrome("results", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if let SearchStatus::Failed(message) = &state.search.status {
            frame.render_widget(
                Paragraph::new(Span::styled(format!("  {}", message), style_error()))
                    .wrap(Wrap { trim: false }),
                inner,
            );
            return;
        }
        if !state.search.has_results {
            frame.render_widget(
                Paragraph::new(Span::styled("  press / to search", style_muted())),
                inner,
            );
            return;
        }

        self.sync(state);
        let height = inner.height as usize;
        self.list.ensure_visible(height);
        let selected = self.list.selected;

        let items: Vec<ListItem> = self
            .list
            .visible_items(height)
            .map(|(i, row)| render_row(row, i == selected, focused))
            .collect();
        let sel_in_view = selected.saturating_sub(self.list.scroll_offset);
        self.list_state.select(Some(sel_in_view));
        frame.render_stateful_widget(List::new(items), inner, &mut self.list_state);
    }
}

fn render_row(row: &ResultRow, selected: bool, focused: bool) -> ListItem<'static> {
    let line = match row {
        ResultRow::Placeholder => Line::from(Span::styled(format!("  {}", NO_RESULTS), style_muted())),
        ResultRow::Hit {
            kind,
            title,
            subtitle,
            liked,
            ..
        } => {
            let (tag, color) = match kind {
                EntityKind::Song => ("song  ", C_SONG),
                EntityKind::Album => ("album ", C_ALBUM),
                EntityKind::Artist => ("artist", C_ARTIST),
            };
            let heart = match liked {
                Some(true) => Span::styled(" ♥ ", Style::default().fg(C_LIKED)),
                Some(false) => Span::styled(" ♡ ", Style::default().fg(C_MUTED)),
                None => Span::raw("   "),
            };
            Line::from(vec![
                heart,
                Span::styled(format!("{} ", tag), Style::default().fg(color)),
                Span::styled(
                    title.clone(),
                    Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  {}", subtitle), Style::default().fg(C_SECONDARY)),
            ])
        }
    };
    let item = ListItem::new(line);
    if selected {
        item.style(style_selected(focused))
    } else {
        item
    }
}
