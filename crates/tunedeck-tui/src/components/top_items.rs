//! TopItems overlay: the listener's top tracks and artists side by side.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use tunedeck_proto::protocol::{TopArtist, TopTrack};

use crate::{
    action::{Action, ComponentId},
    app_state::{AppState, Section},
    component::Component,
    components::help_overlay::{centered_rect, overlay_block},
    theme::{style_error, style_heading, style_muted, C_PRIMARY, C_SECONDARY},
};

pub struct TopItems;

impl Component for TopItems {
    fn id(&self) -> ComponentId {
        ComponentId::TopItems
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('T') => vec![Action::ToggleTopItems],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let popup = centered_rect(76, 24, area);
        frame.render_widget(Clear, popup);
        let block = overlay_block().title(Line::from(Span::styled(" top items ", style_heading())));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(inner);

        let tracks = column(
            "Top Tracks",
            &state.top_tracks,
            |t: &TopTrack| (t.title.clone(), t.artist.clone()),
        );
        let artists = column(
            "Top Artists",
            &state.top_artists,
            |a: &TopArtist| (a.name.clone(), a.genres.first().cloned().unwrap_or_default()),
        );
        frame.render_widget(Paragraph::new(tracks), cols[0]);
        frame.render_widget(Paragraph::new(artists), cols[1]);
    }
}

fn column<T>(
    title: &'static str,
    section: &Section<Vec<T>>,
    describe: impl Fn(&T) -> (String, String),
) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(Span::styled(format!(" {}", title), style_heading())),
        Line::from(""),
    ];
    match section {
        Section::Loading => lines.push(Line::from(Span::styled(" Loading...", style_muted()))),
        Section::Empty => lines.push(Line::from(Span::styled(" nothing here yet", style_muted()))),
        Section::Failed(message) => {
            lines.push(Line::from(Span::styled(format!(" {}", message), style_error())))
        }
        Section::Ready(items) => {
            for (i, item) in items.iter().enumerate() {
                let (name, detail) = describe(item);
                lines.push(Line::from(vec![
                    Span::styled(format!(" {:>2}. ", i + 1), style_muted()),
                    Span::styled(name, Style::default().fg(C_PRIMARY)),
                    Span::styled(format!("  {}", detail), Style::default().fg(C_SECONDARY)),
                ]));
            }
        }
    }
    lines
}
