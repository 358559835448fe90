//! Details overlay: entity metadata plus catalog lookups that load independently.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph, Wrap},
    Frame,
};

use tunedeck_proto::protocol::{Entity, SearchHit, SpotifyTrack};

use crate::{
    action::{Action, ComponentId},
    app_state::{AppState, DetailsView, Enrichment, Section},
    component::Component,
    components::help_overlay::{centered_rect, overlay_block},
    theme::{
        style_error, style_heading, style_muted, style_secondary, style_selected, C_ACCENT,
        C_PLAYING, C_PRIMARY, C_SECONDARY,
    },
};

/// Static part of the view, taken from the hit itself.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailFields {
    pub heading: &'static str,
    pub subtitle: Option<String>,
    pub rows: Vec<(&'static str, String)>,
}

pub fn detail_fields(hit: &SearchHit) -> DetailFields {
    let mut rows: Vec<(&'static str, String)> = Vec::new();
    let mut push = |label: &'static str, value: Option<&str>| {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            rows.push((label, v.to_string()));
        }
    };

    match &hit.entity {
        Entity::Artist(profile) => {
            let info = &profile.info;
            push("Real Name", info.distinct_real_name());
            push("Biography", info.biography());
            push("More Info", info.reference_url());
            push("Instruments", info.instruments_text().as_deref());
            push("Birth Date", info.birth_date.as_deref());
            push("Categories", info.subject.as_ref().map(|s| s.join(", ")).as_deref());
            push(
                "Also Known As",
                info.name_variations.as_ref().map(|n| n.join(", ")).as_deref(),
            );
            DetailFields {
                heading: if profile.is_member {
                    "Artist Information"
                } else {
                    "Band Information"
                },
                subtitle: None,
                rows,
            }
        }
        Entity::Album(album) => {
            push("Genre", album.genre.as_deref());
            push("Release Date", album.date_release.as_deref());
            push("Country", album.country.as_deref());
            DetailFields {
                heading: "Album Information",
                subtitle: Some(format!("by {}", album.by())),
                rows,
            }
        }
        Entity::Song(song) => {
            push("Album", song.album_title.as_deref());
            push("Genre", song.album_genre.as_deref());
            push("BPM", song.bpm.as_deref());
            push("Language", song.language.as_deref());
            push("Preview", hit.preview.as_deref());
            push("Lyrics", song.lyrics.as_deref());
            DetailFields {
                heading: "Song Information",
                subtitle: Some(format!("by {}", hit.credited_name())),
                rows,
            }
        }
    }
}

pub struct Details {
    selected: usize,
    scroll: u16,
    request_id: Option<u64>,
}

impl Details {
    pub fn new() -> Self {
        Self {
            selected: 0,
            scroll: 0,
            request_id: None,
        }
    }

    /// Reset view state when a different view is opened.
    fn sync(&mut self, view: &DetailsView) {
        if self.request_id != Some(view.request_id) {
            self.request_id = Some(view.request_id);
            self.selected = 0;
            self.scroll = 0;
        }
        self.selected = self.selected.min(view.tracks().len().saturating_sub(1));
    }
}

impl Component for Details {
    fn id(&self) -> ComponentId {
        ComponentId::Details
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        let Some(view) = state.details.as_ref() else {
            return vec![Action::CloseDetails];
        };
        self.sync(view);
        let tracks = view.tracks();
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return vec![Action::CloseDetails],
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected = (self.selected + 1).min(tracks.len().saturating_sub(1));
            }
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_add(5),
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(5),
            KeyCode::Enter => {
                if let Some(track) = tracks.get(self.selected) {
                    return vec![Action::PlayTrack(track.id.clone())];
                }
            }
            KeyCode::Char('y') => {
                let url = view
                    .catalog_url()
                    .map(str::to_string)
                    .or_else(|| tracks.get(self.selected).map(track_url));
                if let Some(url) = url {
                    return vec![Action::CopyToClipboard(url)];
                }
            }
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, _area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollDown => self.scroll = self.scroll.saturating_add(1),
            MouseEventKind::ScrollUp => self.scroll = self.scroll.saturating_sub(1),
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        let Some(view) = state.details.as_ref() else {
            return;
        };
        self.sync(view);

        let popup = centered_rect(80, area.height.saturating_sub(4), area);
        frame.render_widget(Clear, popup);
        let block = overlay_block();
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let (catalog_lines, tracks) = enrichment_parts(&view.enrichment);
        let track_rows = match tracks {
            Some(Section::Ready(list)) => (list.len() as u16).min(10) + 1,
            Some(_) => 2,
            None => 0,
        };
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(4),
                Constraint::Length(catalog_lines.len() as u16),
                Constraint::Length(track_rows),
                Constraint::Length(1),
            ])
            .split(inner);

        frame.render_widget(
            Paragraph::new(info_lines(&view.hit))
                .wrap(Wrap { trim: false })
                .scroll((self.scroll, 0)),
            parts[0],
        );
        frame.render_widget(Paragraph::new(catalog_lines), parts[1]);
        if let Some((title, section, empty)) = track_section(&view.enrichment) {
            draw_tracks(frame, parts[2], title, section, empty, self.selected);
        }
        frame.render_widget(
            Paragraph::new(Span::styled(
                " ↑↓ select  enter play  y copy link  pgup/pgdn scroll  esc close",
                style_muted(),
            )),
            parts[3],
        );
    }
}

fn info_lines(hit: &SearchHit) -> Vec<Line<'static>> {
    let fields = detail_fields(hit);
    let mut lines = vec![
        Line::from(Span::styled(format!(" {}", fields.heading), style_muted())),
        Line::from(Span::styled(
            format!(" {}", hit.title),
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        )),
    ];
    if let Some(subtitle) = fields.subtitle {
        lines.push(Line::from(Span::styled(format!(" {}", subtitle), style_secondary())));
    }
    lines.push(Line::from(""));
    for (label, value) in fields.rows {
        lines.push(Line::from(vec![
            Span::styled(format!(" {}: ", label), style_heading()),
            Span::styled(value, Style::default().fg(C_PRIMARY)),
        ]));
    }
    lines
}

fn enrichment_parts(enrichment: &Enrichment) -> (Vec<Line<'static>>, Option<&Section<Vec<SpotifyTrack>>>) {
    match enrichment {
        Enrichment::Artist { catalog, songs } => {
            let body = match catalog {
                Section::Ready(artist) => vec![
                    Line::from(Span::styled(format!(" {}", artist.name), style_heading())),
                    Line::from(Span::styled(
                        format!(" {}", artist.genres.iter().take(3).cloned().collect::<Vec<_>>().join(", ")),
                        style_secondary(),
                    )),
                    Line::from(Span::styled(
                        format!(" {} followers • {}% popularity", artist.followers, artist.popularity),
                        style_secondary(),
                    )),
                ],
                other => vec![status_line(other, "No artist found")],
            };
            (with_title("On Spotify", body), Some(songs))
        }
        Enrichment::Album { catalog } => {
            let body = match catalog {
                Section::Ready(album) => vec![
                    Line::from(Span::styled(format!(" {}", album.name), style_heading())),
                    Line::from(Span::styled(format!(" By {}", album.artist), style_secondary())),
                    Line::from(Span::styled(
                        format!(" {} tracks • Released: {}", album.total_tracks, album.release_date),
                        style_secondary(),
                    )),
                ],
                other => vec![status_line(other, "No album found")],
            };
            (with_title("On Spotify", body), None)
        }
        Enrichment::Song { matches } => (Vec::new(), Some(matches)),
    }
}

fn track_section(enrichment: &Enrichment) -> Option<(&'static str, &Section<Vec<SpotifyTrack>>, &'static str)> {
    match enrichment {
        Enrichment::Artist { songs, .. } => Some(("Songs found on Spotify", songs, "No songs found")),
        Enrichment::Song { matches } => Some(("Spotify matches", matches, "No matches found")),
        Enrichment::Album { .. } => None,
    }
}

fn with_title(title: &'static str, mut body: Vec<Line<'static>>) -> Vec<Line<'static>> {
    body.insert(0, Line::from(Span::styled(format!(" {}", title), style_muted())));
    body
}

fn status_line<T>(section: &Section<T>, empty: &str) -> Line<'static> {
    match section {
        Section::Loading => Line::from(Span::styled(" Loading...", style_muted())),
        Section::Failed(message) => Line::from(Span::styled(format!(" {}", message), style_error())),
        Section::Empty | Section::Ready(_) => Line::from(Span::styled(format!(" {}", empty), style_muted())),
    }
}

fn draw_tracks(
    frame: &mut Frame,
    area: Rect,
    title: &'static str,
    section: &Section<Vec<SpotifyTrack>>,
    empty: &'static str,
    selected: usize,
) {
    let mut lines = vec![Line::from(Span::styled(format!(" {}", title), style_muted()))];
    match section {
        Section::Ready(tracks) => {
            let height = area.height.saturating_sub(1) as usize;
            let skip = (selected + 1).saturating_sub(height);
            for (i, track) in tracks.iter().enumerate().skip(skip).take(height) {
                let line = Line::from(vec![
                    Span::styled(" ▶ ", Style::default().fg(C_PLAYING)),
                    Span::styled(track.title.clone(), Style::default().fg(C_PRIMARY)),
                    Span::styled(
                        format!("  {} • {}", track.artist, track.album),
                        Style::default().fg(C_SECONDARY),
                    ),
                ]);
                lines.push(if i == selected {
                    line.style(style_selected(true))
                } else {
                    line
                });
            }
        }
        other => lines.push(status_line(other, empty)),
    }
    frame.render_widget(Paragraph::new(lines), area);
}

fn track_url(track: &SpotifyTrack) -> String {
    format!("https://open.spotify.com/track/{}", track.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tunedeck_proto::protocol::{ArtistInfo, ArtistProfile, SongInfo};

    #[test]
    fn test_member_artist_heading() {
        let hit = SearchHit {
            title: "Thom Yorke".to_string(),
            image: None,
            preview: None,
            entity: Entity::Artist(ArtistProfile {
                info: ArtistInfo {
                    name: Some("Thom Yorke".to_string()),
                    real_name: Some("Thomas Edward Yorke".to_string()),
                    subject: Some(vec!["English singers".to_string(), "Radiohead".to_string()]),
                    ..ArtistInfo::default()
                },
                is_member: true,
            }),
        };
        let fields = detail_fields(&hit);
        assert_eq!(fields.heading, "Artist Information");
        assert_eq!(fields.rows[0], ("Real Name", "Thomas Edward Yorke".to_string()));
        assert!(fields
            .rows
            .contains(&("Categories", "English singers, Radiohead".to_string())));
    }

    #[test]
    fn test_song_fields_skip_missing() {
        let hit = SearchHit {
            title: "Airbag".to_string(),
            image: None,
            preview: Some("https://p.example/airbag.mp3".to_string()),
            entity: Entity::Song(SongInfo {
                name: Some("Radiohead".to_string()),
                album_title: Some("OK Computer".to_string()),
                bpm: Some("78".to_string()),
                ..SongInfo::default()
            }),
        };
        let fields = detail_fields(&hit);
        assert_eq!(fields.heading, "Song Information");
        assert_eq!(fields.subtitle.as_deref(), Some("by Radiohead"));
        let labels: Vec<&str> = fields.rows.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec!["Album", "BPM", "Preview"]);
    }
}
