//! NowPlaying component: 2-row top bar.
//!
//! Row 1: workspace tabs, play state, track and artist (or the sign-in banner).
//! Row 2: progress bar and volume.
//!
//! Not focusable.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    action::{Action, ComponentId, Workspace},
    app_state::AppState,
    component::Component,
    intent::RenderHint,
    theme::{
        C_ACCENT, C_BADGE_PENDING, C_ERROR, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY,
        C_TOAST_WARNING,
    },
    widgets::progress_bar::draw_progress,
};

pub struct NowPlaying;

impl Component for NowPlaying {
    fn id(&self) -> ComponentId {
        ComponentId::NowPlaying
    }

    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        frame.render_widget(Clear, area);
        if area.height < 2 {
            frame.render_widget(Paragraph::new(build_row1(state)), area);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        frame.render_widget(Paragraph::new(build_row1(state)), rows[0]);
        draw_row2(frame, rows[1], state);
    }
}

// ── Row 1: tabs / track / sign-in ────────────────────────────────────────────

fn build_row1(state: &AppState) -> Line<'static> {
    let mut spans = vec![Span::styled(
        " tunedeck ",
        Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
    )];
    for (ws, label) in [(Workspace::Search, "search"), (Workspace::Dashboard, "dashboard")] {
        let style = if state.workspace == ws {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(C_MUTED)
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(label, style));
    }
    spans.push(Span::styled("  │ ", Style::default().fg(C_MUTED)));

    if let Some(login) = &state.signed_out {
        spans.push(Span::styled(
            format!("sign in required: {}", login),
            Style::default().fg(C_TOAST_WARNING).add_modifier(Modifier::BOLD),
        ));
        return Line::from(spans);
    }

    match state.playback.as_ref().filter(|p| p.is_displayable()) {
        Some(playback) => {
            let (icon, color) = play_icon(playback.is_playing, state.pause_hint);
            spans.push(Span::styled(icon, Style::default().fg(color)));
            spans.push(Span::raw(" "));
            spans.push(Span::styled(
                playback.track_name.clone().unwrap_or_default(),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                format!("  {}", playback.artist_name.clone().unwrap_or_default()),
                Style::default().fg(C_SECONDARY),
            ));
        }
        None => spans.push(Span::styled("nothing playing", Style::default().fg(C_MUTED))),
    }
    Line::from(spans)
}

/// Icon for the play state, overridden while a pause toggle is unconfirmed.
fn play_icon(is_playing: bool, hint: RenderHint) -> (&'static str, Color) {
    let (icon, color) = if is_playing {
        ("▶", C_PLAYING)
    } else {
        ("⏸", C_SECONDARY)
    };
    match hint {
        RenderHint::Normal => (icon, color),
        RenderHint::PendingVisible => (icon, C_BADGE_PENDING),
        RenderHint::PendingHidden => (" ", color),
        RenderHint::TimedOut => ("?", C_ERROR),
    }
}

// ── Row 2: progress / volume ──────────────────────────────────────────────────

fn draw_row2(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(playback) = state.playback.as_ref().filter(|p| p.is_displayable()) else {
        return;
    };
    if area.width < 20 {
        return;
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(12)])
        .split(area);

    draw_progress(
        frame,
        Rect {
            x: cols[0].x + 1,
            width: cols[0].width.saturating_sub(2),
            ..cols[0]
        },
        playback.progress_ratio(),
        playback.progress_ms as f64 / 1000.0,
        playback.duration_ms as f64 / 1000.0,
    );

    let volume = match state.volume_hint {
        RenderHint::Normal => playback.volume.unwrap_or(state.volume),
        _ => state.volume,
    };
    let color = match state.volume_hint {
        RenderHint::Normal => C_SECONDARY,
        RenderHint::TimedOut => C_ERROR,
        _ => C_BADGE_PENDING,
    };
    frame.render_widget(
        Paragraph::new(Span::styled(format!(" vol {:>3}%", volume), Style::default().fg(color))),
        cols[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_pause_keeps_icon_in_pending_colour() {
        assert_eq!(play_icon(true, RenderHint::Normal), ("▶", C_PLAYING));
        assert_eq!(play_icon(false, RenderHint::PendingVisible), ("⏸", C_BADGE_PENDING));
        assert_eq!(play_icon(true, RenderHint::TimedOut).0, "?");
    }
}
