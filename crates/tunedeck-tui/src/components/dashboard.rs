//! Dashboard component: metrics chart, summary, and stat breakdowns.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use unicode_width::UnicodeWidthStr;

use tunedeck_proto::config::ChartVariant;
use tunedeck_proto::protocol::{MetricsSeries, MetricsSnapshot, StatCounts};

use crate::{
    action::{Action, ComponentId},
    app_state::{AppState, Section},
    component::Component,
    theme::{
        style_error, style_muted, style_secondary, C_BADGE_STALE, C_PRIMARY,
        C_SECONDARY, C_SERIES_A, C_SERIES_B, C_TAG,
    },
    widgets::pane_chrome::{pane_chrome, Badge},
};

// ── Chart model ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub name: &'static str,
    pub values: Vec<f64>,
}

/// What the chart shows, independent of how it is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    /// One label per search number (x axis).
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
    /// Upper bound of the y axis.
    pub y_max: f64,
}

impl ChartModel {
    pub fn from_series(series: &MetricsSeries, variant: ChartVariant) -> Self {
        let labels = series.search_numbers.iter().map(u64::to_string).collect();
        match variant {
            ChartVariant::Precision => Self {
                labels,
                series: vec![
                    ChartSeries {
                        name: "precision@5",
                        values: series.precision_at_5.clone(),
                    },
                    ChartSeries {
                        name: "precision@10",
                        values: series.precision_at_10.clone(),
                    },
                ],
                y_max: 1.0,
            },
            ChartVariant::Likes => {
                let peak = series.likes.iter().copied().fold(0.0, f64::max);
                Self {
                    labels,
                    series: vec![ChartSeries {
                        name: "likes",
                        values: series.likes.clone(),
                    }],
                    y_max: peak.max(1.0).ceil(),
                }
            }
        }
    }

    fn points(&self) -> Vec<Vec<(f64, f64)>> {
        self.series
            .iter()
            .map(|s| {
                s.values
                    .iter()
                    .take(self.labels.len())
                    .enumerate()
                    .map(|(i, v)| (i as f64, *v))
                    .collect()
            })
            .collect()
    }
}

// ── Component ─────────────────────────────────────────────────────────────────

pub struct Dashboard;

impl Component for Dashboard {
    fn id(&self) -> ComponentId {
        ComponentId::Dashboard
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        match key.code {
            KeyCode::Char('r') => vec![Action::RefreshMetrics],
            KeyCode::Char('v') => vec![Action::ToggleChart],
            _ => vec![],
        }
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(9)])
            .split(area);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
            ])
            .split(rows[1]);

        let metrics = &state.metrics;
        let badge = metrics.is_stale().then_some(Badge {
            text: "STALE",
            color: C_BADGE_STALE,
        });
        let title = match state.chart {
            ChartVariant::Precision => "precision over searches",
            ChartVariant::Likes => "likes over searches",
        };
        let block = pane_chrome(title, focused, badge);
        let inner = block.inner(rows[0]);
        frame.render_widget(block, rows[0]);

        match metrics.snapshot() {
            Some(snapshot) => {
                let model = ChartModel::from_series(&snapshot.metrics_over_time, state.chart);
                draw_chart(frame, inner, &model, state.chart);
            }
            None => {
                let text = if metrics.error().is_some() {
                    Span::styled("  Failed to load metrics", style_error())
                } else {
                    Span::styled("  loading metrics…", style_muted())
                };
                frame.render_widget(Paragraph::new(text), inner);
            }
        }

        draw_summary(frame, bottom[0], state);
        draw_stats(frame, bottom[1], "genres", &state.genre_stats);
        draw_stats(frame, bottom[2], "artists", &state.artist_stats);
    }
}

fn draw_chart(frame: &mut Frame, area: Rect, model: &ChartModel, variant: ChartVariant) {
    if model.labels.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled("  no searches recorded yet", style_muted())),
            area,
        );
        return;
    }

    let points = model.points();
    let colors = [C_SERIES_A, C_SERIES_B];
    let datasets: Vec<Dataset> = model
        .series
        .iter()
        .zip(points.iter())
        .zip(colors.iter().cycle())
        .map(|((series, data), color)| {
            let (marker, graph) = match variant {
                ChartVariant::Precision => (Marker::Braille, GraphType::Line),
                ChartVariant::Likes => (Marker::HalfBlock, GraphType::Bar),
            };
            Dataset::default()
                .name(series.name)
                .marker(marker)
                .graph_type(graph)
                .style(Style::default().fg(*color))
                .data(data)
        })
        .collect();

    let x_max = (model.labels.len().saturating_sub(1)).max(1) as f64;
    let first = model.labels.first().cloned().unwrap_or_default();
    let last = model.labels.last().cloned().unwrap_or_default();
    let x_axis = Axis::default()
        .style(style_muted())
        .bounds([0.0, x_max])
        .labels(vec![first, last]);

    let y_labels: Vec<String> = match variant {
        ChartVariant::Precision => vec!["0%".into(), "50%".into(), "100%".into()],
        ChartVariant::Likes => vec!["0".into(), format!("{}", model.y_max)],
    };
    let y_axis = Axis::default()
        .style(style_muted())
        .bounds([0.0, model.y_max])
        .labels(y_labels);

    frame.render_widget(Chart::new(datasets).x_axis(x_axis).y_axis(y_axis), area);
}

fn draw_summary(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = pane_chrome("summary", false, None);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(snapshot) = state.metrics.snapshot() else {
        return;
    };
    let mut lines = summary_lines(snapshot);
    if let Some(at) = state.metrics.updated_at() {
        lines.push(Line::from(Span::styled(
            format!(" Last updated {}", at.format("%H:%M:%S")),
            style_muted(),
        )));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn summary_lines(snapshot: &MetricsSnapshot) -> Vec<Line<'static>> {
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {:<14}", label), style_secondary()),
            Span::styled(value, Style::default().fg(C_PRIMARY)),
        ])
    };
    let mut lines = vec![
        row("searches", snapshot.total_searches.to_string()),
        row("interactions", snapshot.total_interactions.to_string()),
    ];
    if let Some(song) = &snapshot.most_played_song {
        let value = if song.artist.is_empty() {
            song.song.clone()
        } else {
            format!("{} · {} ({:.1} min)", song.song, song.artist, song.duration)
        };
        lines.push(row("most played", value));
    }
    if let Some(album) = &snapshot.most_liked_album {
        let value = if album.artist.is_empty() {
            album.album.clone()
        } else {
            format!("{} · {} ({} likes)", album.album, album.artist, album.likes)
        };
        lines.push(row("top album", value));
    }
    if let Some(artist) = &snapshot.most_liked_artist {
        let value = if artist.likes == 0 {
            artist.artist.clone()
        } else {
            format!("{} ({} likes)", artist.artist, artist.likes)
        };
        lines.push(row("top artist", value));
    }
    lines
}

fn draw_stats(frame: &mut Frame, area: Rect, title: &str, section: &Section<StatCounts>) {
    let block = pane_chrome(title, false, None);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = match section {
        Section::Loading => vec![Line::from(Span::styled("  loading…", style_muted()))],
        Section::Failed(message) => vec![Line::from(Span::styled(format!("  {}", message), style_error()))],
        Section::Empty => vec![Line::from(Span::styled("  nothing yet", style_muted()))],
        Section::Ready(stats) => {
            let widest = stats
                .entries
                .iter()
                .take(inner.height as usize)
                .map(|(name, _)| name.width())
                .max()
                .unwrap_or(0)
                .min(24);
            stats
                .entries
                .iter()
                .take(inner.height as usize)
                .map(|(name, count)| {
                    Line::from(vec![
                        Span::styled(format!(" {:<w$} ", name, w = widest), Style::default().fg(C_TAG)),
                        Span::styled(
                            count.to_string(),
                            Style::default().fg(C_SECONDARY).add_modifier(Modifier::BOLD),
                        ),
                    ])
                })
                .collect()
        }
    };
    frame.render_widget(Paragraph::new(lines), inner);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_model_follows_series() {
        let series = MetricsSeries {
            search_numbers: vec![1, 2],
            precision_at_5: vec![0.2, 0.4],
            ..MetricsSeries::default()
        };
        let model = ChartModel::from_series(&series, ChartVariant::Precision);
        assert_eq!(model.labels.len(), 2);
        assert_eq!(model.series[0].values, vec![0.2, 0.4]);
        assert_eq!(model.series[0].name, "precision@5");
        assert!(model.series[1].values.is_empty());
    }

    #[test]
    fn test_likes_model_scales_axis() {
        let series = MetricsSeries {
            search_numbers: vec![1, 2, 3],
            likes: vec![0.0, 3.0, 1.0],
            ..MetricsSeries::default()
        };
        let model = ChartModel::from_series(&series, ChartVariant::Likes);
        assert_eq!(model.labels, vec!["1", "2", "3"]);
        assert_eq!(model.series.len(), 1);
        assert_eq!(model.y_max, 3.0);
    }

    #[test]
    fn test_points_are_cut_to_label_count() {
        let series = MetricsSeries {
            search_numbers: vec![7],
            precision_at_5: vec![0.5, 0.9],
            precision_at_10: vec![0.3],
            likes: vec![],
        };
        let points = ChartModel::from_series(&series, ChartVariant::Precision).points();
        assert_eq!(points[0], vec![(0.0, 0.5)]);
        assert_eq!(points[1], vec![(0.0, 0.3)]);
    }
}
