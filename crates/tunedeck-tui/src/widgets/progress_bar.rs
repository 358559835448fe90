//! Smooth Unicode progress bar for the transport bar.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

/// `progress` is 0.0..=1.0; times are in seconds.
pub fn draw_progress(frame: &mut Frame, area: Rect, progress: f64, position: f64, duration: f64) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let left_label = fmt_time(position);
    let right_label = fmt_time(duration);
    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled(format!("{} ", left_label), Style::default().fg(C_SECONDARY)),
            Span::styled(bar_text(progress, bar_w), Style::default().fg(C_PLAYING)),
            Span::styled(format!(" {}", right_label), Style::default().fg(C_MUTED)),
        ])),
        area,
    );
}

/// Eighth-block fill, exactly `width` cells wide.
fn bar_text(progress: f64, width: usize) -> String {
    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full = (eighths / 8).min(width);
    let mut bar: String = std::iter::repeat('█').take(full).collect();
    if full < width {
        bar.push(BLOCKS[eighths % 8]);
        bar.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    bar
}

pub fn fmt_time(secs: f64) -> String {
    if secs.is_nan() || secs < 0.0 {
        return "0:00".to_string();
    }
    let s = secs as u64;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let s = s % 60;
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_time() {
        assert_eq!(fmt_time(0.0), "0:00");
        assert_eq!(fmt_time(83.9), "1:23");
        assert_eq!(fmt_time(3725.0), "1:02:05");
        assert_eq!(fmt_time(-4.0), "0:00");
    }

    #[test]
    fn test_bar_width_is_stable() {
        for p in [0.0, 0.33, 0.5, 0.999, 1.0, 2.0] {
            assert_eq!(bar_text(p, 20).chars().count(), 20, "progress {}", p);
        }
        assert_eq!(bar_text(0.5, 4), "██  ");
    }
}
