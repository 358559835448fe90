//! Now-playing state machine.
//!
//! Fed with every `/currently-playing` poll; emits a [`PlayReport`] whenever a
//! stretch of listening ends (pause, track switch, stop, or client exit).

use std::time::Instant;

use crate::protocol::PlaybackState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing { track_id: String, started_at: Instant },
    Paused { track_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportReason {
    Paused,
    Switched,
    Stopped,
    Exit,
}

/// Listening time for one track, sent to `/track-play/:id`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayReport {
    pub track_id: String,
    pub duration_secs: f64,
    pub reason: ReportReason,
}

#[derive(Debug)]
pub struct NowPlaying {
    phase: Phase,
}

impl Default for NowPlaying {
    fn default() -> Self {
        Self::new()
    }
}

impl NowPlaying {
    pub fn new() -> Self {
        Self { phase: Phase::Idle }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current_track(&self) -> Option<&str> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Playing { track_id, .. } | Phase::Paused { track_id } => Some(track_id),
        }
    }

    /// Apply one poll result. `None` means the server reported nothing playing.
    pub fn observe(&mut self, state: Option<&PlaybackState>, now: Instant) -> Option<PlayReport> {
        let active = state.and_then(|s| s.active_track().map(|id| (id, s.is_playing)));

        let Some((track_id, is_playing)) = active else {
            let report = self.end_stretch(ReportReason::Stopped, now);
            self.phase = Phase::Idle;
            return report;
        };

        if self.current_track() != Some(track_id) {
            let report = match &self.phase {
                Phase::Idle => None,
                Phase::Playing { .. } => self.end_stretch(ReportReason::Switched, now),
                // Nothing was heard since the pause; the switch is still reported.
                Phase::Paused { track_id } => Some(PlayReport {
                    track_id: track_id.clone(),
                    duration_secs: 0.0,
                    reason: ReportReason::Switched,
                }),
            };
            self.phase = Self::enter(track_id, is_playing, now);
            return report;
        }

        match (&self.phase, is_playing) {
            (Phase::Paused { .. }, true) => {
                self.phase = Self::enter(track_id, true, now);
                None
            }
            (Phase::Playing { .. }, false) => {
                let report = self.end_stretch(ReportReason::Paused, now);
                self.phase = Self::enter(track_id, false, now);
                report
            }
            _ => None,
        }
    }

    /// Close the current stretch on shutdown.
    pub fn flush(&mut self, now: Instant) -> Option<PlayReport> {
        let report = self.end_stretch(ReportReason::Exit, now);
        if let Phase::Playing { track_id, .. } = &self.phase {
            self.phase = Phase::Paused {
                track_id: track_id.clone(),
            };
        }
        report
    }

    fn enter(track_id: &str, is_playing: bool, now: Instant) -> Phase {
        let track_id = track_id.to_string();
        if is_playing {
            Phase::Playing {
                track_id,
                started_at: now,
            }
        } else {
            Phase::Paused { track_id }
        }
    }

    fn end_stretch(&self, reason: ReportReason, now: Instant) -> Option<PlayReport> {
        match &self.phase {
            Phase::Playing {
                track_id,
                started_at,
            } => Some(PlayReport {
                track_id: track_id.clone(),
                duration_secs: now.saturating_duration_since(*started_at).as_secs_f64(),
                reason,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn poll(track: &str, playing: bool) -> PlaybackState {
        PlaybackState {
            track_id: Some(track.to_string()),
            track_name: Some(format!("{} name", track)),
            artist_name: Some("Artist".to_string()),
            is_playing: playing,
            ..PlaybackState::default()
        }
    }

    #[test]
    fn test_pause_then_switch_emits_two_reports() {
        let t0 = Instant::now();
        let mut np = NowPlaying::new();
        let mut reports = Vec::new();

        let sequence = [
            (poll("A", true), 0),
            (poll("A", true), 3),
            (poll("A", false), 6),
            (poll("B", true), 9),
        ];
        for (state, secs) in &sequence {
            if let Some(r) = np.observe(Some(state), t0 + Duration::from_secs(*secs)) {
                reports.push(r);
            }
        }

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].track_id, "A");
        assert_eq!(reports[0].reason, ReportReason::Paused);
        assert!((reports[0].duration_secs - 6.0).abs() < 1e-6);
        assert_eq!(reports[1].track_id, "A");
        assert_eq!(reports[1].reason, ReportReason::Switched);
        assert_eq!(np.current_track(), Some("B"));
    }

    #[test]
    fn test_switch_while_playing_reports_elapsed() {
        let t0 = Instant::now();
        let mut np = NowPlaying::new();
        assert!(np.observe(Some(&poll("A", true)), t0).is_none());
        let report = np
            .observe(Some(&poll("B", false)), t0 + Duration::from_secs(42))
            .unwrap();
        assert_eq!(report.track_id, "A");
        assert!((report.duration_secs - 42.0).abs() < 1e-6);
        assert!(matches!(np.phase(), Phase::Paused { track_id } if track_id == "B"));
    }

    #[test]
    fn test_resume_restarts_clock() {
        let t0 = Instant::now();
        let mut np = NowPlaying::new();
        np.observe(Some(&poll("A", false)), t0);
        assert!(np.observe(Some(&poll("A", true)), t0 + Duration::from_secs(100)).is_none());
        let report = np
            .observe(Some(&poll("A", false)), t0 + Duration::from_secs(110))
            .unwrap();
        assert!((report.duration_secs - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_nothing_playing_goes_idle() {
        let t0 = Instant::now();
        let mut np = NowPlaying::new();
        np.observe(Some(&poll("A", true)), t0);
        let report = np.observe(None, t0 + Duration::from_secs(5)).unwrap();
        assert_eq!(report.reason, ReportReason::Stopped);
        assert_eq!(np.phase(), &Phase::Idle);

        let empty = PlaybackState::default();
        assert!(np.observe(Some(&empty), t0 + Duration::from_secs(6)).is_none());
    }

    #[test]
    fn test_flush_only_when_playing() {
        let t0 = Instant::now();
        let mut np = NowPlaying::new();
        assert!(np.flush(t0).is_none());
        np.observe(Some(&poll("A", true)), t0);
        let report = np.flush(t0 + Duration::from_secs(2)).unwrap();
        assert_eq!(report.reason, ReportReason::Exit);
        assert!(np.flush(t0 + Duration::from_secs(3)).is_none());
    }
}
