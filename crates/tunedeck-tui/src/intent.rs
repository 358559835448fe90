//! Pending-intent tracking for transport commands.
//!
//! A pause or volume change is sent to the server, but only a later
//! `/currently-playing` poll confirms it. Until then the UI shows the intended
//! value with a pending indicator; after [`INTENT_TIMEOUT`] without
//! confirmation it shows a warning instead.

use std::time::{Duration, Instant};

pub const INTENT_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub enum IntentState<T: Clone + PartialEq> {
    Confirmed(T),
    Pending {
        intended: T,
        confirmed: T,
        since: Instant,
    },
    TimedOut {
        intended: T,
        confirmed: T,
    },
}

impl<T: Clone + PartialEq> IntentState<T> {
    pub fn new(value: T) -> Self {
        Self::Confirmed(value)
    }

    /// What to display.
    pub fn intended(&self) -> &T {
        match self {
            Self::Confirmed(v) => v,
            Self::Pending { intended, .. } | Self::TimedOut { intended, .. } => intended,
        }
    }

    pub fn confirmed(&self) -> &T {
        match self {
            Self::Confirmed(v) => v,
            Self::Pending { confirmed, .. } | Self::TimedOut { confirmed, .. } => confirmed,
        }
    }

    pub fn set_intent(&mut self, intended: T, now: Instant) {
        let confirmed = self.confirmed().clone();
        *self = if intended == confirmed {
            Self::Confirmed(intended)
        } else {
            Self::Pending {
                intended,
                confirmed,
                since: now,
            }
        };
    }

    /// Returns true if the intent just timed out.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Self::Pending {
            intended,
            confirmed,
            since,
        } = self
        {
            if now.saturating_duration_since(*since) >= INTENT_TIMEOUT {
                *self = Self::TimedOut {
                    intended: intended.clone(),
                    confirmed: confirmed.clone(),
                };
                return true;
            }
        }
        false
    }

    /// A poll reported `value`.
    pub fn on_confirmed(&mut self, value: T) {
        match self {
            Self::Pending {
                intended,
                confirmed,
                ..
            } => {
                if value == *intended {
                    *self = Self::Confirmed(value);
                } else {
                    *confirmed = value;
                }
            }
            Self::TimedOut { .. } | Self::Confirmed(_) => *self = Self::Confirmed(value),
        }
    }

    pub fn render_state(&self, now: Instant) -> RenderHint {
        match self {
            Self::Confirmed(_) => RenderHint::Normal,
            Self::Pending { since, .. } => {
                // 400ms pulse
                if (now.saturating_duration_since(*since).as_millis() / 400) % 2 == 0 {
                    RenderHint::PendingVisible
                } else {
                    RenderHint::PendingHidden
                }
            }
            Self::TimedOut { .. } => RenderHint::TimedOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RenderHint {
    #[default]
    Normal,
    PendingVisible,
    PendingHidden,
    /// Render with warning colour and a "?" suffix.
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_until_poll_confirms() {
        let t0 = Instant::now();
        let mut paused = IntentState::new(true);
        paused.set_intent(false, t0);
        assert_eq!(*paused.intended(), false);
        assert_eq!(paused.render_state(t0), RenderHint::PendingVisible);

        // A stale poll still reports playing.
        paused.on_confirmed(true);
        assert!(matches!(paused, IntentState::Pending { .. }));

        paused.on_confirmed(false);
        assert_eq!(paused.render_state(t0), RenderHint::Normal);
    }

    #[test]
    fn test_times_out_then_accepts_server_value() {
        let t0 = Instant::now();
        let mut volume = IntentState::new(50u8);
        volume.set_intent(55, t0);
        assert!(!volume.tick(t0 + Duration::from_millis(500)));
        assert!(volume.tick(t0 + INTENT_TIMEOUT));
        assert_eq!(volume.render_state(t0), RenderHint::TimedOut);

        volume.on_confirmed(50);
        assert_eq!(*volume.intended(), 50);
    }

    #[test]
    fn test_same_value_is_immediately_confirmed() {
        let mut volume = IntentState::new(40u8);
        volume.set_intent(40, Instant::now());
        assert!(matches!(volume, IntentState::Confirmed(40)));
    }
}
