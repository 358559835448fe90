//! Dashboard metrics cache.
//!
//! Keeps the last good [`MetricsSnapshot`], coalesces bursts of refresh
//! triggers within a short freshness window, and falls back to the cached
//! snapshot (marked stale) when a fetch fails.

use chrono::{DateTime, Local};
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::protocol::MetricsSnapshot;
use crate::sequence::{RequestSeq, Ticket};
use crate::session::{SessionStore, KEY_METRICS_SNAPSHOT};

/// Why a refresh was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Interval,
    /// Dashboard became visible.
    Visible,
    /// A tracking call succeeded somewhere in the client.
    Signal,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer fetch already landed.
    Superseded,
    /// Fetch failed; the previous snapshot is kept and marked stale.
    FellBack,
    /// Fetch failed and nothing is cached.
    Unavailable,
}

#[derive(Debug)]
pub struct MetricsStore {
    snapshot: Option<MetricsSnapshot>,
    fetched_at: Option<Instant>,
    updated_at: Option<DateTime<Local>>,
    stale: bool,
    error: Option<String>,
    freshness: Duration,
    deferred: bool,
    seq: RequestSeq,
}

impl MetricsStore {
    pub fn new(freshness: Duration) -> Self {
        Self {
            snapshot: None,
            fetched_at: None,
            updated_at: None,
            stale: false,
            error: None,
            freshness,
            deferred: false,
            seq: RequestSeq::new(),
        }
    }

    /// Seed the cache from a previous run; the snapshot counts as stale.
    pub fn restore(&mut self, session: &SessionStore) {
        if let Some(snapshot) = session.get::<MetricsSnapshot>(KEY_METRICS_SNAPSHOT) {
            debug!("restored cached metrics snapshot");
            self.snapshot = Some(snapshot);
            self.stale = true;
        }
    }

    pub fn persist(&self, session: &mut SessionStore) -> anyhow::Result<()> {
        match &self.snapshot {
            Some(snapshot) => session.set(KEY_METRICS_SNAPSHOT, snapshot),
            None => Ok(()),
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        self.fetched_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.freshness)
    }

    /// Returns a ticket if a fetch should be issued now.
    pub fn request(&mut self, trigger: Trigger, now: Instant) -> Option<Ticket> {
        if trigger != Trigger::Manual && self.is_fresh(now) {
            debug!("metrics fresh, deferring {:?} refresh", trigger);
            self.deferred = true;
            return None;
        }
        self.deferred = false;
        Some(self.seq.issue())
    }

    /// Issue a deferred refresh once the freshness window has passed.
    pub fn release_deferred(&mut self, now: Instant) -> Option<Ticket> {
        if !self.deferred || self.is_fresh(now) {
            return None;
        }
        self.deferred = false;
        Some(self.seq.issue())
    }

    pub fn complete<E: Display>(
        &mut self,
        ticket: Ticket,
        result: Result<MetricsSnapshot, E>,
        now: Instant,
    ) -> Outcome {
        if !self.seq.accept(ticket) {
            return Outcome::Superseded;
        }
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.fetched_at = Some(now);
                self.updated_at = Some(Local::now());
                self.stale = false;
                self.error = None;
                Outcome::Applied
            }
            Err(e) => {
                warn!("metrics fetch failed: {}", e);
                self.error = Some(e.to_string());
                if self.snapshot.is_some() {
                    self.stale = true;
                    Outcome::FellBack
                } else {
                    Outcome::Unavailable
                }
            }
        }
    }

    pub fn snapshot(&self) -> Option<&MetricsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Local>> {
        self.updated_at
    }

    pub fn has_deferred(&self) -> bool {
        self.deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MetricsSeries;

    fn snapshot(searches: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            metrics_over_time: MetricsSeries {
                search_numbers: (1..=searches).collect(),
                ..MetricsSeries::default()
            },
            total_searches: searches,
            ..MetricsSnapshot::default()
        }
    }

    #[test]
    fn test_failure_after_success_keeps_stale_snapshot() {
        let t0 = Instant::now();
        let mut store = MetricsStore::new(Duration::from_secs(2));

        let first = store.request(Trigger::Interval, t0).unwrap();
        assert_eq!(
            store.complete::<String>(first, Ok(snapshot(3)), t0),
            Outcome::Applied
        );

        let later = t0 + Duration::from_secs(10);
        let second = store.request(Trigger::Interval, later).unwrap();
        let outcome = store.complete(second, Err("connection refused"), later);

        assert_eq!(outcome, Outcome::FellBack);
        assert!(store.is_stale());
        assert_eq!(store.snapshot().map(|s| s.total_searches), Some(3));
        assert_eq!(store.error(), Some("connection refused"));
    }

    #[test]
    fn test_failure_without_cache_is_unavailable() {
        let t0 = Instant::now();
        let mut store = MetricsStore::new(Duration::from_secs(2));
        let ticket = store.request(Trigger::Visible, t0).unwrap();
        assert_eq!(store.complete(ticket, Err("boom"), t0), Outcome::Unavailable);
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_burst_is_coalesced_until_window_passes() {
        let t0 = Instant::now();
        let mut store = MetricsStore::new(Duration::from_secs(2));
        let ticket = store.request(Trigger::Interval, t0).unwrap();
        store.complete::<String>(ticket, Ok(snapshot(1)), t0);

        let soon = t0 + Duration::from_millis(500);
        assert!(store.request(Trigger::Signal, soon).is_none());
        assert!(store.request(Trigger::Visible, soon).is_none());
        assert!(store.has_deferred());
        assert!(store.release_deferred(soon).is_none());

        let after = t0 + Duration::from_millis(2500);
        assert!(store.release_deferred(after).is_some());
        assert!(!store.has_deferred());
        assert!(store.release_deferred(after).is_none());
    }

    #[test]
    fn test_manual_bypasses_freshness() {
        let t0 = Instant::now();
        let mut store = MetricsStore::new(Duration::from_secs(5));
        let ticket = store.request(Trigger::Interval, t0).unwrap();
        store.complete::<String>(ticket, Ok(snapshot(1)), t0);
        assert!(store.request(Trigger::Manual, t0).is_some());
    }

    #[test]
    fn test_slow_response_is_superseded() {
        let t0 = Instant::now();
        let mut store = MetricsStore::new(Duration::from_secs(2));
        let slow = store.request(Trigger::Manual, t0).unwrap();
        let fast = store.request(Trigger::Manual, t0).unwrap();
        store.complete::<String>(fast, Ok(snapshot(5)), t0);
        assert_eq!(
            store.complete::<String>(slow, Ok(snapshot(4)), t0),
            Outcome::Superseded
        );
        assert_eq!(store.snapshot().map(|s| s.total_searches), Some(5));
    }

    #[test]
    fn test_restored_snapshot_is_stale() {
        let mut session = SessionStore::in_memory();
        let mut store = MetricsStore::new(Duration::from_secs(2));
        let ticket = store.request(Trigger::Manual, Instant::now()).unwrap();
        store.complete::<String>(ticket, Ok(snapshot(2)), Instant::now());
        store.persist(&mut session).unwrap();

        let mut fresh = MetricsStore::new(Duration::from_secs(2));
        fresh.restore(&session);
        assert!(fresh.is_stale());
        assert_eq!(fresh.snapshot().map(|s| s.total_searches), Some(2));
        assert!(!fresh.is_fresh(Instant::now()));
    }
}
