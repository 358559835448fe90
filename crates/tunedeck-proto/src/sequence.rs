use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request within a [`RequestSeq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Orders responses of one request stream so a slow, older response never
/// overwrites a newer one.
#[derive(Debug, Default)]
pub struct RequestSeq {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl RequestSeq {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Marks `ticket` applied if it is newer than anything applied so far.
    pub fn accept(&self, ticket: Ticket) -> bool {
        let mut current = self.applied.load(Ordering::Acquire);
        loop {
            if ticket.0 <= current {
                tracing::debug!("dropping superseded response #{} (applied #{})", ticket.0, current);
                return false;
            }
            match self.applied.compare_exchange_weak(
                current,
                ticket.0,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// True if no ticket newer than `ticket` has been issued.
    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.issued.load(Ordering::Relaxed) == ticket.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_response_is_dropped() {
        let seq = RequestSeq::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(first < second);
        assert!(seq.accept(second));
        assert!(!seq.accept(first));
    }

    #[test]
    fn test_in_order_responses_all_apply() {
        let seq = RequestSeq::new();
        let a = seq.issue();
        assert!(seq.accept(a));
        let b = seq.issue();
        assert!(seq.is_latest(b));
        assert!(seq.accept(b));
        assert!(!seq.accept(b));
    }
}
