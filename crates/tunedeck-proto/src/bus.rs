//! In-process "metrics changed" notifications.
//!
//! Every successful tracking call publishes here; the dashboard subscribes and
//! refreshes. Publishing with no subscribers is not an error.

use tokio::sync::broadcast;

const CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsSignal {
    InteractionTracked,
    PlayTracked,
    PrecisionUpdated,
}

#[derive(Debug, Clone)]
pub struct MetricsBus {
    tx: broadcast::Sender<MetricsSignal>,
}

impl Default for MetricsBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, signal: MetricsSignal) {
        let receivers = self.tx.send(signal).unwrap_or(0);
        tracing::trace!("metrics signal {:?} -> {} subscriber(s)", signal, receivers);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricsSignal> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_signal() {
        let bus = MetricsBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(MetricsSignal::PlayTracked);
        assert_eq!(a.recv().await.unwrap(), MetricsSignal::PlayTracked);
        assert_eq!(b.recv().await.unwrap(), MetricsSignal::PlayTracked);
    }

    #[test]
    fn test_publish_without_subscribers() {
        MetricsBus::new().publish(MetricsSignal::PrecisionUpdated);
    }
}
