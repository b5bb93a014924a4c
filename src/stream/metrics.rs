/// Stream client metrics collection
///
/// Lock-free counters updated by the driver task and read as snapshots.
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct StreamMetrics {
    /// Live frames received from the transport (before classification)
    frames_received: AtomicU64,

    /// Frames dropped by the classifier (malformed)
    frames_dropped: AtomicU64,

    /// Events produced by the synthetic generator
    synthetic_events: AtomicU64,

    /// Transport open attempts
    connect_attempts: AtomicU64,

    /// Reconnect timers scheduled
    reconnects_scheduled: AtomicU64,

    /// Subscribe frames handed to the transport
    subscribe_frames_sent: AtomicU64,

    /// Outbound frames dropped because the transport was not open
    sends_dropped: AtomicU64,
}

impl StreamMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_frames_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_frames_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_synthetic_events(&self) {
        self.synthetic_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_connect_attempts(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnects_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_subscribe_frames_sent(&self) {
        self.subscribe_frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sends_dropped(&self) {
        self.sends_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot for consumers
    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            synthetic_events: self.synthetic_events.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            subscribe_frames_sent: self.subscribe_frames_sent.load(Ordering::Relaxed),
            sends_dropped: self.sends_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot (serializable)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamMetricsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub synthetic_events: u64,
    pub connect_attempts: u64,
    pub reconnects_scheduled: u64,
    pub subscribe_frames_sent: u64,
    pub sends_dropped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot() {
        let metrics = StreamMetrics::new();
        metrics.inc_frames_received();
        metrics.inc_frames_received();
        metrics.inc_frames_dropped();
        metrics.inc_connect_attempts();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.frames_received, 2);
        assert_eq!(snapshot.frames_dropped, 1);
        assert_eq!(snapshot.connect_attempts, 1);
        assert_eq!(snapshot.synthetic_events, 0);
    }
}
