use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use marinecodec::error::DecodeErrorKind;
use tracing::info;

/// Per-device counters for bus and dispatch statistics. All counters are
/// relaxed atomics: each has a single writer (the device task) and a single
/// reader (the metrics logger).
#[derive(Default)]
pub struct DeviceMetrics {
    /// Messages decoded from the transport.
    pub decoded: AtomicU64,
    /// Messages written out to the transport.
    pub emitted: AtomicU64,
    /// Sentences rejected for a wrong checksum.
    pub checksum_mismatch: AtomicU64,
    /// Byte streams that did not frame as a sentence or datagram.
    pub framing_errors: AtomicU64,
    /// Seatalk command bytes without a known datagram.
    pub unknown_datagrams: AtomicU64,
    /// Well-framed input with out-of-domain values.
    pub validation_errors: AtomicU64,
    /// Messages with no representation in the device's codec family.
    pub untranslatable: AtomicU64,
    /// Transport reconnection attempts.
    pub reconnects: AtomicU64,
}

impl DeviceMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count_decode_error(&self, kind: DecodeErrorKind) {
        let counter = match kind {
            DecodeErrorKind::ChecksumMismatch => &self.checksum_mismatch,
            DecodeErrorKind::Framing => &self.framing_errors,
            DecodeErrorKind::UnknownDatagramId => &self.unknown_datagrams,
            DecodeErrorKind::Validation => &self.validation_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// One row in the periodic metrics report.
pub struct MetricsEntry {
    pub name: String,
    pub metrics: Arc<DeviceMetrics>,
    pub queue: Arc<crate::dispatch::TimedQueue>,
}

/// Periodically logs every device's counters, queue drops included.
pub struct MetricsLogger {
    interval: Duration,
}

impl MetricsLogger {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub async fn run(self, entries: Vec<MetricsEntry>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            for entry in &entries {
                let m = &entry.metrics;
                info!(
                    "[{}] decoded: {}, emitted: {}, checksum: {}, framing: {}, unknown: {}, validation: {}, untranslatable: {}, overflow: {}, expired: {}, reconnects: {}, queued: {}",
                    entry.name,
                    m.decoded.load(Ordering::Relaxed),
                    m.emitted.load(Ordering::Relaxed),
                    m.checksum_mismatch.load(Ordering::Relaxed),
                    m.framing_errors.load(Ordering::Relaxed),
                    m.unknown_datagrams.load(Ordering::Relaxed),
                    m.validation_errors.load(Ordering::Relaxed),
                    m.untranslatable.load(Ordering::Relaxed),
                    entry.queue.overflow_dropped(),
                    entry.queue.expired_dropped(),
                    m.reconnects.load(Ordering::Relaxed),
                    entry.queue.len(),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let metrics = DeviceMetrics::new();
        assert_eq!(metrics.decoded.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.checksum_mismatch.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_decode_error_buckets() {
        let metrics = DeviceMetrics::new();
        metrics.count_decode_error(DecodeErrorKind::ChecksumMismatch);
        metrics.count_decode_error(DecodeErrorKind::ChecksumMismatch);
        metrics.count_decode_error(DecodeErrorKind::Validation);
        assert_eq!(metrics.checksum_mismatch.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.validation_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.framing_errors.load(Ordering::Relaxed), 0);
    }
}
