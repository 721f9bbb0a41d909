//! Counters for queued hooks
//!
//! Tracks delivery outcomes for hook workers, including dropped payloads,
//! queue overflow events and flush round-trips.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for queued hook observability
///
/// # Example
///
/// ```
/// use rust_deferred_logger::HookMetrics;
///
/// let metrics = HookMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_delivered();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.delivered_count(), 1);
/// ```
#[derive(Debug)]
pub struct HookMetrics {
    /// Payloads the transport accepted
    delivered: AtomicU64,

    /// Payloads the transport rejected
    failed: AtomicU64,

    /// Payloads never enqueued because the queue was full or closed
    dropped: AtomicU64,

    /// Number of times the queue became full
    queue_full_events: AtomicU64,

    /// Completed flush barriers
    flushes: AtomicU64,
}

impl HookMetrics {
    pub const fn new() -> Self {
        Self {
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Returns the previous value
    #[inline]
    pub fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_failed(&self) -> u64 {
        self.failed.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_flush(&self) -> u64 {
        self.flushes.fetch_add(1, Ordering::Relaxed)
    }

    /// Share of payloads lost to drops or transport failures (0.0 - 100.0)
    pub fn loss_rate(&self) -> f64 {
        let lost = (self.dropped_count() + self.failed_count()) as f64;
        let total = self.delivered_count() as f64 + lost;
        if total == 0.0 {
            0.0
        } else {
            (lost / total) * 100.0
        }
    }
}

impl Default for HookMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for HookMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            delivered: AtomicU64::new(self.delivered_count()),
            failed: AtomicU64::new(self.failed_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            flushes: AtomicU64::new(self.flush_count()),
        }
    }
}
