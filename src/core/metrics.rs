//! Counters for logger and bus observability
//!
//! Tracks dropped entries, published and delivered records, and deliveries
//! that found their subscriber already gone.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the logging facade
///
/// # Example
///
/// ```
/// use fanout_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_logged();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.total_logged(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Entries that could not be handed to the pipeline
    dropped_count: AtomicU64,

    /// Entries encoded and written into the pipeline
    ///
    /// Counts acceptance, not delivery: an entry accepted just before a sink
    /// failure cancelled the pipeline may never reach the sinks. Once the
    /// cancellation is seen, further entries count as dropped.
    total_logged: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_logged: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    /// Record a dropped entry, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if nothing has been logged.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Metrics for the event bus
#[derive(Debug)]
pub struct BusMetrics {
    /// Publish calls that had at least one subscriber
    published: AtomicU64,

    /// Records placed on a subscriber queue
    delivered: AtomicU64,

    /// Records addressed to a subscription that had already closed
    undeliverable: AtomicU64,

    /// Records discarded by the delivery policy
    dropped: AtomicU64,
}

impl BusMetrics {
    pub const fn new() -> Self {
        Self {
            published: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            undeliverable: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn undeliverable(&self) -> u64 {
        self.undeliverable.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_published(&self) -> u64 {
        self.published.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_delivered(&self) -> u64 {
        self.delivered.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_undeliverable(&self) -> u64 {
        self.undeliverable.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for BusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for BusMetrics {
    /// Create a snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            published: AtomicU64::new(self.published()),
            delivered: AtomicU64::new(self.delivered()),
            undeliverable: AtomicU64::new(self.undeliverable()),
            dropped: AtomicU64::new(self.dropped()),
        }
    }
}
