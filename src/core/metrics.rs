//! Per-logger delivery counters
//!
//! Every counter only ever grows. Read them one at a time through the
//! accessors or all at once with [`LoggerMetrics::snapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy)]
enum Counter {
    Logged,
    Dropped,
    WriteFailures,
    QueueFull,
    Blocked,
}

const COUNTERS: usize = 5;

/// Delivery statistics of one logger.
///
/// ```
/// use named_logger::Logger;
///
/// let logger = Logger::builder().build("metrics").unwrap();
/// logger.info("counted").unwrap();
///
/// let stats = logger.metrics().snapshot();
/// assert_eq!(stats.logged, 1);
/// assert_eq!(stats.drop_rate(), 0.0);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    counters: [AtomicU64; COUNTERS],
}

/// Point-in-time copy of a logger's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Records written to every sink without error
    pub logged: u64,
    /// Records discarded or rejected because the queue was full
    pub dropped: u64,
    /// Records for which at least one sink failed
    pub write_failures: u64,
    /// Times a producer found the queue full
    pub queue_full_events: u64,
    /// Times a producer waited for queue space
    pub block_events: u64,
}

impl MetricsSnapshot {
    /// Share of records lost to overflow, in percent
    pub fn drop_rate(&self) -> f64 {
        let attempted = self.logged + self.dropped;
        if attempted == 0 {
            0.0
        } else {
            self.dropped as f64 * 100.0 / attempted as f64
        }
    }
}

impl LoggerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn get(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    /// Increment `counter`, returning its previous value
    #[inline]
    fn bump(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].fetch_add(1, Ordering::Relaxed)
    }

    pub fn total_logged(&self) -> u64 {
        self.get(Counter::Logged)
    }

    pub fn dropped_count(&self) -> u64 {
        self.get(Counter::Dropped)
    }

    pub fn write_failures(&self) -> u64 {
        self.get(Counter::WriteFailures)
    }

    pub fn queue_full_events(&self) -> u64 {
        self.get(Counter::QueueFull)
    }

    pub fn block_events(&self) -> u64 {
        self.get(Counter::Blocked)
    }

    pub(crate) fn record_logged(&self) -> u64 {
        self.bump(Counter::Logged)
    }

    pub(crate) fn record_dropped(&self) -> u64 {
        self.bump(Counter::Dropped)
    }

    pub(crate) fn record_write_failure(&self) -> u64 {
        self.bump(Counter::WriteFailures)
    }

    pub(crate) fn record_queue_full(&self) -> u64 {
        self.bump(Counter::QueueFull)
    }

    pub(crate) fn record_block(&self) -> u64 {
        self.bump(Counter::Blocked)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            logged: self.total_logged(),
            dropped: self.dropped_count(),
            write_failures: self.write_failures(),
            queue_full_events: self.queue_full_events(),
            block_events: self.block_events(),
        }
    }

    pub fn drop_rate(&self) -> f64 {
        self.snapshot().drop_rate()
    }
}
