//! Log record structure

use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::sync::Arc;

// Thread-local cache for the thread id to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<Arc<str>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn current_thread_id() -> Arc<str> {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| {
                let id = format!("{:?}", std::thread::current().id());
                // "ThreadId(7)" -> "7"
                let digits = id
                    .trim_start_matches("ThreadId(")
                    .trim_end_matches(')')
                    .to_string();
                Arc::from(digits)
            })
            .clone()
    })
}

/// A single leveled message, captured the instant a logging method is called.
///
/// The message is opaque: it reaches the formatter exactly as the caller
/// passed it.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub logger_name: Arc<str>,
    pub thread_id: Arc<str>,
}

impl LogRecord {
    pub fn new(logger_name: Arc<str>, level: LogLevel, message: String) -> Self {
        Self {
            level,
            message,
            timestamp: Utc::now(),
            logger_name,
            thread_id: current_thread_id(),
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_message_verbatim() {
        let record = LogRecord::new(
            Arc::from("app"),
            LogLevel::Info,
            "line one\nline two\t".to_string(),
        );
        assert_eq!(record.message, "line one\nline two\t");
        assert_eq!(&*record.logger_name, "app");
    }

    #[test]
    fn test_thread_id_is_numeric() {
        let record = LogRecord::new(Arc::from("app"), LogLevel::Debug, String::new());
        assert!(record.thread_id.chars().all(|c| c.is_ascii_digit()));

        let other = std::thread::spawn(|| {
            LogRecord::new(Arc::from("app"), LogLevel::Debug, String::new()).thread_id
        })
        .join()
        .unwrap();
        assert_ne!(record.thread_id, other);
    }
}
