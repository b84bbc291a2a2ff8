//! Error types for the logger system

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Coarse classification of a [`LoggerError`], as seen by callers at the
/// public boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad level value, missing or mistyped creation parameter, malformed pattern
    InvalidArgument,
    /// A sink write, flush or rotation failed at the storage layer
    IoFailure,
    /// The named logger is not registered
    NotFound,
    /// The dispatch queue refused a record
    QueueFull,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::InvalidArgument => write!(f, "InvalidArgument"),
            ErrorKind::IoFailure => write!(f, "IOFailure"),
            ErrorKind::NotFound => write!(f, "NotFound"),
            ErrorKind::QueueFull => write!(f, "QueueFull"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Invalid argument with the offending parameter name
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument { argument: String, message: String },

    /// Pattern string could not be compiled
    #[error("Invalid pattern \"{pattern}\": {message}")]
    Format { pattern: String, message: String },

    /// IO error with context
    #[error("IO error while {operation} '{path}': {source}")]
    IoOperation {
        operation: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// File lock error
    #[error("Failed to acquire file lock on '{path}'")]
    FileLockError { path: String },

    /// A sink failed without an underlying IO error (e.g. it panicked)
    #[error("Sink '{sink}' failed: {message}")]
    SinkError { sink: String, message: String },

    /// No logger registered under the name
    #[error("Logger '{name}' not found")]
    NotFound { name: String },

    /// Queue full with buffer details
    #[error("Log queue full: {current}/{max} messages buffered")]
    QueueFull { current: usize, max: usize },

    /// JSON decoding error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl LoggerError {
    /// Create an invalid argument error
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }

    /// Create an invalid level error for a raw integer input
    pub fn invalid_level(value: i64) -> Self {
        Self::invalid_argument("level", format!("{} is outside the range 0..=6", value))
    }

    /// Create a pattern compilation error
    pub fn format(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Format {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        path: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file lock error
    pub fn file_lock(path: impl Into<String>) -> Self {
        LoggerError::FileLockError { path: path.into() }
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        LoggerError::NotFound { name: name.into() }
    }

    /// Create a queue full error with buffer details
    pub fn queue_full(current: usize, max: usize) -> Self {
        LoggerError::QueueFull { current, max }
    }

    /// Classify this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoggerError::InvalidArgument { .. }
            | LoggerError::Format { .. }
            | LoggerError::JsonError(_) => ErrorKind::InvalidArgument,
            LoggerError::IoOperation { .. }
            | LoggerError::IoError(_)
            | LoggerError::FileRotationError { .. }
            | LoggerError::FileLockError { .. }
            | LoggerError::SinkError { .. } => ErrorKind::IoFailure,
            LoggerError::NotFound { .. } => ErrorKind::NotFound,
            LoggerError::QueueFull { .. } => ErrorKind::QueueFull,
        }
    }
}

/// Callback invoked for every error raised on an async consumer thread
pub type ErrorHandler = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// Errors raised where no caller is waiting for them.
///
/// The async consumer thread has no producer to return a write failure to,
/// so failures are parked here until someone calls [`ErrorQueue::drain`].
/// Only the most recent `capacity` reports are kept.
pub struct ErrorQueue {
    pending: Mutex<VecDeque<LoggerError>>,
    capacity: usize,
    discarded: AtomicU64,
    handler: RwLock<Option<ErrorHandler>>,
}

impl ErrorQueue {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            discarded: AtomicU64::new(0),
            handler: RwLock::new(None),
        }
    }

    pub fn set_handler(&self, handler: Option<ErrorHandler>) {
        *self.handler.write() = handler;
    }

    /// Record an error, notifying the handler if one is installed
    pub fn report(&self, error: LoggerError) {
        match self.handler.read().as_ref() {
            Some(handler) => handler(&error),
            None => eprintln!("[LOGGER ERROR] {}", error),
        }

        let mut pending = self.pending.lock();
        if pending.len() == self.capacity {
            pending.pop_front();
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        pending.push_back(error);
    }

    /// Take every pending error, oldest first
    pub fn drain(&self) -> Vec<LoggerError> {
        self.pending.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Reports lost because the queue was at capacity
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }
}

impl Default for ErrorQueue {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl fmt::Debug for ErrorQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorQueue")
            .field("pending", &self.len())
            .field("capacity", &self.capacity)
            .field("discarded", &self.discarded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LoggerError::invalid_level(10).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            LoggerError::format("%Q", "unknown flag").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            LoggerError::file_rotation("/var/log/app.log", "Disk full").kind(),
            ErrorKind::IoFailure
        );
        assert_eq!(LoggerError::not_found("app").kind(), ErrorKind::NotFound);
        assert_eq!(LoggerError::queue_full(8, 8).kind(), ErrorKind::QueueFull);
    }

    #[test]
    fn test_error_display() {
        let err = LoggerError::queue_full(100, 1000);
        assert_eq!(
            err.to_string(),
            "Log queue full: 100/1000 messages buffered"
        );

        let err = LoggerError::file_rotation("/var/log/app.log", "Disk full");
        assert_eq!(
            err.to_string(),
            "File rotation failed for '/var/log/app.log': Disk full"
        );

        let err = LoggerError::invalid_level(10);
        assert_eq!(
            err.to_string(),
            "Invalid argument 'level': 10 is outside the range 0..=6"
        );
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LoggerError::io_operation("writing", "/var/log/app.log", io_err);

        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert!(err.to_string().contains("writing"));
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_queue_keeps_most_recent() {
        let queue = ErrorQueue::new(2);
        queue.set_handler(Some(Arc::new(|_: &LoggerError| {})));

        queue.report(LoggerError::not_found("a"));
        queue.report(LoggerError::not_found("b"));
        queue.report(LoggerError::not_found("c"));

        assert_eq!(queue.discarded(), 1);
        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained[0].to_string().contains("'b'"));
        assert!(drained[1].to_string().contains("'c'"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_error_queue_handler_invoked() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);

        let queue = ErrorQueue::default();
        queue.set_handler(Some(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })));
        queue.report(LoggerError::sink("console", "broken pipe"));

        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len(), 1);
    }
}
