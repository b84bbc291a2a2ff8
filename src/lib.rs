//! # Named Logger
//!
//! A process-wide structured logging core: named loggers that route leveled
//! messages through console and rotating-file sinks, with per-logger level
//! filtering, pattern formatting and flush policy, delivered either on the
//! calling thread or through a bounded queue drained by a consumer thread.
//!
//! ## Features
//!
//! - **Registry**: at most one live logger per name, created atomically
//! - **Rotating files**: fixed-size sliding window of `max_files` files
//! - **Async delivery**: FIFO per logger, configurable overflow policy
//! - **Thread safe**: every operation takes `&self`
//!
//! ```
//! use named_logger::prelude::*;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let registry = Registry::new();
//! let logger = registry
//!     .rotating("app", dir.path().join("app.log"), 1024 * 1024, 3)
//!     .unwrap();
//!
//! logger.set_pattern("[%l] %v").unwrap();
//! logger.warn("disk almost full").unwrap();
//! logger.flush().unwrap();
//! ```

pub mod core;
pub mod handle;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        ErrorHandler, ErrorKind, FormattedRecord, Formatter, LogLevel, LogRecord, Logger,
        LoggerBuilder, LoggerError, LoggerMetrics, MetricsSnapshot, OverflowCallback,
        OverflowPolicy, PatternFormatter, PatternTime, Registry, Result, Sink, VoidFormatter,
        DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::handle::{LoggerHandle, LoggerKind, LoggerSpec};
    pub use crate::sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink};
}

pub use crate::core::{
    ErrorHandler, ErrorKind, ErrorQueue, FormattedRecord, Formatter, LogLevel, LogRecord, Logger,
    LoggerBuilder, LoggerError, LoggerMetrics, MetricsSnapshot, OverflowCallback, OverflowPolicy,
    PatternFormatter, PatternTime, Registry, Result, Sink, VoidFormatter, DEFAULT_PATTERN,
    DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use handle::{LoggerHandle, LoggerKind, LoggerSpec};
pub use sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink};
