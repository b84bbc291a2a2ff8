//! Core logger types and traits

mod dispatch;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod registry;
pub mod sink;

pub use dispatch::DEFAULT_QUEUE_CAPACITY;
pub use error::{ErrorHandler, ErrorKind, ErrorQueue, LoggerError, Result};
pub use formatter::{
    FormattedRecord, Formatter, PatternFormatter, PatternTime, VoidFormatter, DEFAULT_PATTERN,
};
pub use log_level::LogLevel;
pub use log_record::LogRecord;
pub use logger::{Logger, LoggerBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use registry::Registry;
pub use sink::Sink;
