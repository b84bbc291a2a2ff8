//! Main logger implementation

use super::{
    dispatch::{Dispatcher, QueuedRecord, DEFAULT_QUEUE_CAPACITY},
    error::{ErrorHandler, ErrorQueue, LoggerError, Result},
    formatter::{Formatter, PatternFormatter, VoidFormatter},
    log_level::LogLevel,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    registry::{RegistryShared, SharedSettings},
    sink::{Sink, SinkSet},
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Default shutdown timeout for draining an async logger (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

struct LoggerInner {
    name: Arc<str>,
    level: AtomicU8,
    formatter: RwLock<Arc<dyn Formatter>>,
    sinks: Arc<SinkSet>,
    /// `None` for synchronous delivery
    dispatcher: Option<Dispatcher>,
    errors: Arc<ErrorQueue>,
    metrics: Arc<LoggerMetrics>,
    registry: Weak<RegistryShared>,
    closed: AtomicBool,
    /// Held while a drop is draining and releasing the sinks
    teardown: Mutex<()>,
    handles: AtomicUsize,
}

/// A named logger.
///
/// Cloning is cheap and yields another reference to the same logger; the
/// registry keeps one of these references for as long as the name is
/// registered. All methods take `&self` and are safe to call from any number
/// of threads.
///
/// Once [`Logger::drop_logger`] has been called the logger is closed: every
/// further call is a no-op that succeeds.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.inner.level.load(Ordering::Acquire))
    }

    pub fn set_level(&self, level: LogLevel) {
        if self.is_closed() {
            return;
        }
        self.inner.level.store(level as u8, Ordering::Release);
    }

    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn is_async(&self) -> bool {
        self.inner.dispatcher.is_some()
    }

    pub fn sink_count(&self) -> usize {
        self.inner.sinks.len()
    }

    /// Log `message` at `level`.
    ///
    /// Filtered records and closed loggers succeed without doing anything.
    /// A synchronous logger returns the first sink failure; an async logger
    /// only fails when its queue rejects the record (see
    /// [`OverflowPolicy::Reject`]), sink failures are reported through
    /// [`Logger::take_errors`].
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        if !self.should_log(level) || self.is_closed() {
            return Ok(());
        }

        let record = LogRecord::new(Arc::clone(&self.inner.name), level, message.into());
        let formatter = Arc::clone(&*self.inner.formatter.read());
        let formatted = formatter.format(&record);

        match self.inner.dispatcher {
            Some(ref dispatcher) => dispatcher.enqueue(QueuedRecord { record, formatted }),
            None => self.inner.sinks.write(&record, &formatted),
        }
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Trace, message)
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message)
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message)
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warn, message)
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message)
    }

    #[inline]
    pub fn critical(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Critical, message)
    }

    /// Flush every sink. For an async logger this first waits until all
    /// records queued before the call have been written.
    pub fn flush(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        match self.inner.dispatcher {
            Some(ref dispatcher) => dispatcher.flush(),
            None => self.inner.sinks.flush(),
        }
    }

    /// Replace the formatter with one compiled from `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Format`] and keeps the current formatter when
    /// the pattern does not compile.
    pub fn set_pattern(&self, pattern: &str) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        let formatter = PatternFormatter::new(pattern)?;
        self.set_formatter(Arc::new(formatter));
        Ok(())
    }

    pub fn set_formatter(&self, formatter: Arc<dyn Formatter>) {
        if self.is_closed() {
            return;
        }
        *self.inner.formatter.write() = formatter;
    }

    /// Install the void formatter: sinks keep receiving one write per
    /// record, but with empty text.
    pub fn clear_formatter(&self) {
        self.set_formatter(Arc::new(VoidFormatter));
    }

    /// Close this logger and remove it from its registry.
    ///
    /// An async logger drains its queue before its consumer thread exits.
    /// Sinks are flushed and released, and only then is the registry entry
    /// removed, so a logger re-created under the same name never races the
    /// old one for its files. Concurrent callers block until the first drop
    /// has finished. Failures are printed, never returned.
    pub fn drop_logger(&self) {
        {
            let _teardown = self.inner.teardown.lock();
            if self.inner.closed.swap(true, Ordering::AcqRel) {
                return;
            }

            if let Some(ref dispatcher) = self.inner.dispatcher {
                dispatcher.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
            }
            if let Err(e) = self.inner.sinks.flush() {
                eprintln!("[LOGGER ERROR] Failed to flush '{}' while dropping: {}", self.name(), e);
            }
            self.inner.sinks.clear();
        }

        self.detach();
    }

    /// Block until a drop in progress on another thread has released the sinks
    pub(crate) fn wait_closed(&self) {
        drop(self.inner.teardown.lock());
    }

    /// Remove the registry entry if it still refers to this logger
    pub(crate) fn detach(&self) {
        if let Some(registry) = self.inner.registry.upgrade() {
            registry.remove_if_same(self);
        }
    }

    pub fn ptr_eq(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drain errors raised on the async consumer thread, oldest first
    pub fn take_errors(&self) -> Vec<LoggerError> {
        self.inner.errors.drain()
    }

    pub fn set_error_handler(&self, handler: Option<ErrorHandler>) {
        self.inner.errors.set_handler(handler);
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    /// Records waiting in the async queue (always 0 for sync loggers)
    pub fn pending(&self) -> usize {
        self.inner.dispatcher.as_ref().map_or(0, Dispatcher::pending)
    }

    /// Capacity of the async queue, `None` for sync loggers
    pub fn queue_capacity(&self) -> Option<usize> {
        self.inner.dispatcher.as_ref().map(Dispatcher::capacity)
    }

    pub(crate) fn acquire_handle(&self) {
        self.inner.handles.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns `true` when the last handle was released
    pub(crate) fn release_handle(&self) -> bool {
        self.inner.handles.fetch_sub(1, Ordering::AcqRel) == 1
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("async", &self.is_async())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        if let Some(ref dispatcher) = self.dispatcher {
            dispatcher.shutdown(DEFAULT_SHUTDOWN_TIMEOUT);
        }

        if let Err(e) = self.sinks.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush '{}' during shutdown: {}", self.name, e);
        }

        let stats = self.metrics.snapshot();
        if stats.dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down with {} dropped logs (drop rate: {:.2}%)",
                self.name,
                stats.dropped,
                stats.drop_rate()
            );
        }
    }
}

/// Builder for constructing a [`Logger`] with a fluent API
///
/// # Example
/// ```
/// use named_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Debug)
///     .sink(ConsoleSink::new())
///     .pattern("[%l] %v")
///     .async_mode(1024)
///     .overflow_policy(OverflowPolicy::DropNewest)
///     .on_overflow(Arc::new(|count| {
///         eprintln!("ALERT: {} logs dropped", count);
///     }))
///     .build("worker")
///     .unwrap();
/// assert!(logger.is_async());
/// ```
pub struct LoggerBuilder {
    level: Option<LogLevel>,
    sinks: Vec<Box<dyn Sink>>,
    pattern: Option<String>,
    formatter: Option<Arc<dyn Formatter>>,
    async_capacity: Option<usize>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    error_handler: Option<ErrorHandler>,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: None,
            sinks: Vec::new(),
            pattern: None,
            formatter: None,
            async_capacity: None,
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
            error_handler: None,
        }
    }

    /// Threshold for the new logger; defaults to the registry's global level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, sink: Box<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Pattern compiled at build time; overrides [`LoggerBuilder::formatter`]
    #[must_use = "builder methods return a new value"]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Deliver through a bounded queue of `capacity` records
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, capacity: usize) -> Self {
        self.async_capacity = Some(capacity);
        self
    }

    /// Deliver through a queue of [`DEFAULT_QUEUE_CAPACITY`] records
    #[must_use = "builder methods return a new value"]
    pub fn async_default(self) -> Self {
        self.async_mode(DEFAULT_QUEUE_CAPACITY)
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Build a logger that is not registered anywhere.
    ///
    /// It gets its own settings: level `info` unless set, no auto flush.
    pub fn build(self, name: &str) -> Result<Logger> {
        self.build_with(name, Arc::new(SharedSettings::default()), Weak::new())
    }

    pub(crate) fn build_in(self, name: &str, registry: &Arc<RegistryShared>) -> Result<Logger> {
        self.build_with(name, registry.settings(), Arc::downgrade(registry))
    }

    fn build_with(
        self,
        name: &str,
        settings: Arc<SharedSettings>,
        registry: Weak<RegistryShared>,
    ) -> Result<Logger> {
        let formatter: Arc<dyn Formatter> = match (self.pattern, self.formatter) {
            (Some(pattern), _) => Arc::new(PatternFormatter::new(&pattern)?),
            (None, Some(formatter)) => formatter,
            (None, None) => Arc::new(PatternFormatter::default()),
        };

        let level = self.level.unwrap_or_else(|| settings.level());
        let metrics = Arc::new(LoggerMetrics::new());
        let errors = Arc::new(ErrorQueue::default());
        errors.set_handler(self.error_handler);
        let sinks = Arc::new(SinkSet::new(self.sinks, settings, Arc::clone(&metrics)));

        let dispatcher = match self.async_capacity {
            Some(capacity) => Some(Dispatcher::spawn(
                name,
                capacity,
                self.overflow_policy,
                self.on_overflow,
                Arc::clone(&sinks),
                Arc::clone(&errors),
                Arc::clone(&metrics),
            )?),
            None => None,
        };

        Ok(Logger {
            inner: Arc::new(LoggerInner {
                name: Arc::from(name),
                level: AtomicU8::new(level as u8),
                formatter: RwLock::new(formatter),
                sinks,
                dispatcher,
                errors,
                metrics,
                registry,
                closed: AtomicBool::new(false),
                teardown: Mutex::new(()),
                handles: AtomicUsize::new(0),
            }),
        })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
