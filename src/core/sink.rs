//! Sink trait for log output destinations

use super::{
    error::{LoggerError, Result},
    formatter::FormattedRecord,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    registry::SharedSettings,
};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// A destination for formatted records.
///
/// A logger serializes all calls on its sinks, so implementations never
/// see two writes at once.
pub trait Sink: Send {
    fn write(&mut self, record: &LogRecord, formatted: &FormattedRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

/// The ordered sinks of one logger, behind the lock that serializes writes,
/// rotation and flushes.
///
/// **Per-sink panic isolation**: each sink call is wrapped in `catch_unwind`
/// so one misbehaving sink cannot starve the others or kill the async
/// consumer thread.
pub(crate) struct SinkSet {
    sinks: Mutex<Vec<Box<dyn Sink>>>,
    settings: Arc<SharedSettings>,
    metrics: Arc<LoggerMetrics>,
}

impl SinkSet {
    pub(crate) fn new(
        sinks: Vec<Box<dyn Sink>>,
        settings: Arc<SharedSettings>,
        metrics: Arc<LoggerMetrics>,
    ) -> Self {
        Self {
            sinks: Mutex::new(sinks),
            settings,
            metrics,
        }
    }

    /// Write one record to every sink, then flush if the record reaches the
    /// process-wide flush threshold. Returns the first failure.
    pub(crate) fn write(&self, record: &LogRecord, formatted: &FormattedRecord) -> Result<()> {
        let mut sinks = self.sinks.lock();
        let mut first_error = None;

        for sink in sinks.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| sink.write(record, formatted)))
                .unwrap_or_else(|panic| Err(LoggerError::sink(sink.name(), panic_message(panic))));
            if let Err(e) = outcome {
                Self::keep_first(&mut first_error, e);
            }
        }

        if record.level >= self.settings.flush_level() {
            if let Err(e) = Self::flush_all(&mut sinks) {
                Self::keep_first(&mut first_error, e);
            }
        }

        match first_error {
            Some(e) => {
                self.metrics.record_write_failure();
                Err(e)
            }
            None => {
                self.metrics.record_logged();
                Ok(())
            }
        }
    }

    pub(crate) fn flush(&self) -> Result<()> {
        let mut sinks = self.sinks.lock();
        Self::flush_all(&mut sinks)
    }

    /// Release every sink (and the files they hold)
    pub(crate) fn clear(&self) {
        let drained: Vec<Box<dyn Sink>> = self.sinks.lock().drain(..).collect();
        drop(drained);
    }

    pub(crate) fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    fn flush_all(sinks: &mut [Box<dyn Sink>]) -> Result<()> {
        let mut first_error = None;
        for sink in sinks.iter_mut() {
            let outcome = catch_unwind(AssertUnwindSafe(|| sink.flush()))
                .unwrap_or_else(|panic| Err(LoggerError::sink(sink.name(), panic_message(panic))));
            if let Err(e) = outcome {
                Self::keep_first(&mut first_error, e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn keep_first(first: &mut Option<LoggerError>, error: LoggerError) {
        if first.is_none() {
            *first = Some(error);
        } else {
            eprintln!("[LOGGER ERROR] Additional sink failure: {}", error);
        }
    }
}
