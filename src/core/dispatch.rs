//! Dispatch queue for asynchronous delivery
//!
//! Producers push formatted records onto a bounded channel; a single
//! consumer thread per logger drains it in FIFO order into the logger's
//! sinks. Flush requests travel through the same channel, so a flush is
//! acknowledged only after every record queued ahead of it was written.

use super::{
    error::{ErrorQueue, LoggerError, Result},
    formatter::FormattedRecord,
    log_record::LogRecord,
    metrics::LoggerMetrics,
    overflow_policy::{OverflowCallback, OverflowPolicy},
    sink::SinkSet,
};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Queue capacity used when none is configured
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

pub(crate) struct QueuedRecord {
    pub(crate) record: LogRecord,
    pub(crate) formatted: FormattedRecord,
}

enum Message {
    Record(Box<QueuedRecord>),
    Flush(Sender<Result<()>>),
}

pub(crate) struct Dispatcher {
    /// `None` once shut down; producers hold the read side while sending
    sender: RwLock<Option<Sender<Message>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    capacity: usize,
    policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    metrics: Arc<LoggerMetrics>,
}

impl Dispatcher {
    pub(crate) fn spawn(
        logger_name: &str,
        capacity: usize,
        policy: OverflowPolicy,
        on_overflow: Option<OverflowCallback>,
        sinks: Arc<SinkSet>,
        errors: Arc<ErrorQueue>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::invalid_argument(
                "queue_capacity",
                "async queue capacity must be greater than zero",
            ));
        }

        let (sender, receiver) = bounded(capacity);
        let handle = thread::Builder::new()
            .name(format!("logger-{}", logger_name))
            .spawn(move || Self::run(receiver, sinks, errors))
            .map_err(|e| LoggerError::io_operation("spawning consumer thread for", logger_name, e))?;

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            worker: Mutex::new(Some(handle)),
            capacity,
            policy,
            on_overflow,
            metrics,
        })
    }

    /// Consumer loop: runs until every sender is gone, so records queued
    /// before shutdown are still written.
    fn run(receiver: Receiver<Message>, sinks: Arc<SinkSet>, errors: Arc<ErrorQueue>) {
        for message in receiver.iter() {
            match message {
                Message::Record(queued) => {
                    if let Err(e) = sinks.write(&queued.record, &queued.formatted) {
                        errors.report(e);
                    }
                }
                Message::Flush(ack) => {
                    let _ = ack.send(sinks.flush());
                }
            }
        }

        if let Err(e) = sinks.flush() {
            errors.report(e);
        }
    }

    /// Queue a record according to the overflow policy.
    ///
    /// Only [`OverflowPolicy::Reject`] reports a full queue to the caller.
    pub(crate) fn enqueue(&self, queued: QueuedRecord) -> Result<()> {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Ok(());
        };

        match sender.try_send(Message::Record(Box::new(queued))) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => Ok(()),
            Err(TrySendError::Full(message)) => self.handle_overflow(sender, message),
        }
    }

    fn handle_overflow(&self, sender: &Sender<Message>, message: Message) -> Result<()> {
        self.metrics.record_queue_full();

        match self.policy {
            OverflowPolicy::Block => {
                self.metrics.record_block();
                // Only fails once the consumer is gone
                let _ = sender.send(message);
                Ok(())
            }
            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(message, timeout) {
                    Ok(()) | Err(SendTimeoutError::Disconnected(_)) => Ok(()),
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.alert_and_drop();
                        Ok(())
                    }
                }
            }
            OverflowPolicy::DropNewest => {
                self.alert_and_drop();
                Ok(())
            }
            OverflowPolicy::Reject => {
                self.metrics.record_dropped();
                Err(LoggerError::queue_full(sender.len(), self.capacity))
            }
        }
    }

    fn alert_and_drop(&self) {
        let dropped = self.metrics.record_dropped() + 1;

        // Alert on first drop and periodically thereafter
        if dropped == 1 || dropped % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full, {} logs dropped. \
                 Consider increasing the queue capacity or using a blocking overflow policy.",
                dropped
            );

            if let Some(ref callback) = self.on_overflow {
                callback(dropped);
            }
        }
    }

    /// Block until every record queued before this call reached the sinks,
    /// then flush them.
    pub(crate) fn flush(&self) -> Result<()> {
        let (ack, done) = bounded(1);
        {
            let guard = self.sender.read();
            let Some(sender) = guard.as_ref() else {
                return Ok(());
            };
            if sender.send(Message::Flush(ack)).is_err() {
                return Ok(());
            }
        }
        done.recv().unwrap_or(Ok(()))
    }

    pub(crate) fn pending(&self) -> usize {
        self.sender.read().as_ref().map_or(0, Sender::len)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    /// Close the queue and wait for the consumer to drain it.
    ///
    /// Returns `false` if the consumer did not finish within `timeout`.
    pub(crate) fn shutdown(&self, timeout: Duration) -> bool {
        // Dropping the only sender lets the consumer run dry and exit
        drop(self.sender.write().take());

        let Some(handle) = self.worker.lock().take() else {
            return true;
        };

        // The consumer itself may release the last logger reference
        if handle.thread().id() == thread::current().id() {
            return true;
        }

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[LOGGER ERROR] Consumer thread panicked during shutdown: {:?}", e);
                    return false;
                }
                return true;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Consumer thread did not finish within {:?}. \
                     Some logs may be lost.",
                    timeout
                );
                return false;
            }

            thread::sleep(Duration::from_millis(1));
        }
    }
}
