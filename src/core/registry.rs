//! Named logger registry
//!
//! A [`Registry`] maps logger names to live [`Logger`]s and guarantees at
//! most one live logger per name. [`Registry::global`] is the process-wide
//! instance, created on first use; [`Registry::new`] builds isolated ones.
//!
//! # Example
//! ```
//! use named_logger::prelude::*;
//!
//! let registry = Registry::new();
//! let first = registry.get_or_create("db", || Ok(Logger::builder())).unwrap();
//! let second = registry.get_or_create("db", || Ok(Logger::builder())).unwrap();
//! assert!(first.ptr_eq(&second));
//!
//! registry.drop_logger("db");
//! assert!(registry.get("db").is_none());
//! assert!(first.is_closed());
//! ```

use super::{
    error::{LoggerError, Result},
    log_level::LogLevel,
    logger::{Logger, LoggerBuilder},
};
use crate::sinks::{ConsoleSink, RotatingFileSink};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

/// Settings shared by every logger of one registry
#[derive(Debug)]
pub(crate) struct SharedSettings {
    /// Threshold given to loggers created without an explicit level
    level: AtomicU8,
    /// Records at or above this level flush their sinks right away
    flush_level: AtomicU8,
}

impl SharedSettings {
    pub(crate) fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Acquire))
    }

    pub(crate) fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Release);
    }

    pub(crate) fn flush_level(&self) -> LogLevel {
        LogLevel::from_u8(self.flush_level.load(Ordering::Acquire))
    }

    pub(crate) fn set_flush_level(&self, level: LogLevel) {
        self.flush_level.store(level as u8, Ordering::Release);
    }
}

impl Default for SharedSettings {
    fn default() -> Self {
        Self {
            level: AtomicU8::new(LogLevel::Info as u8),
            flush_level: AtomicU8::new(LogLevel::Off as u8),
        }
    }
}

pub(crate) struct RegistryShared {
    loggers: Mutex<HashMap<String, Logger>>,
    settings: Arc<SharedSettings>,
}

impl RegistryShared {
    pub(crate) fn settings(&self) -> Arc<SharedSettings> {
        Arc::clone(&self.settings)
    }

    /// Remove `logger`'s entry unless the name now belongs to another logger
    pub(crate) fn remove_if_same(&self, logger: &Logger) {
        let removed = {
            let mut loggers = self.loggers.lock();
            match loggers.get(logger.name()) {
                Some(current) if current.ptr_eq(logger) => loggers.remove(logger.name()),
                _ => None,
            }
        };
        drop(removed);
    }
}

/// Process-wide map from logger name to logger
#[derive(Clone)]
pub struct Registry {
    shared: Arc<RegistryShared>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Create an empty registry, independent of the global one
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                loggers: Mutex::new(HashMap::new()),
                settings: Arc::new(SharedSettings::default()),
            }),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::new)
    }

    /// Return the logger registered as `name`, or register the one built by
    /// `factory`.
    ///
    /// The lookup, the factory call and the insertion happen under one lock,
    /// so concurrent callers with the same name all receive the same logger.
    /// When the name is held by an open logger the factory is never called.
    ///
    /// A logger that is being dropped keeps its entry until its queue is
    /// drained and its sinks are released. Meeting such an entry, this waits
    /// for the drop to finish and then registers a fresh logger.
    pub fn get_or_create<F>(&self, name: &str, factory: F) -> Result<Logger>
    where
        F: FnOnce() -> Result<LoggerBuilder>,
    {
        if name.is_empty() {
            return Err(LoggerError::invalid_argument(
                "name",
                "logger name must not be empty",
            ));
        }

        loop {
            let closing = {
                let mut loggers = self.shared.loggers.lock();
                match loggers.get(name) {
                    Some(existing) if !existing.is_closed() => return Ok(existing.clone()),
                    Some(existing) => existing.clone(),
                    None => {
                        let logger = factory()?.build_in(name, &self.shared)?;
                        loggers.insert(name.to_string(), logger.clone());
                        return Ok(logger);
                    }
                }
            };

            closing.wait_closed();
            self.shared.remove_if_same(&closing);
        }
    }

    /// The logger registered as `name`. A logger in the middle of being
    /// dropped is still returned, already closed.
    pub fn get(&self, name: &str) -> Option<Logger> {
        self.shared.loggers.lock().get(name).cloned()
    }

    /// Like [`Registry::get`], failing with `NotFound` for unknown names
    pub fn try_get(&self, name: &str) -> Result<Logger> {
        self.get(name).ok_or_else(|| LoggerError::not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.shared.loggers.lock().contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.loggers.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.shared.loggers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.loggers.lock().is_empty()
    }

    /// Close the logger registered as `name`, then remove it. Unknown names
    /// are ignored.
    ///
    /// Returns once the logger's queue is drained and its sinks released.
    pub fn drop_logger(&self, name: &str) {
        if let Some(logger) = self.get(name) {
            logger.drop_logger();
            self.shared.remove_if_same(&logger);
        }
    }

    /// Close and remove every registered logger
    pub fn drop_all(&self) {
        for logger in self.snapshot() {
            logger.drop_logger();
            self.shared.remove_if_same(&logger);
        }
    }

    /// Flush every registered logger, returning the first failure
    pub fn flush_all(&self) -> Result<()> {
        let mut first_error = None;
        for logger in self.snapshot() {
            if let Err(e) = logger.flush() {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    eprintln!("[LOGGER ERROR] Failed to flush '{}': {}", logger.name(), e);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Level given to loggers created from now on. Existing loggers keep
    /// their own level; see [`Registry::apply_level_to_all`].
    pub fn set_global_level(&self, level: LogLevel) {
        self.shared.settings.set_level(level);
    }

    pub fn global_level(&self) -> LogLevel {
        self.shared.settings.level()
    }

    /// Set `level` on every registered logger and as the global level
    pub fn apply_level_to_all(&self, level: LogLevel) {
        self.set_global_level(level);
        for logger in self.snapshot() {
            logger.set_level(level);
        }
    }

    /// Records at or above `level` flush their sinks immediately, for every
    /// logger of this registry. [`LogLevel::Off`] disables it.
    pub fn set_flush_threshold(&self, level: LogLevel) {
        self.shared.settings.set_flush_level(level);
    }

    pub fn flush_threshold(&self) -> LogLevel {
        self.shared.settings.flush_level()
    }

    /// Asynchronous logger writing to stdout
    pub fn console(&self, name: &str) -> Result<Logger> {
        self.get_or_create(name, || {
            Ok(LoggerBuilder::new().sink(ConsoleSink::new()).async_default())
        })
    }

    /// Synchronous logger writing to a rotating set of files
    pub fn rotating<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        max_bytes: u64,
        max_files: usize,
    ) -> Result<Logger> {
        self.get_or_create(name, || {
            let sink = RotatingFileSink::new(path, max_bytes, max_files)?;
            Ok(LoggerBuilder::new().sink(sink))
        })
    }

    /// Asynchronous logger writing to a rotating set of files
    pub fn rotating_async<P: AsRef<Path>>(
        &self,
        name: &str,
        path: P,
        max_bytes: u64,
        max_files: usize,
    ) -> Result<Logger> {
        self.get_or_create(name, || {
            let sink = RotatingFileSink::new(path, max_bytes, max_files)?;
            Ok(LoggerBuilder::new().sink(sink).async_default())
        })
    }

    fn snapshot(&self) -> Vec<Logger> {
        self.shared.loggers.lock().values().cloned().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
