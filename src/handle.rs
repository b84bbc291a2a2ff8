//! Boundary surface for language bindings
//!
//! Bindings deal in loosely typed values: a logger kind as a string,
//! positional creation arguments, integer levels. This module validates
//! those inputs and exposes a chainable [`LoggerHandle`].
//!
//! # Example
//! ```
//! use named_logger::handle::LoggerHandle;
//! use named_logger::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::new();
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("app.log");
//!
//! let handle = LoggerHandle::create_in(
//!     &registry,
//!     "rotating",
//!     &[json!("app"), json!(path.to_str().unwrap()), json!(1024), json!(3)],
//! )
//! .unwrap();
//!
//! handle.set_level(1).unwrap().debug("ready").unwrap().flush().unwrap();
//! assert_eq!(handle.get_level(), Some(1));
//! ```

use crate::core::{LogLevel, Logger, LoggerError, Registry, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::str::FromStr;

/// Logger shapes that can be created through the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggerKind {
    /// Asynchronous logger writing to stdout
    Console,
    /// Synchronous rotating file logger
    Rotating,
    /// Asynchronous rotating file logger
    RotatingAsync,
}

impl LoggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggerKind::Console => "console",
            LoggerKind::Rotating => "rotating",
            LoggerKind::RotatingAsync => "rotating_async",
        }
    }
}

impl fmt::Display for LoggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoggerKind {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "console" => Ok(LoggerKind::Console),
            "rotating" => Ok(LoggerKind::Rotating),
            "rotating_async" => Ok(LoggerKind::RotatingAsync),
            _ => Err(LoggerError::invalid_argument(
                "kind",
                format!(
                    "unknown logger kind '{}' (expected console, rotating or rotating_async)",
                    s
                ),
            )),
        }
    }
}

/// Everything needed to create a logger of one shape
///
/// ```
/// use named_logger::handle::LoggerSpec;
///
/// let spec = LoggerSpec::from_json(
///     r#"{"kind": "rotating_async", "name": "audit", "file_path": "logs/audit.log",
///         "max_bytes": 1048576, "max_files": 5}"#,
/// )
/// .unwrap();
/// assert_eq!(spec.name(), "audit");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoggerSpec {
    Console {
        name: String,
    },
    Rotating {
        name: String,
        file_path: PathBuf,
        max_bytes: u64,
        max_files: usize,
    },
    RotatingAsync {
        name: String,
        file_path: PathBuf,
        max_bytes: u64,
        max_files: usize,
    },
}

impl LoggerSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a spec from a kind and positional arguments:
    /// `[name]` for `console`, `[name, file_path, max_bytes, max_files]` for
    /// the rotating kinds. Extra arguments are ignored.
    pub fn from_args(kind: &str, args: &[Value]) -> Result<Self> {
        let kind = kind.parse::<LoggerKind>()?;
        let name = string_arg(args, 0, "name")?;

        match kind {
            LoggerKind::Console => Ok(LoggerSpec::Console { name }),
            LoggerKind::Rotating | LoggerKind::RotatingAsync => {
                let file_path = PathBuf::from(string_arg(args, 1, "file_path")?);
                let max_bytes = count_arg(args, 2, "max_bytes")?;
                let max_files = usize::try_from(count_arg(args, 3, "max_files")?).map_err(|_| {
                    LoggerError::invalid_argument("max_files", "value does not fit in usize")
                })?;

                Ok(if kind == LoggerKind::Rotating {
                    LoggerSpec::Rotating { name, file_path, max_bytes, max_files }
                } else {
                    LoggerSpec::RotatingAsync { name, file_path, max_bytes, max_files }
                })
            }
        }
    }

    pub fn kind(&self) -> LoggerKind {
        match self {
            LoggerSpec::Console { .. } => LoggerKind::Console,
            LoggerSpec::Rotating { .. } => LoggerKind::Rotating,
            LoggerSpec::RotatingAsync { .. } => LoggerKind::RotatingAsync,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LoggerSpec::Console { name }
            | LoggerSpec::Rotating { name, .. }
            | LoggerSpec::RotatingAsync { name, .. } => name,
        }
    }

    /// Get or create the logger in `registry`.
    ///
    /// An existing logger with the same name is returned as is, whatever
    /// its shape.
    pub fn open(&self, registry: &Registry) -> Result<Logger> {
        match self {
            LoggerSpec::Console { name } => registry.console(name),
            LoggerSpec::Rotating { name, file_path, max_bytes, max_files } => {
                registry.rotating(name, file_path, *max_bytes, *max_files)
            }
            LoggerSpec::RotatingAsync { name, file_path, max_bytes, max_files } => {
                registry.rotating_async(name, file_path, *max_bytes, *max_files)
            }
        }
    }
}

fn string_arg(args: &[Value], index: usize, argument: &str) -> Result<String> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(LoggerError::invalid_argument(
            argument,
            format!("expected a string, got {}", other),
        )),
        None => Err(LoggerError::invalid_argument(argument, "missing")),
    }
}

/// A non-negative integer; integral floats are accepted since bindings often
/// carry every number as a double
fn count_arg(args: &[Value], index: usize, argument: &str) -> Result<u64> {
    let value = args
        .get(index)
        .ok_or_else(|| LoggerError::invalid_argument(argument, "missing"))?;

    let number = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    };

    number.ok_or_else(|| {
        LoggerError::invalid_argument(
            argument,
            format!("expected a non-negative integer, got {}", value),
        )
    })
}

/// Parse an integer level as received at the boundary
pub fn level_from_i64(level: i64) -> Result<LogLevel> {
    LogLevel::try_from(level)
}

/// Set the level given to loggers created from now on in the global registry
pub fn set_global_level(level: i64) -> Result<()> {
    Registry::global().set_global_level(level_from_i64(level)?);
    Ok(())
}

/// Set the flush threshold of the global registry
pub fn set_global_flush_threshold(level: i64) -> Result<()> {
    Registry::global().set_flush_threshold(level_from_i64(level)?);
    Ok(())
}

/// A counted reference to a logger.
///
/// Every method returns `Result<&Self>` so calls can be chained. After
/// [`LoggerHandle::drop_logger`] the methods keep succeeding but do nothing.
/// Releasing the last handle of a logger removes it from its registry.
pub struct LoggerHandle {
    logger: Logger,
}

impl LoggerHandle {
    /// Create (or reuse) a logger in the global registry
    pub fn create(kind: &str, args: &[Value]) -> Result<Self> {
        Self::create_in(Registry::global(), kind, args)
    }

    pub fn create_in(registry: &Registry, kind: &str, args: &[Value]) -> Result<Self> {
        let spec = LoggerSpec::from_args(kind, args)?;
        Ok(Self::from_logger(spec.open(registry)?))
    }

    pub fn from_logger(logger: Logger) -> Self {
        logger.acquire_handle();
        Self { logger }
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn critical(&self, message: &str) -> Result<&Self> {
        self.logger.critical(message)?;
        Ok(self)
    }

    pub fn error(&self, message: &str) -> Result<&Self> {
        self.logger.error(message)?;
        Ok(self)
    }

    pub fn warn(&self, message: &str) -> Result<&Self> {
        self.logger.warn(message)?;
        Ok(self)
    }

    pub fn info(&self, message: &str) -> Result<&Self> {
        self.logger.info(message)?;
        Ok(self)
    }

    pub fn debug(&self, message: &str) -> Result<&Self> {
        self.logger.debug(message)?;
        Ok(self)
    }

    pub fn trace(&self, message: &str) -> Result<&Self> {
        self.logger.trace(message)?;
        Ok(self)
    }

    /// Current level as an integer, `None` once the logger was dropped
    pub fn get_level(&self) -> Option<i64> {
        if self.logger.is_closed() {
            None
        } else {
            Some(self.logger.level().as_i64())
        }
    }

    /// # Errors
    ///
    /// `InvalidArgument` when `level` is outside `0..=6`; the level is left
    /// unchanged.
    pub fn set_level(&self, level: i64) -> Result<&Self> {
        self.logger.set_level(level_from_i64(level)?);
        Ok(self)
    }

    pub fn flush(&self) -> Result<&Self> {
        self.logger.flush()?;
        Ok(self)
    }

    pub fn drop_logger(&self) -> Result<&Self> {
        self.logger.drop_logger();
        Ok(self)
    }

    pub fn set_pattern(&self, pattern: &str) -> Result<&Self> {
        self.logger.set_pattern(pattern)?;
        Ok(self)
    }

    pub fn clear_formatter(&self) -> Result<&Self> {
        self.logger.clear_formatter();
        Ok(self)
    }
}

impl Clone for LoggerHandle {
    fn clone(&self) -> Self {
        Self::from_logger(self.logger.clone())
    }
}

impl fmt::Debug for LoggerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerHandle")
            .field("logger", &self.logger)
            .finish()
    }
}

impl Drop for LoggerHandle {
    fn drop(&mut self) {
        if !self.logger.release_handle() {
            return;
        }
        if catch_unwind(AssertUnwindSafe(|| self.logger.detach())).is_err() {
            eprintln!(
                "[LOGGER ERROR] Failed to unregister logger '{}' on handle release",
                self.logger.name()
            );
        }
    }
}
