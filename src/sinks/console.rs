//! Console sink implementation

use crate::core::{FormattedRecord, LogRecord, LoggerError, Result, Sink};
use std::io::{self, Write};

/// Standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

impl ConsoleTarget {
    fn as_str(&self) -> &'static str {
        match self {
            ConsoleTarget::Stdout => "stdout",
            ConsoleTarget::Stderr => "stderr",
        }
    }
}

/// Writes every record to one standard stream. Never rotates.
pub struct ConsoleSink {
    target: ConsoleTarget,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_target(ConsoleTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::with_target(ConsoleTarget::Stderr)
    }

    pub fn with_target(target: ConsoleTarget) -> Self {
        Self {
            target,
            use_colors: cfg!(feature = "console"),
        }
    }

    /// Enable or disable highlighting of the pattern's `%^ .. %$` range
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors && cfg!(feature = "console");
        self
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn write_to(
        &self,
        out: &mut dyn Write,
        record: &LogRecord,
        formatted: &FormattedRecord,
    ) -> io::Result<()> {
        match formatted.color_range.clone() {
            Some(range) if self.use_colors && range.end <= formatted.text.len() => {
                let text = &formatted.text;
                out.write_all(text[..range.start].as_bytes())?;
                out.write_all(Self::paint(record, &text[range.clone()]).as_bytes())?;
                out.write_all(text[range.end..].as_bytes())
            }
            _ => out.write_all(formatted.as_bytes()),
        }
    }

    #[cfg(feature = "console")]
    fn paint(record: &LogRecord, text: &str) -> String {
        use colored::Colorize;
        text.color(record.level.color_code()).to_string()
    }

    #[cfg(not(feature = "console"))]
    fn paint(_record: &LogRecord, text: &str) -> String {
        text.to_string()
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn write(&mut self, record: &LogRecord, formatted: &FormattedRecord) -> Result<()> {
        let result = match self.target {
            ConsoleTarget::Stdout => self.write_to(&mut io::stdout().lock(), record, formatted),
            ConsoleTarget::Stderr => self.write_to(&mut io::stderr().lock(), record, formatted),
        };
        result.map_err(|e| LoggerError::io_operation("writing", self.target.as_str(), e))
    }

    fn flush(&mut self) -> Result<()> {
        let result = match self.target {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        };
        result.map_err(|e| LoggerError::io_operation("flushing", self.target.as_str(), e))
    }

    fn name(&self) -> &str {
        "console"
    }
}
