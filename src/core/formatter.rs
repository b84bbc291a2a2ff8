//! Record formatting
//!
//! A [`PatternFormatter`] compiles a pattern once and renders every record
//! against the compiled items. Supported flags:
//!
//! | flag | renders |
//! |------|---------|
//! | `%v` | message |
//! | `%n` | logger name |
//! | `%l` / `%L` | level name / single letter |
//! | `%t` / `%P` | thread id / process id |
//! | `%Y %y %m %d %H %I %M %S %p` | date and clock fields |
//! | `%e %f %F` | milli, micro, nano seconds |
//! | `%E` | seconds since the epoch |
//! | `%D %T %X %c` | `08/23/14`, `23:55:59`, `23:55:59`, `Thu Aug 23 15:35:46 2014` |
//! | `%a %A %b %B` | weekday and month names |
//! | `%z` | utc offset |
//! | `%^ %$` | start and end of the colored range |
//! | `%+` | the default pattern |
//! | `%%` | a literal `%` |
//!
//! Any other flag is rejected when the pattern is compiled.

use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::{self, Display, Write};
use std::ops::Range;

/// Pattern used when a logger is built without one
pub const DEFAULT_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%n] [%^%l%$] %v";

/// Text produced for one record, ready for a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedRecord {
    pub text: String,
    /// Byte range a color-capable sink may highlight
    pub color_range: Option<Range<usize>>,
}

impl FormattedRecord {
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> FormattedRecord;
}

/// Renders every record as empty text, so sinks still see one write per
/// record but no payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoidFormatter;

impl Formatter for VoidFormatter {
    fn format(&self, _record: &LogRecord) -> FormattedRecord {
        FormattedRecord::default()
    }
}

/// Which clock the time flags are rendered in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PatternTime {
    #[default]
    Local,
    Utc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    Literal(String),
    Message,
    LoggerName,
    Level,
    ShortLevel,
    ThreadId,
    ProcessId,
    /// chrono strftime specifier
    Time(&'static str),
    ColorStart,
    ColorEnd,
}

#[derive(Debug, Clone)]
pub struct PatternFormatter {
    pattern: String,
    items: Vec<Item>,
    time: PatternTime,
}

impl PatternFormatter {
    /// Compile `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::Format`] for an unknown flag or a dangling `%`.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut items = Vec::new();
        compile(pattern, &mut items)?;
        Ok(Self {
            pattern: pattern.to_string(),
            items,
            time: PatternTime::default(),
        })
    }

    #[must_use]
    pub fn with_time(mut self, time: PatternTime) -> Self {
        self.time = time;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn render<Tz>(&self, record: &LogRecord, time: &DateTime<Tz>) -> FormattedRecord
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let mut out = FormattedRecord::default();
        let mut color_start = None;

        for item in &self.items {
            let text = &mut out.text;
            // Writing into a String cannot fail
            let _ = match item {
                Item::Literal(s) => {
                    text.push_str(s);
                    Ok(())
                }
                Item::Message => {
                    text.push_str(&record.message);
                    Ok(())
                }
                Item::LoggerName => {
                    text.push_str(&record.logger_name);
                    Ok(())
                }
                Item::Level => {
                    text.push_str(record.level.to_str());
                    Ok(())
                }
                Item::ShortLevel => {
                    text.push_str(record.level.short_str());
                    Ok(())
                }
                Item::ThreadId => {
                    text.push_str(&record.thread_id);
                    Ok(())
                }
                Item::ProcessId => write!(text, "{}", std::process::id()),
                Item::Time(spec) => write!(text, "{}", time.format(spec)),
                Item::ColorStart => {
                    color_start = Some(text.len());
                    Ok(())
                }
                Item::ColorEnd => {
                    if let Some(start) = color_start.take() {
                        out.color_range = Some(start..text.len());
                    }
                    Ok(())
                }
            };
        }

        out.text.push('\n');
        out
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        let mut items = Vec::new();
        // The default pattern only uses known flags
        let _ = compile(DEFAULT_PATTERN, &mut items);
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            items,
            time: PatternTime::default(),
        }
    }
}

impl Formatter for PatternFormatter {
    fn format(&self, record: &LogRecord) -> FormattedRecord {
        match self.time {
            PatternTime::Utc => self.render(record, &record.timestamp),
            PatternTime::Local => {
                let local: DateTime<Local> = record.timestamp.with_timezone(&Local);
                self.render(record, &local)
            }
        }
    }
}

impl fmt::Display for PatternFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

fn compile(pattern: &str, items: &mut Vec<Item>) -> Result<()> {
    let mut literal = String::new();
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }

        let flag = chars
            .next()
            .ok_or_else(|| LoggerError::format(pattern, "pattern ends with a lone '%'"))?;

        if flag == '%' {
            literal.push('%');
            continue;
        }

        if !literal.is_empty() {
            items.push(Item::Literal(std::mem::take(&mut literal)));
        }

        let item = match flag {
            'v' => Item::Message,
            'n' => Item::LoggerName,
            'l' => Item::Level,
            'L' => Item::ShortLevel,
            't' => Item::ThreadId,
            'P' => Item::ProcessId,
            'Y' => Item::Time("%Y"),
            'y' => Item::Time("%y"),
            'm' => Item::Time("%m"),
            'd' => Item::Time("%d"),
            'H' => Item::Time("%H"),
            'I' => Item::Time("%I"),
            'M' => Item::Time("%M"),
            'S' => Item::Time("%S"),
            'p' => Item::Time("%p"),
            'e' => Item::Time("%3f"),
            'f' => Item::Time("%6f"),
            'F' => Item::Time("%9f"),
            'E' => Item::Time("%s"),
            'D' => Item::Time("%m/%d/%y"),
            'T' | 'X' => Item::Time("%H:%M:%S"),
            'c' => Item::Time("%a %b %e %H:%M:%S %Y"),
            'a' => Item::Time("%a"),
            'A' => Item::Time("%A"),
            'b' => Item::Time("%b"),
            'B' => Item::Time("%B"),
            'z' => Item::Time("%:z"),
            '^' => Item::ColorStart,
            '$' => Item::ColorEnd,
            '+' => {
                compile(DEFAULT_PATTERN, items)?;
                continue;
            }
            other => {
                return Err(LoggerError::format(
                    pattern,
                    format!("unknown flag '%{}'", other),
                ))
            }
        };
        items.push(item);
    }

    if !literal.is_empty() {
        items.push(Item::Literal(literal));
    }
    Ok(())
}
