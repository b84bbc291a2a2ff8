//! Rotating file sink
//!
//! Keeps a fixed-size window of files: index 0 is the active file at the
//! configured path, higher indices are progressively older. When a write
//! would push the active file past `max_bytes`, the window slides by one and
//! the oldest file is deleted, so at most `max_files` files ever exist.

use crate::core::{FormattedRecord, LogRecord, LoggerError, Result, Sink};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Size-triggered rotating file sink
///
/// # Examples
///
/// ```no_run
/// use named_logger::sinks::RotatingFileSink;
///
/// // app.log, app.1.log and app.2.log, each up to 1 MiB
/// let sink = RotatingFileSink::new("/var/log/app.log", 1024 * 1024, 3).unwrap();
/// assert_eq!(sink.file_path(2).file_name().unwrap(), "app.2.log");
/// ```
#[derive(Debug)]
pub struct RotatingFileSink {
    base_path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    writer: Option<BufWriter<File>>,
    current_size: u64,
    rotations: u64,
}

impl RotatingFileSink {
    /// Open (or create) the active file and count its existing size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when `max_bytes` or `max_files` is zero and
    /// an IO error when the file cannot be created, opened or locked.
    pub fn new<P: AsRef<Path>>(path: P, max_bytes: u64, max_files: usize) -> Result<Self> {
        if max_bytes == 0 {
            return Err(LoggerError::invalid_argument(
                "max_bytes",
                "maximum file size must be greater than zero",
            ));
        }
        if max_files == 0 {
            return Err(LoggerError::invalid_argument(
                "max_files",
                "maximum file count must be greater than zero",
            ));
        }

        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
            })?;
        }

        let (writer, current_size) = Self::open_active(&base_path)?;

        Ok(Self {
            base_path,
            max_bytes,
            max_files,
            writer: Some(writer),
            current_size,
            rotations: 0,
        })
    }

    fn open_active(path: &Path) -> Result<(BufWriter<File>, u64)> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoggerError::io_operation("opening", path.display().to_string(), e))?;

        #[cfg(feature = "file")]
        {
            use fs2::FileExt;
            file.try_lock_exclusive()
                .map_err(|_| LoggerError::file_lock(path.display().to_string()))?;
        }

        let size = file
            .metadata()
            .map_err(|e| LoggerError::io_operation("reading metadata of", path.display().to_string(), e))?
            .len();

        Ok((BufWriter::new(file), size))
    }

    /// Path of the file at `index` in the window.
    ///
    /// Index 0 is the configured path; others get `.index` inserted before
    /// the extension (`app.log` -> `app.3.log`, `app` -> `app.3`).
    #[must_use]
    pub fn file_path(&self, index: usize) -> PathBuf {
        if index == 0 {
            return self.base_path.clone();
        }

        let stem = self
            .base_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match self.base_path.extension() {
            Some(ext) => format!("{}.{}.{}", stem, index, ext.to_string_lossy()),
            None => format!("{}.{}", stem, index),
        };
        self.base_path.with_file_name(file_name)
    }

    /// Slide the window by one and start a fresh active file
    fn rotate(&mut self) -> Result<()> {
        // Dropping the writer releases the handle and the lock before renaming
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::io_operation("flushing before rotation", self.base_path.display().to_string(), e)
            })?;
        }

        let oldest = self.file_path(self.max_files - 1);
        if oldest.exists() {
            fs::remove_file(&oldest).map_err(|e| {
                LoggerError::file_rotation(
                    oldest.display().to_string(),
                    format!("Failed to remove oldest file: {}", e),
                )
            })?;
        }

        for index in (0..self.max_files - 1).rev() {
            let src = self.file_path(index);
            if !src.exists() {
                continue;
            }
            let dst = self.file_path(index + 1);
            Self::rename_replacing(&src, &dst)?;
        }

        let (writer, size) = Self::open_active(&self.base_path)?;
        self.writer = Some(writer);
        self.current_size = size;
        self.rotations += 1;

        Ok(())
    }

    fn rename_replacing(src: &Path, dst: &Path) -> Result<()> {
        if fs::rename(src, dst).is_ok() {
            return Ok(());
        }

        // On some platforms rename fails if the destination exists
        if dst.exists() {
            let _ = fs::remove_file(dst);
        }
        fs::rename(src, dst).map_err(|e| {
            LoggerError::file_rotation(
                src.display().to_string(),
                format!("Failed to rename to '{}': {}", dst.display(), e),
            )
        })
    }

    /// Get a writer back after a failed rotation so later records have
    /// somewhere to go
    fn reopen_after_failure(&mut self) {
        if self.writer.is_some() {
            return;
        }
        match Self::open_active(&self.base_path) {
            Ok((writer, size)) => {
                self.writer = Some(writer);
                self.current_size = size;
            }
            Err(e) => {
                eprintln!(
                    "[LOGGER ERROR] Failed to reopen log file after rotation failure: {}",
                    e
                );
            }
        }
    }

    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    #[must_use]
    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Number of rotations performed since this sink was opened
    #[must_use]
    pub fn rotation_count(&self) -> u64 {
        self.rotations
    }
}

impl Sink for RotatingFileSink {
    fn name(&self) -> &str {
        "rotating_file"
    }

    fn write(&mut self, _record: &LogRecord, formatted: &FormattedRecord) -> Result<()> {
        let len = formatted.len() as u64;

        // An empty active file always takes the record, however large
        if self.current_size > 0 && self.current_size + len > self.max_bytes {
            if let Err(e) = self.rotate() {
                self.reopen_after_failure();
                return Err(e);
            }
        }

        if self.writer.is_none() {
            let (writer, size) = Self::open_active(&self.base_path)?;
            self.writer = Some(writer);
            self.current_size = size;
        }

        if let Some(ref mut writer) = self.writer {
            writer.write_all(formatted.as_bytes()).map_err(|e| {
                LoggerError::io_operation("writing", self.base_path.display().to_string(), e)
            })?;
            self.current_size += len;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::io_operation("flushing", self.base_path.display().to_string(), e)
            })?;
        }
        Ok(())
    }
}

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            // Best effort flush - ignore errors during drop
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ErrorKind, LogLevel};
    use std::sync::Arc;
    use tempfile::tempdir;

    /// A record whose formatted text is exactly `len` bytes, newline included
    fn record_of(len: usize, tag: char) -> (LogRecord, FormattedRecord) {
        let body: String = std::iter::repeat(tag).take(len - 1).collect();
        let record = LogRecord::new(Arc::from("test"), LogLevel::Info, body.clone());
        let formatted = FormattedRecord {
            text: format!("{}\n", body),
            color_range: None,
        };
        (record, formatted)
    }

    fn count_files(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().filter_map(|e| e.ok()).count()
    }

    #[test]
    fn test_file_naming() {
        let dir = tempdir().unwrap();
        let sink = RotatingFileSink::new(dir.path().join("app.log"), 100, 3).unwrap();
        assert_eq!(sink.file_path(0), dir.path().join("app.log"));
        assert_eq!(sink.file_path(1), dir.path().join("app.1.log"));
        assert_eq!(sink.file_path(2), dir.path().join("app.2.log"));

        let bare = RotatingFileSink::new(dir.path().join("plain"), 100, 3).unwrap();
        assert_eq!(bare.file_path(2), dir.path().join("plain.2"));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let dir = tempdir().unwrap();
        let err = RotatingFileSink::new(dir.path().join("a.log"), 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = RotatingFileSink::new(dir.path().join("b.log"), 10, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("app.log");
        let sink = RotatingFileSink::new(&path, 100, 2).unwrap();
        assert!(path.exists());
        assert_eq!(sink.current_size(), 0);
    }

    #[test]
    fn test_rotation_before_overflowing_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = RotatingFileSink::new(&path, 100, 3).unwrap();

        for tag in ['a', 'b', 'c', 'd', 'e'] {
            let (record, formatted) = record_of(30, tag);
            sink.write(&record, &formatted).unwrap();
        }
        sink.flush().unwrap();

        assert_eq!(sink.rotation_count(), 1);
        assert_eq!(count_files(dir.path()), 2);

        let active = fs::read_to_string(&path).unwrap();
        assert_eq!(active.lines().count(), 2);
        assert!(active.starts_with('d'));

        let previous = fs::read_to_string(dir.path().join("app.1.log")).unwrap();
        assert_eq!(previous.len(), 90);
    }

    #[test]
    fn test_window_never_exceeds_max_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("multi.log");
        let mut sink = RotatingFileSink::new(&path, 50, 3).unwrap();

        for i in 0..100 {
            let (record, formatted) = record_of(20, char::from(b'a' + (i % 26) as u8));
            sink.write(&record, &formatted).unwrap();
            assert!(count_files(dir.path()) <= 3);
        }
        sink.flush().unwrap();

        assert_eq!(count_files(dir.path()), 3);
        assert!(!sink.file_path(3).exists());
        assert!(fs::metadata(&path).unwrap().len() <= 50);
    }

    #[test]
    fn test_oversized_record_written_whole() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.log");
        let mut sink = RotatingFileSink::new(&path, 10, 2).unwrap();

        let (record, formatted) = record_of(25, 'x');
        sink.write(&record, &formatted).unwrap();
        assert_eq!(sink.rotation_count(), 0);
        assert_eq!(sink.current_size(), 25);

        // The next write rotates first
        let (record, formatted) = record_of(5, 'y');
        sink.write(&record, &formatted).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.rotation_count(), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "yyyy\n");
        assert_eq!(fs::metadata(sink.file_path(1)).unwrap().len(), 25);
    }

    #[test]
    fn test_single_file_window_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("only.log");
        let mut sink = RotatingFileSink::new(&path, 10, 1).unwrap();

        for tag in ['a', 'b', 'c'] {
            let (record, formatted) = record_of(6, tag);
            sink.write(&record, &formatted).unwrap();
        }
        sink.flush().unwrap();

        assert_eq!(count_files(dir.path()), 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "ccccc\n");
    }

    #[test]
    fn test_existing_file_size_counted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("existing.log");
        fs::write(&path, "0123456789\n").unwrap();

        let sink = RotatingFileSink::new(&path, 100, 2).unwrap();
        assert_eq!(sink.current_size(), 11);
    }

    #[cfg(feature = "file")]
    #[test]
    fn test_active_file_is_locked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("locked.log");
        let _first = RotatingFileSink::new(&path, 100, 2).unwrap();

        let err = RotatingFileSink::new(&path, 100, 2).err().unwrap();
        assert!(matches!(err, LoggerError::FileLockError { .. }));
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }

    #[cfg(unix)]
    #[test]
    fn test_rotation_failure_reports_io_failure() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let path = logs.join("app.log");
        let mut sink = RotatingFileSink::new(&path, 10, 2).unwrap();

        let (record, formatted) = record_of(8, 'a');
        sink.write(&record, &formatted).unwrap();

        // A read-only directory makes the rename fail
        fs::set_permissions(&logs, fs::Permissions::from_mode(0o500)).unwrap();
        let scratch = logs.join("write-check");
        let writable = File::create(&scratch).is_ok();
        if writable {
            // Running with privileges that ignore directory permissions
            let _ = fs::remove_file(&scratch);
            fs::set_permissions(&logs, fs::Permissions::from_mode(0o700)).unwrap();
            return;
        }

        let (record, formatted) = record_of(8, 'b');
        let err = sink.write(&record, &formatted).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);

        fs::set_permissions(&logs, fs::Permissions::from_mode(0o700)).unwrap();
        assert_eq!(sink.rotation_count(), 0);
    }
}
