//! Sink over any writer

use crate::core::{Event, Formatter, LogLevel, LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Writes one formatted line per event to `W`
///
/// # Example
///
/// ```
/// use log_pipeline::core::{JsonFormatter, Sink};
/// use log_pipeline::sinks::StreamSink;
/// use std::sync::Arc;
///
/// let sink = StreamSink::new(Vec::new(), Arc::new(JsonFormatter::default()));
/// assert_eq!(sink.name(), "stream");
/// ```
pub struct StreamSink<W: Write + Send> {
    name: String,
    writer: Mutex<W>,
    formatter: Arc<dyn Formatter>,
    min_level: Option<LogLevel>,
}

impl<W: Write + Send> StreamSink<W> {
    pub fn new(writer: W, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            name: "stream".to_string(),
            writer: Mutex::new(writer),
            formatter,
            min_level: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Run `f` with the writer locked
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.writer.lock())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl StreamSink<BufWriter<File>> {
    /// Append to a plain file, creating it and its parent directory
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open_file<P: AsRef<Path>>(path: P, formatter: Arc<dyn Formatter>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LoggerError::io_operation(
                    "open log file",
                    format!("Failed to open '{}'", path.display()),
                    e,
                )
            })?;

        Ok(Self::new(BufWriter::new(file), formatter).with_name(path.display().to_string()))
    }
}

impl<W: Write + Send> Sink for StreamSink<W> {
    fn accept(&self, event: &Event) -> Result<()> {
        let output = self.formatter.format(event);
        writeln!(self.writer.lock(), "{}", output)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.writer.lock().flush()?;
        Ok(())
    }

    fn min_level(&self) -> Option<LogLevel> {
        self.min_level
    }

    fn name(&self) -> &str {
        &self.name
    }
}
