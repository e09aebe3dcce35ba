//! Size-based rotating file sink
//!
//! Before a record is written, the file is rolled over if the write would
//! take it to `max_bytes` or beyond. Backups are named `app.log.1` (newest)
//! through `app.log.N`; the oldest is discarded. With compression enabled,
//! each fresh backup is gzipped to `app.log.1.gz`.

use crate::core::{Event, Formatter, LogLevel, LoggerError, Result, Sink};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Rollover limits
///
/// Rotation is disabled when either `max_bytes` or `backup_count` is zero.
///
/// # Examples
///
/// ```
/// use log_pipeline::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(10_000)
///     .with_backup_count(3)
///     .with_compression(true);
/// assert!(policy.is_enabled());
///
/// assert!(!RotationPolicy::new().with_backup_count(0).is_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationPolicy {
    pub max_bytes: u64,
    pub backup_count: usize,
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024, // 10 MB
            backup_count: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_backup_count(mut self, count: usize) -> Self {
        self.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_bytes > 0 && self.backup_count > 0
    }
}

struct RotatingFile {
    base_path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    current_size: u64,
}

impl RotatingFile {
    fn open(base_path: PathBuf, policy: RotationPolicy) -> Result<Self> {
        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size) = Self::open_file(&base_path)?;
        Ok(Self {
            base_path,
            policy,
            writer: Some(BufWriter::new(file)),
            current_size,
        })
    }

    fn open_file(path: &Path) -> Result<(File, u64)> {
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
        let size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();
        Ok((file, size))
    }

    /// An empty file is never rolled over, so an oversized record still lands
    fn should_rollover(&self, record_len: u64) -> bool {
        self.policy.is_enabled()
            && self.current_size > 0
            && self.current_size + record_len >= self.policy.max_bytes
    }

    fn write_record(&mut self, record: &str) -> Result<()> {
        let record_len = record.len() as u64;
        if self.should_rollover(record_len) {
            if let Err(e) = self.rotate() {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
            }
        }

        if self.writer.is_none() {
            let (file, size) = Self::open_file(&self.base_path)?;
            self.writer = Some(BufWriter::new(file));
            self.current_size = size;
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(record.as_bytes())?;
            self.current_size += record_len;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        // Release the handle before renaming the file underneath it
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }

        let count = self.policy.backup_count;
        for oldest in [self.backup_path(count), self.compressed_path(count)] {
            if oldest.exists() {
                if let Err(e) = fs::remove_file(&oldest) {
                    eprintln!(
                        "[LOGGER WARNING] Failed to remove oldest backup {}: {}",
                        oldest.display(),
                        e
                    );
                }
            }
        }

        for i in (1..count).rev() {
            for (from, to) in [
                (self.backup_path(i), self.backup_path(i + 1)),
                (self.compressed_path(i), self.compressed_path(i + 1)),
            ] {
                if from.exists() {
                    fs::rename(&from, &to).map_err(|e| {
                        LoggerError::file_rotation(
                            from.display().to_string(),
                            format!("Failed to shift backup file: {}", e),
                        )
                    })?;
                }
            }
        }

        let first = self.backup_path(1);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &first).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                compress_file(&first, &self.compressed_path(1))?;
            }
        }

        let (file, size) = Self::open_file(&self.base_path)?;
        self.writer = Some(BufWriter::new(file));
        self.current_size = size;
        Ok(())
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.suffixed(&index.to_string())
    }

    fn compressed_path(&self, index: usize) -> PathBuf {
        self.suffixed(&format!("{}.gz", index))
    }

    fn suffixed(&self, suffix: &str) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app.log".to_string());
        path.set_file_name(format!("{}.{}", filename, suffix));
        path
    }
}

/// Gzip `path` into `gz_path`, removing the original only once the
/// compressed file is complete
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    let temp_path = gz_path.with_extension("gz.tmp");
    let cleanup = |e: std::io::Error, message: String| {
        let _ = fs::remove_file(&temp_path);
        LoggerError::io_operation("compress log file", message, e)
    };

    let input = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to open file for compression: {}", path.display()),
            e,
        )
    })?;
    let mut reader = BufReader::with_capacity(64 * 1024, input);

    let output = File::create(&temp_path).map_err(|e| {
        LoggerError::io_operation(
            "compress log file",
            format!("Failed to create temporary file: {}", temp_path.display()),
            e,
        )
    })?;
    let mut encoder = flate2::write::GzEncoder::new(
        BufWriter::with_capacity(64 * 1024, output),
        flate2::Compression::default(),
    );

    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| cleanup(e, format!("Failed to read from file: {}", path.display())))?;
        if read == 0 {
            break;
        }
        encoder
            .write_all(&buffer[..read])
            .map_err(|e| cleanup(e, "Failed to compress data chunk".to_string()))?;
    }

    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(|e| cleanup(e, "Failed to finish compression".to_string()))?;

    fs::rename(&temp_path, gz_path).map_err(|e| {
        cleanup(
            e,
            format!("Failed to rename compressed file to: {}", gz_path.display()),
        )
    })?;

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compression succeeded but failed to remove original file {}: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

/// File sink with size/count rotation
///
/// # Examples
///
/// ```no_run
/// use log_pipeline::core::LineFormatter;
/// use log_pipeline::sinks::{RotatingFileSink, RotationPolicy};
/// use std::sync::Arc;
///
/// let sink = RotatingFileSink::new(
///     "logs/app.log",
///     RotationPolicy::new().with_max_bytes(10_000).with_backup_count(3),
///     Arc::new(LineFormatter::default()),
/// )
/// .unwrap();
/// ```
pub struct RotatingFileSink {
    name: String,
    formatter: Arc<dyn Formatter>,
    min_level: Option<LogLevel>,
    file: Mutex<RotatingFile>,
}

impl RotatingFileSink {
    /// Open (append) the file, creating its parent directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created or opened
    pub fn new<P: AsRef<Path>>(
        path: P,
        policy: RotationPolicy,
        formatter: Arc<dyn Formatter>,
    ) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        let name = base_path.display().to_string();
        Ok(Self {
            name,
            formatter,
            min_level: None,
            file: Mutex::new(RotatingFile::open(base_path, policy)?),
        })
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn path(&self) -> PathBuf {
        self.file.lock().base_path.clone()
    }

    pub fn policy(&self) -> RotationPolicy {
        self.file.lock().policy.clone()
    }

    /// Bytes written to the current file, including unflushed ones
    pub fn current_size(&self) -> u64 {
        self.file.lock().current_size
    }
}

impl Sink for RotatingFileSink {
    fn accept(&self, event: &Event) -> Result<()> {
        let mut record = self.formatter.format(event);
        record.push('\n');
        self.file.lock().write_record(&record)
    }

    fn flush(&self) -> Result<()> {
        self.file.lock().flush()
    }

    fn min_level(&self) -> Option<LogLevel> {
        self.min_level
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LineFormatter, RenderConfig};
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    fn message_only() -> Arc<dyn Formatter> {
        Arc::new(LineFormatter::new("%(message)s", &RenderConfig::new()).unwrap())
    }

    fn event(message: &str) -> Event {
        Event::builder("test", LogLevel::Info, message).build().unwrap()
    }

    #[test]
    fn test_rotation_policy_default() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.max_bytes, 10 * 1024 * 1024);
        assert_eq!(policy.backup_count, 5);
        assert!(!policy.compress);
    }

    #[test]
    fn test_rollover_before_write_that_reaches_limit() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        // each record is "xxxx\n" = 5 bytes
        let sink = RotatingFileSink::new(
            &path,
            RotationPolicy::new().with_max_bytes(10).with_backup_count(2),
            message_only(),
        )
        .unwrap();

        sink.accept(&event("aaaa")).unwrap(); // size 5
        sink.accept(&event("bbbb")).unwrap(); // 5 + 5 >= 10: roll, then write
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(temp_dir.path().join("app.log.1")).unwrap(), "aaaa\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "bbbb\n");
    }

    #[test]
    fn test_oldest_backup_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let sink = RotatingFileSink::new(
            &path,
            RotationPolicy::new().with_max_bytes(5).with_backup_count(2),
            message_only(),
        )
        .unwrap();

        for message in ["r001", "r002", "r003", "r004"] {
            sink.accept(&event(message)).unwrap();
        }
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "r004\n");
        assert_eq!(fs::read_to_string(temp_dir.path().join("app.log.1")).unwrap(), "r003\n");
        assert_eq!(fs::read_to_string(temp_dir.path().join("app.log.2")).unwrap(), "r002\n");
        assert!(!temp_dir.path().join("app.log.3").exists());
    }

    #[test]
    fn test_zero_backup_count_disables_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let sink = RotatingFileSink::new(
            &path,
            RotationPolicy::new().with_max_bytes(5).with_backup_count(0),
            message_only(),
        )
        .unwrap();

        for _ in 0..5 {
            sink.accept(&event("data")).unwrap();
        }
        sink.flush().unwrap();

        assert_eq!(sink.current_size(), 25);
        assert!(!temp_dir.path().join("app.log.1").exists());
    }

    #[test]
    fn test_compressed_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        let sink = RotatingFileSink::new(
            &path,
            RotationPolicy::new()
                .with_max_bytes(5)
                .with_backup_count(3)
                .with_compression(true),
            message_only(),
        )
        .unwrap();

        sink.accept(&event("one!")).unwrap();
        sink.accept(&event("two!")).unwrap();
        sink.flush().unwrap();

        let gz_path = temp_dir.path().join("app.log.1.gz");
        assert!(gz_path.exists());
        assert!(!temp_dir.path().join("app.log.1").exists());

        let mut decoded = String::new();
        GzDecoder::new(File::open(gz_path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "one!\n");
    }

    #[test]
    fn test_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("nested").join("app.log");
        let sink = RotatingFileSink::new(&path, RotationPolicy::default(), message_only()).unwrap();
        assert!(path.exists());
        assert_eq!(sink.current_size(), 0);
        assert_eq!(sink.path(), path);
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("app.log");
        fs::write(&path, "existing\n").unwrap();

        let sink = RotatingFileSink::new(&path, RotationPolicy::default(), message_only()).unwrap();
        assert_eq!(sink.current_size(), 9);
        sink.accept(&event("appended")).unwrap();
        sink.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nappended\n");
    }
}
