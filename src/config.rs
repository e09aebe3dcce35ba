//! Declarative pipeline configuration
//!
//! A JSON document in the shape of a dict-style logging config:
//!
//! ```json
//! {
//!   "formatters": {
//!     "simple": { "kind": "line", "fmt": "%(levelname)s %(message)s" },
//!     "json": { "kind": "json", "fmt_keys": { "levelname": "level", "message": "message" } }
//!   },
//!   "handlers": {
//!     "stderr": { "kind": "console", "target": "stderr", "formatter": "simple", "level": "WARNING" },
//!     "file": { "kind": "rotating_file", "path": "logs/app.log.jsonl", "formatter": "json",
//!               "max_bytes": 10000, "backup_count": 3 }
//!   },
//!   "loggers": { "my_app": { "level": "DEBUG" } },
//!   "root": { "level": "DEBUG", "handlers": ["stderr", "file"] },
//!   "queue": { "level": "DEBUG" }
//! }
//! ```
//!
//! [`LoggingConfig::build`] validates every part before anything starts and
//! returns a running [`Pipeline`].

use crate::core::{
    AsyncDispatcher, Formatter, JsonFormatter, LineFormatter, LogLevel, LoggerError,
    LoggerRegistry, OverflowPolicy, RenderConfig, Result, Sink, TimeSpec,
};
use crate::pipeline::Pipeline;
use crate::sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink, RotationPolicy};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn default_line_fmt() -> String {
    LineFormatter::DEFAULT_FMT.to_string()
}

fn default_root_level() -> LogLevel {
    LogLevel::Warn
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormatterSpec {
    Line {
        #[serde(default = "default_line_fmt")]
        fmt: String,
        #[serde(default)]
        timespec: TimeSpec,
        #[serde(default)]
        timezone: Option<String>,
    },
    Json {
        #[serde(default = "JsonFormatter::default_fmt_keys")]
        fmt_keys: IndexMap<String, String>,
        #[serde(default)]
        timespec: TimeSpec,
        #[serde(default)]
        timezone: Option<String>,
    },
}

impl FormatterSpec {
    fn render_config(timespec: TimeSpec, timezone: &Option<String>) -> RenderConfig {
        let config = RenderConfig::new().with_timespec(timespec);
        match timezone {
            Some(timezone) => config.with_timezone(timezone.as_str()),
            None => config,
        }
    }

    /// # Errors
    ///
    /// Fails on unknown field names or an unresolvable timezone.
    pub fn build(&self) -> Result<Arc<dyn Formatter>> {
        Ok(match self {
            FormatterSpec::Line {
                fmt,
                timespec,
                timezone,
            } => Arc::new(LineFormatter::new(
                fmt.as_str(),
                &Self::render_config(*timespec, timezone),
            )?),
            FormatterSpec::Json {
                fmt_keys,
                timespec,
                timezone,
            } => Arc::new(JsonFormatter::new(
                fmt_keys.clone(),
                &Self::render_config(*timespec, timezone),
            )?),
        })
    }
}

/// A handler entry; every handler renders with a named formatter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkSpec {
    Console {
        #[serde(default)]
        target: ConsoleTarget,
        #[serde(default)]
        formatter: Option<String>,
        #[serde(default)]
        level: Option<LogLevel>,
        #[serde(default)]
        colors: bool,
    },
    /// `max_bytes` and `backup_count` default to zero, which disables rotation
    RotatingFile {
        path: PathBuf,
        #[serde(default)]
        formatter: Option<String>,
        #[serde(default)]
        level: Option<LogLevel>,
        #[serde(default)]
        max_bytes: u64,
        #[serde(default)]
        backup_count: usize,
        #[serde(default)]
        compress: bool,
    },
}

impl SinkSpec {
    pub fn formatter(&self) -> Option<&str> {
        match self {
            SinkSpec::Console { formatter, .. } | SinkSpec::RotatingFile { formatter, .. } => {
                formatter.as_deref()
            }
        }
    }

    pub fn level(&self) -> Option<LogLevel> {
        match self {
            SinkSpec::Console { level, .. } | SinkSpec::RotatingFile { level, .. } => *level,
        }
    }

    fn build(
        &self,
        handler: &str,
        formatters: &HashMap<&str, Arc<dyn Formatter>>,
    ) -> Result<Arc<dyn Sink>> {
        let formatter: Arc<dyn Formatter> = match self.formatter() {
            Some(name) => formatters.get(name).cloned().ok_or_else(|| {
                LoggerError::config(
                    format!("handlers.{}", handler),
                    format!("unknown formatter '{}'", name),
                )
            })?,
            None => Arc::new(LineFormatter::default()),
        };

        let sink: Arc<dyn Sink> = match self {
            SinkSpec::Console {
                target,
                level,
                colors,
                ..
            } => {
                let mut sink = ConsoleSink::new(*target, formatter).with_colors(*colors);
                if let Some(level) = level {
                    sink = sink.with_min_level(*level);
                }
                Arc::new(sink)
            }
            SinkSpec::RotatingFile {
                path,
                level,
                max_bytes,
                backup_count,
                compress,
                ..
            } => {
                let policy = RotationPolicy::new()
                    .with_max_bytes(*max_bytes)
                    .with_backup_count(*backup_count)
                    .with_compression(*compress);
                let mut sink = RotatingFileSink::new(path, policy, formatter)?;
                if let Some(level) = level {
                    sink = sink.with_min_level(*level);
                }
                Arc::new(sink)
            }
        };
        Ok(sink)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSpec {
    #[serde(default)]
    pub level: Option<LogLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSpec {
    #[serde(default = "default_root_level")]
    pub level: LogLevel,
    /// Handlers the dispatcher delivers to
    #[serde(default)]
    pub handlers: Vec<String>,
}

impl Default for RootSpec {
    fn default() -> Self {
        Self {
            level: default_root_level(),
            handlers: Vec::new(),
        }
    }
}

/// Dispatch queue settings; unbounded with no threshold by default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSpec {
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub overflow_policy: OverflowPolicy,
    #[serde(default)]
    pub level: Option<LogLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub formatters: IndexMap<String, FormatterSpec>,
    #[serde(default)]
    pub handlers: IndexMap<String, SinkSpec>,
    #[serde(default)]
    pub loggers: IndexMap<String, LoggerSpec>,
    #[serde(default)]
    pub root: RootSpec,
    #[serde(default)]
    pub queue: QueueSpec,
}

impl LoggingConfig {
    /// # Errors
    ///
    /// Returns [`LoggerError::JsonError`] for malformed documents.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "read logging config",
                format!("Failed to read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json_str(&json)
    }

    /// Construct every formatter and handler, wire the root handlers into a
    /// dispatcher, apply logger levels and start the consumer.
    ///
    /// # Errors
    ///
    /// Any configuration problem (unknown formatter or handler name, unknown
    /// field token, unresolvable timezone, unopenable file) fails the whole
    /// build; nothing is started.
    pub fn build(&self) -> Result<Pipeline> {
        let mut formatters: HashMap<&str, Arc<dyn Formatter>> = HashMap::new();
        for (name, spec) in &self.formatters {
            formatters.insert(name.as_str(), spec.build()?);
        }

        let mut sinks: HashMap<&str, Arc<dyn Sink>> = HashMap::new();
        for (name, spec) in &self.handlers {
            sinks.insert(name.as_str(), spec.build(name, &formatters)?);
        }

        let mut builder =
            AsyncDispatcher::builder().overflow_policy(self.queue.overflow_policy.clone());
        if let Some(capacity) = self.queue.capacity {
            builder = builder.capacity(capacity);
        }
        if let Some(level) = self.queue.level {
            builder = builder.min_level(level);
        }
        for name in &self.root.handlers {
            let sink = sinks.get(name.as_str()).ok_or_else(|| {
                LoggerError::config("root.handlers", format!("unknown handler '{}'", name))
            })?;
            builder = builder.sink(Arc::clone(sink));
        }

        let dispatcher = Arc::new(builder.build()?);
        let registry = LoggerRegistry::with_root_level(Arc::clone(&dispatcher), self.root.level);
        for (name, spec) in &self.loggers {
            if let Some(level) = spec.level {
                registry.set_level(name, level);
            }
        }

        dispatcher.start()?;
        Ok(Pipeline::new(registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Emit, LogCall};
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_document() {
        let config = LoggingConfig::from_json_str(
            r#"{
                "formatters": {
                    "simple": { "kind": "line", "fmt": "%(levelname)s %(message)s", "timespec": "seconds" },
                    "json": { "kind": "json", "timezone": "Asia/Tokyo" }
                },
                "handlers": {
                    "stderr": { "kind": "console", "target": "stderr", "formatter": "simple", "level": "WARNING" }
                },
                "loggers": { "my_app": { "level": "DEBUG" } },
                "root": { "level": "INFO", "handlers": ["stderr"] },
                "queue": { "capacity": 100, "overflow_policy": "block" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.formatters.len(), 2);
        assert_eq!(
            config.formatters["json"],
            FormatterSpec::Json {
                fmt_keys: JsonFormatter::default_fmt_keys(),
                timespec: TimeSpec::Milliseconds,
                timezone: Some("Asia/Tokyo".to_string()),
            }
        );
        assert_eq!(config.handlers["stderr"].level(), Some(LogLevel::Warn));
        assert_eq!(config.handlers["stderr"].formatter(), Some("simple"));
        assert_eq!(config.loggers["my_app"].level, Some(LogLevel::Debug));
        assert_eq!(config.root.level, LogLevel::Info);
        assert_eq!(config.queue.capacity, Some(100));
        assert_eq!(config.queue.overflow_policy, OverflowPolicy::Block);
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_json_str("{}").unwrap();
        assert_eq!(config.root.level, LogLevel::Warn);
        assert!(config.root.handlers.is_empty());
        assert_eq!(config.queue, QueueSpec::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = LoggingConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, LoggerError::JsonError(_)));
    }

    #[test]
    fn test_unknown_formatter_token_fails_build() {
        let config = LoggingConfig::from_json_str(
            r#"{ "formatters": { "bad": { "kind": "line", "fmt": "%(bogus)s" } } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build(),
            Err(LoggerError::UnknownFormatKey { .. })
        ));
    }

    #[test]
    fn test_unknown_timezone_fails_build() {
        let config = LoggingConfig::from_json_str(
            r#"{ "formatters": { "j": { "kind": "json", "timezone": "Mars/Olympus" } } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.build(),
            Err(LoggerError::UnknownTimezone { .. })
        ));
    }

    #[test]
    fn test_unknown_names_fail_build() {
        let config = LoggingConfig::from_json_str(
            r#"{ "handlers": { "out": { "kind": "console", "formatter": "missing" } } }"#,
        )
        .unwrap();
        let err = config.build().err().unwrap();
        assert!(err.is_config_error());

        let config =
            LoggingConfig::from_json_str(r#"{ "root": { "handlers": ["missing"] } }"#).unwrap();
        let err = config.build().err().unwrap();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_build_and_log_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("app.jsonl");
        let json = format!(
            r#"{{
                "formatters": {{ "json": {{ "kind": "json", "fmt_keys": {{ "levelname": "level", "message": "message" }} }} }},
                "handlers": {{ "file": {{ "kind": "rotating_file", "path": {}, "formatter": "json" }} }},
                "loggers": {{ "my_app": {{ "level": "DEBUG" }} }},
                "root": {{ "level": "WARNING", "handlers": ["file"] }}
            }}"#,
            serde_json::to_string(&path).unwrap()
        );

        let pipeline = LoggingConfig::from_json_str(&json).unwrap().build().unwrap();
        pipeline.logger("my_app").emit(LogCall::new(LogLevel::Debug, "kept"));
        pipeline.logger("other").emit(LogCall::new(LogLevel::Info, "dropped"));
        pipeline.shutdown().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"level\":\"DEBUG\",\"message\":\"kept\",\"extra\":{}}\n");
    }

    #[test]
    fn test_from_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("log_config.json");
        std::fs::write(&path, r#"{ "root": { "level": "ERROR" } }"#).unwrap();

        let config = LoggingConfig::from_path(&path).unwrap();
        assert_eq!(config.root.level, LogLevel::Error);
        assert!(LoggingConfig::from_path(temp_dir.path().join("absent.json")).is_err());
    }
}
