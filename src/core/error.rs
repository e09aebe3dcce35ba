//! Error types for the logging pipeline

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Format token that does not name an intrinsic field
    #[error("Unknown format key: {key}")]
    UnknownFormatKey { key: String },

    /// Format token without the `%(name)s` wrapper
    #[error("Malformed format token: '{token}'")]
    MalformedFormatToken { token: String },

    /// Timezone identifier that cannot be resolved
    #[error("Unknown timezone: '{timezone}'")]
    UnknownTimezone { timezone: String },

    /// Extra field whose key shadows an intrinsic field
    #[error("Extra field '{key}' collides with an intrinsic field")]
    ReservedField { key: String },

    /// Sink failure with the sink name
    #[error("Sink '{sink}' failed: {message}")]
    SinkError { sink: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotationError { path: String, message: String },

    /// Submission before the consumer was started
    #[error("Dispatcher has not been started")]
    DispatcherNotStarted,

    /// Second start of the same dispatcher
    #[error("Dispatcher already started")]
    DispatcherAlreadyStarted,

    /// Submission or shutdown after shutdown
    #[error("Dispatcher already stopped")]
    DispatcherStopped,

    /// Bounded queue full, event dropped
    #[error("Dispatch queue full: capacity {capacity}")]
    QueueFull { capacity: usize },

    /// Flush barrier was not acknowledged in time
    #[error("Flush not acknowledged within {0:?}")]
    FlushTimeout(Duration),

    /// Consumer thread panicked
    #[error("Dispatcher worker panicked: {0}")]
    WorkerPanicked(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn unknown_key(key: impl Into<String>) -> Self {
        LoggerError::UnknownFormatKey { key: key.into() }
    }

    pub fn unknown_timezone(timezone: impl Into<String>) -> Self {
        LoggerError::UnknownTimezone {
            timezone: timezone.into(),
        }
    }

    /// Create a sink error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotationError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error stems from a broken deployment rather than a transient fault
    ///
    /// Configuration errors are raised at construction time only; a
    /// formatter or dispatcher that failed with one of these was never built.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            LoggerError::InvalidConfiguration { .. }
                | LoggerError::UnknownFormatKey { .. }
                | LoggerError::MalformedFormatToken { .. }
                | LoggerError::UnknownTimezone { .. }
                | LoggerError::ReservedField { .. }
                | LoggerError::DispatcherNotStarted
                | LoggerError::DispatcherAlreadyStarted
                | LoggerError::JsonError(_)
        )
    }
}
