//! Core pipeline types and traits

pub mod adapter;
pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod fields;
pub mod formatter;
pub mod json_formatter;
pub mod line_formatter;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod sink;
pub mod timestamp;

pub use adapter::ContextAdapter;
pub use catalog::FieldCatalog;
pub use dispatcher::{AsyncDispatcher, DispatcherBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use error::{LoggerError, Result};
pub use event::{interpolate, Event, EventBuilder, ExceptionInfo, Location, StackInfo};
pub use fields::{FieldValue, Fields};
pub use formatter::Formatter;
pub use json_formatter::JsonFormatter;
pub use line_formatter::LineFormatter;
pub use log_level::LogLevel;
pub use logger::{Emit, LogCall, Logger, LoggerRegistry, ROOT_LOGGER_NAME};
pub use metrics::DispatcherMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use sink::Sink;
pub use timestamp::{RenderConfig, TimeSpec, TimestampRenderer};
