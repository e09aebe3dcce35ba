//! # Log Pipeline
//!
//! A structured logging pipeline that renders events as human-readable
//! lines or single-line JSON and delivers them to sinks from a dedicated
//! background thread.
//!
//! ## Features
//!
//! - **Two renderings**: `%(name)s`-style line format and ordered JSON with an
//!   always-present `extra` object
//! - **Validated up front**: unknown field tokens and timezones fail at
//!   construction, never while logging
//! - **Non-blocking producers**: a FIFO queue with one consumer thread that
//!   fans events out to every sink, isolating sink failures
//! - **Context adapters**: fixed extra fields merged into every call
//! - **Declarative setup**: a JSON config builds a running [`Pipeline`]
//!
//! ## Example
//!
//! ```
//! use log_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! let formatter = LineFormatter::new("%(levelname)s %(name)s %(message)s", &RenderConfig::new()).unwrap();
//! let dispatcher = AsyncDispatcher::builder()
//!     .sink(Arc::new(ConsoleSink::new(ConsoleTarget::Stdout, Arc::new(formatter))))
//!     .build()
//!     .unwrap();
//! dispatcher.start().unwrap();
//!
//! let registry = LoggerRegistry::with_root_level(Arc::new(dispatcher), LogLevel::Debug);
//! let logger = registry.get_logger("my_app");
//! logger.emit(LogCall::new(LogLevel::Info, "user {} logged in").arg("alice").field("ip", "10.0.0.1"));
//!
//! registry.dispatcher().shutdown().unwrap();
//! ```

pub mod config;
pub mod core;
pub mod macros;
pub mod pipeline;
pub mod sinks;

pub mod prelude {
    pub use crate::config::LoggingConfig;
    pub use crate::core::{
        AsyncDispatcher, ContextAdapter, DispatcherMetrics, Emit, Event, ExceptionInfo, Fields,
        FieldValue, Formatter, JsonFormatter, LineFormatter, LogCall, LogLevel, Logger,
        LoggerError, LoggerRegistry, OverflowCallback, OverflowPolicy, RenderConfig, Result,
        Sink, StackInfo, TimeSpec, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::pipeline::Pipeline;
    pub use crate::sinks::{ConsoleSink, ConsoleTarget, RotatingFileSink, RotationPolicy, StreamSink};
}

pub use crate::config::LoggingConfig;
pub use crate::core::{
    AsyncDispatcher, ContextAdapter, DispatcherMetrics, Emit, Event, ExceptionInfo, Fields,
    FieldValue, Formatter, JsonFormatter, LineFormatter, LogCall, LogLevel, Logger, LoggerError,
    LoggerRegistry, OverflowCallback, OverflowPolicy, RenderConfig, Result, Sink, StackInfo,
    TimeSpec, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use crate::pipeline::Pipeline;
pub use crate::sinks::{ConsoleSink, RotatingFileSink, StreamSink};
