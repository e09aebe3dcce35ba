//! Logging macros capturing the call site.
//!
//! Each macro takes a logger (anything implementing
//! [`Emit`](crate::core::Emit)), a message template with `{}` placeholders,
//! positional arguments, and optionally extra fields after a `;`.
//! Arguments are only evaluated when the level is enabled.
//!
//! # Examples
//!
//! ```
//! use log_pipeline::prelude::*;
//! use log_pipeline::{info, warn};
//! use std::sync::Arc;
//!
//! let dispatcher = Arc::new(AsyncDispatcher::new());
//! dispatcher.start().unwrap();
//! let registry = LoggerRegistry::with_root_level(Arc::clone(&dispatcher), LogLevel::Info);
//! let logger = registry.get_logger("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // Positional arguments
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! // Extra fields
//! warn!(logger, "Slow request {}", "/api/users"; "elapsed_ms" => 1250, "method" => "GET");
//!
//! dispatcher.shutdown().unwrap();
//! ```

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// # use log_pipeline::prelude::*;
/// # use std::sync::Arc;
/// # let dispatcher = Arc::new(AsyncDispatcher::new());
/// # dispatcher.start().unwrap();
/// # let logger = LoggerRegistry::new(Arc::clone(&dispatcher)).root();
/// use log_pipeline::log;
/// log!(logger, LogLevel::Error, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500; "path" => "/health");
/// # dispatcher.shutdown().unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $template:expr $(, $arg:expr)* $(; $($key:literal => $value:expr),+)?) => {{
        use $crate::core::Emit as _;
        let __logger = &$logger;
        let __level = $level;
        if __logger.is_enabled_for(__level) {
            __logger.emit(
                $crate::core::LogCall::new(__level, $template)
                    .at(file!(), line!(), module_path!())
                    $(.arg($arg))*
                    $($(.field($key, $value))+)?
            );
        }
    }};
}

/// Log a trace-level message.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Trace, $($rest)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($rest)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use log_pipeline::prelude::*;
/// # use std::sync::Arc;
/// # let dispatcher = Arc::new(AsyncDispatcher::new());
/// # dispatcher.start().unwrap();
/// # let logger = LoggerRegistry::with_root_level(Arc::clone(&dispatcher), LogLevel::Info).root();
/// use log_pipeline::info;
/// info!(logger, "Processing {} items", 100);
/// # dispatcher.shutdown().unwrap();
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($rest)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($rest)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use log_pipeline::prelude::*;
/// # use std::sync::Arc;
/// # let dispatcher = Arc::new(AsyncDispatcher::new());
/// # dispatcher.start().unwrap();
/// # let logger = LoggerRegistry::new(Arc::clone(&dispatcher)).get_logger("db");
/// use log_pipeline::error;
/// error!(logger, "Error code: {}, message: {}", 500, "Internal error"; "retry" => false);
/// # dispatcher.shutdown().unwrap();
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($rest)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($rest:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($rest)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{AsyncDispatcher, Event, LogLevel, LoggerRegistry, Result, Sink};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<Event>>,
    }

    impl Sink for CollectingSink {
        fn accept(&self, event: &Event) -> Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }

        fn name(&self) -> &str {
            "collecting"
        }
    }

    #[test]
    fn test_macros_capture_location_args_and_fields() {
        let sink = Arc::new(CollectingSink::default());
        let dispatcher = Arc::new(AsyncDispatcher::builder().sink(sink.clone()).build().unwrap());
        dispatcher.start().unwrap();
        let registry = LoggerRegistry::with_root_level(Arc::clone(&dispatcher), LogLevel::Debug);
        let logger = registry.get_logger("macros");

        crate::trace!(logger, "not emitted {}", 1);
        crate::info!(logger, "plain");
        crate::warn!(logger, "user {} tried {} times", "alice", 3; "ip" => "10.0.0.1", "blocked" => true);
        crate::log!(logger, LogLevel::Fatal, "direct");

        dispatcher.flush(Duration::from_secs(5)).unwrap();
        let events = sink.events.lock().clone();
        assert_eq!(events.len(), 3);

        assert_eq!(events[0].message(), "plain");
        assert!(events[0].extra().is_empty());

        assert_eq!(events[1].level(), LogLevel::Warn);
        assert_eq!(events[1].message(), "user alice tried 3 times");
        assert_eq!(events[1].extra().format_fields(), "ip=10.0.0.1 blocked=true");
        assert!(events[1].attribute("pathname").unwrap().ends_with("macros.rs"));
        assert_eq!(events[1].attribute("module").as_deref(), Some(module_path!()));

        assert_eq!(events[2].level(), LogLevel::Fatal);
        dispatcher.shutdown().unwrap();
    }

    #[test]
    fn test_disabled_level_skips_argument_evaluation() {
        let dispatcher = Arc::new(AsyncDispatcher::new());
        dispatcher.start().unwrap();
        let logger = LoggerRegistry::new(Arc::clone(&dispatcher)).root();

        let mut evaluated = false;
        crate::debug!(logger, "value {}", {
            evaluated = true;
            1
        });
        assert!(!evaluated);
        dispatcher.shutdown().unwrap();
    }
}
