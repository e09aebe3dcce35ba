//! A started registry and dispatcher pair

use crate::core::{AsyncDispatcher, DispatcherMetrics, Logger, LoggerRegistry, Result};
use std::sync::Arc;
use std::time::Duration;

/// Running logging pipeline
///
/// Usually obtained from [`LoggingConfig::build`](crate::config::LoggingConfig::build).
/// Call [`shutdown`](Self::shutdown) once during teardown so every queued
/// event is delivered.
#[derive(Clone)]
pub struct Pipeline {
    registry: LoggerRegistry,
    dispatcher: Arc<AsyncDispatcher>,
}

impl Pipeline {
    pub fn new(registry: LoggerRegistry) -> Self {
        let dispatcher = Arc::clone(registry.dispatcher());
        Self {
            registry,
            dispatcher,
        }
    }

    pub fn logger(&self, name: &str) -> Logger {
        self.registry.get_logger(name)
    }

    pub fn registry(&self) -> &LoggerRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &AsyncDispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &DispatcherMetrics {
        self.dispatcher.metrics()
    }

    /// # Errors
    ///
    /// See [`AsyncDispatcher::flush`].
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.dispatcher.flush(timeout)
    }

    /// Drain and stop the dispatcher
    ///
    /// # Errors
    ///
    /// See [`AsyncDispatcher::shutdown`].
    pub fn shutdown(&self) -> Result<()> {
        self.dispatcher.shutdown()
    }
}
