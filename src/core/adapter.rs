//! Context adapter: a logger wrapper carrying fixed extra fields

use super::{
    fields::{FieldValue, Fields},
    log_level::LogLevel,
    logger::{Emit, LogCall},
};

/// Wraps any [`Emit`] target and merges a fixed field set into every call.
///
/// Call-site fields win on key collision. Neither the adapter's fields nor
/// the caller's are modified. Wrapping an adapter applies the same overlay
/// once per level, so outer fixed fields overwrite inner ones.
///
/// # Example
///
/// ```
/// use log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let dispatcher = Arc::new(AsyncDispatcher::new());
/// dispatcher.start().unwrap();
/// let registry = LoggerRegistry::with_root_level(Arc::clone(&dispatcher), LogLevel::Info);
///
/// let request_log = ContextAdapter::new(
///     registry.get_logger("http"),
///     Fields::new().with_field("request_id", "abc-123"),
/// );
/// request_log.info("request received");
///
/// dispatcher.shutdown().unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ContextAdapter<L: Emit> {
    inner: L,
    extra: Fields,
}

impl<L: Emit> ContextAdapter<L> {
    pub fn new(inner: L, extra: Fields) -> Self {
        Self { inner, extra }
    }

    /// Add a fixed field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }

    pub fn fields(&self) -> &Fields {
        &self.extra
    }

    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: Emit> Emit for ContextAdapter<L> {
    fn emit(&self, call: LogCall) {
        let merged = self.extra.overlay(call.fields());
        self.inner.emit(call.extra(merged));
    }

    fn is_enabled_for(&self, level: LogLevel) -> bool {
        self.inner.is_enabled_for(level)
    }
}
