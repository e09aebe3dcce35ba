//! Structured (JSON) formatter
//!
//! Renders an event as one single-line JSON object: configured intrinsic
//! fields under their output keys, optional exception/stack text, and an
//! `extra` object that is always present.
//!
//! Example: `{"timestamp":"2025-01-08T10:30:45.123+00:00","message":"Request processed","extra":{}}`

use super::catalog::{self, FieldCatalog};
use super::error::{LoggerError, Result};
use super::event::Event;
use super::formatter::{extra_fields, resolve_field, Formatter};
use super::timestamp::{RenderConfig, TimestampRenderer};
use indexmap::IndexMap;
use serde_json::{Map, Value};

pub const DEFAULT_EXC_INFO_KEY: &str = "excInfo";
pub const DEFAULT_STACK_INFO_KEY: &str = "stackInfo";
pub const EXTRA_KEY: &str = "extra";

pub struct JsonFormatter {
    fmt_keys: IndexMap<String, String>,
    renderer: TimestampRenderer,
}

impl JsonFormatter {
    /// Default renaming: `asctime` -> `timestamp`, `message` -> `message`
    pub fn default_fmt_keys() -> IndexMap<String, String> {
        IndexMap::from([
            ("asctime".to_string(), "timestamp".to_string()),
            ("message".to_string(), "message".to_string()),
        ])
    }

    /// Build a formatter from an ordered `intrinsic name -> output key` mapping.
    ///
    /// `exc_info` and `stack_info` entries only rename the exception and
    /// stack keys; `msg` entries are ignored at render time.
    ///
    /// # Errors
    ///
    /// Fails if a source name is not an intrinsic field or the timezone
    /// cannot be resolved.
    ///
    /// # Examples
    ///
    /// ```
    /// use indexmap::IndexMap;
    /// use log_pipeline::core::{JsonFormatter, RenderConfig};
    ///
    /// let keys = IndexMap::from([("levelname".to_string(), "level".to_string())]);
    /// assert!(JsonFormatter::new(keys, &RenderConfig::new()).is_ok());
    ///
    /// let keys = IndexMap::from([("bogus".to_string(), "b".to_string())]);
    /// assert!(JsonFormatter::new(keys, &RenderConfig::new()).is_err());
    /// ```
    pub fn new(fmt_keys: IndexMap<String, String>, config: &RenderConfig) -> Result<Self> {
        let catalog = FieldCatalog::global();
        if let Some(key) = fmt_keys.keys().find(|key| !catalog.is_intrinsic(key)) {
            return Err(LoggerError::unknown_key(key.as_str()));
        }
        let renderer = config.resolve()?;
        Ok(Self { fmt_keys, renderer })
    }

    pub fn fmt_keys(&self) -> &IndexMap<String, String> {
        &self.fmt_keys
    }

    fn output_key<'a>(&'a self, field: &str, default: &'a str) -> &'a str {
        self.fmt_keys.get(field).map_or(default, String::as_str)
    }

    /// Ordered key/value structure before serialization
    pub fn to_value(&self, event: &Event) -> Value {
        let mut log_data = Map::new();

        for (field, output_key) in &self.fmt_keys {
            if catalog::is_special(field) {
                continue;
            }
            log_data.insert(
                output_key.clone(),
                Value::String(resolve_field(event, field, &self.renderer)),
            );
        }

        if let Some(exception) = event.exception() {
            log_data.insert(
                self.output_key("exc_info", DEFAULT_EXC_INFO_KEY).to_string(),
                Value::String(exception.format()),
            );
        }
        if let Some(stack) = event.stack() {
            log_data.insert(
                self.output_key("stack_info", DEFAULT_STACK_INFO_KEY).to_string(),
                Value::String(stack.format()),
            );
        }

        let extra: Map<String, Value> = extra_fields(event)
            .map(|(key, value)| (key.to_string(), Value::String(value.render())))
            .collect();
        log_data.insert(EXTRA_KEY.to_string(), Value::Object(extra));

        Value::Object(log_data)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self {
            fmt_keys: Self::default_fmt_keys(),
            renderer: TimestampRenderer::default(),
        }
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, event: &Event) -> String {
        serde_json::to_string(&self.to_value(event)).unwrap_or_default()
    }

    fn name(&self) -> &str {
        "json"
    }
}
