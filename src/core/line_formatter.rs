//! Human-readable single-line formatter
//!
//! Renders the configured intrinsic fields separated by spaces, then the
//! exception/stack block on its own lines, then extra fields as `key=value`.
//!
//! Example: `2025-01-08T10:30:45.123+00:00 user alice logged in ip=10.0.0.1`

use super::catalog::{self, FieldCatalog};
use super::error::{LoggerError, Result};
use super::event::Event;
use super::formatter::{extra_fields, resolve_field, Formatter};
use super::timestamp::{RenderConfig, TimeSpec, TimestampRenderer};

pub struct LineFormatter {
    fmt: String,
    keys: Vec<String>,
    renderer: TimestampRenderer,
}

impl LineFormatter {
    pub const DEFAULT_FMT: &'static str = "%(asctime)s %(message)s";

    /// Build a formatter from a space-separated `%(name)s` format string.
    ///
    /// Tokens naming `msg`, `exc_info` or `stack_info` are accepted and
    /// skipped; those fields are rendered by dedicated blocks.
    ///
    /// # Errors
    ///
    /// Fails on a token without the `%(...)x` wrapper, a token naming an
    /// unknown field, or an unresolvable timezone.
    ///
    /// # Examples
    ///
    /// ```
    /// use log_pipeline::core::{LineFormatter, RenderConfig};
    ///
    /// assert!(LineFormatter::new("%(asctime)s %(levelname)s %(message)s", &RenderConfig::new()).is_ok());
    /// assert!(LineFormatter::new("%(bogus)s", &RenderConfig::new()).is_err());
    /// ```
    pub fn new(fmt: impl Into<String>, config: &RenderConfig) -> Result<Self> {
        let fmt = fmt.into();
        let keys = parse_fmt_keys(&fmt)?;
        let renderer = config.resolve()?;
        Ok(Self { fmt, keys, renderer })
    }

    pub fn fmt(&self) -> &str {
        &self.fmt
    }

    /// Validated field names in render order
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    fn write_main_fields(&self, event: &Event, out: &mut String) {
        for key in &self.keys {
            out.push_str(&resolve_field(event, key, &self.renderer));
            out.push(' ');
        }
        out.pop();
    }

    /// Returns whether an exception or stack block was written
    fn write_exception_block(&self, event: &Event, out: &mut String) -> bool {
        let mut emitted = false;
        if let Some(exception) = event.exception() {
            push_seam(out, '\n');
            out.push_str(&exception.format());
            emitted = true;
        }
        if let Some(stack) = event.stack() {
            push_seam(out, '\n');
            out.push_str(&stack.format());
            emitted = true;
        }
        emitted
    }

    fn write_extra_fields(&self, event: &Event, out: &mut String, after_block: bool) {
        let mut extras = extra_fields(event).peekable();
        if extras.peek().is_none() {
            return;
        }
        push_seam(out, if after_block { '\n' } else { ' ' });
        for (key, value) in extras {
            out.push_str(key);
            out.push('=');
            out.push_str(&value.render());
            out.push(' ');
        }
        out.pop();
    }
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self {
            fmt: Self::DEFAULT_FMT.to_string(),
            keys: vec!["asctime".to_string(), "message".to_string()],
            renderer: TimestampRenderer::utc(TimeSpec::Milliseconds),
        }
    }
}

impl Formatter for LineFormatter {
    fn format(&self, event: &Event) -> String {
        let mut out = String::with_capacity(128);
        self.write_main_fields(event, &mut out);
        let after_block = self.write_exception_block(event, &mut out);
        self.write_extra_fields(event, &mut out, after_block);
        out.truncate(out.trim_end().len());
        out
    }

    fn name(&self) -> &str {
        "line"
    }
}

/// Separators only go between rendered parts, never before the first one
fn push_seam(out: &mut String, separator: char) {
    if !out.is_empty() {
        out.push(separator);
    }
}

fn parse_fmt_keys(fmt: &str) -> Result<Vec<String>> {
    let catalog = FieldCatalog::global();
    let mut keys = Vec::new();
    for token in fmt.split(' ') {
        let key = strip_token(token).ok_or_else(|| LoggerError::MalformedFormatToken {
            token: token.to_string(),
        })?;
        if catalog::is_special(key) {
            continue;
        }
        if !catalog.is_intrinsic(key) {
            return Err(LoggerError::unknown_key(key));
        }
        keys.push(key.to_string());
    }
    Ok(keys)
}

/// `%(name)s` -> `name`; any single-letter conversion suffix is accepted
fn strip_token(token: &str) -> Option<&str> {
    let inner = token.strip_prefix("%(")?;
    let mut chars = inner.chars();
    let conversion = chars.next_back()?;
    if !conversion.is_ascii_alphabetic() {
        return None;
    }
    let name = chars.as_str().strip_suffix(')')?;
    if name.is_empty() {
        return None;
    }
    Some(name)
}
