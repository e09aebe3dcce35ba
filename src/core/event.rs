//! Log event structure

use super::catalog::FieldCatalog;
use super::error::{LoggerError, Result};
use super::fields::{FieldValue, Fields};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::fmt;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

static PROCESS_START: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

static PROCESS_NAME: Lazy<String> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "MainProcess".to_string())
});

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

/// Attribute names carried by every event, in record order
pub(crate) const RECORD_ATTRIBUTES: &[&str] = &[
    "name",
    "msg",
    "args",
    "levelname",
    "levelno",
    "pathname",
    "filename",
    "module",
    "exc_info",
    "exc_text",
    "stack_info",
    "lineno",
    "funcName",
    "created",
    "msecs",
    "relativeCreated",
    "thread",
    "threadName",
    "processName",
    "process",
    "taskName",
];

/// Source location of the emitting call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub module_path: String,
    pub function: Option<String>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, module_path: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            module_path: module_path.into(),
            function: None,
        }
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    fn filename(&self) -> &str {
        self.file.rsplit(['/', '\\']).next().unwrap_or(&self.file)
    }
}

/// Captured error: kind, message, cause chain and optional backtrace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    kind: String,
    message: String,
    causes: Vec<String>,
    backtrace: Option<String>,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            causes: Vec::new(),
            backtrace: None,
        }
    }

    /// Capture an error and its `source()` chain
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut info = Self::new(error_kind(std::any::type_name::<E>()), error.to_string());
        let mut source = error.source();
        while let Some(cause) = source {
            info.causes.push(cause.to_string());
            source = cause.source();
        }
        info
    }

    /// Capture an error together with the current backtrace
    pub fn capture<E>(error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::from_error(error).with_backtrace(Backtrace::force_capture().to_string())
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.causes.push(cause.into());
        self
    }

    #[must_use]
    pub fn with_backtrace(mut self, backtrace: impl Into<String>) -> Self {
        self.backtrace = Some(backtrace.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Multi-line traceback text without trailing whitespace
    pub fn format(&self) -> String {
        let mut out = format!("{}: {}", self.kind, self.message);
        if !self.causes.is_empty() {
            out.push_str("\nCaused by:");
            for (idx, cause) in self.causes.iter().enumerate() {
                out.push_str(&format!("\n    {}: {}", idx, cause));
            }
        }
        if let Some(backtrace) = self.backtrace.as_deref().map(str::trim_end) {
            if !backtrace.is_empty() {
                out.push_str("\nStack backtrace:\n");
                out.push_str(backtrace);
            }
        }
        out.truncate(out.trim_end().len());
        out
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Short type name used as the exception kind.
///
/// Generic arguments and the module path are stripped; trait objects have
/// no concrete name and render as `Error`.
fn error_kind(type_name: &str) -> &str {
    if type_name.starts_with("dyn ") {
        return "Error";
    }
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Call stack captured at the emitting call site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackInfo(String);

impl StackInfo {
    pub fn new(frames: impl Into<String>) -> Self {
        Self(frames.into())
    }

    pub fn capture() -> Self {
        Self(Backtrace::force_capture().to_string())
    }

    pub fn format(&self) -> String {
        let frames = self.0.trim_end();
        if frames.is_empty() {
            return "Stack (most recent call first):".to_string();
        }
        format!("Stack (most recent call first):\n{}", frames)
    }
}

/// One immutable log occurrence
///
/// Built through [`EventBuilder`]; extra-field keys never collide with
/// intrinsic field names.
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    level: LogLevel,
    template: String,
    args: Vec<FieldValue>,
    created: DateTime<Utc>,
    location: Option<Location>,
    exception: Option<ExceptionInfo>,
    stack: Option<StackInfo>,
    thread_id: String,
    thread_name: Option<String>,
    extra: Fields,
}

impl Event {
    pub fn builder(name: impl Into<String>, level: LogLevel, template: impl Into<String>) -> EventBuilder {
        EventBuilder::new(name, level, template)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[FieldValue] {
        &self.args
    }

    pub fn created(&self) -> &DateTime<Utc> {
        &self.created
    }

    /// Creation instant as fractional seconds since the epoch
    pub fn created_secs(&self) -> f64 {
        self.created.timestamp_micros() as f64 / 1_000_000.0
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn stack(&self) -> Option<&StackInfo> {
        self.stack.as_ref()
    }

    pub fn extra(&self) -> &Fields {
        &self.extra
    }

    /// Message template with positional arguments interpolated
    pub fn message(&self) -> String {
        interpolate(&self.template, &self.args)
    }

    /// Direct lookup of an intrinsic attribute rendered as text.
    ///
    /// The derived fields `message`, `asctime` and `timestamp` are resolved
    /// by formatters, not here; unknown names yield `None`.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "name" => self.name.clone(),
            "msg" => self.template.clone(),
            "args" => format!(
                "({})",
                self.args
                    .iter()
                    .map(FieldValue::render)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            "levelname" => self.level.to_str().to_string(),
            "levelno" => self.level.number().to_string(),
            "pathname" => self
                .location
                .as_ref()
                .map_or_else(|| "(unknown file)".to_string(), |l| l.file.clone()),
            "filename" => self
                .location
                .as_ref()
                .map_or_else(|| "(unknown file)".to_string(), |l| l.filename().to_string()),
            "module" => self
                .location
                .as_ref()
                .map_or_else(|| "(unknown module)".to_string(), |l| l.module_path.clone()),
            "lineno" => self.location.as_ref().map_or(0, |l| l.line).to_string(),
            "funcName" => self
                .location
                .as_ref()
                .and_then(|l| l.function.clone())
                .unwrap_or_else(|| "(unknown function)".to_string()),
            "exc_info" => self
                .exception
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            "exc_text" => self
                .exception
                .as_ref()
                .map(ExceptionInfo::format)
                .unwrap_or_default(),
            "stack_info" => self.stack.as_ref().map(StackInfo::format).unwrap_or_default(),
            "created" => self.created_secs().to_string(),
            "msecs" => (f64::from(self.created.timestamp_subsec_micros()) / 1_000.0).to_string(),
            "relativeCreated" => {
                let elapsed = self.created.signed_duration_since(*PROCESS_START);
                (elapsed.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000.0).to_string()
            }
            "thread" => self.thread_id.clone(),
            "threadName" => self
                .thread_name
                .clone()
                .unwrap_or_else(|| self.thread_id.clone()),
            "processName" => PROCESS_NAME.clone(),
            "process" => std::process::id().to_string(),
            "taskName" => String::new(),
            _ => return None,
        };
        Some(value)
    }
}

/// Builder for [`Event`]
#[derive(Debug, Clone)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn new(name: impl Into<String>, level: LogLevel, template: impl Into<String>) -> Self {
        Lazy::force(&PROCESS_START);
        Self {
            event: Event {
                name: name.into(),
                level,
                template: template.into(),
                args: Vec::new(),
                created: Utc::now(),
                location: None,
                exception: None,
                stack: None,
                thread_id: get_thread_id(),
                thread_name: get_thread_name(),
                extra: Fields::new(),
            },
        }
    }

    #[must_use]
    pub fn args(mut self, args: Vec<FieldValue>) -> Self {
        self.event.args = args;
        self
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.event.args.push(value.into());
        self
    }

    #[must_use]
    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.event.created = created;
        self
    }

    #[must_use]
    pub fn location(mut self, location: Option<Location>) -> Self {
        self.event.location = location;
        self
    }

    #[must_use]
    pub fn exception(mut self, exception: Option<ExceptionInfo>) -> Self {
        self.event.exception = exception;
        self
    }

    #[must_use]
    pub fn stack(mut self, stack: Option<StackInfo>) -> Self {
        self.event.stack = stack;
        self
    }

    #[must_use]
    pub fn extra(mut self, extra: Fields) -> Self {
        self.event.extra = extra;
        self
    }

    /// # Errors
    ///
    /// Returns [`LoggerError::ReservedField`] if an extra key names an intrinsic field.
    pub fn build(self) -> Result<Event> {
        let catalog = FieldCatalog::global();
        if let Some(key) = self.event.extra.keys().find(|k| catalog.is_intrinsic(k)) {
            return Err(LoggerError::ReservedField {
                key: key.to_string(),
            });
        }
        Ok(self.event)
    }
}

/// Substitute `{}` placeholders with positional arguments in order.
///
/// `{{` and `}}` produce literal braces; placeholders without a matching
/// argument stay as `{}`; surplus arguments are ignored.
pub fn interpolate(template: &str, args: &[FieldValue]) -> String {
    let mut out = String::with_capacity(template.len() + args.len() * 8);
    let mut args = args.iter();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('{')) => {
                chars.next();
                out.push('{');
            }
            ('}', Some('}')) => {
                chars.next();
                out.push('}');
            }
            ('{', Some('}')) => {
                chars.next();
                match args.next() {
                    Some(arg) => out.push_str(&arg.render()),
                    None => out.push_str("{}"),
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation() {
        let args = vec![FieldValue::from("alice"), FieldValue::from(3)];
        assert_eq!(interpolate("user {} logged in {} times", &args), "user alice logged in 3 times");
        assert_eq!(interpolate("{{literal}} {}", &args), "{literal} alice");
        assert_eq!(interpolate("{} {} {}", &args), "alice 3 {}");
        assert_eq!(interpolate("no placeholders", &args), "no placeholders");
        assert_eq!(interpolate("", &[]), "");
    }

    #[test]
    fn test_builder_rejects_reserved_extra() {
        let result = Event::builder("app", LogLevel::Info, "hello")
            .extra(Fields::new().with_field("levelname", "spoofed"))
            .build();
        assert!(matches!(result, Err(LoggerError::ReservedField { key }) if key == "levelname"));

        let result = Event::builder("app", LogLevel::Info, "hello")
            .extra(Fields::new().with_field("message", "spoofed"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_attributes_without_location() {
        let event = Event::builder("app.db", LogLevel::Warn, "slow query {}")
            .arg(250)
            .build()
            .unwrap();

        assert_eq!(event.attribute("name").as_deref(), Some("app.db"));
        assert_eq!(event.attribute("msg").as_deref(), Some("slow query {}"));
        assert_eq!(event.attribute("args").as_deref(), Some("(250)"));
        assert_eq!(event.attribute("levelname").as_deref(), Some("WARN"));
        assert_eq!(event.attribute("levelno").as_deref(), Some("30"));
        assert_eq!(event.attribute("pathname").as_deref(), Some("(unknown file)"));
        assert_eq!(event.attribute("lineno").as_deref(), Some("0"));
        assert_eq!(event.attribute("exc_text").as_deref(), Some(""));
        assert_eq!(event.attribute("bogus"), None);
        assert_eq!(event.message(), "slow query 250");
    }

    #[test]
    fn test_attributes_with_location() {
        let event = Event::builder("app", LogLevel::Info, "x")
            .location(Some(Location::new("src/net/server.rs", 42, "app::net").with_function("serve")))
            .build()
            .unwrap();

        assert_eq!(event.attribute("pathname").as_deref(), Some("src/net/server.rs"));
        assert_eq!(event.attribute("filename").as_deref(), Some("server.rs"));
        assert_eq!(event.attribute("module").as_deref(), Some("app::net"));
        assert_eq!(event.attribute("lineno").as_deref(), Some("42"));
        assert_eq!(event.attribute("funcName").as_deref(), Some("serve"));
    }

    #[test]
    fn test_every_record_attribute_resolves() {
        let event = Event::builder("app", LogLevel::Info, "x").build().unwrap();
        for name in RECORD_ATTRIBUTES {
            assert!(event.attribute(name).is_some(), "attribute {} did not resolve", name);
        }
    }

    #[test]
    fn test_exception_format_from_error_chain() {
        #[derive(Debug)]
        struct Outer(std::io::Error);

        impl fmt::Display for Outer {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "failed to load settings")
            }
        }

        impl std::error::Error for Outer {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "settings.json missing"));
        let info = ExceptionInfo::from_error(&err);

        assert_eq!(info.kind(), "Outer");
        assert_eq!(
            info.format(),
            "Outer: failed to load settings\nCaused by:\n    0: settings.json missing"
        );
    }

    #[test]
    fn test_exception_kind_for_trait_objects_and_generics() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = "disk full".into();
        let info = ExceptionInfo::from_error(&*boxed);
        assert_eq!(info.kind(), "Error");
        assert_eq!(info.format(), "Error: disk full");

        let poisoned = std::sync::PoisonError::new(vec!["a".to_string()]);
        let info = ExceptionInfo::from_error(&poisoned);
        assert_eq!(info.kind(), "PoisonError");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "broken pipe");
        assert_eq!(ExceptionInfo::from_error(&io).kind(), "Error");
        assert_eq!(error_kind("alloc::vec::Vec<alloc::string::String>"), "Vec");
    }

    #[test]
    fn test_exception_format_trims_backtrace() {
        let info = ExceptionInfo::new("ZeroDivisionError", "division by zero")
            .with_backtrace("   0: main\n   1: start\n\n");
        assert_eq!(
            info.format(),
            "ZeroDivisionError: division by zero\nStack backtrace:\n   0: main\n   1: start"
        );
    }

    #[test]
    fn test_stack_info_format() {
        assert_eq!(
            StackInfo::new("   0: worker::run\n").format(),
            "Stack (most recent call first):\n   0: worker::run"
        );
    }
}
