//! Named loggers and the registry that owns them
//!
//! A [`LoggerRegistry`] is an explicit service built around one
//! [`AsyncDispatcher`]. Producers ask it for [`Logger`] handles by dotted
//! name; a logger without its own level inherits the nearest ancestor's,
//! ending at the root.

use super::{
    catalog::FieldCatalog,
    dispatcher::AsyncDispatcher,
    error::{LoggerError, Result},
    event::{Event, ExceptionInfo, Location, StackInfo},
    fields::{FieldValue, Fields},
    log_level::LogLevel,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const ROOT_LOGGER_NAME: &str = "root";

/// Call-site bundle handed to [`Emit::emit`]
#[derive(Debug, Clone)]
pub struct LogCall {
    level: LogLevel,
    template: String,
    args: Vec<FieldValue>,
    extra: Fields,
    exception: Option<ExceptionInfo>,
    stack: Option<StackInfo>,
    location: Option<Location>,
}

impl LogCall {
    pub fn new(level: LogLevel, template: impl Into<String>) -> Self {
        Self {
            level,
            template: template.into(),
            args: Vec::new(),
            extra: Fields::new(),
            exception: None,
            stack: None,
            location: None,
        }
    }

    /// Append a positional argument for the next `{}` placeholder
    #[must_use]
    pub fn arg(mut self, value: impl Into<FieldValue>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Add one extra field
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.insert(key, value);
        self
    }

    /// Replace the extra fields
    #[must_use]
    pub fn extra(mut self, extra: Fields) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Attach an error and its source chain
    #[must_use]
    pub fn error<E>(self, error: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        self.exception(ExceptionInfo::from_error(error))
    }

    #[must_use]
    pub fn stack_info(mut self, stack: StackInfo) -> Self {
        self.stack = Some(stack);
        self
    }

    /// Attach the current call stack
    #[must_use]
    pub fn capture_stack(self) -> Self {
        self.stack_info(StackInfo::capture())
    }

    #[must_use]
    pub fn at(mut self, file: &str, line: u32, module_path: &str) -> Self {
        self.location = Some(Location::new(file, line, module_path));
        self
    }

    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
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

    pub fn fields(&self) -> &Fields {
        &self.extra
    }

    pub fn exception_info(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn stack(&self) -> Option<&StackInfo> {
        self.stack.as_ref()
    }

    pub fn source_location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// Build the event, discarding extra keys that name intrinsic fields
    fn into_event(mut self, logger_name: &str) -> Result<Event> {
        let catalog = FieldCatalog::global();
        let reserved: Vec<String> = self
            .extra
            .keys()
            .filter(|key| catalog.is_intrinsic(key))
            .map(String::from)
            .collect();
        for key in reserved {
            eprintln!(
                "[LOGGER WARNING] Extra field '{}' on logger '{}' collides with an intrinsic attribute and was discarded",
                key, logger_name
            );
            self.extra.remove(&key);
        }

        Event::builder(logger_name, self.level, self.template)
            .args(self.args)
            .location(self.location)
            .exception(self.exception)
            .stack(self.stack)
            .extra(self.extra)
            .build()
    }
}

/// Anything log calls can be emitted through
///
/// Implemented by [`Logger`] and [`ContextAdapter`](super::adapter::ContextAdapter),
/// so adapters can wrap either.
pub trait Emit {
    fn emit(&self, call: LogCall);

    fn is_enabled_for(&self, level: LogLevel) -> bool;

    fn log(&self, level: LogLevel, message: impl Into<String>)
    where
        Self: Sized,
    {
        if self.is_enabled_for(level) {
            self.emit(LogCall::new(level, message));
        }
    }

    fn trace(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Trace, message);
    }

    fn debug(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Error, message);
    }

    fn fatal(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.log(LogLevel::Fatal, message);
    }

    /// Log at error level with the error attached
    fn exception<E>(&self, message: impl Into<String>, error: &E)
    where
        Self: Sized,
        E: std::error::Error + ?Sized,
    {
        if self.is_enabled_for(LogLevel::Error) {
            self.emit(LogCall::new(LogLevel::Error, message).error(error));
        }
    }
}

impl<T: Emit + ?Sized> Emit for &T {
    fn emit(&self, call: LogCall) {
        (**self).emit(call);
    }

    fn is_enabled_for(&self, level: LogLevel) -> bool {
        (**self).is_enabled_for(level)
    }
}

impl<T: Emit + ?Sized> Emit for Arc<T> {
    fn emit(&self, call: LogCall) {
        (**self).emit(call);
    }

    fn is_enabled_for(&self, level: LogLevel) -> bool {
        (**self).is_enabled_for(level)
    }
}

#[derive(Debug)]
struct LoggerNode {
    name: String,
    level: RwLock<Option<LogLevel>>,
}

struct RegistryShared {
    dispatcher: Arc<AsyncDispatcher>,
    root: Arc<LoggerNode>,
    nodes: RwLock<HashMap<String, Arc<LoggerNode>>>,
    submit_failures: AtomicU64,
}

impl RegistryShared {
    fn node(&self, name: &str) -> Arc<LoggerNode> {
        if name.is_empty() || name == ROOT_LOGGER_NAME {
            return Arc::clone(&self.root);
        }
        if let Some(node) = self.nodes.read().get(name) {
            return Arc::clone(node);
        }
        let mut nodes = self.nodes.write();
        Arc::clone(nodes.entry(name.to_string()).or_insert_with(|| {
            Arc::new(LoggerNode {
                name: name.to_string(),
                level: RwLock::new(None),
            })
        }))
    }

    fn effective_level(&self, node: &LoggerNode) -> LogLevel {
        if let Some(level) = *node.level.read() {
            return level;
        }

        let nodes = self.nodes.read();
        let mut name = node.name.as_str();
        while let Some((parent, _)) = name.rsplit_once('.') {
            if let Some(level) = nodes.get(parent).and_then(|n| *n.level.read()) {
                return level;
            }
            name = parent;
        }

        self.root.level.read().unwrap_or_default()
    }

    fn report_submit_failure(&self, logger_name: &str, error: &LoggerError) {
        // overflow is already alerted and counted by the dispatcher
        if matches!(error, LoggerError::QueueFull { .. }) {
            return;
        }

        let previous = self.submit_failures.fetch_add(1, Ordering::Relaxed);
        if previous == 0 || (previous + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER ERROR] Logger '{}' could not submit event ({} failures so far): {}",
                logger_name,
                previous + 1,
                error
            );
        }
    }
}

/// Registry of named loggers sharing one dispatcher
///
/// # Example
///
/// ```
/// use log_pipeline::prelude::*;
/// use std::sync::Arc;
///
/// let dispatcher = Arc::new(AsyncDispatcher::new());
/// dispatcher.start().unwrap();
///
/// let registry = LoggerRegistry::new(Arc::clone(&dispatcher));
/// registry.set_level("app", LogLevel::Debug);
///
/// let logger = registry.get_logger("app.db");
/// assert_eq!(logger.effective_level(), LogLevel::Debug);
/// logger.debug("connected");
///
/// dispatcher.shutdown().unwrap();
/// ```
#[derive(Clone)]
pub struct LoggerRegistry {
    shared: Arc<RegistryShared>,
}

impl LoggerRegistry {
    /// Registry whose root level is `Warn`
    pub fn new(dispatcher: Arc<AsyncDispatcher>) -> Self {
        Self::with_root_level(dispatcher, LogLevel::Warn)
    }

    pub fn with_root_level(dispatcher: Arc<AsyncDispatcher>, root_level: LogLevel) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                dispatcher,
                root: Arc::new(LoggerNode {
                    name: ROOT_LOGGER_NAME.to_string(),
                    level: RwLock::new(Some(root_level)),
                }),
                nodes: RwLock::new(HashMap::new()),
                submit_failures: AtomicU64::new(0),
            }),
        }
    }

    /// Logger for `name`; the same name always shares one level setting.
    /// An empty name or `"root"` returns the root logger.
    pub fn get_logger(&self, name: &str) -> Logger {
        Logger {
            node: self.shared.node(name),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn root(&self) -> Logger {
        self.get_logger(ROOT_LOGGER_NAME)
    }

    pub fn set_level(&self, name: &str, level: LogLevel) {
        *self.shared.node(name).level.write() = Some(level);
    }

    /// Remove a logger's own level so it inherits again; the root keeps its level
    pub fn clear_level(&self, name: &str) {
        let node = self.shared.node(name);
        if !Arc::ptr_eq(&node, &self.shared.root) {
            *node.level.write() = None;
        }
    }

    pub fn effective_level(&self, name: &str) -> LogLevel {
        self.shared.effective_level(&self.shared.node(name))
    }

    pub fn dispatcher(&self) -> &Arc<AsyncDispatcher> {
        &self.shared.dispatcher
    }

    /// Names of every non-root logger created so far
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.nodes.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Submissions that failed for a reason other than queue overflow
    pub fn submit_failures(&self) -> u64 {
        self.shared.submit_failures.load(Ordering::Relaxed)
    }
}

/// Handle to a named logger
#[derive(Clone)]
pub struct Logger {
    node: Arc<LoggerNode>,
    shared: Arc<RegistryShared>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// The logger's own level, if set
    pub fn level(&self) -> Option<LogLevel> {
        *self.node.level.read()
    }

    pub fn set_level(&self, level: LogLevel) {
        *self.node.level.write() = Some(level);
    }

    pub fn effective_level(&self) -> LogLevel {
        self.shared.effective_level(&self.node)
    }

    /// Child logger `"{name}.{suffix}"`
    pub fn child(&self, suffix: &str) -> Logger {
        let name = if Arc::ptr_eq(&self.node, &self.shared.root) {
            suffix.to_string()
        } else {
            format!("{}.{}", self.node.name, suffix)
        };
        Logger {
            node: self.shared.node(&name),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Emit for Logger {
    fn emit(&self, call: LogCall) {
        if !self.is_enabled_for(call.level) {
            return;
        }

        let result = call
            .into_event(&self.node.name)
            .and_then(|event| self.shared.dispatcher.submit(event));

        if let Err(e) = result {
            self.shared.report_submit_failure(&self.node.name, &e);
        }
    }

    fn is_enabled_for(&self, level: LogLevel) -> bool {
        level >= self.effective_level() && self.shared.dispatcher.accepts_level(level)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.node.name)
            .field("level", &self.level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sink;
    use parking_lot::Mutex;
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

    fn setup() -> (LoggerRegistry, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        let dispatcher = AsyncDispatcher::builder().sink(sink.clone()).build().unwrap();
        dispatcher.start().unwrap();
        let registry = LoggerRegistry::with_root_level(Arc::new(dispatcher), LogLevel::Info);
        (registry, sink)
    }

    fn drain(registry: &LoggerRegistry, sink: &CollectingSink) -> Vec<Event> {
        registry.dispatcher().flush(Duration::from_secs(5)).unwrap();
        sink.events.lock().clone()
    }

    #[test]
    fn test_get_logger_is_cached() {
        let (registry, _sink) = setup();
        let a = registry.get_logger("app");
        a.set_level(LogLevel::Error);
        assert_eq!(registry.get_logger("app").level(), Some(LogLevel::Error));
        assert_eq!(registry.logger_names(), vec!["app".to_string()]);
        assert_eq!(registry.get_logger("").name(), ROOT_LOGGER_NAME);
    }

    #[test]
    fn test_effective_level_walks_hierarchy() {
        let (registry, _sink) = setup();
        registry.set_level("app", LogLevel::Debug);
        assert_eq!(registry.effective_level("app.db.pool"), LogLevel::Debug);
        assert_eq!(registry.effective_level("other"), LogLevel::Info);

        registry.set_level("app.db", LogLevel::Error);
        assert_eq!(registry.effective_level("app.db.pool"), LogLevel::Error);

        registry.clear_level("app.db");
        assert_eq!(registry.effective_level("app.db.pool"), LogLevel::Debug);

        registry.clear_level("root");
        assert_eq!(registry.root().level(), Some(LogLevel::Info));
    }

    #[test]
    fn test_below_threshold_is_discarded() {
        let (registry, sink) = setup();
        let logger = registry.get_logger("app");
        logger.debug("hidden");
        logger.info("shown");

        let events = drain(&registry, &sink);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message(), "shown");
        assert_eq!(events[0].name(), "app");
    }

    #[test]
    fn test_call_fields_and_args_reach_event() {
        let (registry, sink) = setup();
        registry.get_logger("app").emit(
            LogCall::new(LogLevel::Warn, "user {} failed {} times")
                .arg("bob")
                .arg(3)
                .field("ip", "10.0.0.1")
                .at("src/main.rs", 42, "demo::main"),
        );

        let events = drain(&registry, &sink);
        let event = &events[0];
        assert_eq!(event.message(), "user bob failed 3 times");
        assert_eq!(event.extra().get("ip").unwrap().render(), "10.0.0.1");
        assert_eq!(event.attribute("lineno").as_deref(), Some("42"));
        assert_eq!(event.attribute("filename").as_deref(), Some("main.rs"));
    }

    #[test]
    fn test_reserved_extra_keys_are_discarded() {
        let (registry, sink) = setup();
        registry.get_logger("app").emit(
            LogCall::new(LogLevel::Info, "hello")
                .field("levelname", "spoofed")
                .field("user", "alice"),
        );

        let events = drain(&registry, &sink);
        let keys: Vec<&str> = events[0].extra().keys().collect();
        assert_eq!(keys, vec!["user"]);
        assert_eq!(events[0].attribute("levelname").as_deref(), Some("INFO"));
    }

    #[test]
    fn test_exception_helper_attaches_error() {
        let (registry, sink) = setup();
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "config missing");
        registry.get_logger("app").exception("startup failed", &err);

        let events = drain(&registry, &sink);
        let exception = events[0].exception().unwrap();
        assert_eq!(exception.message(), "config missing");
        assert_eq!(events[0].level(), LogLevel::Error);
    }

    #[test]
    fn test_child_logger_names() {
        let (registry, _sink) = setup();
        assert_eq!(registry.root().child("app").name(), "app");
        assert_eq!(registry.get_logger("app").child("db").name(), "app.db");
    }

    #[test]
    fn test_submit_after_shutdown_is_not_raised() {
        let (registry, _sink) = setup();
        registry.dispatcher().shutdown().unwrap();
        registry.get_logger("app").info("after shutdown");
        assert_eq!(registry.submit_failures(), 1);
    }
}
