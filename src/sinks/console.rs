//! Console sink writing to stdout or stderr

use crate::core::{Event, Formatter, LineFormatter, LogLevel, Result, Sink};
#[cfg(feature = "console")]
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Arc;

/// Standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

pub struct ConsoleSink {
    target: ConsoleTarget,
    formatter: Arc<dyn Formatter>,
    min_level: Option<LogLevel>,
    use_colors: bool,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget, formatter: Arc<dyn Formatter>) -> Self {
        Self {
            target,
            formatter,
            min_level: None,
            use_colors: false,
        }
    }

    /// Stdout with the default line formatter
    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout, Arc::new(LineFormatter::default()))
    }

    /// Stderr with the default line formatter
    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr, Arc::new(LineFormatter::default()))
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    /// Color each line by level. Has no effect without the `console` feature.
    ///
    /// # Example
    ///
    /// ```
    /// use log_pipeline::sinks::ConsoleSink;
    ///
    /// let sink = ConsoleSink::stderr().with_colors(true);
    /// ```
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }

    fn render(&self, event: &Event) -> String {
        let output = self.formatter.format(event);

        #[cfg(feature = "console")]
        if self.use_colors {
            return output.color(event.level().color_code()).to_string();
        }

        output
    }
}

impl Sink for ConsoleSink {
    fn accept(&self, event: &Event) -> Result<()> {
        let output = self.render(event);
        match self.target {
            ConsoleTarget::Stdout => writeln!(std::io::stdout().lock(), "{}", output)?,
            ConsoleTarget::Stderr => writeln!(std::io::stderr().lock(), "{}", output)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush()?,
            ConsoleTarget::Stderr => std::io::stderr().flush()?,
        }
        Ok(())
    }

    fn min_level(&self) -> Option<LogLevel> {
        self.min_level
    }

    fn name(&self) -> &str {
        match self.target {
            ConsoleTarget::Stdout => "console:stdout",
            ConsoleTarget::Stderr => "console:stderr",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JsonFormatter;

    #[test]
    fn test_console_sink_defaults() {
        let sink = ConsoleSink::stdout();
        assert_eq!(sink.target(), ConsoleTarget::Stdout);
        assert_eq!(sink.min_level(), None);
        assert_eq!(sink.name(), "console:stdout");
    }

    #[test]
    fn test_console_sink_level_filter() {
        let sink = ConsoleSink::stderr().with_min_level(LogLevel::Warn);
        assert!(!sink.accepts_level(LogLevel::Info));
        assert!(sink.accepts_level(LogLevel::Warn));
        assert!(sink.accepts_level(LogLevel::Fatal));
    }

    #[test]
    fn test_console_sink_accepts_event() {
        let sink = ConsoleSink::new(ConsoleTarget::Stdout, Arc::new(JsonFormatter::default()));
        let event = Event::builder("test", LogLevel::Info, "hello").build().unwrap();
        assert!(sink.accept(&event).is_ok());
        assert!(sink.flush().is_ok());
    }

    #[test]
    fn test_console_target_deserialize() {
        let target: ConsoleTarget = serde_json::from_str("\"stderr\"").unwrap();
        assert_eq!(target, ConsoleTarget::Stderr);
    }
}
