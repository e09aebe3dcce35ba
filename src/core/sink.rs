//! Sink trait for log output destinations

use super::{error::Result, event::Event, log_level::LogLevel};

/// Destination that accepts events and renders them with its own formatter.
///
/// Sinks are shared between the owner and the dispatcher (`Arc<dyn Sink>`),
/// so writers live behind interior mutability.
pub trait Sink: Send + Sync {
    fn accept(&self, event: &Event) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Events below this level are not offered to the sink
    fn min_level(&self) -> Option<LogLevel> {
        None
    }

    fn name(&self) -> &str;

    fn accepts_level(&self, level: LogLevel) -> bool {
        self.min_level().map_or(true, |min| level >= min)
    }
}
