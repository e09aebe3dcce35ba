//! Formatter interface shared by the line and JSON renderings

use super::catalog::FieldCatalog;
use super::event::Event;
use super::fields::FieldValue;
use super::timestamp::TimestampRenderer;

/// Renders one event into its output representation.
///
/// Implementations are configured once at construction and are immutable
/// afterwards, so a single instance can be shared between sinks.
pub trait Formatter: Send + Sync {
    fn format(&self, event: &Event) -> String;

    fn name(&self) -> &str;
}

/// Resolve an intrinsic field to text.
///
/// `asctime`/`timestamp` go through the timestamp renderer, `message`
/// through template interpolation, everything else through direct
/// attribute lookup.
pub(crate) fn resolve_field(event: &Event, field: &str, renderer: &TimestampRenderer) -> String {
    match field {
        "asctime" | "timestamp" => renderer.render(event.created()),
        "message" => event.message(),
        other => event.attribute(other).unwrap_or_default(),
    }
}

/// Extra fields of `event` that are not intrinsic, in insertion order
pub(crate) fn extra_fields(event: &Event) -> impl Iterator<Item = (&str, &FieldValue)> {
    let catalog = FieldCatalog::global();
    event
        .extra()
        .iter()
        .filter(move |(key, _)| !catalog.is_intrinsic(key))
}
