//! Property-based tests for log_pipeline using proptest

use log_pipeline::core::catalog;
use log_pipeline::core::{interpolate, EventBuilder};
use log_pipeline::prelude::*;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
    ]
}

/// Extra fields whose keys never name intrinsic attributes
fn extra_fields() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(
        (
            "[a-zA-Z_][a-zA-Z0-9_]{0,10}".prop_filter("intrinsic name", |k| {
                !catalog::is_intrinsic(k)
            }),
            any::<String>(),
        ),
        0..6,
    )
}

fn to_fields(pairs: &[(String, String)]) -> Fields {
    pairs
        .iter()
        .fold(Fields::new(), |fields, (k, v)| fields.with_field(k.as_str(), v.as_str()))
}

fn event(
    level: LogLevel,
    message: &str,
    extras: &[(String, String)],
    exception: Option<(String, String)>,
) -> EventBuilder {
    Event::builder("prop", level, message)
        .extra(to_fields(extras))
        .exception(exception.map(|(kind, msg)| ExceptionInfo::new(kind, msg)))
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Test that LogLevel string conversions roundtrip correctly
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// Ordering agrees with the numeric levels
    #[test]
    fn test_log_level_ordering(a in any_level(), b in any_level()) {
        prop_assert_eq!(a <= b, a.number() <= b.number());
        prop_assert_eq!(a < b, a.number() < b.number());
    }
}

// ============================================================================
// Structured Formatter Tests
// ============================================================================

proptest! {
    /// Output is valid JSON whose extra keys are exactly the event's extra keys
    #[test]
    fn test_json_roundtrip_extra_keys(
        level in any_level(),
        message in any::<String>(),
        extras in extra_fields(),
    ) {
        let event = event(level, &message, &extras, None).build().unwrap();
        let output = JsonFormatter::default().format(&event);
        prop_assert!(!output.contains('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let extra = parsed["extra"].as_object().unwrap();

        let rendered: BTreeSet<&str> = extra.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = extras.iter().map(|(k, _)| k.as_str()).collect();
        prop_assert_eq!(rendered, expected);

        // later duplicates overwrite earlier ones
        for (key, _) in &extras {
            let last = extras.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
            prop_assert_eq!(extra[key.as_str()].as_str(), last);
        }
    }

    /// `extra` is present and empty when there are no extra fields
    #[test]
    fn test_json_extra_never_omitted(level in any_level(), message in "[^{}]*") {
        let event = event(level, &message, &[], None).build().unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&JsonFormatter::default().format(&event)).unwrap();
        prop_assert_eq!(&parsed["extra"], &serde_json::json!({}));
        prop_assert_eq!(parsed["message"].as_str(), Some(message.as_str()));
    }

    /// Formatting twice gives byte-identical output
    #[test]
    fn test_formatters_idempotent(
        message in any::<String>(),
        extras in extra_fields(),
        exception in prop::option::of(("[A-Za-z]{1,12}", "[ -~]{0,30}")),
    ) {
        let event = event(LogLevel::Error, &message, &extras, exception).build().unwrap();
        let line = LineFormatter::new("%(levelname)s %(name)s %(message)s", &RenderConfig::new()).unwrap();
        let json = JsonFormatter::default();

        prop_assert_eq!(line.format(&event), line.format(&event));
        prop_assert_eq!(json.format(&event), json.format(&event));
    }
}

// ============================================================================
// Line Formatter Tests
// ============================================================================

proptest! {
    /// No trailing whitespace and exactly one newline per block transition
    #[test]
    fn test_line_separators(
        message in "[a-zA-Z0-9 ]{0,40}",
        extras in prop::collection::vec(
            ("[a-z][a-z0-9]{2,8}".prop_filter("intrinsic name", |k| !catalog::is_intrinsic(k)),
             "[a-zA-Z0-9]{1,10}"),
            0..5,
        ),
        exception in prop::option::of(("[A-Za-z]{1,12}", "[a-zA-Z0-9]{1,20}")),
    ) {
        let has_exception = exception.is_some();
        let event = event(LogLevel::Warn, &message, &extras, exception).build().unwrap();
        let formatter = LineFormatter::new("%(levelname)s %(message)s", &RenderConfig::new()).unwrap();
        let output = formatter.format(&event);

        prop_assert_eq!(output.trim_end(), output.as_str());

        let expected_newlines = match (has_exception, extras.is_empty()) {
            (false, _) => 0,
            (true, true) => 1,
            (true, false) => 2,
        };
        prop_assert_eq!(output.matches('\n').count(), expected_newlines);
        prop_assert!(output.starts_with("WARN"));
    }
}

// ============================================================================
// Interpolation and Field Tests
// ============================================================================

proptest! {
    /// Each `{}` takes the next argument; surplus placeholders stay literal
    #[test]
    fn test_interpolation_consumes_args_in_order(
        args in prop::collection::vec("[a-z0-9]{1,6}", 0..5),
        placeholders in 0usize..6,
    ) {
        let template = vec!["{}"; placeholders].join("|");
        let values: Vec<FieldValue> = args.iter().map(|a| FieldValue::from(a.as_str())).collect();
        let output = interpolate(&template, &values);

        let expected: Vec<String> = (0..placeholders)
            .map(|i| args.get(i).cloned().unwrap_or_else(|| "{}".to_string()))
            .collect();
        prop_assert_eq!(output, expected.join("|"));
    }

    /// Overlay keeps every key and lets the top mapping win
    #[test]
    fn test_overlay_semantics(base in extra_fields(), top in extra_fields()) {
        let base_fields = to_fields(&base);
        let top_fields = to_fields(&top);
        let merged = base_fields.overlay(&top_fields);

        let keys: BTreeSet<&str> = merged.keys().collect();
        let expected: BTreeSet<&str> = base_fields.keys().chain(top_fields.keys()).collect();
        prop_assert_eq!(keys, expected);

        for (key, value) in top_fields.iter() {
            prop_assert_eq!(merged.get(key).unwrap().render(), value.render());
        }
        prop_assert_eq!(base_fields.len(), to_fields(&base).len());
    }
}
