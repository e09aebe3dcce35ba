//! Field catalog: the fixed set of intrinsic event attributes
//!
//! Formatters validate their configured tokens against the catalog at
//! construction and use it to separate caller-supplied extra fields from
//! intrinsic ones at render time.

use super::event::RECORD_ATTRIBUTES;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Pseudo-fields computed at render time rather than stored on the event
pub const DERIVED_FIELDS: &[&str] = &["asctime", "timestamp", "message"];

/// Intrinsic fields a formatter renders through dedicated blocks
pub const SPECIAL_FIELDS: &[&str] = &["msg", "exc_info", "stack_info"];

static CATALOG: Lazy<FieldCatalog> = Lazy::new(FieldCatalog::build);

#[derive(Debug)]
pub struct FieldCatalog {
    names: HashSet<&'static str>,
}

impl FieldCatalog {
    fn build() -> Self {
        let names = RECORD_ATTRIBUTES
            .iter()
            .chain(DERIVED_FIELDS)
            .copied()
            .collect();
        Self { names }
    }

    /// Process-wide catalog, built on first use
    pub fn global() -> &'static FieldCatalog {
        &CATALOG
    }

    pub fn is_intrinsic(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Shorthand for `FieldCatalog::global().is_intrinsic(name)`
pub fn is_intrinsic(name: &str) -> bool {
    CATALOG.is_intrinsic(name)
}

/// Whether `name` is rendered through a dedicated block rather than as a token
pub fn is_special(name: &str) -> bool {
    SPECIAL_FIELDS.contains(&name)
}
