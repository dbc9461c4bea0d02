//! Compiled-in scripts.

pub mod bimcloud;

use crate::ScriptCatalog;

/// Catalog of every script shipped with the binary.
#[must_use]
pub fn builtin_catalog() -> ScriptCatalog {
    ScriptCatalog::new().with(bimcloud::NAME, bimcloud::entries)
}
