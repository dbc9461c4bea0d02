//! # lh-runner
//!
//! Script discovery and dispatch for Lakehouse.
//!
//! - [`ScriptRegistry`] finds the enabled scripts under `scripts/`
//! - [`Dispatcher`] resolves `script.entry`, attaches the script's config and runs it
//! - [`ChangeTracker`] persists the per-script watermark and last-seen map
//! - [`scripts`] holds the compiled-in scripts; [`builtin_catalog`] lists them

mod dispatcher;
mod error;
pub mod registry;
pub mod scripts;
mod tracker;

pub use dispatcher::{DEFAULT_ENTRY, Dispatcher, Invocation, RESERVED_PARAMETERS};
pub use error::{RunnerError, ScriptError};
pub use registry::{EntryFn, EntryFuture, Exposed, ScriptCatalog, ScriptDescriptor, ScriptRegistry};
pub use scripts::builtin_catalog;
pub use tracker::{ChangeTracker, TRACKING_FILE, TraceableStore};
