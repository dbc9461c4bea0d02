//! # lh-core
//!
//! Core types, change detection, and error types for Lakehouse.
//!
//! This crate provides the foundational types shared across all Lakehouse crates:
//! - Remote resource records as returned by the BIMcloud management API
//! - The criterion expression tree used to query resources
//! - Traceable state (high-watermark + last-seen resource map) and the pure
//!   change-detection pass over it
//! - Cross-cutting error types

pub mod criterion;
pub mod errors;
pub mod resource;
pub mod traceable;

pub use criterion::Criterion;
pub use errors::CoreError;
pub use resource::{ResourceRecord, ResourceType};
pub use traceable::{ChangeSet, TraceableState, TrackedResource, detect_changes};
