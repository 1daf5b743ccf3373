//! Delve Core: data model for the delve value-graph dumper
//!
//! This crate provides the dumper-agnostic primitives shared by walkers,
//! renderers, and introspectors:
//!
//! - `Value`: the closed union a dump walks over (scalars, raw text bytes,
//!   index-addressed composites, named-member objects, opaque handles)
//! - `ValueId`: per-allocation identity for containers, the basis of cycle
//!   detection
//! - `RenderNode`: the owned, serializable record of one visited value
//!
//! No policy lives here: budgets, traversal, path generation, and output
//! chunking are the `delve` crate's business.

pub mod render;
pub mod value;

// Re-export key types
pub use render::{RenderNode, TextEncoding, TextMeta};
pub use value::{Member, ObjectData, OpaqueHandle, Value, ValueId, ValueKind, Visibility};
