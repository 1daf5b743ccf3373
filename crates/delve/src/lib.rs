//! Delve: a bounded, cycle-safe value-graph dumper
//!
//! Given an arbitrary runtime value — scalar, composite, or object-like —
//! delve produces a structured textual rendering of its contents, walking
//! nested structures to a bounded depth while guaranteeing termination on
//! cyclic data, bounding wall-clock time and memory, and optionally
//! emitting source-level access-path expressions for visited values.
//!
//! Key pieces:
//! - `DumpSession`: the per-run context; `dump()` then `finish()`
//! - `IdentityTracker`: cycle guard over container identities
//! - `ResourceGovernor`: sticky time/memory/depth/call budgets
//! - `AccessPathBuilder`: scope-gated `root[2].name` expressions
//! - `OutputChunker`: spills oversized fragments to disk and streams them
//!   back at flush time
//!
//! The fast path for callers:
//!
//! ```
//! use delve::{DumpConfig, dump_to_string};
//! use delve_core::Value;
//!
//! let root = Value::composite(vec![Value::Int(1), Value::text("two")]);
//! let out = dump_to_string(&root, &DumpConfig::default());
//! assert!(out.contains("0 => int 1"));
//! ```

pub mod chunker;
pub mod config;
pub mod governor;
pub mod identity;
pub mod introspect;
pub mod memory;
pub mod path;
pub mod render_text;
pub mod report;
pub mod session;
pub mod text;
mod walker;

// Re-export key types and functions
pub use chunker::{CHUNK_MARK, OutputChunker, StorageError, cleanup_stale, sweep_stale_once};
pub use config::DumpConfig;
pub use governor::{CallVerdict, ResourceGovernor, disable_dumper, dumper_disabled, enable_dumper};
pub use identity::{Decision, IdentityTracker};
pub use introspect::{Child, Introspect, ValueIntrospector};
pub use path::{AccessPathBuilder, PATH_PLACEHOLDER, PathStep, SELF_SCOPE, StepKind};
pub use render_text::{Render, TextConfig, TextRenderer};
pub use report::{DumpStats, ReportConfig, ReportDestination, ReportFormat};
pub use session::{DEFAULT_ROOT_NAME, DumpSession, dump_to_string};

// The core data model is re-exported for convenience; hosts embedding the
// dumper only need this crate
pub use delve_core::{
    Member, ObjectData, OpaqueHandle, RenderNode, TextEncoding, TextMeta, Value, ValueId,
    ValueKind, Visibility,
};
