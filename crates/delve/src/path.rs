//! Access paths: source-level expressions from the root to a node
//!
//! When enabled, every rendered node can carry an expression describing
//! how to reach it from the dump's root variable (`root[2].name`). The
//! rules are a hard allow-list, not a heuristic: a wrong accessor is code
//! that throws or silently reads the wrong member when executed, so any
//! doubt yields the placeholder instead.
//!
//! Generation is disabled by default. Setting a scope token enables it;
//! an ambiguous root name disables it again for the whole dump, because a
//! correct expression for *some* nodes is worth less than the risk of a
//! wrong root for all of them.

use delve_core::{ValueKind, Visibility};

/// Scope token marking the dump root as a self-reference
pub const SELF_SCOPE: &str = "self";

/// Emitted instead of any expression that fails the allow-list
pub const PATH_PLACEHOLDER: &str = "(unreachable)";

/// Shape of one access-path step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// The root variable itself
    Root,
    /// Index into an ordered composite
    Index,
    /// Direct member access
    Field,
    /// Member only reachable through an accessor method. Never rendered:
    /// synthesizing the call could run arbitrary side effects.
    Accessor,
}

/// One step of the chain from the root to the current node
#[derive(Debug, Clone)]
pub struct PathStep {
    pub kind: StepKind,
    pub name: String,
}

impl PathStep {
    pub fn new(kind: StepKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Left/right connector pair for this step
    fn connectors(&self) -> (&'static str, &'static str) {
        match self.kind {
            StepKind::Root => ("", ""),
            StepKind::Index => ("[", "]"),
            StepKind::Field => (".", ""),
            StepKind::Accessor => ("", ""),
        }
    }
}

/// Builder for access-path expressions, scoped to one dump run
#[derive(Debug)]
pub struct AccessPathBuilder {
    scope: Option<String>,
    root_known: bool,
    emitted: u64,
}

impl Default for AccessPathBuilder {
    fn default() -> Self {
        Self {
            scope: None,
            root_known: true,
            emitted: 0,
        }
    }
}

impl AccessPathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the scope token of the dump's root variable. This is also
    /// the switch that enables generation at all.
    pub fn set_scope(&mut self, token: impl Into<String>) {
        self.scope = Some(token.into());
    }

    /// The root's own name could not be determined (several candidate
    /// call sites on one source line): disable generation for this dump.
    pub fn mark_root_ambiguous(&mut self) {
        self.root_known = false;
    }

    /// True when expressions may be generated this run
    pub fn generation_enabled(&self) -> bool {
        self.scope.is_some() && self.root_known
    }

    /// Allow-list check for emitting a real expression.
    ///
    /// Containers count one level deeper than the level at which they are
    /// reached. A value passes only when that adjusted level is at most 1,
    /// the active scope is the self-reference token, and the declared
    /// visibility is not private-inherited (an inherited private member is
    /// out of reach even from a matching scope).
    pub fn is_reachable(&self, kind: ValueKind, visibility: Visibility, level: u32) -> bool {
        let adjusted = level + u32::from(kind.is_container());
        adjusted <= 1
            && self.scope.as_deref() == Some(SELF_SCOPE)
            && visibility != Visibility::PrivateInherited
    }

    /// Concatenate the chain into an expression, root to leaf.
    ///
    /// The first step carries no connector (there is no parent to connect
    /// to). Any accessor-backed step yields the placeholder outright.
    pub fn build(&mut self, steps: &[PathStep]) -> String {
        if steps.iter().any(|s| s.kind == StepKind::Accessor) {
            return PATH_PLACEHOLDER.to_string();
        }
        let mut expr = String::new();
        for (i, step) in steps.iter().enumerate() {
            if i == 0 {
                expr.push_str(&step.name);
                continue;
            }
            let (left, right) = step.connectors();
            expr.push_str(left);
            expr.push_str(&step.name);
            expr.push_str(right);
        }
        self.emitted += 1;
        expr
    }

    /// Expressions built so far this run
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Reset for a new top-level dump
    pub fn reset_counter(&mut self) {
        self.emitted = 0;
    }
}
