//! Graph walker: the per-node state machine
//!
//! For one value the walker runs
//! `enter → healthy? → cycle? → depth? → dispatch → recurse → emit`,
//! threading the session's governor, tracker, and path builder through
//! every frame. It never panics and never returns `Err`: every branch has
//! a defined fallback fragment, and the one externally visible failure
//! mode is a fully empty dump (governor unhealthy from the very first
//! call).
//!
//! Once the governor trips mid-walk the stack unwinds cooperatively:
//! each frame's health check fails, the in-flight node yields nothing,
//! and fragments already completed for earlier siblings are kept.

use delve_core::{RenderNode, Value, ValueKind, Visibility};

use crate::config::DumpConfig;
use crate::governor::{CallVerdict, ResourceGovernor};
use crate::identity::{Decision, IdentityTracker};
use crate::introspect::{Child, Introspect};
use crate::path::{AccessPathBuilder, PATH_PLACEHOLDER, PathStep, StepKind};
use crate::render_text::Render;
use crate::report::DumpStats;
use crate::text;

/// One traversal over one root, borrowing the session's state
pub(crate) struct GraphWalker<'a, I: Introspect, R: Render> {
    pub introspector: &'a I,
    pub renderer: &'a R,
    pub governor: &'a mut ResourceGovernor,
    pub tracker: &'a mut IdentityTracker,
    pub paths: &'a mut AccessPathBuilder,
    pub config: &'a DumpConfig,
    pub stats: &'a mut DumpStats,
}

impl<I: Introspect, R: Render> GraphWalker<'_, I, R> {
    /// Walk a root value under the given name
    pub(crate) fn walk_root(&mut self, root: &Value, name: &str) -> Option<String> {
        let child = Child {
            name: name.to_string(),
            value: root.clone(),
            visibility: Visibility::Public,
            step: StepKind::Root,
        };
        let mut steps = vec![PathStep::new(StepKind::Root, name)];
        self.walk(&child, &mut steps)
    }

    /// Visit one value. `None` means the governor was unhealthy and the
    /// node produced nothing.
    fn walk(&mut self, child: &Child, steps: &mut Vec<PathStep>) -> Option<String> {
        if !self.governor.healthy() {
            return None;
        }

        let mut warning = None;
        match self.governor.check_call_budget() {
            CallVerdict::Proceed => {}
            CallVerdict::LastCall => {
                let notice = RenderNode::leaf(
                    "notice",
                    ValueKind::Text,
                    "(node budget nearly exhausted; output will be truncated)",
                );
                warning = Some(self.renderer.render_leaf(&notice));
            }
            CallVerdict::Refuse => {
                self.stats.call_refusals += 1;
                let kind = self.introspector.kind_of(&child.value);
                let node = RenderNode::leaf(&child.name, kind, "(node budget exceeded)");
                return Some(self.renderer.render_leaf(&node));
            }
        }

        let value = &child.value;
        let kind = self.introspector.kind_of(value);

        // Cycle check precedes everything but the budgets: a revisited
        // identity is rendered as a marker and never descended again
        if self.tracker.enter(value) == Decision::AlreadyVisited {
            if let Some(id) = self.introspector.identity_of(value) {
                self.stats.cycle_markers += 1;
                self.stats.nodes_rendered += 1;
                let marker = self.renderer.render_cycle(id, kind);
                let node = RenderNode::leaf(&child.name, kind, marker);
                return Some(with_warning(warning, self.renderer.render_leaf(&node)));
            }
        }

        // Depth check applies to containers only; scalars at the same
        // level still render
        if kind.is_container() && self.governor.at_depth_limit(true) {
            self.stats.depth_hits += 1;
            self.stats.nodes_rendered += 1;
            let node = RenderNode::leaf(&child.name, kind, "(maximum depth reached)");
            return Some(with_warning(warning, self.renderer.render_leaf(&node)));
        }

        let fragment = if kind.is_container() {
            self.walk_container(child, kind, steps)
        } else {
            let node = self.leaf_node(child, kind, steps);
            self.renderer.render_leaf(&node)
        };
        self.stats.nodes_rendered += 1;
        Some(with_warning(warning, fragment))
    }

    /// Expand a container: header node plus children fragments in
    /// introspector order
    fn walk_container(
        &mut self,
        child: &Child,
        kind: ValueKind,
        steps: &mut Vec<PathStep>,
    ) -> String {
        let children = self.introspector.children_of(&child.value);
        let brief = match &child.value {
            Value::Object(data) => format!("{} ({} members)", data.type_name, children.len()),
            _ => format!("{} items", children.len()),
        };
        let mut node = RenderNode::leaf(&child.name, kind, brief);
        node = self.attach_path(node, kind, child, steps);

        let fragments = self.with_child_level(|walker| {
            let mut fragments = Vec::with_capacity(children.len());
            for c in &children {
                steps.push(PathStep::new(c.step, &c.name));
                if let Some(fragment) = walker.walk(c, steps) {
                    fragments.push(fragment);
                }
                steps.pop();
            }
            fragments
        });

        self.renderer.render_branch(&node, &fragments)
    }

    /// Fixed leaf mapping for every non-container kind
    fn leaf_node(&mut self, child: &Child, kind: ValueKind, steps: &[PathStep]) -> RenderNode {
        let (full, meta) = match &child.value {
            Value::Null => (String::new(), None),
            Value::Bool(b) => (b.to_string(), None),
            Value::Int(n) => (n.to_string(), None),
            Value::Float(f) => (format_float(*f), None),
            Value::Text(bytes) => {
                let decoded = text::decode(bytes, self.config.text_fallback_ceiling);
                (decoded.rendered, Some(decoded.meta))
            }
            Value::Opaque(handle) => (format!("<{}>", handle.label), None),
            // Containers were dispatched above
            Value::Composite(_) | Value::Object(_) => (String::new(), None),
        };
        let mut node = RenderNode::clipped(&child.name, kind, full, self.config.brief_limit);
        if let Some(meta) = meta {
            node = node.with_text_meta(meta);
        }
        self.attach_path(node, kind, child, steps)
    }

    /// Attach the access path when generation is enabled: a real
    /// expression inside the allow-list, the placeholder everywhere else
    fn attach_path(
        &mut self,
        node: RenderNode,
        kind: ValueKind,
        child: &Child,
        steps: &[PathStep],
    ) -> RenderNode {
        if !self.paths.generation_enabled() {
            return node;
        }
        let level = self.governor.nesting_level();
        let path = if self.paths.is_reachable(kind, child.visibility, level) {
            self.paths.build(steps)
        } else {
            PATH_PLACEHOLDER.to_string()
        };
        node.with_access_path(path)
    }

    /// Run `f` one nesting level deeper, pairing enter/exit on every path
    fn with_child_level<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.governor.enter_nesting();
        let out = f(self);
        self.governor.exit_nesting();
        out
    }
}

/// Prepend the one-time call-budget warning, when present
fn with_warning(warning: Option<String>, fragment: String) -> String {
    match warning {
        Some(w) => format!("{w}\n{fragment}"),
        None => fragment,
    }
}

/// Floats always carry a decimal point to stay distinguishable from ints
fn format_float(f: f64) -> String {
    let s = f.to_string();
    if !s.contains('.') && f.is_finite() {
        format!("{s}.0")
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspect::ValueIntrospector;
    use crate::path::SELF_SCOPE;
    use crate::render_text::TextRenderer;
    use delve_core::Member;

    struct Harness {
        config: DumpConfig,
        governor: ResourceGovernor,
        tracker: IdentityTracker,
        paths: AccessPathBuilder,
        stats: DumpStats,
        introspector: ValueIntrospector,
        renderer: TextRenderer,
    }

    impl Harness {
        fn new(config: DumpConfig) -> Self {
            let governor = ResourceGovernor::new(&config);
            Self {
                config,
                governor,
                tracker: IdentityTracker::new(),
                paths: AccessPathBuilder::new(),
                stats: DumpStats::default(),
                introspector: ValueIntrospector,
                renderer: TextRenderer::new(),
            }
        }

        fn walk(&mut self, root: &Value) -> Option<String> {
            self.governor.start_run();
            let mut walker = GraphWalker {
                introspector: &self.introspector,
                renderer: &self.renderer,
                governor: &mut self.governor,
                tracker: &mut self.tracker,
                paths: &mut self.paths,
                config: &self.config,
                stats: &mut self.stats,
            };
            let fragment = walker.walk_root(root, "root");
            self.tracker.cleanup();
            fragment
        }
    }

    fn quiet_config() -> DumpConfig {
        DumpConfig {
            memory_left_bytes: 0,
            ..DumpConfig::default()
        }
    }

    #[test]
    fn test_scalar_leaves() {
        let mut h = Harness::new(quiet_config());
        assert_eq!(h.walk(&Value::Int(42)).unwrap(), "root => int 42");
        assert_eq!(h.walk(&Value::Bool(true)).unwrap(), "root => bool true");
        assert_eq!(h.walk(&Value::Null).unwrap(), "root => null");
        assert_eq!(h.walk(&Value::Float(2.0)).unwrap(), "root => float 2.0");
        assert_eq!(
            h.walk(&Value::opaque("socket")).unwrap(),
            "root => opaque <socket>"
        );
    }

    #[test]
    fn test_example_tree_order() {
        let mut h = Harness::new(quiet_config());
        let root = Value::object(
            "Record",
            vec![
                Member::public("a", Value::Int(1)),
                Member::public(
                    "b",
                    Value::object("Record", vec![Member::public("c", Value::Int(2))]),
                ),
            ],
        );
        let out = h.walk(&root).unwrap();
        let a = out.find("a => int 1").unwrap();
        let b = out.find("b => object").unwrap();
        let c = out.find("c => int 2").unwrap();
        assert!(a < b && b < c, "visit order must be preserved: {out}");
        assert!(!out.contains("*RECURSION*"));
        assert!(!out.contains("(maximum depth"));
        assert_eq!(h.stats.nodes_rendered, 4);
        assert_eq!(h.stats.cycle_markers, 0);
    }

    #[test]
    fn test_nesting_returns_to_zero() {
        let mut h = Harness::new(quiet_config());
        let root = Value::composite(vec![Value::composite(vec![Value::Int(1)])]);
        h.walk(&root).unwrap();
        assert_eq!(h.governor.nesting_level(), 0);
    }

    #[test]
    fn test_self_referential_object_terminates() {
        let mut h = Harness::new(quiet_config());
        let root = Value::object("Node", vec![Member::public("next", Value::Null)]);
        if let Value::Object(data) = &root {
            data.members.borrow_mut()[0].value = root.clone();
        }
        let out = h.walk(&root).unwrap();
        assert_eq!(out.matches("*RECURSION*").count(), 1);
        assert_eq!(h.stats.cycle_markers, 1);
    }

    #[test]
    fn test_aliased_composite_marked_on_second_visit() {
        let mut h = Harness::new(quiet_config());
        let shared = Value::composite(vec![Value::Int(7)]);
        let root = Value::composite(vec![shared.clone(), shared]);
        let out = h.walk(&root).unwrap();
        assert_eq!(out.matches("*RECURSION*").count(), 1);
    }

    #[test]
    fn test_equal_composites_not_marked() {
        let mut h = Harness::new(quiet_config());
        let root = Value::composite(vec![
            Value::composite(vec![Value::Int(7)]),
            Value::composite(vec![Value::Int(7)]),
        ]);
        let out = h.walk(&root).unwrap();
        assert!(!out.contains("*RECURSION*"));
    }

    #[test]
    fn test_depth_placeholder_at_limit_plus_one() {
        let mut h = Harness::new(DumpConfig {
            max_nesting_level: 2,
            memory_left_bytes: 0,
            ..DumpConfig::default()
        });
        // Chain: root(0) -> c1(1) -> c2(2) -> c3(3) -> int
        let root = Value::composite(vec![Value::composite(vec![Value::composite(vec![
            Value::composite(vec![Value::Int(99)]),
        ])])]);
        let out = h.walk(&root).unwrap();
        assert_eq!(out.matches("(maximum depth reached)").count(), 1);
        // The child beyond the cutoff is never read
        assert!(!out.contains("99"));
        assert_eq!(h.stats.depth_hits, 1);
    }

    #[test]
    fn test_call_budget_warning_and_refusal() {
        let mut h = Harness::new(DumpConfig {
            max_call_count: 3,
            memory_left_bytes: 0,
            ..DumpConfig::default()
        });
        let root = Value::composite(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        let out = h.walk(&root).unwrap();
        assert_eq!(out.matches("nearly exhausted").count(), 1);
        assert!(out.contains("(node budget exceeded)"));
        assert!(h.stats.call_refusals > 0);
    }

    #[test]
    #[serial_test::serial]
    fn test_unhealthy_at_entry_is_empty() {
        let mut h = Harness::new(quiet_config());
        h.governor.start_run();
        h.governor.trip("test");
        let mut walker = GraphWalker {
            introspector: &h.introspector,
            renderer: &h.renderer,
            governor: &mut h.governor,
            tracker: &mut h.tracker,
            paths: &mut h.paths,
            config: &h.config,
            stats: &mut h.stats,
        };
        assert!(walker.walk_root(&Value::Int(1), "root").is_none());
        crate::governor::enable_dumper();
    }

    #[test]
    fn test_paths_disabled_by_default() {
        let mut h = Harness::new(quiet_config());
        let root = Value::object("T", vec![Member::public("x", Value::Int(1))]);
        let out = h.walk(&root).unwrap();
        assert!(!out.contains("(at "));
    }

    #[test]
    fn test_paths_with_self_scope() {
        let mut h = Harness::new(quiet_config());
        h.paths.set_scope(SELF_SCOPE);
        let root = Value::object(
            "T",
            vec![
                Member::public("x", Value::Int(1)),
                Member::new("base", Value::Int(2), Visibility::PrivateInherited),
                Member::public("hidden", Value::Int(3)).through_accessor(),
            ],
        );
        let out = h.walk(&root).unwrap();
        assert!(out.contains("x => int 1  (at root.x)"));
        assert!(out.contains(&format!("base => int 2  (at {PATH_PLACEHOLDER})")));
        assert!(out.contains(&format!("hidden => int 3  (at {PATH_PLACEHOLDER})")));
        // The root itself is reachable
        assert!(out.contains("(at root)"));
    }

    #[test]
    fn test_text_fallback_in_walk() {
        let mut h = Harness::new(quiet_config());
        let out = h.walk(&Value::raw_text(vec![0x41, 0xff])).unwrap();
        assert!(out.contains("A&#xFF;"));
    }

    #[test]
    fn test_long_text_is_clipped() {
        let mut h = Harness::new(quiet_config());
        let out = h.walk(&Value::text("x".repeat(500))).unwrap();
        assert!(out.contains("[+]"));
    }

    #[test]
    fn test_format_float_keeps_decimal_point() {
        assert_eq!(format_float(42.0), "42.0");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(f64::NAN), "NaN");
    }
}
