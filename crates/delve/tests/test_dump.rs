//! End-to-end tests for the public dump API
//!
//! These exercise whole dump runs through `DumpSession`: cycle
//! termination, aliasing detection, the depth boundary, chunk
//! transparency, and scope-gated access paths.

use delve::{DumpConfig, DumpSession, Member, PATH_PLACEHOLDER, SELF_SCOPE, Value, Visibility};
use serial_test::serial;

fn config_with_dir(dir: &std::path::Path) -> DumpConfig {
    DumpConfig {
        // Keep the memory probe out of the picture: these tests are about
        // traversal semantics, not the environment they run in
        memory_left_bytes: 0,
        chunk_dir: dir.to_path_buf(),
        ..DumpConfig::default()
    }
}

fn dump(root: &Value, config: &DumpConfig) -> (String, delve::DumpStats) {
    let mut session = DumpSession::new(config.clone());
    session.dump(root);
    let mut sink = Vec::new();
    let stats = session.finish(&mut sink).unwrap();
    (String::from_utf8(sink).unwrap(), stats)
}

#[test]
#[serial]
fn test_example_scenario() {
    let dir = tempfile::tempdir().unwrap();
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
    let (out, stats) = dump(&root, &config_with_dir(dir.path()));

    let root_pos = out.find("root => object").unwrap();
    let a = out.find("a => int 1").unwrap();
    let b = out.find("b => object").unwrap();
    let c = out.find("c => int 2").unwrap();
    assert!(root_pos < a && a < b && b < c, "order must be preserved:\n{out}");

    assert!(!out.contains("*RECURSION*"));
    assert!(!out.contains("(maximum depth"));
    assert!(!out.contains(PATH_PLACEHOLDER));
    assert_eq!(stats.nodes_rendered, 4);
    assert_eq!(stats.cycle_markers, 0);
    assert_eq!(stats.depth_hits, 0);
}

#[test]
#[serial]
fn test_cycle_terminates_with_one_marker_per_identity() {
    let dir = tempfile::tempdir().unwrap();
    // node -> next -> node (a two-object ring)
    let first = Value::object("Node", vec![Member::public("next", Value::Null)]);
    let second = Value::object("Node", vec![Member::public("next", first.clone())]);
    if let Value::Object(data) = &first {
        data.members.borrow_mut()[0].value = second.clone();
    }

    let (out, stats) = dump(&first, &config_with_dir(dir.path()));
    assert_eq!(out.matches("*RECURSION*").count(), 1);
    assert_eq!(stats.cycle_markers, 1);
    // Ring of two: both objects rendered once, plus the marker
    assert_eq!(stats.nodes_rendered, 3);
}

#[test]
#[serial]
fn test_deep_self_reference_terminates() {
    let dir = tempfile::tempdir().unwrap();
    // Object whose member graph points back at it from several levels down
    let root = Value::object("Deep", vec![Member::public("layers", Value::Null)]);
    let inner = Value::composite(vec![Value::composite(vec![root.clone()])]);
    if let Value::Object(data) = &root {
        data.members.borrow_mut()[0].value = inner;
    }

    let (out, _) = dump(&root, &config_with_dir(dir.path()));
    assert_eq!(out.matches("*RECURSION*").count(), 1);
}

#[test]
#[serial]
fn test_aliasing_detected_value_equality_is_not() {
    let dir = tempfile::tempdir().unwrap();

    // Two references to the same composite: second is a revisit
    let shared = Value::composite(vec![Value::Int(7)]);
    let aliased_root = Value::composite(vec![shared.clone(), shared]);
    let (out, _) = dump(&aliased_root, &config_with_dir(dir.path()));
    assert_eq!(out.matches("*RECURSION*").count(), 1);

    // Two independent composites with identical contents: no markers
    let equal_root = Value::composite(vec![
        Value::composite(vec![Value::Int(7)]),
        Value::composite(vec![Value::Int(7)]),
    ]);
    let (out, _) = dump(&equal_root, &config_with_dir(dir.path()));
    assert_eq!(out.matches("*RECURSION*").count(), 0);
}

#[test]
#[serial]
fn test_depth_placeholder_at_exactly_limit_plus_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = DumpConfig {
        max_nesting_level: 2,
        ..config_with_dir(dir.path())
    };
    // Chain: root(level 0) -> (1) -> (2) -> (3) -> leaf
    let root = Value::composite(vec![Value::composite(vec![Value::composite(vec![
        Value::composite(vec![Value::Int(99)]),
    ])])]);
    let (out, stats) = dump(&root, &config);

    assert_eq!(out.matches("(maximum depth reached)").count(), 1);
    // Level 3 = three indents of the default two spaces
    assert!(
        out.contains("\n      0 => composite (maximum depth reached)"),
        "placeholder must sit at level 3:\n{out}"
    );
    // Children beyond the cutoff are never read
    assert!(!out.contains("99"));
    assert_eq!(stats.depth_hits, 1);
}

#[test]
#[serial]
fn test_chunking_is_value_transparent() {
    let dir_chunked = tempfile::tempdir().unwrap();
    let dir_plain = tempfile::tempdir().unwrap();
    let root = Value::composite(
        (0..128)
            .map(|i| Value::text(format!("row {i} with some padding text")))
            .collect(),
    );

    let chunked_config = DumpConfig {
        chunk_threshold: 64,
        ..config_with_dir(dir_chunked.path())
    };
    let plain_config = DumpConfig {
        chunk_threshold: 0,
        ..config_with_dir(dir_plain.path())
    };

    let (chunked, chunked_stats) = dump(&root, &chunked_config);
    let (plain, plain_stats) = dump(&root, &plain_config);
    assert_eq!(chunked, plain, "chunking must not change output bytes");
    assert!(chunked_stats.chunks_spilled > 0);
    assert_eq!(plain_stats.chunks_spilled, 0);

    // Read-once: nothing remains in storage after a finished flush
    let leftover = std::fs::read_dir(dir_chunked.path()).unwrap().count();
    assert_eq!(leftover, 0);
}

#[test]
#[serial]
fn test_scope_gating() {
    let dir = tempfile::tempdir().unwrap();
    let root = Value::object(
        "Widget",
        vec![
            Member::public("size", Value::Int(10)),
            Member::new("cache", Value::Int(11), Visibility::Private),
            Member::new("origin", Value::Int(12), Visibility::PrivateInherited),
        ],
    );

    // Scope unset: no access paths anywhere
    let (out, stats) = dump(&root, &config_with_dir(dir.path()));
    assert!(!out.contains("(at "));
    assert_eq!(stats.paths_emitted, 0);

    // Self scope: public and plain-private members at level 1 get real
    // expressions, private-inherited gets the placeholder
    let mut session = DumpSession::new(config_with_dir(dir.path()));
    session.set_scope(SELF_SCOPE);
    session.dump(&root);
    let mut sink = Vec::new();
    let stats = session.finish(&mut sink).unwrap();
    let out = String::from_utf8(sink).unwrap();

    assert!(out.contains("size => int 10  (at root.size)"));
    assert!(out.contains("cache => int 11  (at root.cache)"));
    assert!(out.contains(&format!("origin => int 12  (at {PATH_PLACEHOLDER})")));
    assert!(stats.paths_emitted > 0);
}

#[test]
#[serial]
fn test_non_self_scope_yields_placeholders_only() {
    let dir = tempfile::tempdir().unwrap();
    let root = Value::object("Widget", vec![Member::public("size", Value::Int(10))]);

    let mut session = DumpSession::new(config_with_dir(dir.path()));
    session.set_scope("Widget");
    session.dump(&root);
    let mut sink = Vec::new();
    session.finish(&mut sink).unwrap();
    let out = String::from_utf8(sink).unwrap();

    assert!(out.contains(&format!("size => int 10  (at {PATH_PLACEHOLDER})")));
    assert!(!out.contains("(at root.size)"));
}

#[test]
#[serial]
fn test_ambiguous_root_disables_paths_entirely() {
    let dir = tempfile::tempdir().unwrap();
    let root = Value::object("Widget", vec![Member::public("size", Value::Int(10))]);

    let mut session = DumpSession::new(config_with_dir(dir.path()));
    session.set_scope(SELF_SCOPE);
    session.mark_root_ambiguous();
    session.dump(&root);
    let mut sink = Vec::new();
    let stats = session.finish(&mut sink).unwrap();
    let out = String::from_utf8(sink).unwrap();

    assert!(!out.contains("(at "));
    assert_eq!(stats.paths_emitted, 0);
}

#[test]
#[serial]
fn test_call_budget_truncates_wide_dump() {
    let dir = tempfile::tempdir().unwrap();
    let config = DumpConfig {
        max_call_count: 5,
        ..config_with_dir(dir.path())
    };
    let root = Value::composite((0..20).map(Value::Int).collect());
    let (out, stats) = dump(&root, &config);

    assert_eq!(out.matches("nearly exhausted").count(), 1);
    assert!(out.contains("(node budget exceeded)"));
    assert_eq!(stats.call_refusals, 20 - 3);
    // Budget or not, the dump stayed well-formed and complete per line
    assert!(out.starts_with("root => composite 20 items"));
}

#[test]
#[serial]
fn test_mixed_kinds_render() {
    let dir = tempfile::tempdir().unwrap();
    let root = Value::composite(vec![
        Value::Null,
        Value::Bool(false),
        Value::Float(1.5),
        Value::text("plain"),
        Value::raw_text(vec![0xc3, 0x28]),
        Value::opaque("file-handle"),
    ]);
    let (out, _) = dump(&root, &config_with_dir(dir.path()));

    assert!(out.contains("0 => null"));
    assert!(out.contains("1 => bool false"));
    assert!(out.contains("2 => float 1.5"));
    assert!(out.contains("3 => text \"plain\""));
    // Invalid UTF-8 takes the numeric-reference fallback
    assert!(out.contains("&#x"));
    assert!(out.contains("5 => opaque <file-handle>"));
}
