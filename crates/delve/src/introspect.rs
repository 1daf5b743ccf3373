//! Introspector: the child-enumeration seam
//!
//! The walker never looks inside a container itself; it asks an
//! `Introspect` implementation to classify values, hand out identities,
//! and enumerate children in a deterministic order. The canonical
//! implementation covers the built-in `Value` model; hosts with their own
//! member-discovery conventions implement the trait over the same model.

use delve_core::{Value, ValueId, ValueKind, Visibility};

use crate::path::StepKind;

/// One enumerated child of a container value
#[derive(Debug, Clone)]
pub struct Child {
    /// Name at the parent: member name for objects, decimal index for
    /// composites
    pub name: String,
    pub value: Value,
    pub visibility: Visibility,
    /// Shape of the access-path step that reaches this child
    pub step: StepKind,
}

/// Capability to classify values and enumerate their children
pub trait Introspect {
    /// Kind tag for dispatch
    fn kind_of(&self, value: &Value) -> ValueKind;

    /// Stable per-run identity for containers, `None` for everything else
    fn identity_of(&self, value: &Value) -> Option<ValueId>;

    /// Children in the order they should be visited and rendered.
    /// Non-containers return an empty list.
    fn children_of(&self, value: &Value) -> Vec<Child>;
}

/// Canonical introspector over the built-in value model
#[derive(Debug, Default, Clone)]
pub struct ValueIntrospector;

impl Introspect for ValueIntrospector {
    fn kind_of(&self, value: &Value) -> ValueKind {
        value.kind()
    }

    fn identity_of(&self, value: &Value) -> Option<ValueId> {
        value.identity()
    }

    fn children_of(&self, value: &Value) -> Vec<Child> {
        match value {
            Value::Composite(items) => {
                // Clone out of the borrow before the walker recurses;
                // a held borrow would conflict on self-referential graphs
                items
                    .borrow()
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(idx, value)| Child {
                        name: idx.to_string(),
                        value,
                        visibility: Visibility::Public,
                        step: StepKind::Index,
                    })
                    .collect()
            }
            Value::Object(data) => data
                .members
                .borrow()
                .iter()
                .map(|member| Child {
                    name: member.name.clone(),
                    value: member.value.clone(),
                    visibility: member.visibility,
                    step: if member.via_accessor {
                        StepKind::Accessor
                    } else {
                        StepKind::Field
                    },
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}
