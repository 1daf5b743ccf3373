//! Renderer seam and the plain-text reference renderer
//!
//! The walker hands every visited node to a `Render` implementation;
//! child fragments are already rendered by the time the parent is. Skins
//! with richer output implement the same trait — the walker has no idea
//! what a fragment looks like inside.

use delve_core::{RenderNode, ValueId, ValueKind};

/// Capability to turn visited nodes into text fragments
pub trait Render {
    /// One childless node
    fn render_leaf(&self, node: &RenderNode) -> String;

    /// A container node with its children's fragments, in visit order
    fn render_branch(&self, node: &RenderNode, children: &[String]) -> String;

    /// Marker for a value whose identity was already visited this run
    fn render_cycle(&self, identity: ValueId, kind: ValueKind) -> String;
}

/// Configuration for plain-text output
#[derive(Debug, Clone)]
pub struct TextConfig {
    /// Number of spaces per nesting level
    pub indent: usize,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

/// Reference renderer: one line per node, children indented
#[derive(Debug, Default)]
pub struct TextRenderer {
    config: TextConfig,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TextConfig) -> Self {
        Self { config }
    }
}

impl Render for TextRenderer {
    fn render_leaf(&self, node: &RenderNode) -> String {
        let mut line = format!("{} => {}", node.name, node.kind.label());
        if !node.brief.is_empty() {
            line.push(' ');
            line.push_str(&node.brief);
        }
        if node.has_more {
            line.push_str(" [+]");
        }
        if let Some(path) = &node.access_path {
            line.push_str("  (at ");
            line.push_str(path);
            line.push(')');
        }
        line
    }

    fn render_branch(&self, node: &RenderNode, children: &[String]) -> String {
        let mut out = self.render_leaf(node);
        let pad = " ".repeat(self.config.indent);
        for child in children {
            for line in child.lines() {
                out.push('\n');
                out.push_str(&pad);
                out.push_str(line);
            }
        }
        out
    }

    fn render_cycle(&self, identity: ValueId, kind: ValueKind) -> String {
        format!("*RECURSION* #{identity} ({})", kind.label())
    }
}
