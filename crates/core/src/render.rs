//! RenderNode: the renderer-facing record of one visited value
//!
//! The walker turns every visited value into a `RenderNode` before any
//! renderer sees it. The node carries owned strings only, so it can be
//! serialized (serde) or handed to renderers that outlive the walk.
//!
//! A node has a *brief* form always, and a *detail* form only when the
//! brief form had to be truncated — `has_more` flags that case so skins can
//! offer expansion.

use serde::Serialize;

use crate::value::ValueKind;

/// Encoding disposition of a text value after detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextEncoding {
    /// Bytes were valid UTF-8
    Utf8,
    /// Detection failed; bytes were re-encoded as numeric character
    /// references
    NumericRefs,
    /// Detection failed and the input exceeded the fallback ceiling;
    /// only a static notice is shown
    TooLarge,
}

/// Metadata attached to text nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextMeta {
    /// Length in bytes as handed over by the caller
    pub byte_len: usize,
    /// Length in characters, when the encoding made that countable
    pub char_len: Option<usize>,
    pub encoding: TextEncoding,
}

/// One visited value, ready for rendering
#[derive(Debug, Clone, Serialize)]
pub struct RenderNode {
    /// Name of this value at its parent (member name, index, root name)
    pub name: String,
    /// Machine-readable kind tag
    pub kind: ValueKind,
    /// Short form, always present
    pub brief: String,
    /// Long form, present only when the short form was truncated
    pub detail: Option<String>,
    /// True iff `detail` carries more than `brief` shows
    pub has_more: bool,
    /// Text metadata, for text nodes only
    pub text: Option<TextMeta>,
    /// Source-level access path, when generation is enabled for the dump
    pub access_path: Option<String>,
}

impl RenderNode {
    /// Leaf node with a brief form that fit as-is
    pub fn leaf(name: impl Into<String>, kind: ValueKind, brief: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            brief: brief.into(),
            detail: None,
            has_more: false,
            text: None,
            access_path: None,
        }
    }

    /// Split a full rendering into brief/detail around a length threshold.
    ///
    /// At or under the threshold the full form *is* the brief form; above
    /// it the brief form is a character-boundary-safe prefix and the full
    /// form moves to `detail`.
    pub fn clipped(
        name: impl Into<String>,
        kind: ValueKind,
        full: String,
        brief_limit: usize,
    ) -> Self {
        if full.chars().count() <= brief_limit {
            return Self::leaf(name, kind, full);
        }
        let brief: String = full.chars().take(brief_limit).collect();
        Self {
            name: name.into(),
            kind,
            brief,
            detail: Some(full),
            has_more: true,
            text: None,
            access_path: None,
        }
    }

    /// Attach text metadata
    pub fn with_text_meta(mut self, meta: TextMeta) -> Self {
        self.text = Some(meta);
        self
    }

    /// Attach an access path
    pub fn with_access_path(mut self, path: impl Into<String>) -> Self {
        self.access_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_has_no_detail() {
        let n = RenderNode::leaf("x", ValueKind::Int, "42");
        assert_eq!(n.brief, "42");
        assert!(n.detail.is_none());
        assert!(!n.has_more);
    }

    #[test]
    fn test_clipped_under_limit_is_leaf() {
        let n = RenderNode::clipped("s", ValueKind::Text, "short".to_string(), 10);
        assert_eq!(n.brief, "short");
        assert!(!n.has_more);
    }

    #[test]
    fn test_clipped_over_limit_keeps_full_form() {
        let full = "a".repeat(20);
        let n = RenderNode::clipped("s", ValueKind::Text, full.clone(), 8);
        assert_eq!(n.brief.chars().count(), 8);
        assert_eq!(n.detail.as_deref(), Some(full.as_str()));
        assert!(n.has_more);
    }

    #[test]
    fn test_clipped_respects_char_boundaries() {
        let full = "héllo wörld plus more text".to_string();
        let n = RenderNode::clipped("s", ValueKind::Text, full, 7);
        // Prefix is counted in chars, not bytes
        assert_eq!(n.brief.chars().count(), 7);
    }

    #[test]
    fn test_serializes_to_json() {
        let n = RenderNode::leaf("x", ValueKind::Bool, "true").with_access_path("root.x");
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["kind"], "bool");
        assert_eq!(json["access_path"], "root.x");
    }
}
