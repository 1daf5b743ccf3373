//! Text decoding and display fallback
//!
//! Text values arrive as raw bytes; nothing guarantees an encoding. The
//! happy path is UTF-8 detection plus escaping. When detection fails the
//! bytes are re-encoded one code point at a time into numeric character
//! references, and that fallback itself is bounded: above the configured
//! ceiling only a static notice is shown, because the reference encoding
//! multiplies the input size and the whole point of the dumper is to stay
//! inside its budgets.

use delve_core::{TextEncoding, TextMeta};

/// Shown instead of the fallback encoding when the input exceeds the
/// fallback ceiling
pub const TOO_LARGE_NOTICE: &str = "(text too large to display safely)";

/// A text value after detection, ready for a render node
#[derive(Debug, Clone)]
pub struct DecodedText {
    pub rendered: String,
    pub meta: TextMeta,
}

/// Decode text bytes for display.
///
/// Never fails: every input produces *some* rendering plus metadata
/// recording which route it took.
pub fn decode(bytes: &[u8], fallback_ceiling: usize) -> DecodedText {
    match std::str::from_utf8(bytes) {
        Ok(s) => DecodedText {
            rendered: escape_text(s),
            meta: TextMeta {
                byte_len: bytes.len(),
                char_len: Some(s.chars().count()),
                encoding: TextEncoding::Utf8,
            },
        },
        Err(_) if bytes.len() > fallback_ceiling => DecodedText {
            rendered: TOO_LARGE_NOTICE.to_string(),
            meta: TextMeta {
                byte_len: bytes.len(),
                char_len: None,
                encoding: TextEncoding::TooLarge,
            },
        },
        Err(_) => DecodedText {
            rendered: numeric_refs(bytes),
            meta: TextMeta {
                byte_len: bytes.len(),
                // One code point per byte in the reference encoding
                char_len: Some(bytes.len()),
                encoding: TextEncoding::NumericRefs,
            },
        },
    }
}

/// Quote and escape a valid UTF-8 string for display
pub fn escape_text(s: &str) -> String {
    let mut buf = String::with_capacity(s.len() + 2);
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\x08' => buf.push_str("\\b"),
            '\x0C' => buf.push_str("\\f"),
            c if c.is_control() => {
                buf.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
    buf
}

/// Byte-per-code-point re-encoding into numeric character references.
/// Printable ASCII passes through; everything else (and `&`, to keep the
/// encoding unambiguous) becomes `&#xNN;`.
fn numeric_refs(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..0x7f).contains(&b) && b != b'&' {
            out.push(b as char);
        } else {
            out.push_str(&format!("&#x{:02X};", b));
        }
    }
    out
}
