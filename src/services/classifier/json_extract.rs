//! JSON recovery from free-form classifier output
//!
//! Classifier responses are expected to contain one JSON object but arrive
//! as free text: sometimes bare JSON, sometimes fenced, sometimes wrapped
//! in prose. Recovery is an explicit ordered chain of parse strategies,
//! each optional-success:
//!
//! 1. direct parse of the whole response
//! 2. fenced ``` block contents
//! 3. balanced-brace scan anchored on an expected key
//! 4. outermost-brace substring
//!
//! Exhausting the chain yields `None`, never an error; the caller treats
//! that as "no information".

use serde_json::Value;
use tracing::debug;

/// Recover one JSON object from classifier text. `anchor_key` is a key the
/// expected schema is known to contain, used to anchor the brace scan.
pub fn extract_json_object(text: &str, anchor_key: &str) -> Option<Value> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }
    if let Some(value) = from_fenced_block(trimmed) {
        return Some(value);
    }
    if let Some(value) = from_anchored_braces(trimmed, anchor_key) {
        return Some(value);
    }
    if let Some(value) = from_outermost_braces(trimmed) {
        return Some(value);
    }

    debug!(anchor_key = %anchor_key, "No JSON object recoverable from classifier output");
    None
}

fn parse_object(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}

/// Contents of the first fenced code block (```json or bare ```)
fn from_fenced_block(text: &str) -> Option<Value> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip an optional language tag on the fence line
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    parse_object(body[..close].trim())
}

/// Scan for a balanced object around the first occurrence of the anchor
/// key: walk back to the nearest '{', then forward balancing braces while
/// respecting string literals and escapes.
fn from_anchored_braces(text: &str, anchor_key: &str) -> Option<Value> {
    let needle = format!("\"{}\"", anchor_key);
    let anchor = text.find(&needle)?;
    let start = text[..anchor].rfind('{')?;
    let candidate = balanced_object_at(text, start)?;
    parse_object(candidate)
}

/// Substring from the first '{' to the last '}', as a last resort
fn from_outermost_braces(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&text[start..=end])
}

/// The balanced `{...}` slice starting at byte offset `start`
fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    debug_assert_eq!(bytes.get(start), Some(&b'{'));

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
