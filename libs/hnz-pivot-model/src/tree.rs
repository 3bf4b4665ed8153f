//! Attribute-tree accessors
//!
//! Conversion units travel as `serde_json::Value` attribute trees. These
//! helpers centralize child lookup and typed extraction so that "attribute
//! present but wrong kind" is always an explicit error instead of a silent
//! no-op.

use serde_json::Value;

use crate::error::{ConversionError, Result};

/// Look up a named child of an attribute dictionary.
///
/// Returns `None` when the node is not a dictionary or the child is absent.
pub fn child<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    node.as_object().and_then(|map| map.get(name))
}

/// Extract a string payload.
pub fn value_str<'a>(node: &'a Value, name: &str) -> Result<&'a str> {
    node.as_str().ok_or_else(|| ConversionError::WrongValueType {
        name: name.to_string(),
        expected: "a string",
    })
}

/// Extract an integer payload.
pub fn value_i64(node: &Value, name: &str) -> Result<i64> {
    node.as_i64().ok_or_else(|| ConversionError::WrongValueType {
        name: name.to_string(),
        expected: "an integer",
    })
}

/// String payload of a required child.
pub fn child_str<'a>(node: &'a Value, name: &str) -> Result<&'a str> {
    match child(node, name) {
        Some(c) => value_str(c, name),
        None => Err(ConversionError::MissingChild(name.to_string())),
    }
}

/// Integer payload of a required child.
pub fn child_i64(node: &Value, name: &str) -> Result<i64> {
    match child(node, name) {
        Some(c) => value_i64(c, name),
        None => Err(ConversionError::MissingChild(name.to_string())),
    }
}

/// Boolean read of an integer-carrying child: any value above zero is true.
///
/// Absent child leaves `out` untouched; a non-integer payload is an error.
pub fn read_bool(node: &Value, name: &str, out: &mut bool) -> Result<()> {
    if let Some(c) = child(node, name) {
        *out = value_i64(c, name)? > 0;
    }
    Ok(())
}
