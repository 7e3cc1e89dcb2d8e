//! Validation of caller-supplied code arrays.
//!
//! Site adapters hand over `[[path, content], ...]`. Anything else (a bare
//! object, null, a string, malformed pairs) is rejected before any work starts.

use serde_json::Value;
use tracing::warn;

use super::types::FileEntry;
use crate::error::DeployError;

/// Turn a JSON code array into ordered file entries
pub fn parse_code_array(code_array: &Value) -> Result<Vec<FileEntry>, DeployError> {
    let items = match code_array {
        Value::Array(items) => items,
        other => {
            warn!(kind = json_kind(other), "Code is not an array");
            return Err(DeployError::InvalidInput);
        }
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            parse_pair(item).ok_or_else(|| {
                warn!(
                    index,
                    kind = json_kind(item),
                    "Code array entry is not a [path, content] pair"
                );
                DeployError::InvalidInput
            })
        })
        .collect()
}

fn parse_pair(item: &Value) -> Option<FileEntry> {
    match item.as_array()?.as_slice() {
        [Value::String(path), Value::String(content)] if !path.is_empty() => {
            Some(FileEntry::new(path.as_str(), content.as_str()))
        }
        _ => None,
    }
}

/// Encode file entries back into the code array shape
pub fn to_code_array(entries: &[FileEntry]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|e| {
                Value::Array(vec![
                    Value::String(e.path.clone()),
                    Value::String(e.content.clone()),
                ])
            })
            .collect(),
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
