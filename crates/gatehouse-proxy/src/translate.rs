//! Permission prompt arguments → broker submission.
//!
//! Two argument shapes are accepted:
//!
//! - generic: `{action, description, resource?, details?}`
//! - tool call: `{tool_name, input}`, translated to `action = tool_name`,
//!   `details = input`, and a resource taken from the input's path, its
//!   command, or failing both its serialized form

use gatehouse_core::PermissionSubmission;
use serde_json::{Map, Value};

use crate::errors::ProxyError;

/// Input fields that carry a file path, in lookup order.
pub const PATH_FIELDS: [&str; 3] = ["file_path", "path", "notebook_path"];

/// Longest synthesized resource string.
const MAX_RESOURCE_LEN: usize = 200;

/// A translated prompt.
#[derive(Clone, Debug, PartialEq)]
pub struct Translated {
    /// What to submit to the broker.
    pub submission: PermissionSubmission,
    /// Input to echo back (possibly rewritten) when approved.
    pub input: Option<Value>,
}

/// Translate prompt arguments into a broker submission.
pub fn translate(args: &Value) -> Result<Translated, ProxyError> {
    let obj = args
        .as_object()
        .ok_or_else(|| ProxyError::InvalidParams("arguments must be an object".into()))?;

    if let Some(tool_name) = obj.get("tool_name").and_then(Value::as_str) {
        return Ok(translate_tool_call(tool_name, obj.get("input")));
    }

    let action = non_empty(obj, "action")
        .ok_or_else(|| ProxyError::InvalidParams("missing action or tool_name".into()))?;
    let description = non_empty(obj, "description")
        .ok_or_else(|| ProxyError::InvalidParams("missing description".into()))?;
    let details = obj.get("details").filter(|d| !d.is_null()).cloned();
    Ok(Translated {
        submission: PermissionSubmission {
            action: action.to_string(),
            description: description.to_string(),
            resource: obj
                .get("resource")
                .and_then(Value::as_str)
                .map(str::to_string),
            details: details.clone(),
        },
        input: details,
    })
}

fn translate_tool_call(tool_name: &str, input: Option<&Value>) -> Translated {
    let input = input.cloned().unwrap_or_else(|| Value::Object(Map::new()));
    let resource = resource_for(&input);
    let description = match &resource {
        Some(r) => format!("{tool_name} wants to access {r}"),
        None => format!("{tool_name} wants to run"),
    };
    Translated {
        submission: PermissionSubmission {
            action: tool_name.to_string(),
            description,
            resource,
            details: Some(input.clone()),
        },
        input: Some(input),
    }
}

/// Pick the most meaningful resource string out of a tool input.
pub fn resource_for(input: &Value) -> Option<String> {
    for field in PATH_FIELDS {
        if let Some(path) = input.get(field).and_then(Value::as_str) {
            return Some(path.to_string());
        }
    }
    if let Some(command) = input.get("command").and_then(Value::as_str) {
        return Some(truncate(command));
    }
    match input {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(truncate(&other.to_string())),
    }
}

fn non_empty<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_RESOURCE_LEN {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_RESOURCE_LEN).collect();
    out.push('…');
    out
}
