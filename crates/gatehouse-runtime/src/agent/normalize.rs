//! Turn event normalization.
//!
//! The agent runtime emits loosely typed JSON values. [`normalize`] reduces
//! each one to at most one [`TurnEvent`], checking shapes in a fixed order:
//!
//! 1. bare string → text
//! 2. `{type:"system", subtype:"init", session_id}` → session bound
//! 3. `{type:"assistant", message:{content:[…]}}` → text parts joined by `\n`
//! 4. `{type:"result", …}` → nothing (it repeats the incremental content)
//! 5. any object with a string `content` or `text` field → text
//! 6. anything else → nothing

use serde_json::Value;

/// A normalized turn event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnEvent {
    /// Assistant text.
    Text(String),
    /// The runtime announced its session ID.
    SessionBound(String),
}

/// Classify one raw turn event.
pub fn normalize(value: &Value) -> Option<TurnEvent> {
    let obj = match value {
        Value::String(s) => return Some(TurnEvent::Text(s.clone())),
        Value::Object(obj) => obj,
        _ => return None,
    };

    let kind = obj.get("type").and_then(Value::as_str);

    if kind == Some("system") && obj.get("subtype").and_then(Value::as_str) == Some("init") {
        if let Some(id) = obj.get("session_id").and_then(Value::as_str) {
            return Some(TurnEvent::SessionBound(id.to_string()));
        }
    }

    if kind == Some("assistant") {
        if let Some(parts) = obj
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(Value::as_array)
        {
            let text = parts
                .iter()
                .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n");
            return (!text.is_empty()).then_some(TurnEvent::Text(text));
        }
    }

    if kind == Some("result") {
        return None;
    }

    obj.get("content")
        .and_then(Value::as_str)
        .or_else(|| obj.get("text").and_then(Value::as_str))
        .map(|s| TurnEvent::Text(s.to_string()))
}

/// Append `next` to `acc`, separating non-empty sides with a blank line.
pub fn push_text(acc: &mut String, next: &str) {
    if !acc.is_empty() && !next.is_empty() {
        acc.push_str("\n\n");
    }
    acc.push_str(next);
}

/// Join consecutive text chunks for non-streaming consumers.
pub fn join_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        push_text(&mut out, part);
    }
    out
}
