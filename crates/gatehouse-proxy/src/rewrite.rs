//! Temp-path rewriting for approved tool input.
//!
//! Paths under a well-known temp root are outside the session workspace and
//! shared with every other process on the host. An approved call that
//! targets one is redirected to the same relative name inside the workspace,
//! whatever the agent asked for.

use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::translate::PATH_FIELDS;

/// Temp roots that are never written to directly.
pub const UNTRUSTED_TEMP_ROOTS: [&str; 3] = ["/tmp", "/var/tmp", "/private/tmp"];

/// Map `path` into `workspace` if it lives under an untrusted temp root.
///
/// The remainder below the temp root is kept. A remainder that tries to
/// climb out with `..` is reduced to its final file name.
pub fn rewrite_path(path: &str, workspace: &Path) -> Option<PathBuf> {
    let candidate = Path::new(path);
    let remainder = UNTRUSTED_TEMP_ROOTS
        .iter()
        .find_map(|root| candidate.strip_prefix(root).ok())?;
    if remainder.as_os_str().is_empty() {
        return Some(workspace.to_path_buf());
    }
    if remainder
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Some(workspace.join(remainder));
    }
    Some(match remainder.file_name() {
        Some(name) => workspace.join(name),
        None => workspace.to_path_buf(),
    })
}

/// Whether `path` sits under one of [`UNTRUSTED_TEMP_ROOTS`].
pub fn is_untrusted(path: &str) -> bool {
    let candidate = Path::new(path);
    UNTRUSTED_TEMP_ROOTS
        .iter()
        .any(|root| candidate.starts_with(root))
}

/// Path fields of `input` that point into a temp root.
pub fn untrusted_fields(input: &Value) -> Vec<&'static str> {
    PATH_FIELDS
        .into_iter()
        .filter(|field| input.get(field).and_then(Value::as_str).is_some_and(is_untrusted))
        .collect()
}

/// Rewrite every path field of `input` that points into a temp root.
///
/// Returns the number of fields changed.
pub fn rewrite_temp_paths(input: &mut Value, workspace: &Path) -> usize {
    let Some(obj) = input.as_object_mut() else {
        return 0;
    };
    let mut changed = 0;
    for field in PATH_FIELDS {
        let Some(original) = obj.get(field).and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if let Some(rewritten) = rewrite_path(&original, workspace) {
            let rewritten = rewritten.display().to_string();
            info!(field, from = %original, to = %rewritten, "redirected temp path into workspace");
            let _ = obj.insert(field.to_string(), Value::String(rewritten));
            changed += 1;
        }
    }
    changed
}
