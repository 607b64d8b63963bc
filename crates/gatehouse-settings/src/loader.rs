//! Settings loading: defaults, then file, then environment.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::GatehouseSettings;

/// Resolve the user's home directory, falling back to the current directory.
pub fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from)
}

/// Default settings file location: `~/.gatehouse/settings.json`.
pub fn settings_path() -> PathBuf {
    home_dir().join(".gatehouse").join("settings.json")
}

/// Recursively merge `overlay` into `base`. Objects merge key by key;
/// any other overlay value replaces the base value.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<GatehouseSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env overrides.
///
/// A missing file yields defaults. An unreadable or malformed file is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GatehouseSettings> {
    let mut settings = read_file_layer(path)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate();
    Ok(settings)
}

fn read_file_layer(path: &Path) -> Result<GatehouseSettings> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(?path, "no settings file, using defaults");
            return Ok(GatehouseSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let parse_err = |source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let user: Value = serde_json::from_str(&raw).map_err(parse_err)?;
    let defaults = serde_json::to_value(GatehouseSettings::default()).map_err(parse_err)?;
    serde_json::from_value(deep_merge(defaults, user)).map_err(parse_err)
}

/// Apply `GATEHOUSE_*` overrides using `lookup` to read variables.
///
/// Unparseable numeric values are ignored with a warning.
pub fn apply_env_overrides(
    settings: &mut GatehouseSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(host) = lookup("GATEHOUSE_HOST") {
        settings.server.host = host;
    }
    if let Some(port) = lookup("GATEHOUSE_PORT") {
        match port.parse() {
            Ok(port) => settings.server.port = port,
            Err(_) => tracing::warn!(%port, "ignoring invalid GATEHOUSE_PORT"),
        }
    }
    if let Some(dir) = lookup("GATEHOUSE_WORKSPACE_DIR") {
        settings.workspace.base_dir = PathBuf::from(dir);
    }
    if let Some(command) = lookup("GATEHOUSE_AGENT_COMMAND") {
        settings.agent.command = command;
    }
    if let Some(command) = lookup("GATEHOUSE_PROXY_COMMAND") {
        settings.proxy.command = command;
    }
    if let Some(level) = lookup("GATEHOUSE_LOG_LEVEL") {
        settings.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn deep_merge_nested_objects() {
        let merged = deep_merge(
            json!({"a": {"x": 1, "y": 2}, "b": 1}),
            json!({"a": {"y": 3}, "c": 4}),
        );
        assert_eq!(merged, json!({"a": {"x": 1, "y": 3}, "b": 1, "c": 4}));
    }

    #[test]
    fn deep_merge_replaces_non_objects() {
        assert_eq!(deep_merge(json!([1, 2]), json!([3])), json!([3]));
        assert_eq!(deep_merge(json!({"a": 1}), json!("s")), json!("s"));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = read_file_layer(&dir.path().join("nope.json")).unwrap();
        assert_eq!(s, GatehouseSettings::default());
    }

    #[test]
    fn file_layer_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"broker": {"requestTimeoutSecs": 30}}"#).unwrap();
        let s = load_settings_from_path(&path).unwrap();
        assert_eq!(s.broker.request_timeout_secs, 30);
        assert_eq!(s.broker.observer_buffer, 256);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GATEHOUSE_PORT", "9999"),
            ("GATEHOUSE_WORKSPACE_DIR", "/srv/ws"),
            ("GATEHOUSE_AGENT_COMMAND", "my-agent"),
        ]);
        let mut s = GatehouseSettings::default();
        apply_env_overrides(&mut s, |k| vars.get(k).map(ToString::to_string));
        assert_eq!(s.server.port, 9999);
        assert_eq!(s.workspace.base_dir, PathBuf::from("/srv/ws"));
        assert_eq!(s.agent.command, "my-agent");
    }

    #[test]
    fn invalid_env_port_is_ignored() {
        let mut s = GatehouseSettings::default();
        apply_env_overrides(&mut s, |k| (k == "GATEHOUSE_PORT").then(|| "abc".to_string()));
        assert_eq!(s.server.port, 8787);
    }
}
