//! # gatehouse-settings
//!
//! Configuration management with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GatehouseSettings::default()`]
//! 2. **User file**: `~/.gatehouse/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `GATEHOUSE_*` overrides (highest priority)
//!
//! The global cache is reloadable: [`reload_settings_from_path`] swaps the
//! cached value so all subsequent [`get_settings`] calls return fresh data.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

/// Global settings cache.
static SETTINGS: RwLock<Option<Arc<GatehouseSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.gatehouse/settings.json` with env
/// overrides. If loading fails, returns compiled defaults.
pub fn get_settings() -> Arc<GatehouseSettings> {
    {
        let guard = SETTINGS.read();
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write();
    // Another thread may have initialized while we waited.
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            GatehouseSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Replace the cached settings with a specific value.
pub fn init_settings(settings: GatehouseSettings) {
    *SETTINGS.write() = Some(Arc::new(settings));
}

/// Reload settings from `path` and swap the global cache.
///
/// Falls back to defaults (with a warning) if the file is malformed.
pub fn reload_settings_from_path(path: &Path) -> Arc<GatehouseSettings> {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            GatehouseSettings::default()
        }
    });
    *SETTINGS.write() = Some(Arc::clone(&new));
    tracing::info!(?path, "settings loaded");
    new
}

#[cfg(test)]
pub(crate) fn reset_settings() {
    *SETTINGS.write() = None;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tests that mutate the global cache hold this lock.
    static SETTINGS_MUTEX: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    #[test]
    fn init_settings_sets_custom_value() {
        let _lock = SETTINGS_MUTEX.lock();
        reset_settings();
        let mut custom = GatehouseSettings::default();
        custom.server.port = 9999;
        init_settings(custom);
        assert_eq!(get_settings().server.port, 9999);
        reset_settings();
    }

    #[test]
    fn reload_from_path_updates_cache() {
        let _lock = SETTINGS_MUTEX.lock();
        reset_settings();
        init_settings(GatehouseSettings::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"logging": {"json": true}}"#).unwrap();

        let loaded = reload_settings_from_path(&path);
        assert!(loaded.logging.json);
        assert!(get_settings().logging.json);
        reset_settings();
    }

    #[test]
    fn reload_from_malformed_file_falls_back_to_defaults() {
        let _lock = SETTINGS_MUTEX.lock();
        reset_settings();
        let mut custom = GatehouseSettings::default();
        custom.server.port = 7777;
        init_settings(custom);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "][").unwrap();
        let _ = reload_settings_from_path(&path);
        assert_eq!(get_settings().server.port, 8787);
        reset_settings();
    }

    #[test]
    fn snapshot_isolated_from_reload() {
        let _lock = SETTINGS_MUTEX.lock();
        reset_settings();
        init_settings(GatehouseSettings::default());
        let snapshot = get_settings();

        let mut next = GatehouseSettings::default();
        next.server.port = 5555;
        init_settings(next);

        assert_eq!(snapshot.server.port, 8787);
        assert_eq!(get_settings().server.port, 5555);
        reset_settings();
    }
}
