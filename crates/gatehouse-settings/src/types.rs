//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may specify any subset of fields; missing ones get their default.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Seconds the broker waits for a human decision.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Seconds the proxy waits for the broker. Must exceed the broker deadline.
pub const DEFAULT_PROXY_TIMEOUT_SECS: u64 = 65;

/// Root settings type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatehouseSettings {
    /// HTTP listener.
    pub server: ServerSettings,
    /// Permission broker.
    pub broker: BrokerSettings,
    /// Session workspaces.
    pub workspace: WorkspaceSettings,
    /// Agent runtime command.
    pub agent: AgentSettings,
    /// Tool permission proxy.
    pub proxy: ProxySettings,
    /// Logging.
    pub logging: LoggingSettings,
}

impl GatehouseSettings {
    /// Correct invalid invariants in place.
    ///
    /// Called automatically during loading. Out-of-range values are corrected
    /// with a warning rather than rejected.
    pub fn validate(&mut self) {
        if self.broker.request_timeout_secs == 0 {
            tracing::warn!("broker requestTimeoutSecs is 0, using default");
            self.broker.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        if self.broker.observer_buffer == 0 {
            tracing::warn!("broker observerBuffer is 0, using 1");
            self.broker.observer_buffer = 1;
        }
        if self.proxy.request_timeout_secs <= self.broker.request_timeout_secs {
            let corrected = self.broker.request_timeout_secs + 5;
            tracing::warn!(
                "proxy requestTimeoutSecs ({}) <= broker requestTimeoutSecs ({}), correcting to {corrected}",
                self.proxy.request_timeout_secs,
                self.broker.request_timeout_secs
            );
            self.proxy.request_timeout_secs = corrected;
        }
    }
}

/// HTTP listener settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
        }
    }
}

impl ServerSettings {
    /// Base URL the proxy should call back on.
    pub fn base_url(&self) -> String {
        let host = if self.host == "0.0.0.0" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        format!("http://{host}:{}", self.port)
    }
}

/// Permission broker settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Deadline for a human decision, in seconds.
    pub request_timeout_secs: u64,
    /// Per-observer queue capacity. A full queue evicts the observer.
    pub observer_buffer: usize,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            observer_buffer: 256,
        }
    }
}

/// Session workspace settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceSettings {
    /// Directory holding one subdirectory per session.
    pub base_dir: PathBuf,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            base_dir: crate::loader::home_dir()
                .join(".gatehouse")
                .join("workspaces"),
        }
    }
}

/// Agent runtime command settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Program launched once per chat turn.
    pub command: String,
    /// Extra arguments passed to the program.
    pub args: Vec<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            command: "gatehouse-runner".into(),
            args: Vec::new(),
        }
    }
}

/// Tool permission proxy settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    /// Proxy program the agent runtime launches.
    pub command: String,
    /// How long the proxy waits for the broker, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            command: "gatehouse-proxy".into(),
            request_timeout_secs: DEFAULT_PROXY_TIMEOUT_SECS,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = GatehouseSettings::default();
        assert_eq!(s.server.port, 8787);
        assert_eq!(s.broker.request_timeout_secs, 60);
        assert_eq!(s.proxy.request_timeout_secs, 65);
        assert_eq!(s.logging.level, "info");
        assert!(s.workspace.base_dir.ends_with(".gatehouse/workspaces"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: GatehouseSettings =
            serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(s.server.port, 9000);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.broker.observer_buffer, 256);
    }

    #[test]
    fn validate_keeps_proxy_above_broker_deadline() {
        let mut s = GatehouseSettings::default();
        s.broker.request_timeout_secs = 120;
        s.validate();
        assert_eq!(s.proxy.request_timeout_secs, 125);
    }

    #[test]
    fn validate_fixes_zero_values() {
        let mut s = GatehouseSettings::default();
        s.broker.request_timeout_secs = 0;
        s.broker.observer_buffer = 0;
        s.validate();
        assert_eq!(s.broker.request_timeout_secs, 60);
        assert_eq!(s.broker.observer_buffer, 1);
    }

    #[test]
    fn base_url_rewrites_wildcard_host() {
        let server = ServerSettings {
            host: "0.0.0.0".into(),
            port: 1234,
        };
        assert_eq!(server.base_url(), "http://127.0.0.1:1234");
    }
}
