// Server Configuration
//
// Listen address, backing file and failure policy for the history
// service. Loaded from an optional JSON file; every field has a default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What the HTTP layer does when the store fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and answer as if it succeeded: an unreadable history
    /// is served empty and a failed append still reports 201.
    #[default]
    Lenient,

    /// Surface store failures as 500 responses.
    Strict,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid listen address `{0}`")]
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub data_file: PathBuf,
    pub failure_policy: FailurePolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 3000,
            data_file: PathBuf::from("public/data/data.json"),
            failure_policy: FailurePolicy::Lenient,
        }
    }
}

/// Values given on the command line (or via `PORT`). Unset fields leave the
/// loaded config alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub data_file: Option<PathBuf>,
    pub strict: bool,
}

impl ServerConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(address) = overrides.address {
            self.address = address;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(data_file) = overrides.data_file {
            self.data_file = data_file;
        }
        if overrides.strict {
            self.failure_policy = FailurePolicy::Strict;
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.address, self.port);
        addr.parse().map_err(|_| ConfigError::Address(addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = ServerConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 3000);
        assert_eq!(config.failure_policy, FailurePolicy::Lenient);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let config = ServerConfig::from_json_str(
            r#"{ "port": 8080, "failure_policy": "strict", "data_file": "/var/lib/photolog/history.json" }"#,
        )
        .unwrap();

        assert_eq!(config.address, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
        assert_eq!(
            config.data_file,
            PathBuf::from("/var/lib/photolog/history.json")
        );
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = ServerConfig::from_json_str(r#"{ "failure_policy": "yolo" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn command_line_wins_over_file() {
        let file = ServerConfig::from_json_str(r#"{ "port": 8080, "address": "127.0.0.1" }"#)
            .unwrap();

        let config = file.with_overrides(ConfigOverrides {
            port: Some(9000),
            strict: true,
            ..Default::default()
        });

        assert_eq!(config.port, 9000);
        assert_eq!(config.address, "127.0.0.1");
        assert_eq!(config.failure_policy, FailurePolicy::Strict);
    }

    #[test]
    fn socket_addr_validates_address() {
        let config = ServerConfig {
            address: "127.0.0.1".into(),
            port: 4000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 4000);

        let bad = ServerConfig {
            address: "not an address".into(),
            ..Default::default()
        };
        assert!(matches!(bad.socket_addr(), Err(ConfigError::Address(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = ServerConfig::from_json_file(Path::new("/nonexistent/photolog.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
