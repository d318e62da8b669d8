//! Configuration for constructing the storage engine.
//!
//! [`EngineConfig`] is a flat, serializable struct handed to the storage
//! layer by the caller. Parsing it out of a file format (YAML, TOML, ...)
//! is an external concern left to callers of this crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while building or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The `.beads/` directory was not found.
    #[error("no .beads directory found (run 'bd init' first)")]
    BeadsDirNotFound,

    /// Server mode was requested without the fields it needs.
    #[error("server_mode requires {field} to be set")]
    MissingServerField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// Embedded mode was requested without a data directory.
    #[error("embedded mode requires `path` to be set")]
    MissingPath,

    /// Filesystem I/O failed while reading or creating configuration state.
    #[error("config io error: {0}")]
    ReadError(#[from] std::io::Error),
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Construction parameters for the storage engine.
///
/// Every field here corresponds to an entry in the external interface's
/// configuration table. Serializes with `serde` so external callers can
/// embed it in their own config formats; this crate never parses one
/// itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Data directory for embedded mode. Absent in server mode.
    #[serde(default)]
    pub path: Option<String>,

    /// Database name, within the server or on the on-disk engine.
    #[serde(default)]
    pub database: String,

    /// Authorship name recorded on versioned commits.
    #[serde(default)]
    pub committer_name: String,

    /// Authorship email recorded on versioned commits.
    #[serde(default)]
    pub committer_email: String,

    /// Selects server mode (true) vs. embedded mode (false).
    #[serde(default)]
    pub server_mode: bool,

    /// Target server host, server mode only.
    #[serde(default)]
    pub server_host: Option<String>,

    /// Target server port, server mode only.
    #[serde(default)]
    pub server_port: Option<u16>,

    /// SQL credential: user.
    #[serde(default)]
    pub remote_user: Option<String>,

    /// SQL credential: password.
    #[serde(default)]
    pub remote_password: Option<String>,

    /// Opens with a shared advisory lock and skips schema initialization.
    #[serde(default)]
    pub read_only: bool,

    /// Maximum wait for the filesystem advisory lock.
    #[serde(default = "default_open_timeout")]
    pub open_timeout: Duration,

    /// Number of commit-level retries for lock-related transient errors.
    #[serde(default = "default_lock_retries")]
    pub lock_retries: u32,

    /// Delay between lock-related commit retries.
    #[serde(default = "default_lock_retry_delay")]
    pub lock_retry_delay: Duration,

    /// Server-mode per-query watchdog timeout. Zero disables the watchdog.
    #[serde(default)]
    pub query_timeout: Duration,

    /// Disables the background server supervisor.
    #[serde(default)]
    pub disable_watchdog: bool,
}

fn default_open_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_lock_retries() -> u32 {
    5
}

fn default_lock_retry_delay() -> Duration {
    Duration::from_millis(50)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: None,
            database: String::new(),
            committer_name: String::new(),
            committer_email: String::new(),
            server_mode: false,
            server_host: None,
            server_port: None,
            remote_user: None,
            remote_password: None,
            read_only: false,
            open_timeout: default_open_timeout(),
            lock_retries: default_lock_retries(),
            lock_retry_delay: default_lock_retry_delay(),
            query_timeout: Duration::ZERO,
            disable_watchdog: false,
        }
    }
}

impl EngineConfig {
    /// Builds a minimal embedded-mode config rooted at `path`.
    pub fn embedded(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Builds a minimal server-mode config pointed at `host:port`.
    pub fn server(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            server_mode: true,
            server_host: Some(host.into()),
            server_port: Some(port),
            database: database.into(),
            ..Self::default()
        }
    }

    /// Validates that the fields required by the selected mode are present.
    pub fn validate(&self) -> Result<()> {
        if self.server_mode {
            if self.server_host.is_none() {
                return Err(ConfigError::MissingServerField { field: "server_host" });
            }
            if self.server_port.is_none() {
                return Err(ConfigError::MissingServerField { field: "server_port" });
            }
        } else if self.path.is_none() {
            return Err(ConfigError::MissingPath);
        }
        Ok(())
    }

    /// Whether the query watchdog is active for this config.
    pub fn watchdog_enabled(&self) -> bool {
        self.server_mode && !self.disable_watchdog && !self.query_timeout.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_retry_bounds() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.lock_retries, 5);
        assert_eq!(cfg.open_timeout, Duration::from_secs(10));
        assert!(!cfg.server_mode);
    }

    #[test]
    fn embedded_requires_path() {
        let mut cfg = EngineConfig::default();
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingPath)));
        cfg.path = Some("/tmp/project/.beads".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn server_mode_requires_host_and_port() {
        let mut cfg = EngineConfig {
            server_mode: true,
            ..EngineConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingServerField { field: "server_host" })
        ));
        cfg.server_host = Some("db.internal".into());
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MissingServerField { field: "server_port" })
        ));
        cfg.server_port = Some(3306);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn watchdog_disabled_when_query_timeout_is_zero() {
        let cfg = EngineConfig::server("db.internal", 3306, "issues");
        assert!(!cfg.watchdog_enabled());
    }

    #[test]
    fn watchdog_enabled_when_configured() {
        let cfg = EngineConfig {
            query_timeout: Duration::from_secs(30),
            ..EngineConfig::server("db.internal", 3306, "issues")
        };
        assert!(cfg.watchdog_enabled());
    }

    #[test]
    fn embedded_constructor_sets_path() {
        let cfg = EngineConfig::embedded("/repo/.beads");
        assert_eq!(cfg.path.as_deref(), Some("/repo/.beads"));
        assert!(!cfg.server_mode);
    }
}
