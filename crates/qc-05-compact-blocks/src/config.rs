//! Compact block reconciliation configuration.
//!
//! Loaded from defaults, environment variables, or a TOML file:
//!
//! ```toml
//! [compact_blocks]
//! peer_request_fanout = 5
//! reconstruction_timeout_ms = 5000
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Peers asked for each missing transaction.
pub const DEFAULT_PEER_REQUEST_FANOUT: usize = 5;

/// Default wait for missing transactions, in milliseconds.
pub const DEFAULT_RECONSTRUCTION_TIMEOUT_MS: u64 = 5_000;

/// Reconciliation configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompactBlockConfig {
    /// Number of candidate peers each missing transaction is requested from.
    pub peer_request_fanout: usize,
    /// Deadline used by `fetch_txs_from_keys_with_timeout`.
    pub reconstruction_timeout_ms: u64,
}

impl Default for CompactBlockConfig {
    fn default() -> Self {
        Self {
            peer_request_fanout: DEFAULT_PEER_REQUEST_FANOUT,
            reconstruction_timeout_ms: DEFAULT_RECONSTRUCTION_TIMEOUT_MS,
        }
    }
}

/// Logging configuration consumed by [`init_logging`](crate::logging::init_logging).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration file structure.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub compact_blocks: CompactBlockConfig,
    pub logging: LoggingConfig,
}

impl CompactBlockConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_COMPACT_FANOUT`: peers per missing transaction (default: 5)
    /// - `QC_COMPACT_TIMEOUT_MS`: reconstruction timeout (default: 5000)
    ///
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            peer_request_fanout: env::var("QC_COMPACT_FANOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.peer_request_fanout),
            reconstruction_timeout_ms: env::var("QC_COMPACT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reconstruction_timeout_ms),
        }
    }

    pub fn reconstruction_timeout(&self) -> Duration {
        Duration::from_millis(self.reconstruction_timeout_ms)
    }

    /// Rejects values the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.peer_request_fanout == 0 {
            return Err(ConfigError::Invalid {
                field: "peer_request_fanout",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.reconstruction_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "reconstruction_timeout_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl LoggingConfig {
    /// Create configuration from environment variables.
    ///
    /// - `QC_LOG_LEVEL` or `RUST_LOG`: filter directive (default: info)
    /// - `QC_JSON_LOGS`: JSON output (default: false)
    pub fn from_env() -> Self {
        Self {
            level: env::var("QC_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),
            json: env::var("QC_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl ConfigFile {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string. Missing tables and fields
    /// take their defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(content)?;
        file.compact_blocks.validate()?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{const_mutex, Mutex};

    /// Serialises tests that touch the process environment.
    static ENV_LOCK: Mutex<()> = const_mutex(());

    const ENV_VARS: [&str; 4] = [
        "QC_COMPACT_FANOUT",
        "QC_COMPACT_TIMEOUT_MS",
        "QC_LOG_LEVEL",
        "QC_JSON_LOGS",
    ];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock();
        for name in ENV_VARS {
            env::remove_var(name);
        }
        for (name, value) in vars {
            env::set_var(name, value);
        }
        let result = f();
        for name in ENV_VARS {
            env::remove_var(name);
        }
        result
    }

    #[test]
    fn test_from_env_overrides() {
        let config = with_env(
            &[("QC_COMPACT_FANOUT", "8"), ("QC_COMPACT_TIMEOUT_MS", "1200")],
            CompactBlockConfig::from_env,
        );
        assert_eq!(config.peer_request_fanout, 8);
        assert_eq!(config.reconstruction_timeout(), Duration::from_millis(1_200));
    }

    #[test]
    fn test_from_env_unparseable_falls_back() {
        let config = with_env(
            &[("QC_COMPACT_FANOUT", "many"), ("QC_COMPACT_TIMEOUT_MS", "-5")],
            CompactBlockConfig::from_env,
        );
        assert_eq!(config, CompactBlockConfig::default());
    }

    #[test]
    fn test_logging_from_env() {
        let config = with_env(
            &[("QC_LOG_LEVEL", "debug"), ("QC_JSON_LOGS", "1")],
            LoggingConfig::from_env,
        );
        assert_eq!(config.level, "debug");
        assert!(config.json);

        let config = with_env(
            &[("QC_LOG_LEVEL", "warn"), ("QC_JSON_LOGS", "TRUE")],
            LoggingConfig::from_env,
        );
        assert!(config.json);

        let config = with_env(
            &[("QC_LOG_LEVEL", "warn"), ("QC_JSON_LOGS", "yes")],
            LoggingConfig::from_env,
        );
        assert!(!config.json);
    }

    #[test]
    fn test_defaults() {
        let config = CompactBlockConfig::default();
        assert_eq!(config.peer_request_fanout, 5);
        assert_eq!(config.reconstruction_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full() {
        let file = ConfigFile::parse(
            r#"
            [compact_blocks]
            peer_request_fanout = 3
            reconstruction_timeout_ms = 250

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(file.compact_blocks.peer_request_fanout, 3);
        assert_eq!(file.compact_blocks.reconstruction_timeout_ms, 250);
        assert_eq!(file.logging.level, "debug");
        assert!(file.logging.json);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let file = ConfigFile::parse("").unwrap();
        assert_eq!(file, ConfigFile::default());
    }

    #[test]
    fn test_parse_rejects_zero_fanout() {
        let result = ConfigFile::parse("[compact_blocks]\npeer_request_fanout = 0\n");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "peer_request_fanout",
                ..
            })
        ));
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        assert!(matches!(
            ConfigFile::parse("[compact_blocks"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ConfigFile::load("/nonexistent/qc-05-compact-blocks.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
