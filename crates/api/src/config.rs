//! Server configuration

use attention::SessionConfig;
use ::config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use sessions::ContentionPolicy;
use std::time::Duration;

/// Config file read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "classroom-monitor.toml";

/// Prefix for environment overrides, e.g. `CLASSROOM__BIND_ADDR`
pub const ENV_PREFIX: &str = "CLASSROOM";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Maximum log level (trace, debug, info, warn, error)
    pub log_level: String,

    pub log_format: LogFormat,

    /// Sessions without frames for this long are stopped; 0 disables reaping
    pub idle_timeout_secs: u64,

    /// How often the idle reaper runs
    pub reap_interval_secs: u64,

    /// Behavior when frames for one session overlap
    pub contention: ContentionPolicy,

    /// Serve Prometheus metrics at `/metrics`
    pub metrics_enabled: bool,

    /// Thresholds for sessions started without overrides
    pub session_defaults: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            idle_timeout_secs: 600,
            reap_interval_secs: 30,
            contention: ContentionPolicy::Queue,
            metrics_enabled: true,
            session_defaults: SessionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load the optional config file, then environment overrides. Missing keys
    /// keep their defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let server: ServerConfig = config.try_deserialize()?;
        server
            .session_defaults
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(server)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}
