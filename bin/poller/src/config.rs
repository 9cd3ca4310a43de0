//! Centralized poller configuration.
//!
//! Strongly-typed configuration loaded via the `config` crate from
//! environment variables (`DATABASE_URL`, `CONDUCTOR__BASE_URL`,
//! `ENGINE__POLL_INTERVAL_SECONDS`, ...).

use chime_conductor::ConductorConfig;
use chime_engine::EngineConfig;
use serde::Deserialize;

/// Poller configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct PollerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Workflow engine client configuration.
    pub conductor: ConductorConfig,

    /// Scheduling engine tuning knobs.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl PollerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_section_is_optional() {
        let config: PollerConfig = serde_json::from_value(serde_json::json!({
            "database_url": "postgres://localhost/chime",
            "conductor": {"base_url": "http://localhost:8080"},
        }))
        .expect("deserialize");
        assert_eq!(config.engine.poll_interval_seconds, 30);
        assert_eq!(config.conductor.request_timeout_seconds, 10);
    }
}
