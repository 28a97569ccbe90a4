//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `harvestguard.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use serde::Deserialize;

use harvestguard_app::control_loop::Cadence;
use harvestguard_domain::actuator::TargetMoisture;
use harvestguard_domain::time::{Span, seconds};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Decision engine and watchdog settings.
    pub control: ControlConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Pool size.
    pub max_connections: u32,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Control loop configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Humidity (%) at or below which a batch is dry.
    pub target_moisture: f64,
    /// Silence after which a device is offline.
    pub watchdog_timeout_secs: u64,
    /// Period of the liveness sweep.
    pub watchdog_interval_secs: u64,
    /// Period of the decision cycle.
    pub decision_interval_secs: u64,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo integration.
    pub virtual_enabled: bool,
    /// Number of simulated dryers.
    pub virtual_devices: u32,
    /// Seconds between two simulated readings.
    pub virtual_interval_secs: u64,
}

impl Config {
    /// Load configuration from `harvestguard.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("harvestguard.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HARVESTGUARD_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("HARVESTGUARD_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("HARVESTGUARD_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("HARVESTGUARD_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("HARVESTGUARD_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(target) = var("HARVESTGUARD_TARGET_MOISTURE").and_then(|val| val.parse().ok()) {
            self.control.target_moisture = target;
        }
        if let Some(timeout) =
            var("HARVESTGUARD_WATCHDOG_TIMEOUT_SECS").and_then(|val| val.parse().ok())
        {
            self.control.watchdog_timeout_secs = timeout;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be non-zero".to_string(),
            ));
        }
        if let Err(err) = TargetMoisture::new(self.control.target_moisture) {
            return Err(ConfigError::Validation(err.to_string()));
        }
        let cadences = [
            ("control.watchdog_timeout_secs", self.control.watchdog_timeout_secs),
            ("control.watchdog_interval_secs", self.control.watchdog_interval_secs),
            ("control.decision_interval_secs", self.control.decision_interval_secs),
            ("integrations.virtual_interval_secs", self.integrations.virtual_interval_secs),
        ];
        if let Some((name, _)) = cadences.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Validation(format!("{name} must be non-zero")));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl ControlConfig {
    /// The configured target moisture.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when the value is not a percentage.
    pub fn target(&self) -> Result<TargetMoisture, ConfigError> {
        TargetMoisture::new(self.target_moisture)
            .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    #[must_use]
    pub fn watchdog_timeout(&self) -> Span {
        seconds(self.watchdog_timeout_secs)
    }

    #[must_use]
    pub fn cadence(&self) -> Cadence {
        Cadence {
            watchdog: Duration::from_secs(self.watchdog_interval_secs),
            decision: Duration::from_secs(self.decision_interval_secs),
        }
    }
}

impl IntegrationsConfig {
    #[must_use]
    pub fn virtual_interval(&self) -> Duration {
        Duration::from_secs(self.virtual_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:harvestguard.db?mode=rwc".to_string(),
            max_connections: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "harvestguardd=info,harvestguard=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            target_moisture: TargetMoisture::DEFAULT_PERCENT,
            watchdog_timeout_secs: 30,
            watchdog_interval_secs: 30,
            decision_interval_secs: 5,
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
            virtual_devices: 2,
            virtual_interval_secs: 10,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
