//! Configuration module for Vestry.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Vestry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub alerts: AlertsConfig,
    pub retention: RetentionConfig,
    pub logging: LoggingConfig,
}

/// SQLite storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the audit database file.
    pub path: PathBuf,
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the API server, `host:port`.
    pub bind: String,
}

/// Security alert dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Milliseconds granted to each channel before its delivery is abandoned.
    pub dispatch_timeout_ms: u64,
    /// Enabled delivery channels. Currently only `tracing`.
    pub channels: Vec<String>,
}

/// Retention cleanup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Default age threshold in days for cleanup runs.
    pub cleanup_days: u32,
    /// Whether cleanup skips critical-risk events by default.
    pub preserve_critical: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Log output format: `pretty` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vestry/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vestry")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("vestry")
                .join("audit.db"),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8687".to_string(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: 2000,
            channels: vec!["tracing".to_string()],
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            cleanup_days: 365,
            preserve_critical: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"alerts.dispatch_timeout_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

/// Valid values for `alerts.channels` entries.
const VALID_ALERT_CHANNELS: &[&str] = &["tracing"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- server ---
        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError {
                field: "server.bind".into(),
                message: format!("invalid socket address '{}'", self.server.bind),
            });
        }

        // --- alerts ---
        if self.alerts.dispatch_timeout_ms < 100 {
            errors.push(ValidationError {
                field: "alerts.dispatch_timeout_ms".into(),
                message: "must be at least 100".into(),
            });
        }
        for channel in &self.alerts.channels {
            if !VALID_ALERT_CHANNELS.contains(&channel.as_str()) {
                errors.push(ValidationError {
                    field: "alerts.channels".into(),
                    message: format!(
                        "unknown channel '{}'; valid options: {}",
                        channel,
                        VALID_ALERT_CHANNELS.join(", ")
                    ),
                });
            }
        }

        // --- retention ---
        if self.retention.cleanup_days == 0 {
            errors.push(ValidationError {
                field: "retention.cleanup_days".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}'; valid options: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use vestry_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .database_path(PathBuf::from("/var/lib/vestry/audit.db"))
///     .server_bind("0.0.0.0:8687")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- database ---

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    // --- server ---

    pub fn server_bind(mut self, bind: impl Into<String>) -> Self {
        self.config.server.bind = bind.into();
        self
    }

    // --- alerts ---

    pub fn alerts_dispatch_timeout_ms(mut self, ms: u64) -> Self {
        self.config.alerts.dispatch_timeout_ms = ms;
        self
    }

    pub fn alerts_channels(mut self, channels: Vec<String>) -> Self {
        self.config.alerts.channels = channels;
        self
    }

    // --- retention ---

    pub fn retention_cleanup_days(mut self, days: u32) -> Self {
        self.config.retention.cleanup_days = days;
        self
    }

    pub fn retention_preserve_critical(mut self, preserve: bool) -> Self {
        self.config.retention.preserve_critical = preserve;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
