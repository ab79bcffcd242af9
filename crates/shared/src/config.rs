//! Application configuration management.
//!
//! Layers, lowest precedence first: `config/default.*`, `config/{RUN_MODE}.*`,
//! then `LEDGER__SECTION__KEY` environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Log every SQL statement through `tracing`.
    #[serde(default)]
    pub sqlx_logging: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    10
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Deadline for a single ledger transaction, in seconds.
    #[serde(default = "default_transaction_timeout")]
    pub transaction_timeout_secs: u64,
    /// Account code that receives net income when a period closes.
    #[serde(default = "default_retained_earnings_code")]
    pub retained_earnings_code: String,
    /// Prefix for journal entry codes.
    #[serde(default = "default_entry_code_prefix")]
    pub entry_code_prefix: String,
    /// IANA timezone used to decide what "today" is.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// How many months back a posting may provision a missing period.
    #[serde(default = "default_max_backdate_months")]
    pub max_backdate_months: u32,
    /// How many days ahead of today an entry may be posted.
    #[serde(default = "default_max_future_days")]
    pub max_future_days: u32,
}

fn default_transaction_timeout() -> u64 {
    30
}

fn default_retained_earnings_code() -> String {
    "3201".to_string()
}

fn default_entry_code_prefix() -> String {
    "JE".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_backdate_months() -> u32 {
    24
}

fn default_max_future_days() -> u32 {
    7
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            transaction_timeout_secs: default_transaction_timeout(),
            retained_earnings_code: default_retained_earnings_code(),
            entry_code_prefix: default_entry_code_prefix(),
            timezone: default_timezone(),
            max_backdate_months: default_max_backdate_months(),
            max_future_days: default_max_future_days(),
        }
    }
}

impl LedgerConfig {
    /// Deadline applied to every mutating ledger transaction.
    #[must_use]
    pub const fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info,erp_ledger_db=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
