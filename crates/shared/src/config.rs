//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Cash register configuration.
    #[serde(default)]
    pub cash_register: CashRegisterConfig,
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
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Cash register (till) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CashRegisterConfig {
    /// Code of the payment method that receives supplies, withdrawals
    /// and the opening float during reconciliation.
    #[serde(default = "default_cash_method_code")]
    pub cash_method_code: String,
    /// Maximum number of operators tracked by the open-session cache.
    #[serde(default = "default_session_cache_capacity")]
    pub session_cache_capacity: u64,
    /// Time-to-live of an open-session cache entry, in seconds.
    #[serde(default = "default_session_cache_ttl")]
    pub session_cache_ttl_secs: u64,
}

fn default_cash_method_code() -> String {
    "CASH".to_string()
}

fn default_session_cache_capacity() -> u64 {
    1000
}

fn default_session_cache_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for CashRegisterConfig {
    fn default() -> Self {
        Self {
            cash_method_code: default_cash_method_code(),
            session_cache_capacity: default_session_cache_capacity(),
            session_cache_ttl_secs: default_session_cache_ttl(),
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
            .add_source(config::Environment::with_prefix("CAIXA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
