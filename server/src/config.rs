//! Server configuration.

use std::time::Duration;

use ratebridge_fx::{BreakerSettings, FxEngineConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Rates provider configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Open Exchange Rates credential. Absent selects the mock table.
    pub api_key: Option<String>,
    /// Open Exchange Rates base URL.
    pub base_url: String,
    /// Per-request timeout for the live API.
    pub request_timeout: Duration,
    /// Circuit breaker tuning.
    pub breaker: BreakerSettings,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openexchangerates.org/api".to_string(),
            request_timeout: Duration::from_secs(10),
            breaker: BreakerSettings::default(),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub listen_port: u16,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Deployment environment name.
    pub environment: String,
    /// Rates provider configuration.
    pub provider: ProviderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            listen_port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            environment: "development".to_string(),
            provider: ProviderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, after reading any
    /// `.env` file in the working directory.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(addr) = get("BIND_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = get("PORT") {
            if let Ok(port) = port.trim().parse() {
                config.listen_port = port;
            }
        }

        if let Some(level) = get("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(format) = get("LOG_FORMAT") {
            if format.eq_ignore_ascii_case("json") {
                config.log_format = LogFormat::Json;
            }
        }

        if let Some(env) = get("ENV") {
            config.environment = env;
        }

        config.provider.api_key = get("OPEN_EXCHANGE_API_KEY");

        if let Some(url) = get("OPEN_EXCHANGE_BASE_URL") {
            config.provider.base_url = url;
        }

        if let Some(secs) = get("RATES_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.trim().parse() {
                config.provider.request_timeout = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_port == 0 {
            return Err("Listen port cannot be 0".to_string());
        }

        if self.log_level.trim().is_empty() {
            return Err("Log level cannot be empty".to_string());
        }

        if self.provider.base_url.trim().is_empty() {
            return Err("Rates provider base URL cannot be empty".to_string());
        }

        if self.provider.request_timeout.is_zero() {
            return Err("Rates request timeout cannot be zero".to_string());
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Engine configuration derived from the provider settings.
    pub fn fx_engine_config(&self) -> FxEngineConfig {
        FxEngineConfig {
            api_key: self.provider.api_key.clone(),
            base_url: self.provider.base_url.clone(),
            request_timeout: self.provider.request_timeout,
            breaker: self.provider.breaker.clone(),
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.listen_port)
    }
}
