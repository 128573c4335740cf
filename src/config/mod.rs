//! Application configuration.
//!
//! Layered the usual way: `config.yaml` in the working directory, then a
//! file named by `PLEDGELINE_CONFIG`, then environment variables with the
//! `PLEDGELINE` prefix and `__` separator (`PLEDGELINE__SERVER__PORT=9090`).

use std::time::Duration;

use serde::Deserialize;

use crate::mailer::HttpMailerConfig;
use crate::outreach::{DripSchedulerConfig, SendEngineConfig};

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "PLEDGELINE_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "PLEDGELINE";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "PLEDGELINE_LOG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub mailer: MailerConfig,
    pub payments: PaymentsConfig,
    pub outreach: OutreachConfig,
}

impl Config {
    /// Load configuration from files and environment.
    pub fn load() -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub uri: String,
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "pledgeline".to_string(),
        }
    }
}

/// Mail provider configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    pub endpoint: String,
    pub api_key: String,
    pub from_address: String,
    pub timeout_secs: u64,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            from_address: String::new(),
            timeout_secs: 10,
        }
    }
}

impl MailerConfig {
    pub fn to_http_config(&self) -> HttpMailerConfig {
        HttpMailerConfig::default()
            .with_endpoint(self.endpoint.clone())
            .with_api_key(self.api_key.clone())
            .with_from_address(self.from_address.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}

/// Payment processor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
    /// Replay tolerance for signed webhooks, in seconds.
    pub signature_tolerance_secs: u64,
    /// Wall-clock budget for processing one webhook delivery, in seconds.
    pub handler_budget_secs: u64,
    /// Processor API base, for reconciliation.
    pub api_base: String,
    /// Processor API key, for reconciliation.
    pub api_key: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            signature_tolerance_secs: 300,
            handler_budget_secs: 20,
            api_base: String::new(),
            api_key: String::new(),
        }
    }
}

impl PaymentsConfig {
    pub fn tolerance(&self) -> Duration {
        Duration::from_secs(self.signature_tolerance_secs)
    }

    pub fn handler_budget(&self) -> Duration {
        Duration::from_secs(self.handler_budget_secs)
    }
}

/// Drip scheduler configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    /// Run the sweep loop in the server process.
    pub sweep_enabled: bool,
    pub sweep_interval_secs: u64,
    pub send_concurrency: usize,
    pub send_timeout_secs: u64,
    pub send_budget_secs: u64,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            sweep_enabled: true,
            sweep_interval_secs: 900,
            send_concurrency: 8,
            send_timeout_secs: 10,
            send_budget_secs: 120,
        }
    }
}

impl OutreachConfig {
    pub fn to_scheduler_config(&self) -> DripSchedulerConfig {
        DripSchedulerConfig {
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            engine: SendEngineConfig {
                concurrency: self.send_concurrency.max(1),
                send_timeout: Duration::from_secs(self.send_timeout_secs),
                budget: Duration::from_secs(self.send_budget_secs),
            },
        }
    }
}
