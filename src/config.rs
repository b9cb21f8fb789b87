use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::services::NumberLocale;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub driver: DriverConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite file path or `sqlite:` URL; ignored by the memory backend
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplayConfig {
    /// BCP 47 style tag such as `es-ES`; unset means "ask the host"
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Environment variable → config key
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("HOST", "server.host"),
    ("PORT", "server.port"),
    ("STORAGE_BACKEND", "storage.backend"),
    ("DATABASE_URL", "storage.url"),
    ("DRIVER_CONNECT_TIMEOUT_SECS", "driver.connect_timeout_secs"),
    ("DISPLAY_LOCALE", "display.locale"),
    ("RUST_LOG", "logging.level"),
];

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // .env values only fill variables that are not already set
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from defaults overridden by whatever `lookup`
    /// returns for the known environment variables
    pub fn from_lookup<F>(lookup: F) -> Result<Self, config::ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "memory")?
            .set_default("storage.url", "./restaurant-admin.db")?
            .set_default("driver.connect_timeout_secs", 30)?
            .set_default("logging.level", "info")?;

        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                builder = builder.set_override(*key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.driver.connect_timeout_secs)
    }

    /// Configured display locale, else the host locale
    pub fn number_locale(&self) -> NumberLocale {
        match &self.display.locale {
            Some(tag) => NumberLocale::from_tag(tag),
            None => NumberLocale::from_env(),
        }
    }
}
