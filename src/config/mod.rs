use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Memory,
    File,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub directory: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Artificial delay standing in for a backend round-trip.
    pub simulated_latency_ms: u64,
    pub min_password_length: usize,
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
}

impl AuthConfig {
    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    pub seed_demo_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub stats: StatsConfig,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default values
            .set_default("environment", "development")?
            .set_default("storage.backend", "file")?
            .set_default("storage.directory", ".storefront")?
            .set_default("auth.simulated_latency_ms", 800)?
            .set_default("auth.min_password_length", 8)?
            .set_default("auth.argon2_memory_kib", 19 * 1024)?
            .set_default("auth.argon2_iterations", 2)?
            .set_default("stats.seed_demo_data", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // E.g., `APP_AUTH__SIMULATED_LATENCY_MS=0` would set `Settings.auth.simulated_latency_ms`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// In-memory profile, no latency and cheap hashing parameters.
    pub fn for_test() -> Self {
        Self {
            environment: "test".to_string(),
            storage: StorageConfig {
                backend: StorageBackendKind::Memory,
                directory: PathBuf::from(".storefront-test"),
            },
            auth: AuthConfig {
                simulated_latency_ms: 0,
                min_password_length: 8,
                argon2_memory_kib: 1024,
                argon2_iterations: 1,
            },
            stats: StatsConfig {
                seed_demo_data: false,
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
