use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub words_directory: String,
    pub timeout_sweep_seconds: u64,
    pub stale_sweep_seconds: u64,
    pub stale_idle_minutes: u64,
    pub ghost_cooldown_seconds: u64,
    pub max_cas_retries: usize,
    /// Empty disables external lookups entirely.
    pub lookup_base_url: String,
    pub dictionary_base_url: String,
    pub lookup_timeout_ms: u64,
    pub auth_dev_mode: bool,
    pub auth_jwt_secret: Option<String>,
    pub connection_timeout_seconds: u64,
}

/// Read `key`, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Invalid value {:?} for {}, using default", raw, key);
                default
            }
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: env_or("HOST", "127.0.0.1".to_string()),
            port: env_or("PORT", 8080),
            database_url: env_or("DATABASE_URL", "sqlite://wordmoney.db?mode=rwc".to_string()),
            words_directory: env_or("WORDS_DIRECTORY", "./shared/words".to_string()),
            timeout_sweep_seconds: env_or("TIMEOUT_SWEEP_SECONDS", 60),
            stale_sweep_seconds: env_or("STALE_SWEEP_SECONDS", 300),
            stale_idle_minutes: env_or("STALE_IDLE_MINUTES", 20),
            ghost_cooldown_seconds: env_or("GHOST_COOLDOWN_SECONDS", 20),
            max_cas_retries: env_or("MAX_CAS_RETRIES", 16),
            lookup_base_url: env_or("LOOKUP_BASE_URL", "https://api.datamuse.com".to_string()),
            dictionary_base_url: env_or(
                "DICTIONARY_BASE_URL",
                "https://api.dictionaryapi.dev/api/v2/entries/en".to_string(),
            ),
            lookup_timeout_ms: env_or("LOOKUP_TIMEOUT_MS", 2500),
            auth_dev_mode: env_or("AUTH_DEV_MODE", false),
            auth_jwt_secret: env::var("AUTH_JWT_SECRET").ok().filter(|s| !s.is_empty()),
            connection_timeout_seconds: env_or("CONNECTION_TIMEOUT_SECONDS", 300),
        }
    }

    pub fn timeout_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.timeout_sweep_seconds.max(1))
    }

    pub fn stale_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.stale_sweep_seconds.max(1))
    }

    pub fn stale_idle_threshold(&self) -> Duration {
        Duration::from_secs(self.stale_idle_minutes * 60)
    }

    pub fn lookup_enabled(&self) -> bool {
        !self.lookup_base_url.trim().is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
