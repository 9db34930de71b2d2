use loco_rs::config::Config;
use serde::{Deserialize, Serialize};

use crate::services::retry_manager::BackoffKind;

/// Extension trait for accessing JWT configuration
pub trait JwtConfig {
    fn get_jwt_secret(&self) -> Option<String>;
    fn get_jwt_expiration(&self) -> Option<u64>;
}

impl JwtConfig for Config {
    fn get_jwt_secret(&self) -> Option<String> {
        std::env::var("JWT_SECRET").ok().or_else(|| Some("development-secret-key-change-in-production".to_string()))
    }

    fn get_jwt_expiration(&self) -> Option<u64> {
        Some(86400)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt: JwtSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub expiration: u64,
}

/// `RETRY_MAX_ATTEMPTS`, `RETRY_INITIAL_DELAY_MS`, `RETRY_MAX_DELAY_MS`, `RETRY_BACKOFF`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: BackoffKind::Exponential, initial_delay_ms: 1000, max_delay_ms: 60_000 }
    }
}

impl RetryPolicyConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: env_parse("RETRY_MAX_ATTEMPTS", defaults.max_attempts),
            backoff: std::env::var("RETRY_BACKOFF")
                .ok()
                .and_then(|v| match v.as_str() {
                    "fixed" => Some(BackoffKind::Fixed),
                    "exponential" => Some(BackoffKind::Exponential),
                    _ => None,
                })
                .unwrap_or(defaults.backoff),
            initial_delay_ms: env_parse("RETRY_INITIAL_DELAY_MS", defaults.initial_delay_ms),
            max_delay_ms: env_parse("RETRY_MAX_DELAY_MS", defaults.max_delay_ms),
        }
    }
}

/// `EVENT_PROCESSING_INTERVAL_MS`, `EVENT_MAX_RETRIES`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventProcessorConfig {
    pub tick_interval_ms: u64,
    pub max_retries: u32,
    pub batch_size: u64,
}

impl Default for EventProcessorConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 5000, max_retries: 3, batch_size: 50 }
    }
}

impl EventProcessorConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tick_interval_ms: env_parse("EVENT_PROCESSING_INTERVAL_MS", defaults.tick_interval_ms),
            max_retries: env_parse("EVENT_MAX_RETRIES", defaults.max_retries),
            batch_size: defaults.batch_size,
        }
    }
}

/// Default TTL applied to every `RecordLocker` acquisition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    pub default_ttl_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { default_ttl_ms: 30_000 }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
