use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub kafka: KafkaConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_gate_window")]
    pub gate_window_minutes: i64,
    #[serde(default = "enabled")]
    pub enforce_class_capacity: bool,
    #[serde(default = "enabled")]
    pub enforce_gate_windows: bool,
    #[serde(default = "default_reference_attempts")]
    pub reference_max_attempts: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
}

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            gate_window_minutes: default_gate_window(),
            enforce_class_capacity: true,
            enforce_gate_windows: true,
            reference_max_attempts: default_reference_attempts(),
            rate_limit_per_minute: default_rate_limit(),
            notification_buffer: default_notification_buffer(),
        }
    }
}

fn default_gate_window() -> i64 { 120 }
fn enabled() -> bool { true }
fn default_reference_attempts() -> u32 { 32 }
fn default_rate_limit() -> i64 { 100 }
fn default_notification_buffer() -> usize { 256 }
fn default_max_connections() -> u32 { 10 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Without a URL the API runs on the in-memory store.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: default_max_connections() }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KafkaConfig {
    pub brokers: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `AEROFLOW__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("AEROFLOW").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
