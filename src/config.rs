//! Configuration module

use std::env;
use std::fmt;
use std::str::FromStr;

use sqlx::postgres::PgConnectOptions;
use validator::Validate;

use crate::constants::{
    DEFAULT_CONSUMER_CONCURRENCY, DEFAULT_DATABASE_URL, DEFAULT_PORT, DEFAULT_PREFETCH_COUNT,
    DEFAULT_RABBITMQ_ADDR, STAT_FANOUT_QUEUE_NAME,
};

/// How the coercer treats missing or mistyped attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionMode {
    /// Zero-default the field, log the issue, keep the record
    #[default]
    Lenient,
    /// Drop the message on the first issue
    Strict,
}

impl FromStr for CoercionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(CoercionMode::Lenient),
            "strict" => Ok(CoercionMode::Strict),
            other => Err(format!("unknown coercion mode '{}'", other)),
        }
    }
}

impl fmt::Display for CoercionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercionMode::Lenient => f.write_str("lenient"),
            CoercionMode::Strict => f.write_str("strict"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Validate)]
pub struct Config {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// AMQP broker URL
    #[validate(length(min = 1))]
    pub rabbitmq_addr: String,

    /// Queue the stat fanout exchange delivers into
    #[validate(length(min = 1))]
    pub queue_name: String,

    /// Deliveries processed in parallel
    #[validate(range(min = 1, max = 256))]
    pub concurrency: usize,

    /// Broker prefetch window
    #[validate(range(min = 1))]
    pub prefetch_count: u16,

    pub coercion_mode: CoercionMode,

    /// Write idempotency keys and skip duplicate detections
    pub deduplicate: bool,

    /// Requeue a delivery once when the store rejects it
    pub requeue_on_store_failure: bool,

    /// Health server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),

            rabbitmq_addr: env::var("RABBITMQ_ADDR")
                .unwrap_or_else(|_| DEFAULT_RABBITMQ_ADDR.to_string()),

            queue_name: env::var("STAT_QUEUE_NAME")
                .unwrap_or_else(|_| STAT_FANOUT_QUEUE_NAME.to_string()),

            concurrency: parse_var("CONSUMER_CONCURRENCY").unwrap_or(DEFAULT_CONSUMER_CONCURRENCY),

            prefetch_count: parse_var("PREFETCH_COUNT").unwrap_or(DEFAULT_PREFETCH_COUNT),

            coercion_mode: parse_var("COERCION_MODE").unwrap_or_default(),

            deduplicate: parse_flag("DEDUPLICATE_DETECTIONS"),

            requeue_on_store_failure: parse_flag("REQUEUE_ON_STORE_FAILURE"),

            port: parse_var("PORT").unwrap_or(DEFAULT_PORT),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// `host:port/database` of the database URL, safe for logs.
    /// User, password and query parameters are never included.
    pub fn database_display(&self) -> String {
        match PgConnectOptions::from_str(&self.database_url) {
            Ok(options) => format!(
                "{}:{}/{}",
                options.get_host(),
                options.get_port(),
                options.get_database().unwrap_or("")
            ),
            Err(_) => "***".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            rabbitmq_addr: DEFAULT_RABBITMQ_ADDR.to_string(),
            queue_name: STAT_FANOUT_QUEUE_NAME.to_string(),
            concurrency: DEFAULT_CONSUMER_CONCURRENCY,
            prefetch_count: DEFAULT_PREFETCH_COUNT,
            coercion_mode: CoercionMode::Lenient,
            deduplicate: false,
            requeue_on_store_failure: false,
            port: DEFAULT_PORT,
            environment: "development".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}
