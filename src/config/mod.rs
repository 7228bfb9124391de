//! Configuration management for CarStore Core

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP (ops) server host
    pub http_host: String,
    /// HTTP (ops) server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Redis configuration
    pub redis: RedisConfig,
    /// JWT configuration
    pub jwt: JwtConfig,
    /// Message bus configuration
    pub bus: BusConfig,
    /// Logging and metrics configuration
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub token_ttl_secs: i64,
}

/// Stream consumer settings for the stock reconciliation subscriber
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Topic (stream key) that order creation publishes to
    pub order_topic: String,
    /// Consumer group shared by all inventory instances
    pub consumer_group: String,
    /// Name of this consumer within the group
    pub consumer_name: String,
    /// Maximum number of messages handled concurrently
    pub concurrency: usize,
    /// How long a single read blocks waiting for new entries
    pub block_ms: u64,
    /// Pending entries idle longer than this are reclaimed for redelivery
    pub claim_idle_ms: u64,
    /// Deadline for applying one message
    pub handler_timeout_ms: u64,
}

impl BusConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            order_topic: crate::domain::ORDER_CREATED_TOPIC.to_string(),
            consumer_group: "inventory".to_string(),
            consumer_name: "inventory-1".to_string(),
            concurrency: 16,
            block_ms: 5000,
            claim_idle_ms: 30_000,
            handler_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "text" or "json"
    pub log_format: String,
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            metrics_enabled: true,
            service_name: "carstore-core".to_string(),
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .unwrap_or(2),
        })
    }
}

impl JwtConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "carstore".to_string()),
            token_ttl_secs: env::var("JWT_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| "86400".to_string())
                .parse()
                .unwrap_or(86400),
        })
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let bus_defaults = BusConfig::default();

        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig::from_env()?,
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            jwt: JwtConfig::from_env()?,
            bus: BusConfig {
                order_topic: env::var("BUS_ORDER_TOPIC").unwrap_or(bus_defaults.order_topic),
                consumer_group: env::var("BUS_CONSUMER_GROUP")
                    .unwrap_or(bus_defaults.consumer_group),
                consumer_name: env::var("BUS_CONSUMER_NAME")
                    .or_else(|_| env::var("HOSTNAME"))
                    .unwrap_or(bus_defaults.consumer_name),
                concurrency: env::var("BUS_CONCURRENCY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .filter(|n| *n > 0)
                    .unwrap_or(bus_defaults.concurrency),
                block_ms: env::var("BUS_BLOCK_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bus_defaults.block_ms),
                claim_idle_ms: env::var("BUS_CLAIM_IDLE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bus_defaults.claim_idle_ms),
                handler_timeout_ms: env::var("BUS_HANDLER_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(bus_defaults.handler_timeout_ms),
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() != "false")
                    .unwrap_or(true),
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "carstore-core".to_string()),
            },
        })
    }

    /// Get HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}
