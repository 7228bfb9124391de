//! HTTP operations surface (health, readiness, metrics)

pub mod health;
pub mod metrics;
