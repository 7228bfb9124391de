//! CarStore Core
//!
//! Event-driven stock reconciliation between the order and inventory
//! services, and the authorization gate that fronts every RPC.

pub mod api;
pub mod bus;
pub mod config;
pub mod domain;
pub mod error;
pub mod grpc;
pub mod jwt;
pub mod migration;
pub mod repository;
pub mod server;
pub mod service;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
