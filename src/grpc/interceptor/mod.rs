//! gRPC authorization gate
//!
//! - [`MethodRules`]: method → minimum role table
//! - [`AuthGate`]: bearer token verification and role check
//! - [`AuthGateLayer`]: the gate as a tower layer over a gRPC service

pub mod auth;
pub mod layer;
pub mod rules;

pub use auth::{AuthGate, CallContext};
pub use layer::{AuthGateLayer, AuthGateService};
pub use rules::{methods, MethodRules};
