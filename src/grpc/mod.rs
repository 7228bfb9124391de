//! RPC surface: authorization gate, handlers and their routes

pub mod handlers;
pub mod interceptor;
pub mod routes;

pub use handlers::{InventoryRpc, OrderRpc};
pub use interceptor::{AuthGate, AuthGateLayer, CallContext, MethodRules};
pub use routes::rpc_router;
