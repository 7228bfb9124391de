//! Business logic layer

pub mod inventory;
pub mod order;
pub mod reconciliation;

pub use inventory::InventoryService;
pub use order::OrderService;
pub use reconciliation::StockReconciler;
