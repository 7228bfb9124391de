//! Data access layer (Repository pattern)

pub mod car;
pub mod order;

pub use car::CarRepository;
pub use order::OrderRepository;
