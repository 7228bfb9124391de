//! Domain models for CarStore Core

pub mod car;
pub mod common;
pub mod event;
pub mod identity;
pub mod order;

pub use car::*;
pub use common::*;
pub use event::*;
pub use identity::*;
pub use order::*;
