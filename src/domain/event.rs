//! Messages exchanged over the bus between the order and inventory sides

use super::common::EntityId;
use super::order::Order;
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Topic that order creation publishes stock decrements to
pub const ORDER_CREATED_TOPIC: &str = "order.created";

/// Request to take `quantity` units of `car_id` out of stock for `order_id`.
///
/// Wire shape: `{"order_id", "car_id", "quantity", "created_at"}` as JSON with
/// an RFC 3339 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrementEvent {
    pub order_id: EntityId,
    pub car_id: EntityId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl StockDecrementEvent {
    pub fn for_order(order: &Order) -> Self {
        Self {
            order_id: order.id,
            car_id: order.car_id,
            quantity: order.quantity,
            created_at: order.created_at,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Event serialize error: {}", e)))
    }

    /// Decode a bus payload. Non-positive quantities are rejected here so a
    /// bad producer cannot turn a decrement into an increment.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let event: Self = serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Malformed stock event: {}", e)))?;
        if event.quantity <= 0 {
            return Err(AppError::BadRequest(format!(
                "Stock event quantity must be positive, got {}",
                event.quantity
            )));
        }
        Ok(event)
    }
}
