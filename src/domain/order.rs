//! Order domain model

use super::common::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Status assigned to orders created without an explicit one
pub const DEFAULT_ORDER_STATUS: &str = "pending";

/// Order placed by a buyer for a quantity of one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: EntityId,
    pub user_id: EntityId,
    pub car_id: EntityId,
    pub quantity: i64,
    pub total_price: f64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Input for placing an order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub car_id: EntityId,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(range(min = 0.0))]
    pub total_price: f64,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub status: Option<String>,
}

impl CreateOrderInput {
    /// Build the record to persist, stamping id, buyer and creation time.
    pub fn into_order(self, buyer_id: EntityId) -> Order {
        let status = self
            .status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ORDER_STATUS.to_string());

        Order {
            id: EntityId::generate(),
            user_id: buyer_id,
            car_id: self.car_id,
            quantity: self.quantity,
            total_price: self.total_price,
            status,
            created_at: Utc::now(),
        }
    }
}

/// Replacement fields for an administrative update
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrderInput {
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(range(min = 0.0))]
    pub total_price: f64,
    #[validate(length(min = 1, max = 32))]
    pub status: String,
}

impl UpdateOrderInput {
    pub fn apply_to(self, existing: &Order) -> Order {
        Order {
            id: existing.id,
            user_id: existing.user_id,
            car_id: existing.car_id,
            quantity: self.quantity,
            total_price: self.total_price,
            status: self.status,
            created_at: existing.created_at,
        }
    }
}
