//! Car (inventory item) domain model

use super::common::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Car listing with its available stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Car {
    pub id: EntityId,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: f64,
    pub description: String,
    pub engine_capacity: f64,
    pub mileage: i64,
    pub gearbox: String,
    pub engine_type: String,
    /// Units available; never negative
    pub stock: i64,
    pub created_at: DateTime<Utc>,
}

impl Default for Car {
    fn default() -> Self {
        Self {
            id: EntityId::generate(),
            brand: String::new(),
            model: String::new(),
            year: 0,
            price: 0.0,
            description: String::new(),
            engine_capacity: 0.0,
            mileage: 0,
            gearbox: String::new(),
            engine_type: String::new(),
            stock: 0,
            created_at: Utc::now(),
        }
    }
}

/// Input for listing a new car
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCarInput {
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1886, max = 2100))]
    pub year: i32,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub engine_capacity: f64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub mileage: i64,
    #[serde(default)]
    pub gearbox: String,
    #[serde(default)]
    pub engine_type: String,
    #[validate(range(min = 0))]
    pub stock: i64,
}

impl CreateCarInput {
    pub fn into_car(self) -> Car {
        Car {
            id: EntityId::generate(),
            brand: self.brand,
            model: self.model,
            year: self.year,
            price: self.price,
            description: self.description,
            engine_capacity: self.engine_capacity,
            mileage: self.mileage,
            gearbox: self.gearbox,
            engine_type: self.engine_type,
            stock: self.stock,
            created_at: Utc::now(),
        }
    }
}

/// Replacement fields for an administrative update.
///
/// The record is replaced wholesale; `id` and `created_at` are kept.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCarInput {
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 1886, max = 2100))]
    pub year: i32,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub engine_capacity: f64,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub mileage: i64,
    #[serde(default)]
    pub gearbox: String,
    #[serde(default)]
    pub engine_type: String,
    #[validate(range(min = 0))]
    pub stock: i64,
}

impl UpdateCarInput {
    pub fn apply_to(self, existing: &Car) -> Car {
        Car {
            id: existing.id,
            brand: self.brand,
            model: self.model,
            year: self.year,
            price: self.price,
            description: self.description,
            engine_capacity: self.engine_capacity,
            mileage: self.mileage,
            gearbox: self.gearbox,
            engine_type: self.engine_type,
            stock: self.stock,
            created_at: existing.created_at,
        }
    }
}
