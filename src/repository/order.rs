//! Order repository

use crate::domain::{EntityId, Order};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Unconditional insert; duplicate submissions are not detected here.
    async fn create(&self, order: &Order) -> Result<Order>;
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Order>>;
    async fn list(&self) -> Result<Vec<Order>>;
    async fn replace(&self, order: &Order) -> Result<Order>;
    async fn delete(&self, id: EntityId) -> Result<()>;
}

pub struct OrderRepositoryImpl {
    pool: MySqlPool,
}

impl OrderRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for OrderRepositoryImpl {
    async fn create(&self, order: &Order) -> Result<Order> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, car_id, quantity, total_price, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.car_id)
        .bind(order.quantity)
        .bind(order.total_price)
        .bind(&order.status)
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(order.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create order")))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, car_id, quantity, total_price, status, created_at
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, car_id, quantity, total_price, status, created_at
            FROM orders
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn replace(&self, order: &Order) -> Result<Order> {
        sqlx::query(
            r#"
            UPDATE orders
            SET quantity = ?, total_price = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(order.quantity)
        .bind(order.total_price)
        .bind(&order.status)
        .bind(order.id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(order.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.id)))
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Order {} not found", id)));
        }

        Ok(())
    }
}
