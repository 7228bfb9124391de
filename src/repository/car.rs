//! Car repository and the inventory ledger's conditional decrement

use crate::domain::{Car, EntityId};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CarRepository: Send + Sync {
    async fn create(&self, car: &Car) -> Result<Car>;
    async fn find_by_id(&self, id: EntityId) -> Result<Option<Car>>;
    async fn list(&self) -> Result<Vec<Car>>;
    /// Replace every mutable field of an existing record.
    async fn replace(&self, car: &Car) -> Result<Car>;
    async fn delete(&self, id: EntityId) -> Result<()>;

    /// Atomically take `quantity` units out of stock.
    ///
    /// Finding the row, checking `stock >= quantity` and decrementing happen
    /// in one storage operation. Returns the stock left after the decrement.
    /// Fails with `NotFound` for an unknown id and `InsufficientStock` when
    /// the floor would be crossed; neither case mutates anything.
    async fn decrease_stock(&self, id: EntityId, quantity: i64) -> Result<i64>;
}

pub struct CarRepositoryImpl {
    pool: MySqlPool,
}

impl CarRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const CAR_COLUMNS: &str = "id, brand, model, year, price, description, engine_capacity, mileage, gearbox, engine_type, stock, created_at";

#[async_trait]
impl CarRepository for CarRepositoryImpl {
    async fn create(&self, car: &Car) -> Result<Car> {
        sqlx::query(
            r#"
            INSERT INTO cars (id, brand, model, year, price, description, engine_capacity, mileage, gearbox, engine_type, stock, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(car.id)
        .bind(&car.brand)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.price)
        .bind(&car.description)
        .bind(car.engine_capacity)
        .bind(car.mileage)
        .bind(&car.gearbox)
        .bind(&car.engine_type)
        .bind(car.stock)
        .bind(car.created_at)
        .execute(&self.pool)
        .await?;

        self.find_by_id(car.id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create car")))
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Car>> {
        let car = sqlx::query_as::<_, Car>(&format!(
            "SELECT {} FROM cars WHERE id = ?",
            CAR_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(car)
    }

    async fn list(&self) -> Result<Vec<Car>> {
        let cars = sqlx::query_as::<_, Car>(&format!(
            "SELECT {} FROM cars ORDER BY created_at DESC",
            CAR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(cars)
    }

    async fn replace(&self, car: &Car) -> Result<Car> {
        sqlx::query(
            r#"
            UPDATE cars
            SET brand = ?, model = ?, year = ?, price = ?, description = ?, engine_capacity = ?,
                mileage = ?, gearbox = ?, engine_type = ?, stock = ?
            WHERE id = ?
            "#,
        )
        .bind(&car.brand)
        .bind(&car.model)
        .bind(car.year)
        .bind(car.price)
        .bind(&car.description)
        .bind(car.engine_capacity)
        .bind(car.mileage)
        .bind(&car.gearbox)
        .bind(&car.engine_type)
        .bind(car.stock)
        .bind(car.id)
        .execute(&self.pool)
        .await?;

        // MySQL reports changed rows, so an identical replace affects zero rows;
        // existence is decided by reading back instead.
        self.find_by_id(car.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Car {} not found", car.id)))
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        let result = sqlx::query("DELETE FROM cars WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Car {} not found", id)));
        }

        Ok(())
    }

    async fn decrease_stock(&self, id: EntityId, quantity: i64) -> Result<i64> {
        if quantity <= 0 {
            return Err(AppError::Validation(format!(
                "quantity must be positive, got {}",
                quantity
            )));
        }

        // Dropping `tx` before commit rolls back, so a cancelled caller never
        // leaves a half-applied decrement behind.
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("UPDATE cars SET stock = stock - ? WHERE id = ? AND stock >= ?")
            .bind(quantity)
            .bind(id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(i64,)> = sqlx::query_as("SELECT stock FROM cars WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;

            return Err(match exists {
                None => AppError::NotFound(format!("Car {} not found", id)),
                Some(_) => AppError::InsufficientStock {
                    car_id: id.to_string(),
                    requested: quantity,
                },
            });
        }

        // The UPDATE holds the row lock until commit, so this reads our own result.
        let (stock,): (i64,) = sqlx::query_as("SELECT stock FROM cars WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(stock)
    }
}
