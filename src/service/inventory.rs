//! Inventory (car catalogue and stock) business logic

use crate::domain::{Car, CreateCarInput, EntityId, UpdateCarInput};
use crate::error::{AppError, Result};
use crate::repository::CarRepository;
use std::sync::Arc;
use tracing::info;
use validator::Validate;

pub struct InventoryService<R: CarRepository> {
    repo: Arc<R>,
}

impl<R: CarRepository> InventoryService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateCarInput) -> Result<Car> {
        input.validate()?;
        let car = self.repo.create(&input.into_car()).await?;
        info!(car_id = %car.id, stock = car.stock, "Car listed");
        Ok(car)
    }

    pub async fn get(&self, id: EntityId) -> Result<Car> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Car {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Car>> {
        self.repo.list().await
    }

    pub async fn update(&self, id: EntityId, input: UpdateCarInput) -> Result<Car> {
        input.validate()?;
        let existing = self.get(id).await?;
        self.repo.replace(&input.apply_to(&existing)).await
    }

    pub async fn delete(&self, id: EntityId) -> Result<()> {
        self.repo.delete(id).await?;
        info!(car_id = %id, "Car deleted");
        Ok(())
    }

    /// Take `quantity` units out of stock; returns the remaining stock.
    pub async fn decrease_stock(&self, id: EntityId, quantity: i64) -> Result<i64> {
        let remaining = self.repo.decrease_stock(id, quantity).await?;
        info!(car_id = %id, quantity, remaining, "Stock decreased");
        Ok(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::car::MockCarRepository;
    use mockall::predicate::*;

    fn create_input(stock: i64) -> CreateCarInput {
        CreateCarInput {
            brand: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2020,
            price: 15000.0,
            description: String::new(),
            engine_capacity: 1.6,
            mileage: 30000,
            gearbox: "manual".to_string(),
            engine_type: "petrol".to_string(),
            stock,
        }
    }

    #[tokio::test]
    async fn test_create_car() {
        let mut repo = MockCarRepository::new();
        repo.expect_create()
            .withf(|c| c.brand == "Toyota" && c.stock == 5)
            .returning(|c| Ok(c.clone()));

        let service = InventoryService::new(Arc::new(repo));
        let car = service.create(create_input(5)).await.unwrap();

        assert_eq!(car.model, "Corolla");
        assert!(!car.id.is_nil());
    }

    #[tokio::test]
    async fn test_create_rejects_negative_stock() {
        let mut repo = MockCarRepository::new();
        repo.expect_create().never();

        let service = InventoryService::new(Arc::new(repo));
        let result = service.create(create_input(-1)).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let mut repo = MockCarRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = InventoryService::new(Arc::new(repo));
        let result = service.get(EntityId::generate()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_missing_car() {
        let mut repo = MockCarRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        repo.expect_replace().never();

        let service = InventoryService::new(Arc::new(repo));
        let input = UpdateCarInput {
            brand: "Toyota".to_string(),
            model: "Yaris".to_string(),
            year: 2021,
            price: 12000.0,
            description: String::new(),
            engine_capacity: 1.0,
            mileage: 0,
            gearbox: "automatic".to_string(),
            engine_type: "hybrid".to_string(),
            stock: 2,
        };
        let result = service.update(EntityId::generate(), input).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_decrease_stock_passes_through_errors() {
        let id = EntityId::generate();
        let mut repo = MockCarRepository::new();
        repo.expect_decrease_stock()
            .with(eq(id), eq(3))
            .returning(|id, quantity| {
                Err(AppError::InsufficientStock {
                    car_id: id.to_string(),
                    requested: quantity,
                })
            });

        let service = InventoryService::new(Arc::new(repo));
        let result = service.decrease_stock(id, 3).await;

        assert!(matches!(result, Err(AppError::InsufficientStock { requested: 3, .. })));
    }

    #[tokio::test]
    async fn test_decrease_stock_returns_remaining() {
        let mut repo = MockCarRepository::new();
        repo.expect_decrease_stock().returning(|_, _| Ok(2));

        let service = InventoryService::new(Arc::new(repo));
        assert_eq!(service.decrease_stock(EntityId::generate(), 3).await.unwrap(), 2);
    }
}
