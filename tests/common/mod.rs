//! Common test utilities
//!
//! In-memory repositories and helpers for integration tests without
//! external dependencies (no database, no Redis).

#![allow(dead_code)]

use async_trait::async_trait;
use carstore_core::config::JwtConfig;
use carstore_core::domain::{Car, EntityId, Order, Role};
use carstore_core::error::{AppError, Result};
use carstore_core::jwt::JwtManager;
use carstore_core::repository::{CarRepository, OrderRepository};
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

// ============================================================================
// Test Configuration
// ============================================================================

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-key-for-carstore-testing".to_string(),
        issuer: "carstore".to_string(),
        token_ttl_secs: 3600,
    }
}

pub fn create_test_jwt_manager() -> JwtManager {
    JwtManager::new(test_jwt_config())
}

pub fn token_for(subject: &str, role: Role) -> String {
    create_test_jwt_manager()
        .create_token(subject, role)
        .expect("Failed to create test token")
}

pub fn sample_car(stock: i64) -> Car {
    Car {
        id: EntityId::generate(),
        brand: "Toyota".to_string(),
        model: "Corolla".to_string(),
        year: 2020,
        price: 15000.0,
        description: "Test car".to_string(),
        engine_capacity: 1.6,
        mileage: 10000,
        gearbox: "manual".to_string(),
        engine_type: "petrol".to_string(),
        stock,
        created_at: Utc::now(),
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within timeout");
}

// ============================================================================
// Test Car Repository
// ============================================================================

pub struct TestCarRepository {
    cars: RwLock<Vec<Car>>,
    /// Number of upcoming `decrease_stock` calls that fail transiently
    transient_failures: AtomicUsize,
    /// Artificial latency before each `decrease_stock`
    delay: Option<Duration>,
    decrease_calls: AtomicUsize,
}

impl TestCarRepository {
    pub fn new() -> Self {
        Self {
            cars: RwLock::new(vec![]),
            transient_failures: AtomicUsize::new(0),
            delay: None,
            decrease_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new()
        }
    }

    pub async fn add_car(&self, car: Car) {
        self.cars.write().await.push(car);
    }

    pub async fn stock_of(&self, id: EntityId) -> Option<i64> {
        self.cars
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.stock)
    }

    pub fn fail_next_decrements(&self, n: usize) {
        self.transient_failures.store(n, Ordering::SeqCst);
    }

    pub fn decrease_calls(&self) -> usize {
        self.decrease_calls.load(Ordering::SeqCst)
    }
}

impl Default for TestCarRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarRepository for TestCarRepository {
    async fn create(&self, car: &Car) -> Result<Car> {
        self.cars.write().await.push(car.clone());
        Ok(car.clone())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Car>> {
        let cars = self.cars.read().await;
        Ok(cars.iter().find(|c| c.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Car>> {
        Ok(self.cars.read().await.clone())
    }

    async fn replace(&self, car: &Car) -> Result<Car> {
        let mut cars = self.cars.write().await;
        let slot = cars
            .iter_mut()
            .find(|c| c.id == car.id)
            .ok_or_else(|| AppError::NotFound(format!("Car {} not found", car.id)))?;
        *slot = car.clone();
        Ok(car.clone())
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        let mut cars = self.cars.write().await;
        let before = cars.len();
        cars.retain(|c| c.id != id);
        if cars.len() == before {
            return Err(AppError::NotFound(format!("Car {} not found", id)));
        }
        Ok(())
    }

    async fn decrease_stock(&self, id: EntityId, quantity: i64) -> Result<i64> {
        self.decrease_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let injected = self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AppError::Transient("injected storage failure".to_string()));
        }

        if quantity <= 0 {
            return Err(AppError::Validation("quantity must be positive".to_string()));
        }

        // Check and decrement under one write lock: the store's atomic primitive.
        let mut cars = self.cars.write().await;
        let car = cars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Car {} not found", id)))?;

        if car.stock < quantity {
            return Err(AppError::InsufficientStock {
                car_id: id.to_string(),
                requested: quantity,
            });
        }
        car.stock -= quantity;
        Ok(car.stock)
    }
}

// ============================================================================
// Test Order Repository
// ============================================================================

pub struct TestOrderRepository {
    orders: RwLock<Vec<Order>>,
}

impl TestOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(vec![]),
        }
    }

    pub async fn count(&self) -> usize {
        self.orders.read().await.len()
    }
}

impl Default for TestOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for TestOrderRepository {
    async fn create(&self, order: &Order) -> Result<Order> {
        self.orders.write().await.push(order.clone());
        Ok(order.clone())
    }

    async fn find_by_id(&self, id: EntityId) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>> {
        Ok(self.orders.read().await.clone())
    }

    async fn replace(&self, order: &Order) -> Result<Order> {
        let mut orders = self.orders.write().await;
        let slot = orders
            .iter_mut()
            .find(|o| o.id == order.id)
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.id)))?;
        *slot = order.clone();
        Ok(order.clone())
    }

    async fn delete(&self, id: EntityId) -> Result<()> {
        let mut orders = self.orders.write().await;
        let before = orders.len();
        orders.retain(|o| o.id != id);
        if orders.len() == before {
            return Err(AppError::NotFound(format!("Order {} not found", id)));
        }
        Ok(())
    }
}
