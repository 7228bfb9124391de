//! Order business logic

use crate::bus::EventPublisher;
use crate::domain::{
    CreateOrderInput, EntityId, Order, StockDecrementEvent, UpdateOrderInput,
    ORDER_CREATED_TOPIC,
};
use crate::error::{AppError, Result};
use crate::repository::OrderRepository;
use crate::telemetry::metrics;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

pub struct OrderService<R: OrderRepository, P: EventPublisher> {
    repo: Arc<R>,
    publisher: Arc<P>,
    topic: String,
}

impl<R: OrderRepository, P: EventPublisher> OrderService<R, P> {
    pub fn new(repo: Arc<R>, publisher: Arc<P>) -> Self {
        Self::with_topic(repo, publisher, ORDER_CREATED_TOPIC)
    }

    pub fn with_topic(repo: Arc<R>, publisher: Arc<P>, topic: impl Into<String>) -> Self {
        Self {
            repo,
            publisher,
            topic: topic.into(),
        }
    }

    /// Persist a new order for `buyer_id` and announce it to inventory.
    ///
    /// The stock decrement happens asynchronously on event receipt. A failed
    /// publish is logged and the order is still returned; there is no
    /// outbox, so that event is lost.
    pub async fn create(&self, buyer_id: EntityId, input: CreateOrderInput) -> Result<Order> {
        input.validate()?;

        let order = self.repo.create(&input.into_order(buyer_id)).await?;
        info!(order_id = %order.id, car_id = %order.car_id, quantity = order.quantity, "Order created");

        match self.publish_created(&order).await {
            Ok(()) => metrics::record_order_event_published("published"),
            Err(e) => {
                metrics::record_order_event_published("failed");
                warn!(
                    order_id = %order.id,
                    topic = %self.topic,
                    error = %e,
                    "Failed to publish stock decrement event"
                );
            }
        }

        Ok(order)
    }

    async fn publish_created(&self, order: &Order) -> Result<()> {
        let payload = StockDecrementEvent::for_order(order).encode()?;
        self.publisher.publish(&self.topic, &payload).await
    }

    pub async fn get(&self, id: EntityId) -> Result<Order> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))
    }

    pub async fn list(&self) -> Result<Vec<Order>> {
        self.repo.list().await
    }

    pub async fn update(&self, id: EntityId, input: UpdateOrderInput) -> Result<Order> {
        input.validate()?;
        let existing = self.get(id).await?;
        self.repo.replace(&input.apply_to(&existing)).await
    }

    pub async fn delete(&self, id: EntityId) -> Result<()> {
        self.repo.delete(id).await?;
        info!(order_id = %id, "Order deleted");
        Ok(())
    }
}
