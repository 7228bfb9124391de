//! Stock reconciliation: applies order-created events to the inventory ledger

use crate::bus::{BusMessage, HandlerOutcome, MessageHandler};
use crate::domain::StockDecrementEvent;
use crate::error::AppError;
use crate::repository::CarRepository;
use crate::telemetry::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct StockReconciler<R: CarRepository> {
    repo: Arc<R>,
    timeout: Duration,
}

impl<R: CarRepository> StockReconciler<R> {
    pub fn new(repo: Arc<R>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// Decode and apply one payload.
    ///
    /// Malformed payloads and business rejections are terminal and acked.
    /// Storage failures and timeouts are retried through redelivery.
    pub async fn apply(&self, payload: &[u8]) -> HandlerOutcome {
        let event = match StockDecrementEvent::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                metrics::record_stock_event("malformed");
                warn!(error = %e, "Dropping malformed stock decrement event");
                return HandlerOutcome::Ack;
            }
        };

        let applied =
            tokio::time::timeout(self.timeout, self.repo.decrease_stock(event.car_id, event.quantity))
                .await;

        match applied {
            Ok(Ok(remaining)) => {
                metrics::record_stock_event("applied");
                info!(
                    order_id = %event.order_id,
                    car_id = %event.car_id,
                    quantity = event.quantity,
                    remaining,
                    "Stock decremented"
                );
                HandlerOutcome::Ack
            }
            Ok(Err(AppError::NotFound(_))) => {
                metrics::record_stock_event("not_found");
                warn!(order_id = %event.order_id, car_id = %event.car_id, "Car not found for order");
                HandlerOutcome::Ack
            }
            Ok(Err(AppError::InsufficientStock { requested, .. })) => {
                metrics::record_stock_event("insufficient_stock");
                warn!(
                    order_id = %event.order_id,
                    car_id = %event.car_id,
                    requested,
                    "Insufficient stock for order"
                );
                HandlerOutcome::Ack
            }
            Ok(Err(e)) if e.is_transient() => {
                metrics::record_stock_event("retry");
                error!(order_id = %event.order_id, error = %e, "Stock decrement failed, will retry");
                HandlerOutcome::Retry
            }
            Ok(Err(e)) => {
                metrics::record_stock_event("rejected");
                warn!(order_id = %event.order_id, error = %e, "Stock decrement rejected");
                HandlerOutcome::Ack
            }
            Err(_) => {
                metrics::record_stock_event("retry");
                error!(
                    order_id = %event.order_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Stock decrement timed out, will retry"
                );
                HandlerOutcome::Retry
            }
        }
    }
}

#[async_trait]
impl<R: CarRepository + 'static> MessageHandler for StockReconciler<R> {
    async fn handle(&self, message: &BusMessage) -> HandlerOutcome {
        if message.redelivered {
            info!(id = %message.id, topic = %message.topic, "Handling redelivered message");
        }
        self.apply(&message.payload).await
    }
}
