//! RPC handlers behind the authorization gate
//!
//! Each handler receives the [`CallContext`] produced by the gate and maps
//! service errors onto gRPC status codes.

use super::interceptor::CallContext;
use crate::bus::EventPublisher;
use crate::domain::{
    Car, CreateCarInput, CreateOrderInput, EntityId, Order, UpdateCarInput, UpdateOrderInput,
};
use crate::repository::{CarRepository, OrderRepository};
use crate::service::{InventoryService, OrderService};
use std::sync::Arc;
use tonic::Status;

#[allow(clippy::result_large_err)]
fn parse_id(raw: &str) -> Result<EntityId, Status> {
    raw.parse()
        .map_err(|_| Status::invalid_argument(format!("invalid id: {}", raw)))
}

pub struct OrderRpc<R: OrderRepository, P: EventPublisher> {
    service: Arc<OrderService<R, P>>,
}

impl<R: OrderRepository, P: EventPublisher> OrderRpc<R, P> {
    pub fn new(service: Arc<OrderService<R, P>>) -> Self {
        Self { service }
    }

    /// The buyer is always the verified caller; no buyer id is taken from the request.
    pub async fn create_order(
        &self,
        ctx: &CallContext,
        input: CreateOrderInput,
    ) -> Result<Order, Status> {
        let buyer: EntityId = ctx
            .subject_id()
            .parse()
            .map_err(|_| Status::unauthenticated("invalid token"))?;
        Ok(self.service.create(buyer, input).await?)
    }

    pub async fn get_order(&self, _ctx: &CallContext, id: &str) -> Result<Order, Status> {
        Ok(self.service.get(parse_id(id)?).await?)
    }

    pub async fn list_orders(&self, _ctx: &CallContext) -> Result<Vec<Order>, Status> {
        Ok(self.service.list().await?)
    }

    pub async fn update_order(
        &self,
        _ctx: &CallContext,
        id: &str,
        input: UpdateOrderInput,
    ) -> Result<Order, Status> {
        Ok(self.service.update(parse_id(id)?, input).await?)
    }

    pub async fn delete_order(&self, _ctx: &CallContext, id: &str) -> Result<(), Status> {
        Ok(self.service.delete(parse_id(id)?).await?)
    }
}

pub struct InventoryRpc<R: CarRepository> {
    service: Arc<InventoryService<R>>,
}

impl<R: CarRepository> InventoryRpc<R> {
    pub fn new(service: Arc<InventoryService<R>>) -> Self {
        Self { service }
    }

    pub async fn create_car(&self, _ctx: &CallContext, input: CreateCarInput) -> Result<Car, Status> {
        Ok(self.service.create(input).await?)
    }

    pub async fn get_car(&self, _ctx: &CallContext, id: &str) -> Result<Car, Status> {
        Ok(self.service.get(parse_id(id)?).await?)
    }

    pub async fn list_cars(&self, _ctx: &CallContext) -> Result<Vec<Car>, Status> {
        Ok(self.service.list().await?)
    }

    pub async fn update_car(
        &self,
        _ctx: &CallContext,
        id: &str,
        input: UpdateCarInput,
    ) -> Result<Car, Status> {
        Ok(self.service.update(parse_id(id)?, input).await?)
    }

    pub async fn delete_car(&self, _ctx: &CallContext, id: &str) -> Result<(), Status> {
        Ok(self.service.delete(parse_id(id)?).await?)
    }

    /// Synchronous decrement, separate from the event-driven path.
    pub async fn decrease_stock(
        &self,
        _ctx: &CallContext,
        id: &str,
        quantity: i64,
    ) -> Result<i64, Status> {
        Ok(self.service.decrease_stock(parse_id(id)?, quantity).await?)
    }
}
