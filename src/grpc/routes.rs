//! RPC routes behind the authorization gate
//!
//! Each handler is mounted at its fully-qualified method path
//! (`/package.Service/Method`) and exchanges JSON bodies. [`AuthGateLayer`]
//! wraps the whole router, so a handler only runs with an admitted
//! [`CallContext`] in the request extensions. Handler failures are answered
//! the way the gate answers rejections: `grpc-status` and `grpc-message`
//! headers with an empty body.

use super::handlers::{InventoryRpc, OrderRpc};
use super::interceptor::layer::status_response;
use super::interceptor::methods;
use super::interceptor::{AuthGate, AuthGateLayer, CallContext};
use crate::bus::EventPublisher;
use crate::domain::{Car, CreateCarInput, CreateOrderInput, Order, UpdateCarInput, UpdateOrderInput};
use crate::repository::{CarRepository, OrderRepository};
use axum::{
    body::Body,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tonic::Status;

/// A gRPC status returned from an RPC handler.
pub struct RpcError(Status);

impl From<Status> for RpcError {
    fn from(status: Status) -> Self {
        Self(status)
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        status_response::<Body>(&self.0)
    }
}

type RpcResult<T> = std::result::Result<Json<T>, RpcError>;

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCarRequest {
    pub id: String,
    #[serde(flatten)]
    pub car: UpdateCarInput,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderRequest {
    pub id: String,
    #[serde(flatten)]
    pub order: UpdateOrderInput,
}

#[derive(Debug, Deserialize)]
pub struct DecreaseStockRequest {
    pub id: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
pub struct DecreaseStockResponse {
    pub stock: i64,
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

/// All order and inventory routes, gated by `gate`.
pub fn rpc_router<OR, P, CR>(
    orders: Arc<OrderRpc<OR, P>>,
    inventory: Arc<InventoryRpc<CR>>,
    gate: AuthGate,
) -> Router
where
    OR: OrderRepository + 'static,
    P: EventPublisher + 'static,
    CR: CarRepository + 'static,
{
    Router::new()
        .merge(order_routes(orders))
        .merge(inventory_routes(inventory))
        .layer(AuthGateLayer::new(gate))
}

fn order_routes<R, P>(rpc: Arc<OrderRpc<R, P>>) -> Router
where
    R: OrderRepository + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route(methods::CREATE_ORDER, post(create_order::<R, P>))
        .route(methods::GET_ORDER, post(get_order::<R, P>))
        .route(methods::LIST_ORDERS, post(list_orders::<R, P>))
        .route(methods::UPDATE_ORDER, post(update_order::<R, P>))
        .route(methods::DELETE_ORDER, post(delete_order::<R, P>))
        .with_state(rpc)
}

fn inventory_routes<R>(rpc: Arc<InventoryRpc<R>>) -> Router
where
    R: CarRepository + 'static,
{
    Router::new()
        .route(methods::CREATE_CAR, post(create_car::<R>))
        .route(methods::GET_CAR, post(get_car::<R>))
        .route(methods::LIST_CARS, post(list_cars::<R>))
        .route(methods::UPDATE_CAR, post(update_car::<R>))
        .route(methods::DELETE_CAR, post(delete_car::<R>))
        .route(methods::DECREASE_STOCK, post(decrease_stock::<R>))
        .with_state(rpc)
}

async fn create_order<R: OrderRepository, P: EventPublisher>(
    State(rpc): State<Arc<OrderRpc<R, P>>>,
    Extension(ctx): Extension<CallContext>,
    Json(input): Json<CreateOrderInput>,
) -> RpcResult<Order> {
    Ok(Json(rpc.create_order(&ctx, input).await?))
}

async fn get_order<R: OrderRepository, P: EventPublisher>(
    State(rpc): State<Arc<OrderRpc<R, P>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<IdRequest>,
) -> RpcResult<Order> {
    Ok(Json(rpc.get_order(&ctx, &req.id).await?))
}

async fn list_orders<R: OrderRepository, P: EventPublisher>(
    State(rpc): State<Arc<OrderRpc<R, P>>>,
    Extension(ctx): Extension<CallContext>,
) -> RpcResult<ListResponse<Order>> {
    let items = rpc.list_orders(&ctx).await?;
    Ok(Json(ListResponse { items }))
}

async fn update_order<R: OrderRepository, P: EventPublisher>(
    State(rpc): State<Arc<OrderRpc<R, P>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<UpdateOrderRequest>,
) -> RpcResult<Order> {
    Ok(Json(rpc.update_order(&ctx, &req.id, req.order).await?))
}

async fn delete_order<R: OrderRepository, P: EventPublisher>(
    State(rpc): State<Arc<OrderRpc<R, P>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<IdRequest>,
) -> RpcResult<Empty> {
    rpc.delete_order(&ctx, &req.id).await?;
    Ok(Json(Empty {}))
}

async fn create_car<R: CarRepository>(
    State(rpc): State<Arc<InventoryRpc<R>>>,
    Extension(ctx): Extension<CallContext>,
    Json(input): Json<CreateCarInput>,
) -> RpcResult<Car> {
    Ok(Json(rpc.create_car(&ctx, input).await?))
}

async fn get_car<R: CarRepository>(
    State(rpc): State<Arc<InventoryRpc<R>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<IdRequest>,
) -> RpcResult<Car> {
    Ok(Json(rpc.get_car(&ctx, &req.id).await?))
}

async fn list_cars<R: CarRepository>(
    State(rpc): State<Arc<InventoryRpc<R>>>,
    Extension(ctx): Extension<CallContext>,
) -> RpcResult<ListResponse<Car>> {
    let items = rpc.list_cars(&ctx).await?;
    Ok(Json(ListResponse { items }))
}

async fn update_car<R: CarRepository>(
    State(rpc): State<Arc<InventoryRpc<R>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<UpdateCarRequest>,
) -> RpcResult<Car> {
    Ok(Json(rpc.update_car(&ctx, &req.id, req.car).await?))
}

async fn delete_car<R: CarRepository>(
    State(rpc): State<Arc<InventoryRpc<R>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<IdRequest>,
) -> RpcResult<Empty> {
    rpc.delete_car(&ctx, &req.id).await?;
    Ok(Json(Empty {}))
}

async fn decrease_stock<R: CarRepository>(
    State(rpc): State<Arc<InventoryRpc<R>>>,
    Extension(ctx): Extension<CallContext>,
    Json(req): Json<DecreaseStockRequest>,
) -> RpcResult<DecreaseStockResponse> {
    let stock = rpc.decrease_stock(&ctx, &req.id, req.quantity).await?;
    Ok(Json(DecreaseStockResponse { stock }))
}
