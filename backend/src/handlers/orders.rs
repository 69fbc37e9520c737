//! Order handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared::{Order, OrderId, OrderStatus};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::orders::{CreateOrderInput, UpdateOrderStatusInput};
use crate::services::OrderService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let service = OrderService::new(state.store.clone());
    Ok(Json(service.list_orders(user, query.status).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.store.clone());
    Ok(Json(service.get_order(user, order_id).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.store.clone());
    let order = service.create_order(user, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
    Json(body): Json<UpdateOrderStatusInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.store.clone());
    Ok(Json(service.update_status(user, order_id, body).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> AppResult<StatusCode> {
    let service = OrderService::new(state.store.clone());
    service.delete_order(user, order_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
