//! Product catalogue handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared::{Product, ProductId};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::products::{CreateProductInput, UpdateProductInput};
use crate::services::ProductService;
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.store.clone());
    Ok(Json(service.list_products(user).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<ProductId>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.store.clone());
    Ok(Json(service.get_product(user, product_id).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = ProductService::new(state.store.clone());
    let product = service.create_product(user, body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<ProductId>,
    Json(body): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.store.clone());
    Ok(Json(service.update_product(user, product_id, body).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<ProductId>,
) -> AppResult<StatusCode> {
    let service = ProductService::new(state.store.clone());
    service.delete_product(user, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
