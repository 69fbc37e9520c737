//! Production floor handlers: completions, intake, pipeline views and work logs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use shared::{
    AvailableTask, DateRange, InventoryLine, OrderId, Pagination, ProductId, ProductPipeline,
    SalarySummary, UserId, WorkLogEntry, WorkLogFilter,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::production::{IntakeInput, RecordCompletionInput};
use crate::services::ProductionService;
use crate::AppState;

/// Query parameters for listing work logs
#[derive(Debug, Default, Deserialize)]
pub struct WorkLogQuery {
    pub worker_id: Option<UserId>,
    pub order_id: Option<OrderId>,
    pub product_id: Option<ProductId>,
    pub is_paid: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl From<WorkLogQuery> for WorkLogFilter {
    fn from(query: WorkLogQuery) -> Self {
        let default_page = Pagination::default();
        WorkLogFilter {
            worker_id: query.worker_id,
            order_id: query.order_id,
            product_id: query.product_id,
            is_paid: query.is_paid,
            completed: DateRange::new(query.from, query.to),
            page: Pagination {
                offset: query.offset.unwrap_or(default_page.offset),
                limit: query.limit.unwrap_or(default_page.limit).min(1000),
            },
        }
    }
}

/// Record units completed at a stage
pub async fn record_completion(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<RecordCompletionInput>,
) -> AppResult<(StatusCode, Json<WorkLogEntry>)> {
    let service = ProductionService::new(state.store.clone());
    let entry = service.record_completion(user, body).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Add a batch of raw units to the holding area
pub async fn intake(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<IntakeInput>,
) -> AppResult<(StatusCode, Json<ProductPipeline>)> {
    let service = ProductionService::new(state.store.clone());
    let pipeline = service.intake(user, body).await?;
    Ok((StatusCode::CREATED, Json(pipeline)))
}

pub async fn pipeline(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<ProductPipeline>>> {
    let service = ProductionService::new(state.store.clone());
    Ok(Json(service.pipeline(user).await?))
}

pub async fn tasks(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<AvailableTask>>> {
    let service = ProductionService::new(state.store.clone());
    Ok(Json(service.tasks(user).await?))
}

pub async fn inventory(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<InventoryLine>>> {
    let service = ProductionService::new(state.store.clone());
    Ok(Json(service.inventory(user).await?))
}

pub async fn list_work_logs(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<WorkLogQuery>,
) -> AppResult<Json<Vec<WorkLogEntry>>> {
    let service = ProductionService::new(state.store.clone());
    Ok(Json(service.list_work_logs(user, query.into()).await?))
}

pub async fn my_salary(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<SalarySummary>> {
    let service = ProductionService::new(state.store.clone());
    Ok(Json(service.my_salary(user).await?))
}
