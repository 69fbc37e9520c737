//! Report handlers

use axum::{
    extract::{Query, State},
    Json,
};

use shared::reports::{CashReport, DashboardStats, SalesReport, WorkerReportRow};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::ReportPeriod;
use crate::services::ReportingService;
use crate::AppState;

pub async fn cash_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(period): Query<ReportPeriod>,
) -> AppResult<Json<CashReport>> {
    let service = ReportingService::new(state.store.clone());
    Ok(Json(service.cash(user, period).await?))
}

pub async fn sales_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(period): Query<ReportPeriod>,
) -> AppResult<Json<SalesReport>> {
    let service = ReportingService::new(state.store.clone());
    Ok(Json(service.sales(user, period).await?))
}

pub async fn worker_report(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(period): Query<ReportPeriod>,
) -> AppResult<Json<Vec<WorkerReportRow>>> {
    let service = ReportingService::new(state.store.clone());
    Ok(Json(service.workers(user, period).await?))
}

pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<DashboardStats>> {
    let service = ReportingService::new(state.store.clone());
    Ok(Json(service.dashboard(user).await?))
}
