//! Payroll handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared::{PaymentRecord, UserId};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::payroll::{CreatePaymentInput, MarkPaidInput, MarkPaidOutcome};
use crate::services::PayrollService;
use crate::AppState;

/// Flag work log entries as paid and settle them
pub async fn mark_paid(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<MarkPaidInput>,
) -> AppResult<Json<MarkPaidOutcome>> {
    let service = PayrollService::new(state.store.clone());
    Ok(Json(service.mark_entries_paid(user, body).await?))
}

pub async fn create_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreatePaymentInput>,
) -> AppResult<(StatusCode, Json<PaymentRecord>)> {
    let service = PayrollService::new(state.store.clone());
    let payment = service.create_payment(user, body).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

pub async fn payment_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(worker_id): Path<UserId>,
) -> AppResult<Json<Vec<PaymentRecord>>> {
    let service = PayrollService::new(state.store.clone());
    Ok(Json(service.payment_history(user, worker_id).await?))
}

pub async fn my_payment_history(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<PaymentRecord>>> {
    let service = PayrollService::new(state.store.clone());
    Ok(Json(service.my_payment_history(user).await?))
}
