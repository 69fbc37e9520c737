//! Expense and cash withdrawal handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared::{CashWithdrawal, Expense, ExpenseId};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::finance::{CreateExpenseInput, CreateWithdrawalInput, UpdateExpenseInput};
use crate::services::FinanceService;
use crate::AppState;

pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Expense>>> {
    let service = FinanceService::new(state.store.clone());
    Ok(Json(service.list_expenses(user).await?))
}

pub async fn get_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<ExpenseId>,
) -> AppResult<Json<Expense>> {
    let service = FinanceService::new(state.store.clone());
    Ok(Json(service.get_expense(user, expense_id).await?))
}

pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateExpenseInput>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let service = FinanceService::new(state.store.clone());
    let expense = service.create_expense(user, body).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<ExpenseId>,
    Json(body): Json<UpdateExpenseInput>,
) -> AppResult<Json<Expense>> {
    let service = FinanceService::new(state.store.clone());
    Ok(Json(service.update_expense(user, expense_id, body).await?))
}

pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(expense_id): Path<ExpenseId>,
) -> AppResult<StatusCode> {
    let service = FinanceService::new(state.store.clone());
    service.delete_expense(user, expense_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<CashWithdrawal>>> {
    let service = FinanceService::new(state.store.clone());
    Ok(Json(service.list_withdrawals(user).await?))
}

pub async fn create_withdrawal(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateWithdrawalInput>,
) -> AppResult<(StatusCode, Json<CashWithdrawal>)> {
    let service = FinanceService::new(state.store.clone());
    let withdrawal = service.create_withdrawal(user, body).await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}
