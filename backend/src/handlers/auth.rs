//! Authentication and account handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use shared::{Role, User, UserId};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::auth::{AuthTokens, LoginInput};
use crate::services::users::{CreateUserInput, UpdateUserInput, UserService};
use crate::services::AuthService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> AppResult<Json<AuthTokens>> {
    let auth_service = AuthService::new(state.store.clone(), state.config.clone());
    let tokens = auth_service.login(body).await?;
    Ok(Json(tokens))
}

/// The authenticated user's own account
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.store.clone(), &state.config);
    Ok(Json(service.me(user).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let service = UserService::new(state.store.clone(), &state.config);
    let created = service.create_user(user, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Vec<User>>> {
    let service = UserService::new(state.store.clone(), &state.config);
    Ok(Json(service.list_users(user, query.role).await?))
}

pub async fn list_wholesalers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    let service = UserService::new(state.store.clone(), &state.config);
    Ok(Json(service.list_wholesalers(user).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<UserId>,
    Json(body): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    let service = UserService::new(state.store.clone(), &state.config);
    Ok(Json(service.update_user(user, user_id, body).await?))
}

/// Accounts are deactivated rather than removed
pub async fn deactivate_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<UserId>,
) -> AppResult<StatusCode> {
    let service = UserService::new(state.store.clone(), &state.config);
    service.deactivate_user(user, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
