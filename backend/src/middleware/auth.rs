//! Authentication middleware
//!
//! Validates the bearer token, resolves the acting user and exposes it to
//! handlers through the `CurrentUser` extractor.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use shared::{Role, UserId};

use crate::error::{AppError, AppResult};
use crate::services::AuthService;
use crate::AppState;

/// The acting user of a request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthUser {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    /// Fails with `Forbidden` unless the user holds one of `roles`
    pub fn require_any(&self, roles: &[Role], action: &str) -> AppResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = self.user_id, role = %self.role, action, "Permission denied");
            Err(AppError::forbidden(format!(
                "role {} may not {}",
                self.role, action
            )))
        }
    }

    pub fn require_admin(&self, action: &str) -> AppResult<()> {
        self.require_any(&[Role::Admin], action)
    }

    pub fn require_staff(&self, action: &str) -> AppResult<()> {
        self.require_any(&[Role::Admin, Role::Manager], action)
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing or invalid Authorization header".into()))?;

    let service = AuthService::new(state.store.clone(), state.config.clone());
    let auth_user = service.authenticate(token).await?;

    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}
