//! Authentication service for login and token validation

use std::sync::Arc;

use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::{Role, User, UserId};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::Store;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Login by username or email
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>) -> Self {
        Self {
            store,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate user with username (or email) and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthTokens> {
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let user = match tx.find_user_by_username(&input.username).await? {
            Some(user) => Some(user),
            None => tx.find_user_by_email(&input.username).await?,
        }
        .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".into()));
        }

        let valid = verify(&input.password, &user.password_hash)?;
        if !valid {
            tracing::warn!(username = %input.username, "Failed login attempt");
            return Err(AppError::InvalidCredentials);
        }

        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        self.issue_token(user)
    }

    /// Resolve a bearer token to an active user
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthUser> {
        let claims = self.validate_token(token)?;
        let user_id: UserId = claims.sub.parse().map_err(|_| AppError::InvalidToken)?;

        let mut tx = self.store.begin().await?;
        let user = tx
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".into()));
        }

        // the stored role wins over a stale claim
        Ok(AuthUser::new(user.id, user.role))
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        })?;

        Ok(token_data.claims)
    }

    /// Generate an access token for a user
    pub fn issue_token(&self, user: User) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role,
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user,
        })
    }
}
