//! User accounts and the startup administrator

use std::sync::Arc;

use bcrypt::hash;
use serde::Deserialize;
use validator::Validate;

use shared::{
    check_field, validate_password, validate_phone, validate_username, DomainError, NewUser, Role,
    User, UserId, UserPatch,
};

use crate::config::{BootstrapConfig, Config};
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, StoreTx};

/// User service
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    bcrypt_cost: u32,
}

/// Input for creating a user
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(length(min = 8))]
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Input for editing a user; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: Option<bool>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            bcrypt_cost: config.jwt.bcrypt_cost,
        }
    }

    /// Create an account. Admin only.
    pub async fn create_user(&self, actor: AuthUser, input: CreateUserInput) -> AppResult<User> {
        actor.require_admin("create users")?;
        input.validate()?;
        check_field("username", validate_username(&input.username))?;
        check_field("password", validate_password(&input.password))?;
        if let Some(phone) = &input.phone {
            check_field("phone", validate_phone(phone))?;
        }

        let mut tx = self.store.begin().await?;
        let user = self.insert_account(tx.as_mut(), input).await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, role = %user.role, created_by = actor.user_id, "User created");
        Ok(user)
    }

    /// All users, optionally of one role
    pub async fn list_users(&self, actor: AuthUser, role: Option<Role>) -> AppResult<Vec<User>> {
        actor.require_staff("list users")?;
        let mut tx = self.store.begin().await?;
        Ok(tx.list_users(role).await?)
    }

    pub async fn list_wholesalers(&self, actor: AuthUser) -> AppResult<Vec<User>> {
        actor.require_staff("list wholesalers")?;
        let mut tx = self.store.begin().await?;
        Ok(tx.list_users(Some(Role::Wholesaler)).await?)
    }

    /// Edit an account. Admin only; a new password is re-hashed.
    pub async fn update_user(
        &self,
        actor: AuthUser,
        id: UserId,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        actor.require_admin("update users")?;
        input.validate()?;
        if let Some(username) = &input.username {
            check_field("username", validate_username(username))?;
        }
        if let Some(password) = &input.password {
            check_field("password", validate_password(password))?;
        }
        if let Some(phone) = &input.phone {
            check_field("phone", validate_phone(phone))?;
        }
        if id == actor.user_id && input.is_active == Some(false) {
            return Err(cannot_deactivate_self());
        }

        let mut tx = self.store.begin().await?;
        let mut user = tx
            .lock_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {}", id)))?;

        if let Some(username) = &input.username {
            if username != &user.username && tx.find_user_by_username(username).await?.is_some() {
                return Err(DomainError::conflict("username", "Username already taken").into());
            }
        }
        if let Some(email) = &input.email {
            if email != &user.email && tx.find_user_by_email(email).await?.is_some() {
                return Err(DomainError::conflict("email", "Email already taken").into());
            }
        }

        let password_hash = match &input.password {
            Some(password) => Some(hash(password, self.bcrypt_cost)?),
            None => None,
        };
        UserPatch {
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            password_hash,
            role: input.role,
            phone: input.phone,
            address: input.address,
            is_active: input.is_active,
        }
        .apply(&mut user);
        tx.update_user(&user).await?;
        tx.commit().await?;

        tracing::info!(user_id = id, updated_by = actor.user_id, "User updated");
        Ok(user)
    }

    /// Disable an account. Work logs and payments keep pointing at it, so
    /// the row stays; the user can no longer log in or use a token.
    pub async fn deactivate_user(&self, actor: AuthUser, id: UserId) -> AppResult<()> {
        actor.require_admin("deactivate users")?;
        if id == actor.user_id {
            return Err(cannot_deactivate_self());
        }

        let mut tx = self.store.begin().await?;
        let mut user = tx
            .lock_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {}", id)))?;
        user.is_active = false;
        tx.update_user(&user).await?;
        tx.commit().await?;

        tracing::info!(user_id = id, deactivated_by = actor.user_id, "User deactivated");
        Ok(())
    }

    /// The caller's own account
    pub async fn me(&self, actor: AuthUser) -> AppResult<User> {
        let mut tx = self.store.begin().await?;
        tx.get_user(actor.user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {}", actor.user_id)))
    }

    /// Creates the configured administrator unless an admin already exists.
    /// Returns the new account, or `None` when nothing was done.
    pub async fn bootstrap_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<Option<User>> {
        let (Some(username), Some(email), Some(password)) = (
            bootstrap.admin_username.as_ref(),
            bootstrap.admin_email.as_ref(),
            bootstrap.admin_password.as_ref(),
        ) else {
            tracing::debug!("No bootstrap administrator configured");
            return Ok(None);
        };

        let mut tx = self.store.begin().await?;
        if !tx.list_users(Some(Role::Admin)).await?.is_empty() {
            return Ok(None);
        }

        let input = CreateUserInput {
            username: username.clone(),
            email: email.clone(),
            full_name: "Administrator".to_string(),
            password: password.clone(),
            role: Role::Admin,
            phone: None,
            address: None,
        };
        input.validate()?;
        let user = self.insert_account(tx.as_mut(), input).await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, username = %user.username, "Bootstrap administrator created");
        Ok(Some(user))
    }

    async fn insert_account(&self, tx: &mut dyn StoreTx, input: CreateUserInput) -> AppResult<User> {
        if tx.find_user_by_username(&input.username).await?.is_some() {
            return Err(DomainError::conflict("username", "Username already registered").into());
        }
        if tx.find_user_by_email(&input.email).await?.is_some() {
            return Err(DomainError::conflict("email", "Email already registered").into());
        }

        let password_hash = hash(&input.password, self.bcrypt_cost)?;
        tx.insert_user(&NewUser {
            username: input.username,
            email: input.email,
            full_name: input.full_name,
            password_hash,
            role: input.role,
            phone: input.phone,
            address: input.address,
        })
        .await
    }
}

fn cannot_deactivate_self() -> AppError {
    DomainError::validation("user_id", "You cannot deactivate your own account").into()
}
