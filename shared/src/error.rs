//! Domain failures raised by the pure pipeline and ledger rules

use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::ProductId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient inventory at the previous stage: available {available}, requested {requested}")]
    InsufficientInventory { available: i32, requested: i32 },

    #[error("Insufficient finished stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i32,
        requested: i32,
    },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid stage topology: {0}")]
    InvalidTopology(String),

    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Settlement of {requested} exceeds outstanding balance {balance}")]
    ExceedsBalance { balance: Decimal, requested: Decimal },

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },
}

impl DomainError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        DomainError::NotFound(resource.into())
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
