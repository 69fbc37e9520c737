//! Payment ledger records

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::{PaymentId, UserId};

/// Salary settles accrued work; an advance is paid ahead of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Salary,
    Advance,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Salary => "salary",
            PaymentType::Advance => "advance",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "salary" => Ok(PaymentType::Salary),
            "advance" => Ok(PaymentType::Advance),
            other => Err(DomainError::validation(
                "payment_type",
                format!("unknown payment type '{}'", other),
            )),
        }
    }
}

/// Money handed to a worker. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub worker_id: UserId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub comment: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub worker_id: UserId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub comment: Option<String>,
    pub created_by: Option<UserId>,
}
