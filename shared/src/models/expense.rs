//! Non-payroll cash outflow: expenses and withdrawals

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::types::{ExpenseId, ProductId, UserId, WithdrawalId};

/// Cost expenses count against gross profit, other expenses only against net profit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseType {
    Cost,
    Other,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Cost => "cost",
            ExpenseType::Other => "other",
        }
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExpenseType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cost" => Ok(ExpenseType::Cost),
            "other" => Ok(ExpenseType::Other),
            other => Err(DomainError::validation(
                "expense_type",
                format!("unknown expense type '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub name: Option<String>,
    pub amount: Decimal,
    pub expense_type: ExpenseType,
    pub description: Option<String>,
    pub product_id: Option<ProductId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub name: Option<String>,
    pub amount: Decimal,
    pub expense_type: ExpenseType,
    pub description: Option<String>,
    pub product_id: Option<ProductId>,
}

/// Partial expense update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePatch {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub expense_type: Option<ExpenseType>,
    pub description: Option<String>,
    pub product_id: Option<ProductId>,
}

impl ExpensePatch {
    pub fn apply(&self, expense: &mut Expense) {
        if let Some(name) = &self.name {
            expense.name = Some(name.clone());
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(expense_type) = self.expense_type {
            expense.expense_type = expense_type;
        }
        if let Some(description) = &self.description {
            expense.description = Some(description.clone());
        }
        if let Some(product_id) = self.product_id {
            expense.product_id = Some(product_id);
        }
    }
}

/// Cash taken out of the business by its owners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashWithdrawal {
    pub id: WithdrawalId,
    pub amount: Decimal,
    pub purpose: Option<String>,
    pub withdrawn_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWithdrawal {
    pub amount: Decimal,
    pub purpose: Option<String>,
    pub withdrawn_by: Option<UserId>,
}
