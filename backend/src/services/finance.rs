//! Expenses and cash withdrawals

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use shared::{
    check_field, validate_amount, CashWithdrawal, Expense, ExpenseId, ExpensePatch, ExpenseType,
    NewExpense, NewWithdrawal, ProductId,
};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, StoreTx};

/// Finance service
#[derive(Clone)]
pub struct FinanceService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateExpenseInput {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub amount: Decimal,
    pub expense_type: ExpenseType,
    pub description: Option<String>,
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateExpenseInput {
    #[validate(length(max = 200))]
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub expense_type: Option<ExpenseType>,
    pub description: Option<String>,
    pub product_id: Option<ProductId>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWithdrawalInput {
    pub amount: Decimal,
    #[validate(length(max = 500))]
    pub purpose: Option<String>,
}

impl FinanceService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_expense(
        &self,
        actor: AuthUser,
        input: CreateExpenseInput,
    ) -> AppResult<Expense> {
        actor.require_admin("record expenses")?;
        input.validate()?;
        check_field("amount", validate_amount(input.amount))?;

        let mut tx = self.store.begin().await?;
        if let Some(product_id) = input.product_id {
            ensure_product(tx.as_mut(), product_id).await?;
        }
        let expense = tx
            .insert_expense(&NewExpense {
                name: input.name,
                amount: input.amount,
                expense_type: input.expense_type,
                description: input.description,
                product_id: input.product_id,
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            expense_id = expense.id,
            amount = %expense.amount,
            expense_type = %expense.expense_type,
            "Expense recorded"
        );
        Ok(expense)
    }

    pub async fn list_expenses(&self, actor: AuthUser) -> AppResult<Vec<Expense>> {
        actor.require_admin("view expenses")?;
        let mut tx = self.store.begin().await?;
        Ok(tx.list_expenses().await?)
    }

    pub async fn get_expense(&self, actor: AuthUser, id: ExpenseId) -> AppResult<Expense> {
        actor.require_admin("view expenses")?;
        let mut tx = self.store.begin().await?;
        find_expense(tx.as_mut(), id).await
    }

    pub async fn update_expense(
        &self,
        actor: AuthUser,
        id: ExpenseId,
        input: UpdateExpenseInput,
    ) -> AppResult<Expense> {
        actor.require_admin("edit expenses")?;
        input.validate()?;
        if let Some(amount) = input.amount {
            check_field("amount", validate_amount(amount))?;
        }

        let mut tx = self.store.begin().await?;
        let mut expense = find_expense(tx.as_mut(), id).await?;
        if let Some(product_id) = input.product_id {
            ensure_product(tx.as_mut(), product_id).await?;
        }

        ExpensePatch {
            name: input.name,
            amount: input.amount,
            expense_type: input.expense_type,
            description: input.description,
            product_id: input.product_id,
        }
        .apply(&mut expense);
        tx.update_expense(&expense).await?;
        tx.commit().await?;

        tracing::info!(expense_id = id, "Expense updated");
        Ok(expense)
    }

    pub async fn delete_expense(&self, actor: AuthUser, id: ExpenseId) -> AppResult<()> {
        actor.require_admin("delete expenses")?;

        let mut tx = self.store.begin().await?;
        find_expense(tx.as_mut(), id).await?;
        tx.delete_expense(id).await?;
        tx.commit().await?;

        tracing::info!(expense_id = id, deleted_by = actor.user_id, "Expense deleted");
        Ok(())
    }

    pub async fn create_withdrawal(
        &self,
        actor: AuthUser,
        input: CreateWithdrawalInput,
    ) -> AppResult<CashWithdrawal> {
        actor.require_admin("record cash withdrawals")?;
        input.validate()?;
        check_field("amount", validate_amount(input.amount))?;

        let mut tx = self.store.begin().await?;
        let withdrawal = tx
            .insert_withdrawal(&NewWithdrawal {
                amount: input.amount,
                purpose: input.purpose,
                withdrawn_by: Some(actor.user_id),
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            withdrawal_id = withdrawal.id,
            amount = %withdrawal.amount,
            withdrawn_by = actor.user_id,
            "Cash withdrawal recorded"
        );
        Ok(withdrawal)
    }

    pub async fn list_withdrawals(&self, actor: AuthUser) -> AppResult<Vec<CashWithdrawal>> {
        actor.require_admin("view cash withdrawals")?;
        let mut tx = self.store.begin().await?;
        Ok(tx.list_withdrawals().await?)
    }
}

async fn find_expense(tx: &mut dyn StoreTx, id: ExpenseId) -> AppResult<Expense> {
    tx.get_expense(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Expense {}", id)))
}

async fn ensure_product(tx: &mut dyn StoreTx, id: ProductId) -> AppResult<()> {
    tx.get_product(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::not_found(format!("Product {}", id)))
}
