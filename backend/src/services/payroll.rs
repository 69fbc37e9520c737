//! Payroll service: settling work log entries and recording payments
//!
//! A settlement never pays out more than the worker is owed. Balances are
//! always recomputed from the full ledgers inside the same transaction that
//! writes the payment, with the worker row locked.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::{
    check_field, validate_amount, DomainError, NewPayment, PaymentRecord, PaymentType, Role, User,
    UserId, WorkLogId,
};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, StoreTx};

/// Payroll service
#[derive(Clone)]
pub struct PayrollService {
    store: Arc<dyn Store>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarkPaidInput {
    #[validate(length(min = 1, message = "At least one work log entry is required"))]
    pub work_log_ids: Vec<WorkLogId>,
}

/// Result of settling a batch of entries
#[derive(Debug, Clone, Serialize)]
pub struct MarkPaidOutcome {
    /// Entries flipped to paid by this call
    pub marked: Vec<WorkLogId>,
    /// Entries that were already paid and left alone
    pub already_paid: Vec<WorkLogId>,
    /// Settlement payments written, at most one per worker
    pub payments: Vec<PaymentRecord>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentInput {
    pub worker_id: UserId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    #[validate(length(max = 500))]
    pub comment: Option<String>,
}

impl PayrollService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Flag entries as paid and settle the newly paid amount per worker
    pub async fn mark_entries_paid(
        &self,
        actor: AuthUser,
        input: MarkPaidInput,
    ) -> AppResult<MarkPaidOutcome> {
        actor.require_admin("mark work logs paid")?;
        input.validate()?;

        let ids: Vec<WorkLogId> = input
            .work_log_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tx = self.store.begin().await?;
        let entries = tx.lock_work_logs(&ids).await?;
        if entries.len() != ids.len() {
            let missing: Vec<String> = ids
                .iter()
                .filter(|id| !entries.iter().any(|e| e.id == **id))
                .map(|id| id.to_string())
                .collect();
            return Err(AppError::not_found(format!(
                "Work log entries {}",
                missing.join(", ")
            )));
        }

        let mut marked = Vec::new();
        let mut already_paid = Vec::new();
        let mut newly_paid: BTreeMap<UserId, Decimal> = BTreeMap::new();
        for entry in &entries {
            if entry.is_paid {
                already_paid.push(entry.id);
            } else {
                marked.push(entry.id);
                *newly_paid.entry(entry.worker_id).or_default() += entry.payment;
            }
        }

        if !marked.is_empty() {
            tx.mark_work_logs_paid(&marked, Utc::now()).await?;
        }

        let mut payments = Vec::new();
        for (worker_id, amount) in newly_paid {
            lock_worker(tx.as_mut(), worker_id).await?;
            let balance = tx.worker_balance(worker_id).await?;
            let settlement = balance.settlement_for(amount);

            if settlement > Decimal::ZERO {
                let payment = tx
                    .insert_payment(&NewPayment {
                        worker_id,
                        amount: settlement,
                        payment_type: PaymentType::Salary,
                        comment: Some("Settlement of marked work log entries".to_string()),
                        created_by: Some(actor.user_id),
                    })
                    .await?;
                payments.push(payment);
            } else {
                tracing::info!(
                    worker_id,
                    marked_amount = %amount,
                    balance = %balance.balance(),
                    "Advances cover the marked entries, no settlement written"
                );
            }
        }

        tx.commit().await?;

        tracing::info!(
            marked = marked.len(),
            already_paid = already_paid.len(),
            payments = payments.len(),
            paid_by = actor.user_id,
            "Work log entries marked paid"
        );
        Ok(MarkPaidOutcome {
            marked,
            already_paid,
            payments,
        })
    }

    /// Record a salary settlement or an advance
    pub async fn create_payment(
        &self,
        actor: AuthUser,
        input: CreatePaymentInput,
    ) -> AppResult<PaymentRecord> {
        actor.require_admin("record payments")?;
        input.validate()?;
        check_field("amount", validate_amount(input.amount))?;

        let mut tx = self.store.begin().await?;
        lock_worker(tx.as_mut(), input.worker_id).await?;

        if input.payment_type == PaymentType::Salary {
            let balance = tx.worker_balance(input.worker_id).await?;
            if let Err(err) = balance.check_settlement(input.amount) {
                tracing::warn!(
                    worker_id = input.worker_id,
                    amount = %input.amount,
                    balance = %balance.balance(),
                    "Rejected settlement above outstanding balance"
                );
                return Err(err.into());
            }
        }

        let payment = tx
            .insert_payment(&NewPayment {
                worker_id: input.worker_id,
                amount: input.amount,
                payment_type: input.payment_type,
                comment: input.comment,
                created_by: Some(actor.user_id),
            })
            .await?;
        tx.commit().await?;

        tracing::info!(
            payment_id = payment.id,
            worker_id = payment.worker_id,
            amount = %payment.amount,
            payment_type = %payment.payment_type,
            "Payment recorded"
        );
        Ok(payment)
    }

    /// Payments made to a worker, newest first
    pub async fn payment_history(
        &self,
        actor: AuthUser,
        worker_id: UserId,
    ) -> AppResult<Vec<PaymentRecord>> {
        actor.require_admin("view payment history")?;
        let mut tx = self.store.begin().await?;
        Ok(tx.list_payments(Some(worker_id)).await?)
    }

    pub async fn my_payment_history(&self, actor: AuthUser) -> AppResult<Vec<PaymentRecord>> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_payments(Some(actor.user_id)).await?)
    }
}

async fn lock_worker(tx: &mut dyn StoreTx, worker_id: UserId) -> AppResult<User> {
    let user = tx
        .lock_user(worker_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Worker {}", worker_id)))?;
    if user.role != Role::Worker {
        return Err(DomainError::validation("worker_id", format!("User {} is not a worker", worker_id)).into());
    }
    Ok(user)
}
