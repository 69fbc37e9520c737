//! Worker pay arithmetic
//!
//! A worker's balance is everything they have earned through work logs minus
//! everything they have been paid, salary and advances alike. It may go
//! negative after advances. Settlements are capped so they never exceed the
//! positive part of the balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::{PaymentRecord, PaymentType, WorkLogEntry};

/// Accrued pay for a completion
pub fn piece_payment(quantity: i32, piece_rate: Decimal) -> Decimal {
    Decimal::from(quantity) * piece_rate
}

/// Earned and paid totals of one worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerBalance {
    pub earned: Decimal,
    pub paid: Decimal,
}

impl WorkerBalance {
    pub fn new(earned: Decimal, paid: Decimal) -> Self {
        Self { earned, paid }
    }

    /// Folds a worker's full ledgers
    pub fn from_ledgers<'a>(
        logs: impl IntoIterator<Item = &'a WorkLogEntry>,
        payments: impl IntoIterator<Item = &'a PaymentRecord>,
    ) -> Self {
        Self {
            earned: logs.into_iter().map(|log| log.payment).sum(),
            paid: payments.into_iter().map(|p| p.amount).sum(),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.earned - self.paid
    }

    /// What is actually owed right now
    pub fn outstanding(&self) -> Decimal {
        self.balance().max(Decimal::ZERO)
    }

    /// Payout for entries just marked paid
    pub fn settlement_for(&self, newly_marked: Decimal) -> Decimal {
        newly_marked.min(self.outstanding()).max(Decimal::ZERO)
    }

    /// Rejects an explicit salary payment larger than what is owed
    pub fn check_settlement(&self, amount: Decimal) -> DomainResult<()> {
        if amount > self.outstanding() {
            return Err(DomainError::ExceedsBalance {
                balance: self.balance(),
                requested: amount,
            });
        }
        Ok(())
    }
}

/// Pay overview shown to a worker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalarySummary {
    pub total_earned: Decimal,
    /// Salary settlements only
    pub total_paid: Decimal,
    pub total_advances: Decimal,
    /// Accrual on entries not yet marked paid
    pub total_unpaid: Decimal,
    pub unpaid_count: usize,
    pub current_balance: Decimal,
}

impl SalarySummary {
    pub fn build(logs: &[WorkLogEntry], payments: &[PaymentRecord]) -> Self {
        let balance = WorkerBalance::from_ledgers(logs, payments);
        let unpaid: Vec<&WorkLogEntry> = logs.iter().filter(|log| !log.is_paid).collect();

        Self {
            total_earned: balance.earned,
            total_paid: sum_of_type(payments, PaymentType::Salary),
            total_advances: sum_of_type(payments, PaymentType::Advance),
            total_unpaid: unpaid.iter().map(|log| log.payment).sum(),
            unpaid_count: unpaid.len(),
            current_balance: balance.balance(),
        }
    }
}

pub fn sum_of_type(payments: &[PaymentRecord], payment_type: PaymentType) -> Decimal {
    payments
        .iter()
        .filter(|p| p.payment_type == payment_type)
        .map(|p| p.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn log(payment: i64, is_paid: bool) -> WorkLogEntry {
        WorkLogEntry {
            id: 1,
            worker_id: 1,
            order_id: None,
            product_id: 1,
            stage_id: 1,
            quantity: 1,
            payment: Decimal::from(payment),
            is_paid,
            paid_at: None,
            completed_at: Utc::now(),
        }
    }

    fn payment(amount: i64, payment_type: PaymentType) -> PaymentRecord {
        PaymentRecord {
            id: 1,
            worker_id: 1,
            amount: Decimal::from(amount),
            payment_type,
            comment: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_piece_payment() {
        assert_eq!(piece_payment(5, Decimal::from(10)), Decimal::from(50));
        assert_eq!(piece_payment(5, Decimal::new(125, 1)), Decimal::new(625, 1));
    }

    #[test]
    fn test_settlement_without_advances_pays_everything() {
        let balance = WorkerBalance::new(Decimal::from(125), Decimal::ZERO);
        assert_eq!(balance.settlement_for(Decimal::from(125)), Decimal::from(125));
    }

    #[test]
    fn test_settlement_capped_by_advances() {
        // earned 125, advanced 100
        let balance = WorkerBalance::new(Decimal::from(125), Decimal::from(100));
        assert_eq!(balance.settlement_for(Decimal::from(125)), Decimal::from(25));

        // advanced more than earned
        let balance = WorkerBalance::new(Decimal::from(125), Decimal::from(200));
        assert_eq!(balance.balance(), Decimal::from(-75));
        assert_eq!(balance.settlement_for(Decimal::from(125)), Decimal::ZERO);
    }

    #[test]
    fn test_check_settlement() {
        let balance = WorkerBalance::new(Decimal::from(50), Decimal::from(20));
        assert!(balance.check_settlement(Decimal::from(30)).is_ok());
        assert!(matches!(
            balance.check_settlement(Decimal::from(31)),
            Err(DomainError::ExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_salary_summary() {
        let logs = vec![log(50, true), log(75, false), log(10, false)];
        let payments = vec![
            payment(50, PaymentType::Salary),
            payment(20, PaymentType::Advance),
        ];

        let summary = SalarySummary::build(&logs, &payments);
        assert_eq!(summary.total_earned, Decimal::from(135));
        assert_eq!(summary.total_paid, Decimal::from(50));
        assert_eq!(summary.total_advances, Decimal::from(20));
        assert_eq!(summary.total_unpaid, Decimal::from(85));
        assert_eq!(summary.unpaid_count, 2);
        assert_eq!(summary.current_balance, Decimal::from(65));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A settlement never exceeds what was just marked nor the positive balance
        #[test]
        fn prop_settlement_is_capped(
            earned in 0i64..100_000,
            paid in 0i64..100_000,
            marked in 0i64..100_000,
        ) {
            let balance = WorkerBalance::new(Decimal::from(earned), Decimal::from(paid));
            let settlement = balance.settlement_for(Decimal::from(marked));

            prop_assert!(settlement >= Decimal::ZERO);
            prop_assert!(settlement <= Decimal::from(marked));
            prop_assert!(settlement <= balance.outstanding());

            // paying it never drives a non-negative balance below zero
            let after = WorkerBalance::new(balance.earned, balance.paid + settlement);
            if balance.balance() >= Decimal::ZERO {
                prop_assert!(after.balance() >= Decimal::ZERO);
            }
        }

        /// Balance is always earned minus paid across both payment types
        #[test]
        fn prop_balance_matches_ledgers(
            earnings in prop::collection::vec(0i64..1_000, 0..20),
            salaries in prop::collection::vec(1i64..1_000, 0..10),
            advances in prop::collection::vec(1i64..1_000, 0..10),
        ) {
            let logs: Vec<WorkLogEntry> = earnings.iter().map(|&e| log(e, false)).collect();
            let payments: Vec<PaymentRecord> = salaries
                .iter()
                .map(|&a| payment(a, PaymentType::Salary))
                .chain(advances.iter().map(|&a| payment(a, PaymentType::Advance)))
                .collect();

            let balance = WorkerBalance::from_ledgers(&logs, &payments);
            let expected = earnings.iter().sum::<i64>()
                - salaries.iter().sum::<i64>()
                - advances.iter().sum::<i64>();
            prop_assert_eq!(balance.balance(), Decimal::from(expected));
        }
    }
}
