//! Report and cash ledger tests
//!
//! Tests for the read-side projections including:
//! - Cash report formulas over a delivered order, payroll and expenses
//! - Sales and worker reports
//! - Dashboard rankings
//! - Expense and withdrawal bookkeeping

mod common;

use chrono::{Duration, Utc};
use common::{dec, Harness};
use production_backend::services::finance::{
    CreateExpenseInput, CreateWithdrawalInput, UpdateExpenseInput,
};
use production_backend::services::orders::UpdateOrderStatusInput;
use production_backend::services::payroll::MarkPaidInput;
use production_backend::services::reporting::ReportPeriod;
use production_backend::services::{FinanceService, ReportingService};
use shared::{DomainError, ExpenseType, OrderStatus};

fn finance(h: &Harness) -> FinanceService {
    FinanceService::new(h.store.clone())
}

fn reporting(h: &Harness) -> ReportingService {
    ReportingService::new(h.store.clone())
}

async fn expense(h: &Harness, amount: i64, expense_type: ExpenseType) {
    finance(h)
        .create_expense(
            h.admin,
            CreateExpenseInput {
                name: Some(format!("{} expense", expense_type)),
                amount: dec(amount),
                expense_type,
                description: None,
                product_id: None,
            },
        )
        .await
        .unwrap();
}

/// Five chairs built, settled and delivered; 30 cost and 20 other expenses;
/// 40 withdrawn from the till.
async fn trading_day(h: &Harness) {
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 5)]).await;
    h.orders()
        .update_status(
            h.manager,
            order.id,
            UpdateOrderStatusInput {
                status: OrderStatus::InProgress,
            },
        )
        .await
        .unwrap();

    let cut = h.complete(h.worker, &chair, 0, 5, Some(order.id)).await;
    let assemble = h.complete(h.worker, &chair, 1, 5, Some(order.id)).await;
    h.payroll()
        .mark_entries_paid(
            h.admin,
            MarkPaidInput {
                work_log_ids: vec![cut.id, assemble.id],
            },
        )
        .await
        .unwrap();

    h.orders()
        .update_status(
            h.manager,
            order.id,
            UpdateOrderStatusInput {
                status: OrderStatus::Delivered,
            },
        )
        .await
        .unwrap();

    expense(h, 30, ExpenseType::Cost).await;
    expense(h, 20, ExpenseType::Other).await;
    finance(h)
        .create_withdrawal(
            h.admin,
            CreateWithdrawalInput {
                amount: dec(40),
                purpose: Some("Owner draw".into()),
            },
        )
        .await
        .unwrap();
}

// ============================================================================
// Reports
// ============================================================================

#[tokio::test]
async fn test_cash_report_formulas() {
    let h = Harness::new().await;
    trading_day(&h).await;

    let report = reporting(&h).cash(h.admin, ReportPeriod::default()).await.unwrap();

    assert_eq!(report.sales, dec(500));
    assert_eq!(report.cost_of_goods, dec(200));
    assert_eq!(report.cost_expenses, dec(30));
    assert_eq!(report.other_expenses, dec(20));
    assert_eq!(report.total_expenses, dec(50));
    assert_eq!(report.total_salaries, dec(125));
    assert_eq!(report.paid_salaries, dec(125));
    assert_eq!(report.unpaid_salaries, dec(0));
    assert_eq!(report.total_disbursed, dec(125));
    assert_eq!(report.total_withdrawals, dec(40));
    assert_eq!(report.gross_profit, dec(270));
    assert_eq!(report.net_profit, dec(125));
    assert_eq!(report.cash_balance, dec(285));
}

#[tokio::test]
async fn test_period_outside_activity_is_empty() {
    let h = Harness::new().await;
    trading_day(&h).await;

    let period = ReportPeriod {
        from: Some(Utc::now() + Duration::days(1)),
        to: None,
    };
    let report = reporting(&h).cash(h.admin, period).await.unwrap();
    assert_eq!(report.sales, dec(0));
    assert_eq!(report.total_salaries, dec(0));
    assert_eq!(report.cash_balance, dec(0));

    let sales = reporting(&h).sales(h.admin, period).await.unwrap();
    assert_eq!(sales.total_orders, 0);
}

#[tokio::test]
async fn test_sales_and_worker_reports() {
    let h = Harness::new().await;
    trading_day(&h).await;

    let sales = reporting(&h).sales(h.admin, ReportPeriod::default()).await.unwrap();
    assert_eq!(sales.total_orders, 1);
    assert_eq!(sales.total_revenue, dec(500));
    assert_eq!(sales.sales_by_product.len(), 1);
    assert_eq!(sales.sales_by_product[0].product_name, "Chair");
    assert_eq!(sales.sales_by_product[0].quantity_sold, 5);

    let workers = reporting(&h).workers(h.admin, ReportPeriod::default()).await.unwrap();
    assert_eq!(workers.len(), 1);
    let row = &workers[0];
    assert_eq!(row.worker_id, h.worker.user_id);
    assert_eq!(row.stages_completed, 2);
    assert_eq!(row.total_earned, dec(125));
    assert_eq!(row.total_paid, dec(125));
    assert_eq!(row.total_unpaid, dec(0));
    assert_eq!(row.current_balance, dec(0));
    assert_eq!(row.top_product.as_deref(), Some("Chair"));
    assert_eq!(row.days_active, 1);
    assert_eq!(row.avg_daily, dec(125));
}

#[tokio::test]
async fn test_dashboard_rankings() {
    let h = Harness::new().await;
    trading_day(&h).await;

    let stats = reporting(&h).dashboard(h.admin).await.unwrap();
    assert_eq!(stats.daily_sales.len(), 30);
    assert_eq!(stats.daily_sales.last().map(|d| d.amount), Some(dec(500)));
    assert_eq!(stats.top_products[0].name, "Chair");
    assert_eq!(stats.top_products[0].value, 5);
    assert_eq!(stats.worker_performance[0].name, "worker1");
    assert_eq!(stats.worker_performance[0].value, 2);
}

#[tokio::test]
async fn test_reports_are_admin_only() {
    let h = Harness::new().await;
    let err = reporting(&h)
        .cash(h.manager, ReportPeriod::default())
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
    assert!(reporting(&h).dashboard(h.worker).await.is_err());
}

// ============================================================================
// Expenses and withdrawals
// ============================================================================

#[tokio::test]
async fn test_expense_update_and_delete() {
    let h = Harness::new().await;
    expense(&h, 30, ExpenseType::Cost).await;
    let created = finance(&h).list_expenses(h.admin).await.unwrap().remove(0);

    let updated = finance(&h)
        .update_expense(
            h.admin,
            created.id,
            UpdateExpenseInput {
                amount: Some(dec(45)),
                expense_type: Some(ExpenseType::Other),
                ..UpdateExpenseInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, dec(45));
    assert_eq!(updated.expense_type, ExpenseType::Other);
    assert_eq!(updated.name, created.name);

    finance(&h).delete_expense(h.admin, created.id).await.unwrap();
    let err = finance(&h).get_expense(h.admin, created.id).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_cash_outflows_must_be_positive() {
    let h = Harness::new().await;

    let err = finance(&h)
        .create_withdrawal(
            h.admin,
            CreateWithdrawalInput {
                amount: dec(-5),
                purpose: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Validation { .. })));

    let err = finance(&h)
        .create_expense(
            h.manager,
            CreateExpenseInput {
                name: None,
                amount: dec(10),
                expense_type: ExpenseType::Cost,
                description: None,
                product_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
}

#[tokio::test]
async fn test_withdrawals_record_who_took_the_cash() {
    let h = Harness::new().await;
    let withdrawal = finance(&h)
        .create_withdrawal(
            h.admin,
            CreateWithdrawalInput {
                amount: dec(15),
                purpose: Some("Supplies".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(withdrawal.withdrawn_by, Some(h.admin.user_id));
    assert_eq!(finance(&h).list_withdrawals(h.admin).await.unwrap().len(), 1);
}
