//! Reporting service
//!
//! Loads the ledgers once per request and hands them to the pure
//! projections in `shared::reports`. Reports are read-only and run in their
//! own short transaction, so they may trail concurrent writers slightly.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use shared::reports::{
    cash_report, dashboard, sales_report, worker_report, CashReport, DashboardStats,
    LedgerSnapshot, SalesReport, WorkerReportRow,
};
use shared::{
    CashWithdrawal, DateRange, Expense, Order, OrderFilter, Pagination, PaymentRecord, Product,
    User, WorkLogEntry, WorkLogFilter,
};

use crate::error::AppResult;
use crate::middleware::AuthUser;
use crate::store::Store;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    store: Arc<dyn Store>,
}

/// Optional report period; each ledger is filtered by its own timestamp
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ReportPeriod {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl From<ReportPeriod> for DateRange {
    fn from(period: ReportPeriod) -> Self {
        DateRange::new(period.from, period.to)
    }
}

/// Owned copy of every ledger a report reads
struct Ledgers {
    products: Vec<Product>,
    orders: Vec<Order>,
    work_logs: Vec<WorkLogEntry>,
    payments: Vec<PaymentRecord>,
    expenses: Vec<Expense>,
    withdrawals: Vec<CashWithdrawal>,
    users: Vec<User>,
}

impl Ledgers {
    fn snapshot(&self) -> LedgerSnapshot<'_> {
        LedgerSnapshot {
            products: &self.products,
            orders: &self.orders,
            work_logs: &self.work_logs,
            payments: &self.payments,
            expenses: &self.expenses,
            withdrawals: &self.withdrawals,
            users: &self.users,
        }
    }
}

impl ReportingService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self) -> AppResult<Ledgers> {
        let mut tx = self.store.begin().await?;
        let all_logs = WorkLogFilter {
            page: Pagination {
                offset: 0,
                limit: u32::MAX,
            },
            ..WorkLogFilter::default()
        };

        let ledgers = Ledgers {
            products: tx.list_products().await?,
            orders: tx.list_orders(&OrderFilter::default()).await?,
            work_logs: tx.list_work_logs(&all_logs).await?,
            payments: tx.list_payments(None).await?,
            expenses: tx.list_expenses().await?,
            withdrawals: tx.list_withdrawals().await?,
            users: tx.list_users(None).await?,
        };
        tracing::debug!(
            orders = ledgers.orders.len(),
            work_logs = ledgers.work_logs.len(),
            payments = ledgers.payments.len(),
            "Loaded ledgers for reporting"
        );
        Ok(ledgers)
    }

    pub async fn cash(&self, actor: AuthUser, period: ReportPeriod) -> AppResult<CashReport> {
        actor.require_admin("view financial reports")?;
        let ledgers = self.load().await?;
        Ok(cash_report(&ledgers.snapshot(), period.into()))
    }

    pub async fn sales(&self, actor: AuthUser, period: ReportPeriod) -> AppResult<SalesReport> {
        actor.require_admin("view financial reports")?;
        let ledgers = self.load().await?;
        Ok(sales_report(&ledgers.snapshot(), period.into()))
    }

    pub async fn workers(
        &self,
        actor: AuthUser,
        period: ReportPeriod,
    ) -> AppResult<Vec<WorkerReportRow>> {
        actor.require_admin("view worker reports")?;
        let ledgers = self.load().await?;
        Ok(worker_report(&ledgers.snapshot(), period.into()))
    }

    pub async fn dashboard(&self, actor: AuthUser) -> AppResult<DashboardStats> {
        actor.require_admin("view the dashboard")?;
        let ledgers = self.load().await?;
        Ok(dashboard(&ledgers.snapshot(), Utc::now()))
    }
}
