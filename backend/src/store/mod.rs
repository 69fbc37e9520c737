//! Persistence interface for the pipeline and ledger engine
//!
//! Every operation runs against a [`StoreTx`]. Nothing is visible to other
//! transactions until `commit`; dropping a transaction discards its writes.
//! Methods named `lock_*` take a row lock that is held until the transaction
//! ends, so check-then-write sequences on the same rows serialise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use shared::{
    CashWithdrawal, Expense, InventoryRecord, NewExpense, NewOrder, NewOrderItem, NewPayment,
    NewProduct, NewUser, NewWithdrawal, NewWorkLog, Order, OrderFilter, OrderId, OrderStatus,
    PaymentRecord, Product, ProductId, Role, Stage, StageId, StageInput, StageSlot, User, UserId,
    WorkLogEntry, WorkLogFilter, WorkLogId, WorkerBalance,
};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;

    /// Cheap liveness probe for health checks
    async fn ping(&self) -> AppResult<()>;
}

#[async_trait]
pub trait StoreTx: Send {
    // Products and stages
    async fn insert_product(&mut self, product: &NewProduct) -> AppResult<Product>;
    async fn get_product(&mut self, id: ProductId) -> AppResult<Option<Product>>;
    async fn lock_product(&mut self, id: ProductId) -> AppResult<Option<Product>>;
    async fn find_product_by_name(&mut self, name: &str) -> AppResult<Option<Product>>;
    async fn list_products(&mut self) -> AppResult<Vec<Product>>;
    async fn update_product(&mut self, product: &Product) -> AppResult<()>;
    async fn set_product_stock(&mut self, id: ProductId, stock: i32) -> AppResult<()>;
    /// Removes the product with its stages and inventory rows
    async fn delete_product(&mut self, id: ProductId) -> AppResult<()>;
    async fn insert_stage(&mut self, product_id: ProductId, stage: &StageInput) -> AppResult<Stage>;
    async fn update_stage(&mut self, stage_id: StageId, stage: &StageInput) -> AppResult<()>;
    async fn delete_stage(&mut self, stage_id: StageId) -> AppResult<()>;

    // Inventory
    /// Current quantity at a slot, 0 when the row does not exist yet
    async fn lock_inventory(&mut self, product_id: ProductId, slot: StageSlot) -> AppResult<i32>;
    /// Creates the row on first use. Never called with a negative quantity.
    async fn set_inventory(
        &mut self,
        product_id: ProductId,
        slot: StageSlot,
        quantity: i32,
    ) -> AppResult<()>;
    async fn list_inventory(&mut self) -> AppResult<Vec<InventoryRecord>>;

    // Orders
    async fn insert_order(&mut self, order: &NewOrder, items: &[NewOrderItem]) -> AppResult<Order>;
    async fn get_order(&mut self, id: OrderId) -> AppResult<Option<Order>>;
    async fn lock_order(&mut self, id: OrderId) -> AppResult<Option<Order>>;
    /// Newest first
    async fn list_orders(&mut self, filter: &OrderFilter) -> AppResult<Vec<Order>>;
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
    /// Removes the order and its line items
    async fn delete_order(&mut self, id: OrderId) -> AppResult<()>;
    async fn count_order_items_for_product(&mut self, product_id: ProductId) -> AppResult<i64>;

    // Work log ledger
    async fn insert_work_log(&mut self, log: &NewWorkLog) -> AppResult<WorkLogEntry>;
    /// Locks and returns the entries that exist among `ids`
    async fn lock_work_logs(&mut self, ids: &[WorkLogId]) -> AppResult<Vec<WorkLogEntry>>;
    async fn mark_work_logs_paid(&mut self, ids: &[WorkLogId], paid_at: DateTime<Utc>)
        -> AppResult<()>;
    /// Newest first, paginated by the filter
    async fn list_work_logs(&mut self, filter: &WorkLogFilter) -> AppResult<Vec<WorkLogEntry>>;
    /// Units completed at `stage_id` by work logs linked to `order_id`
    async fn completed_quantity(&mut self, order_id: OrderId, stage_id: StageId) -> AppResult<i64>;
    async fn count_work_logs_for_stage(&mut self, stage_id: StageId) -> AppResult<i64>;
    async fn count_work_logs_for_product(&mut self, product_id: ProductId) -> AppResult<i64>;
    async fn count_work_logs_for_order(&mut self, order_id: OrderId) -> AppResult<i64>;

    // Payment ledger
    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<PaymentRecord>;
    /// Newest first; all workers when `worker_id` is `None`
    async fn list_payments(&mut self, worker_id: Option<UserId>) -> AppResult<Vec<PaymentRecord>>;
    /// All-time earned and paid totals, recomputed from both ledgers
    async fn worker_balance(&mut self, worker_id: UserId) -> AppResult<WorkerBalance>;

    // Expenses and withdrawals
    async fn insert_expense(&mut self, expense: &NewExpense) -> AppResult<Expense>;
    async fn get_expense(&mut self, id: i64) -> AppResult<Option<Expense>>;
    async fn update_expense(&mut self, expense: &Expense) -> AppResult<()>;
    async fn delete_expense(&mut self, id: i64) -> AppResult<()>;
    async fn list_expenses(&mut self) -> AppResult<Vec<Expense>>;
    async fn insert_withdrawal(&mut self, withdrawal: &NewWithdrawal) -> AppResult<CashWithdrawal>;
    async fn list_withdrawals(&mut self) -> AppResult<Vec<CashWithdrawal>>;

    // Users
    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User>;
    async fn get_user(&mut self, id: UserId) -> AppResult<Option<User>>;
    async fn lock_user(&mut self, id: UserId) -> AppResult<Option<User>>;
    async fn update_user(&mut self, user: &User) -> AppResult<()>;
    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&mut self, role: Option<Role>) -> AppResult<Vec<User>>;

    async fn commit(self: Box<Self>) -> AppResult<()>;
}
