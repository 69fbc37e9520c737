//! In-memory store
//!
//! A transaction holds the store mutex for its whole lifetime and works on a
//! private copy of the state, which replaces the shared state on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use shared::{
    CashWithdrawal, DomainError, Expense, ExpenseId, InventoryRecord, NewExpense, NewOrder,
    NewOrderItem, NewPayment, NewProduct, NewUser, NewWithdrawal, NewWorkLog, Order, OrderFilter,
    OrderId, OrderItem, OrderStatus, PaymentId, PaymentRecord, Product, ProductId, Role, Stage,
    StageId, StageInput, StageSlot, User, UserId, WithdrawalId, WorkLogEntry, WorkLogFilter,
    WorkLogId, WorkerBalance,
};

use super::{Store, StoreTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: i64,
    products: BTreeMap<ProductId, Product>,
    inventory: BTreeMap<(ProductId, StageSlot), i32>,
    orders: BTreeMap<OrderId, Order>,
    work_logs: BTreeMap<WorkLogId, WorkLogEntry>,
    payments: BTreeMap<PaymentId, PaymentRecord>,
    expenses: BTreeMap<ExpenseId, Expense>,
    withdrawals: BTreeMap<WithdrawalId, CashWithdrawal>,
    users: BTreeMap<UserId, User>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn product_mut(&mut self, id: ProductId) -> AppResult<&mut Product> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Product {}", id)))
    }

    fn stage_owner(&self, stage_id: StageId) -> AppResult<ProductId> {
        self.products
            .values()
            .find(|p| p.stages.iter().any(|s| s.id == stage_id))
            .map(|p| p.id)
            .ok_or_else(|| AppError::not_found(format!("Stage {}", stage_id)))
    }
}

/// Process-local store used by tests and `storage.backend = "memory"`
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

fn conflict(resource: &str, message: impl Into<String>) -> AppError {
    AppError::Domain(DomainError::conflict(resource, message))
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn insert_product(&mut self, product: &NewProduct) -> AppResult<Product> {
        if self.working.products.values().any(|p| p.name == product.name) {
            return Err(conflict("name", format!("Product '{}' already exists", product.name)));
        }
        let id = self.working.next_id();
        let product = Product {
            id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            cost: product.cost,
            stock: 0,
            stages: Vec::new(),
        };
        self.working.products.insert(id, product.clone());
        Ok(product)
    }

    async fn get_product(&mut self, id: ProductId) -> AppResult<Option<Product>> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn lock_product(&mut self, id: ProductId) -> AppResult<Option<Product>> {
        self.get_product(id).await
    }

    async fn find_product_by_name(&mut self, name: &str) -> AppResult<Option<Product>> {
        Ok(self.working.products.values().find(|p| p.name == name).cloned())
    }

    async fn list_products(&mut self) -> AppResult<Vec<Product>> {
        Ok(self.working.products.values().cloned().collect())
    }

    async fn update_product(&mut self, product: &Product) -> AppResult<()> {
        if self
            .working
            .products
            .values()
            .any(|p| p.id != product.id && p.name == product.name)
        {
            return Err(conflict("name", format!("Product '{}' already exists", product.name)));
        }
        let stored = self.working.product_mut(product.id)?;
        stored.name = product.name.clone();
        stored.description = product.description.clone();
        stored.price = product.price;
        stored.cost = product.cost;
        Ok(())
    }

    async fn set_product_stock(&mut self, id: ProductId, stock: i32) -> AppResult<()> {
        if stock < 0 {
            return Err(AppError::Internal(format!(
                "finished stock of product {} would become negative",
                id
            )));
        }
        self.working.product_mut(id)?.stock = stock;
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> AppResult<()> {
        self.working.products.remove(&id);
        self.working.inventory.retain(|(product_id, _), _| *product_id != id);
        for expense in self.working.expenses.values_mut() {
            if expense.product_id == Some(id) {
                expense.product_id = None;
            }
        }
        Ok(())
    }

    async fn insert_stage(&mut self, product_id: ProductId, stage: &StageInput) -> AppResult<Stage> {
        let id = self.working.next_id();
        let product = self.working.product_mut(product_id)?;
        let stage = Stage {
            id,
            product_id,
            name: stage.name.clone(),
            position: stage.position,
            piece_rate: stage.piece_rate,
        };
        product.stages.push(stage.clone());
        product.stages.sort_by_key(|s| s.position);
        Ok(stage)
    }

    async fn update_stage(&mut self, stage_id: StageId, input: &StageInput) -> AppResult<()> {
        let owner = self.working.stage_owner(stage_id)?;
        let product = self.working.product_mut(owner)?;
        if let Some(stage) = product.stages.iter_mut().find(|s| s.id == stage_id) {
            stage.name = input.name.clone();
            stage.position = input.position;
            stage.piece_rate = input.piece_rate;
        }
        product.stages.sort_by_key(|s| s.position);
        Ok(())
    }

    async fn delete_stage(&mut self, stage_id: StageId) -> AppResult<()> {
        let owner = self.working.stage_owner(stage_id)?;
        self.working.product_mut(owner)?.stages.retain(|s| s.id != stage_id);
        self.working
            .inventory
            .remove(&(owner, StageSlot::Stage(stage_id)));
        Ok(())
    }

    async fn lock_inventory(&mut self, product_id: ProductId, slot: StageSlot) -> AppResult<i32> {
        Ok(self
            .working
            .inventory
            .get(&(product_id, slot))
            .copied()
            .unwrap_or(0))
    }

    async fn set_inventory(
        &mut self,
        product_id: ProductId,
        slot: StageSlot,
        quantity: i32,
    ) -> AppResult<()> {
        if quantity < 0 {
            return Err(AppError::Internal(format!(
                "inventory of product {} at {:?} would become negative",
                product_id, slot
            )));
        }
        self.working.inventory.insert((product_id, slot), quantity);
        Ok(())
    }

    async fn list_inventory(&mut self) -> AppResult<Vec<InventoryRecord>> {
        Ok(self
            .working
            .inventory
            .iter()
            .map(|(&(product_id, slot), &quantity)| InventoryRecord {
                product_id,
                slot,
                quantity,
            })
            .collect())
    }

    async fn insert_order(&mut self, order: &NewOrder, items: &[NewOrderItem]) -> AppResult<Order> {
        let id = self.working.next_id();
        let now = Utc::now();
        let items = items
            .iter()
            .map(|item| OrderItem {
                id: self.working.next_id(),
                order_id: id,
                product_id: item.product_id,
                quantity: item.quantity,
                price_at_order: item.price_at_order,
            })
            .collect();
        let order = Order {
            id,
            items,
            deadline: order.deadline,
            status: order.status,
            created_by: order.created_by,
            wholesaler_id: order.wholesaler_id,
            customer_name: order.customer_name.clone(),
            customer_phone: order.customer_phone.clone(),
            customer_address: order.customer_address.clone(),
            total_price: order.total_price,
            prepayment: order.prepayment,
            payment_method: order.payment_method.clone(),
            created_at: now,
            updated_at: now,
            delivered_at: None,
        };
        self.working.orders.insert(id, order.clone());
        Ok(order)
    }

    async fn get_order(&mut self, id: OrderId) -> AppResult<Option<Order>> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> AppResult<Option<Order>> {
        self.get_order(id).await
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        Ok(self
            .working
            .orders
            .values()
            .rev()
            .filter(|order| filter.matches(order))
            .cloned()
            .collect())
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Order {}", id)))?;
        order.status = status;
        order.updated_at = Utc::now();
        if delivered_at.is_some() {
            order.delivered_at = delivered_at;
        }
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> AppResult<()> {
        self.working.orders.remove(&id);
        for log in self.working.work_logs.values_mut() {
            if log.order_id == Some(id) {
                log.order_id = None;
            }
        }
        Ok(())
    }

    async fn count_order_items_for_product(&mut self, product_id: ProductId) -> AppResult<i64> {
        Ok(self
            .working
            .orders
            .values()
            .flat_map(|o| o.items.iter())
            .filter(|item| item.product_id == product_id)
            .count() as i64)
    }

    async fn insert_work_log(&mut self, log: &NewWorkLog) -> AppResult<WorkLogEntry> {
        let id = self.working.next_id();
        let entry = WorkLogEntry {
            id,
            worker_id: log.worker_id,
            order_id: log.order_id,
            product_id: log.product_id,
            stage_id: log.stage_id,
            quantity: log.quantity,
            payment: log.payment,
            is_paid: false,
            paid_at: None,
            completed_at: Utc::now(),
        };
        self.working.work_logs.insert(id, entry.clone());
        Ok(entry)
    }

    async fn lock_work_logs(&mut self, ids: &[WorkLogId]) -> AppResult<Vec<WorkLogEntry>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.working.work_logs.get(id).cloned())
            .collect())
    }

    async fn mark_work_logs_paid(
        &mut self,
        ids: &[WorkLogId],
        paid_at: DateTime<Utc>,
    ) -> AppResult<()> {
        for id in ids {
            if let Some(log) = self.working.work_logs.get_mut(id) {
                log.is_paid = true;
                log.paid_at = Some(paid_at);
            }
        }
        Ok(())
    }

    async fn list_work_logs(&mut self, filter: &WorkLogFilter) -> AppResult<Vec<WorkLogEntry>> {
        let matching: Vec<WorkLogEntry> = self
            .working
            .work_logs
            .values()
            .rev()
            .filter(|log| filter.matches(log))
            .cloned()
            .collect();
        Ok(filter.page.apply(matching))
    }

    async fn completed_quantity(&mut self, order_id: OrderId, stage_id: StageId) -> AppResult<i64> {
        Ok(self
            .working
            .work_logs
            .values()
            .filter(|log| log.order_id == Some(order_id) && log.stage_id == stage_id)
            .map(|log| i64::from(log.quantity))
            .sum())
    }

    async fn count_work_logs_for_stage(&mut self, stage_id: StageId) -> AppResult<i64> {
        Ok(self
            .working
            .work_logs
            .values()
            .filter(|log| log.stage_id == stage_id)
            .count() as i64)
    }

    async fn count_work_logs_for_product(&mut self, product_id: ProductId) -> AppResult<i64> {
        Ok(self
            .working
            .work_logs
            .values()
            .filter(|log| log.product_id == product_id)
            .count() as i64)
    }

    async fn count_work_logs_for_order(&mut self, order_id: OrderId) -> AppResult<i64> {
        Ok(self
            .working
            .work_logs
            .values()
            .filter(|log| log.order_id == Some(order_id))
            .count() as i64)
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<PaymentRecord> {
        let id = self.working.next_id();
        let record = PaymentRecord {
            id,
            worker_id: payment.worker_id,
            amount: payment.amount,
            payment_type: payment.payment_type,
            comment: payment.comment.clone(),
            created_by: payment.created_by,
            created_at: Utc::now(),
        };
        self.working.payments.insert(id, record.clone());
        Ok(record)
    }

    async fn list_payments(&mut self, worker_id: Option<UserId>) -> AppResult<Vec<PaymentRecord>> {
        Ok(self
            .working
            .payments
            .values()
            .rev()
            .filter(|p| worker_id.map_or(true, |id| p.worker_id == id))
            .cloned()
            .collect())
    }

    async fn worker_balance(&mut self, worker_id: UserId) -> AppResult<WorkerBalance> {
        Ok(WorkerBalance::from_ledgers(
            self.working
                .work_logs
                .values()
                .filter(|log| log.worker_id == worker_id),
            self.working
                .payments
                .values()
                .filter(|p| p.worker_id == worker_id),
        ))
    }

    async fn insert_expense(&mut self, expense: &NewExpense) -> AppResult<Expense> {
        let id = self.working.next_id();
        let record = Expense {
            id,
            name: expense.name.clone(),
            amount: expense.amount,
            expense_type: expense.expense_type,
            description: expense.description.clone(),
            product_id: expense.product_id,
            created_at: Utc::now(),
        };
        self.working.expenses.insert(id, record.clone());
        Ok(record)
    }

    async fn get_expense(&mut self, id: ExpenseId) -> AppResult<Option<Expense>> {
        Ok(self.working.expenses.get(&id).cloned())
    }

    async fn update_expense(&mut self, expense: &Expense) -> AppResult<()> {
        match self.working.expenses.get_mut(&expense.id) {
            Some(stored) => {
                *stored = expense.clone();
                Ok(())
            }
            None => Err(AppError::not_found(format!("Expense {}", expense.id))),
        }
    }

    async fn delete_expense(&mut self, id: ExpenseId) -> AppResult<()> {
        self.working.expenses.remove(&id);
        Ok(())
    }

    async fn list_expenses(&mut self) -> AppResult<Vec<Expense>> {
        Ok(self.working.expenses.values().rev().cloned().collect())
    }

    async fn insert_withdrawal(&mut self, withdrawal: &NewWithdrawal) -> AppResult<CashWithdrawal> {
        let id = self.working.next_id();
        let record = CashWithdrawal {
            id,
            amount: withdrawal.amount,
            purpose: withdrawal.purpose.clone(),
            withdrawn_by: withdrawal.withdrawn_by,
            created_at: Utc::now(),
        };
        self.working.withdrawals.insert(id, record.clone());
        Ok(record)
    }

    async fn list_withdrawals(&mut self) -> AppResult<Vec<CashWithdrawal>> {
        Ok(self.working.withdrawals.values().rev().cloned().collect())
    }

    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User> {
        if self.working.users.values().any(|u| u.username == user.username) {
            return Err(conflict("username", "Username is already taken"));
        }
        if self.working.users.values().any(|u| u.email == user.email) {
            return Err(conflict("email", "Email is already registered"));
        }
        let id = self.working.next_id();
        let record = User {
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            phone: user.phone.clone(),
            address: user.address.clone(),
            is_active: true,
            created_at: Utc::now(),
        };
        self.working.users.insert(id, record.clone());
        Ok(record)
    }

    async fn get_user(&mut self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: UserId) -> AppResult<Option<User>> {
        self.get_user(id).await
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        let others = self.working.users.values().filter(|u| u.id != user.id);
        for other in others {
            if other.username == user.username {
                return Err(conflict("username", "Username is already taken"));
            }
            if other.email == user.email {
                return Err(conflict("email", "Email is already registered"));
            }
        }
        let stored = self
            .working
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::not_found(format!("User {}", user.id)))?;
        *stored = user.clone();
        Ok(())
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        Ok(self.working.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&mut self, role: Option<Role>) -> AppResult<Vec<User>> {
        Ok(self
            .working
            .users
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn chair() -> NewProduct {
        NewProduct {
            name: "Chair".into(),
            description: None,
            price: Decimal::from(100),
            cost: Decimal::from(40),
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_state_untouched() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&chair()).await.unwrap();
        drop(tx);

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = MemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let product = tx.insert_product(&chair()).await.unwrap();
        tx.set_inventory(product.id, StageSlot::Holding, 5).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.lock_inventory(product.id, StageSlot::Holding).await.unwrap(), 5);
        assert_eq!(tx.lock_inventory(product.id, StageSlot::Stage(99)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_negative_quantities_are_refused() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let product = tx.insert_product(&chair()).await.unwrap();

        assert!(tx.set_inventory(product.id, StageSlot::Holding, -1).await.is_err());
        assert!(tx.set_product_stock(product.id, -1).await.is_err());
    }

    #[tokio::test]
    async fn test_unique_names() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_product(&chair()).await.unwrap();

        let err = tx.insert_product(&chair()).await.unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::Conflict { .. })));
    }
}
