//! PostgreSQL store
//!
//! Enum columns are stored as TEXT and parsed on the way out. Every
//! transaction is a single `sqlx::Transaction`; `lock_*` methods use
//! `SELECT ... FOR UPDATE`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use shared::{
    CashWithdrawal, DomainError, Expense, ExpenseId, InventoryRecord, NewExpense, NewOrder,
    NewOrderItem, NewPayment, NewProduct, NewUser, NewWithdrawal, NewWorkLog, Order, OrderFilter,
    OrderId, OrderItem, OrderStatus, PaymentRecord, Product, ProductId, Role, Stage, StageId,
    StageInput, StageSlot, User, UserId, WorkLogEntry, WorkLogFilter, WorkLogId, WorkerBalance,
};

use super::{Store, StoreTx};
use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {}", e)))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

/// Turns unique violations into domain conflicts
fn map_write_err(err: sqlx::Error, resource: &str) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Domain(DomainError::conflict(
                resource,
                format!("{} already exists", resource),
            ));
        }
        if db.is_check_violation() {
            return AppError::Internal(format!("constraint violated: {}", db.message()));
        }
    }
    AppError::DatabaseError(err)
}

fn parse<T: std::str::FromStr<Err = DomainError>>(value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|e: DomainError| AppError::Internal(format!("corrupt row: {}", e)))
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price: Decimal,
    cost: Decimal,
    stock: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct StageRow {
    id: i64,
    product_id: i64,
    name: String,
    position: i32,
    piece_rate: Decimal,
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            product_id: row.product_id,
            name: row.name,
            position: row.position,
            piece_rate: row.piece_rate,
        }
    }
}

impl ProductRow {
    fn into_product(self, stages: Vec<Stage>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            description: self.description,
            price: self.price,
            cost: self.cost,
            stock: self.stock,
            stages,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InventoryRow {
    product_id: i64,
    stage_id: i64,
    quantity: i32,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    deadline: DateTime<Utc>,
    status: String,
    created_by: i64,
    wholesaler_id: Option<i64>,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_address: Option<String>,
    total_price: Option<Decimal>,
    prepayment: Decimal,
    payment_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    delivered_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> AppResult<Order> {
        Ok(Order {
            id: self.id,
            items,
            deadline: self.deadline,
            status: parse::<OrderStatus>(&self.status)?,
            created_by: self.created_by,
            wholesaler_id: self.wholesaler_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            customer_address: self.customer_address,
            total_price: self.total_price,
            prepayment: self.prepayment,
            payment_method: self.payment_method,
            created_at: self.created_at,
            updated_at: self.updated_at,
            delivered_at: self.delivered_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i32,
    price_at_order: Option<Decimal>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            price_at_order: row.price_at_order,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WorkLogRow {
    id: i64,
    worker_id: i64,
    order_id: Option<i64>,
    product_id: i64,
    stage_id: i64,
    quantity: i32,
    payment: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
}

impl From<WorkLogRow> for WorkLogEntry {
    fn from(row: WorkLogRow) -> Self {
        WorkLogEntry {
            id: row.id,
            worker_id: row.worker_id,
            order_id: row.order_id,
            product_id: row.product_id,
            stage_id: row.stage_id,
            quantity: row.quantity,
            payment: row.payment,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            completed_at: row.completed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    worker_id: i64,
    amount: Decimal,
    payment_type: String,
    comment: Option<String>,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> AppResult<Self> {
        Ok(PaymentRecord {
            id: row.id,
            worker_id: row.worker_id,
            amount: row.amount,
            payment_type: parse(&row.payment_type)?,
            comment: row.comment,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: i64,
    name: Option<String>,
    amount: Decimal,
    expense_type: String,
    description: Option<String>,
    product_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = AppError;

    fn try_from(row: ExpenseRow) -> AppResult<Self> {
        Ok(Expense {
            id: row.id,
            name: row.name,
            amount: row.amount,
            expense_type: parse(&row.expense_type)?,
            description: row.description,
            product_id: row.product_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WithdrawalRow {
    id: i64,
    amount: Decimal,
    purpose: Option<String>,
    withdrawn_by: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<WithdrawalRow> for CashWithdrawal {
    fn from(row: WithdrawalRow) -> Self {
        CashWithdrawal {
            id: row.id,
            amount: row.amount,
            purpose: row.purpose,
            withdrawn_by: row.withdrawn_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    full_name: String,
    password_hash: String,
    role: String,
    phone: Option<String>,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            password_hash: row.password_hash,
            role: parse(&row.role)?,
            phone: row.phone,
            address: row.address,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

fn collect_rows<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

// ============================================================================
// Helpers that assemble aggregates
// ============================================================================

impl PgTx {
    async fn stages_of(&mut self, product_ids: &[i64]) -> AppResult<HashMap<i64, Vec<Stage>>> {
        let rows = sqlx::query_as::<_, StageRow>(
            r#"
            SELECT id, product_id, name, position, piece_rate
            FROM stages
            WHERE product_id = ANY($1)
            ORDER BY product_id, position
            "#,
        )
        .bind(product_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut grouped: HashMap<i64, Vec<Stage>> = HashMap::new();
        for row in rows {
            grouped.entry(row.product_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn assemble_products(&mut self, rows: Vec<ProductRow>) -> AppResult<Vec<Product>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut stages = self.stages_of(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let product_stages = stages.remove(&row.id).unwrap_or_default();
                row.into_product(product_stages)
            })
            .collect())
    }

    async fn assemble_orders(&mut self, rows: Vec<OrderRow>) -> AppResult<Vec<Order>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, quantity, price_at_order
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            items.entry(row.order_id).or_default().push(row.into());
        }

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn single_product(&mut self, row: Option<ProductRow>) -> AppResult<Option<Product>> {
        match row {
            Some(row) => Ok(self.assemble_products(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn single_order(&mut self, row: Option<OrderRow>) -> AppResult<Option<Order>> {
        match row {
            Some(row) => Ok(self.assemble_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn count(&mut self, sql: &'static str, id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(sql)
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_product(&mut self, product: &NewProduct) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, description, price, cost)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, price, cost, stock
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.cost)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_err(e, "name"))?;

        Ok(row.into_product(Vec::new()))
    }

    async fn get_product(&mut self, id: ProductId) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, cost, stock FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        self.single_product(row).await
    }

    async fn lock_product(&mut self, id: ProductId) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, cost, stock FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        self.single_product(row).await
    }

    async fn find_product_by_name(&mut self, name: &str) -> AppResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, cost, stock FROM products WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;
        self.single_product(row).await
    }

    async fn list_products(&mut self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price, cost, stock FROM products ORDER BY id",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        self.assemble_products(rows).await
    }

    async fn update_product(&mut self, product: &Product) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE products
            SET name = $1, description = $2, price = $3, cost = $4
            WHERE id = $5
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.cost)
        .bind(product.id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_err(e, "name"))?;
        Ok(())
    }

    async fn set_product_stock(&mut self, id: ProductId, stock: i32) -> AppResult<()> {
        sqlx::query("UPDATE products SET stock = $1 WHERE id = $2")
            .bind(stock)
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_write_err(e, "stock"))?;
        Ok(())
    }

    async fn delete_product(&mut self, id: ProductId) -> AppResult<()> {
        // stages and inventory rows cascade
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_stage(&mut self, product_id: ProductId, stage: &StageInput) -> AppResult<Stage> {
        let row = sqlx::query_as::<_, StageRow>(
            r#"
            INSERT INTO stages (product_id, name, position, piece_rate)
            VALUES ($1, $2, $3, $4)
            RETURNING id, product_id, name, position, piece_rate
            "#,
        )
        .bind(product_id)
        .bind(&stage.name)
        .bind(stage.position)
        .bind(stage.piece_rate)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_err(e, "position"))?;
        Ok(row.into())
    }

    async fn update_stage(&mut self, stage_id: StageId, stage: &StageInput) -> AppResult<()> {
        sqlx::query("UPDATE stages SET name = $1, position = $2, piece_rate = $3 WHERE id = $4")
            .bind(&stage.name)
            .bind(stage.position)
            .bind(stage.piece_rate)
            .bind(stage_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_write_err(e, "position"))?;
        Ok(())
    }

    async fn delete_stage(&mut self, stage_id: StageId) -> AppResult<()> {
        sqlx::query("DELETE FROM production_inventory WHERE stage_id = $1")
            .bind(stage_id)
            .execute(&mut *self.tx)
            .await?;
        sqlx::query("DELETE FROM stages WHERE id = $1")
            .bind(stage_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn lock_inventory(&mut self, product_id: ProductId, slot: StageSlot) -> AppResult<i32> {
        // materialise the row so there is something to lock on first use
        sqlx::query(
            r#"
            INSERT INTO production_inventory (product_id, stage_id, quantity)
            VALUES ($1, $2, 0)
            ON CONFLICT (product_id, stage_id) DO NOTHING
            "#,
        )
        .bind(product_id)
        .bind(slot.as_db_id())
        .execute(&mut *self.tx)
        .await?;

        let quantity = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT quantity FROM production_inventory
            WHERE product_id = $1 AND stage_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(slot.as_db_id())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(quantity)
    }

    async fn set_inventory(
        &mut self,
        product_id: ProductId,
        slot: StageSlot,
        quantity: i32,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO production_inventory (product_id, stage_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (product_id, stage_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
            "#,
        )
        .bind(product_id)
        .bind(slot.as_db_id())
        .bind(quantity)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_err(e, "inventory"))?;
        Ok(())
    }

    async fn list_inventory(&mut self) -> AppResult<Vec<InventoryRecord>> {
        let rows = sqlx::query_as::<_, InventoryRow>(
            "SELECT product_id, stage_id, quantity FROM production_inventory ORDER BY product_id, stage_id",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| InventoryRecord {
                product_id: row.product_id,
                slot: StageSlot::from_db_id(row.stage_id),
                quantity: row.quantity,
            })
            .collect())
    }

    async fn insert_order(&mut self, order: &NewOrder, items: &[NewOrderItem]) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            INSERT INTO orders (deadline, status, created_by, wholesaler_id, customer_name,
                                customer_phone, customer_address, total_price, prepayment, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, deadline, status, created_by, wholesaler_id, customer_name, customer_phone,
                      customer_address, total_price, prepayment, payment_method, created_at,
                      updated_at, delivered_at
            "#,
        )
        .bind(order.deadline)
        .bind(order.status.as_str())
        .bind(order.created_by)
        .bind(order.wholesaler_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_address)
        .bind(order.total_price)
        .bind(order.prepayment)
        .bind(&order.payment_method)
        .fetch_one(&mut *self.tx)
        .await?;

        let mut stored_items = Vec::with_capacity(items.len());
        for item in items {
            let item_row = sqlx::query_as::<_, OrderItemRow>(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price_at_order)
                VALUES ($1, $2, $3, $4)
                RETURNING id, order_id, product_id, quantity, price_at_order
                "#,
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.quantity)
            .bind(item.price_at_order)
            .fetch_one(&mut *self.tx)
            .await?;
            stored_items.push(item_row.into());
        }

        row.into_order(stored_items)
    }

    async fn get_order(&mut self, id: OrderId) -> AppResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, deadline, status, created_by, wholesaler_id, customer_name, customer_phone,
                   customer_address, total_price, prepayment, payment_method, created_at,
                   updated_at, delivered_at
            FROM orders WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        self.single_order(row).await
    }

    async fn lock_order(&mut self, id: OrderId) -> AppResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, deadline, status, created_by, wholesaler_id, customer_name, customer_phone,
                   customer_address, total_price, prepayment, payment_method, created_at,
                   updated_at, delivered_at
            FROM orders WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        self.single_order(row).await
    }

    async fn list_orders(&mut self, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let (from, to) = filter
            .delivered
            .map_or((None, None), |range| (range.from, range.to));
        let restrict_delivered = filter
            .delivered
            .map_or(false, |range| range.from.is_some() || range.to.is_some());

        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, deadline, status, created_by, wholesaler_id, customer_name, customer_phone,
                   customer_address, total_price, prepayment, payment_method, created_at,
                   updated_at, delivered_at
            FROM orders
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::BIGINT IS NULL OR wholesaler_id = $2)
              AND (NOT $3 OR delivered_at IS NOT NULL)
              AND ($4::TIMESTAMPTZ IS NULL OR delivered_at >= $4)
              AND ($5::TIMESTAMPTZ IS NULL OR delivered_at <= $5)
            ORDER BY id DESC
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.wholesaler_id)
        .bind(restrict_delivered)
        .bind(from)
        .bind(to)
        .fetch_all(&mut *self.tx)
        .await?;

        self.assemble_orders(rows).await
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = $1, delivered_at = COALESCE($2, delivered_at), updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(delivered_at)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> AppResult<()> {
        // line items cascade, work log links are nulled
        sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn count_order_items_for_product(&mut self, product_id: ProductId) -> AppResult<i64> {
        self.count(
            "SELECT COUNT(*) FROM order_items WHERE product_id = $1",
            product_id,
        )
        .await
    }

    async fn insert_work_log(&mut self, log: &NewWorkLog) -> AppResult<WorkLogEntry> {
        let row = sqlx::query_as::<_, WorkLogRow>(
            r#"
            INSERT INTO work_logs (worker_id, order_id, product_id, stage_id, quantity, payment)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, worker_id, order_id, product_id, stage_id, quantity, payment,
                      is_paid, paid_at, completed_at
            "#,
        )
        .bind(log.worker_id)
        .bind(log.order_id)
        .bind(log.product_id)
        .bind(log.stage_id)
        .bind(log.quantity)
        .bind(log.payment)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn lock_work_logs(&mut self, ids: &[WorkLogId]) -> AppResult<Vec<WorkLogEntry>> {
        let rows = sqlx::query_as::<_, WorkLogRow>(
            r#"
            SELECT id, worker_id, order_id, product_id, stage_id, quantity, payment,
                   is_paid, paid_at, completed_at
            FROM work_logs
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_work_logs_paid(
        &mut self,
        ids: &[WorkLogId],
        paid_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE work_logs SET is_paid = TRUE, paid_at = $1 WHERE id = ANY($2)")
            .bind(paid_at)
            .bind(ids)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_work_logs(&mut self, filter: &WorkLogFilter) -> AppResult<Vec<WorkLogEntry>> {
        let rows = sqlx::query_as::<_, WorkLogRow>(
            r#"
            SELECT id, worker_id, order_id, product_id, stage_id, quantity, payment,
                   is_paid, paid_at, completed_at
            FROM work_logs
            WHERE ($1::BIGINT IS NULL OR worker_id = $1)
              AND ($2::BIGINT IS NULL OR order_id = $2)
              AND ($3::BIGINT IS NULL OR product_id = $3)
              AND ($4::BOOLEAN IS NULL OR is_paid = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR completed_at >= $5)
              AND ($6::TIMESTAMPTZ IS NULL OR completed_at <= $6)
            ORDER BY id DESC
            OFFSET $7 LIMIT $8
            "#,
        )
        .bind(filter.worker_id)
        .bind(filter.order_id)
        .bind(filter.product_id)
        .bind(filter.is_paid)
        .bind(filter.completed.from)
        .bind(filter.completed.to)
        .bind(i64::from(filter.page.offset))
        .bind(i64::from(filter.page.limit))
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn completed_quantity(&mut self, order_id: OrderId, stage_id: StageId) -> AppResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::BIGINT
            FROM work_logs
            WHERE order_id = $1 AND stage_id = $2
            "#,
        )
        .bind(order_id)
        .bind(stage_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(total)
    }

    async fn count_work_logs_for_stage(&mut self, stage_id: StageId) -> AppResult<i64> {
        self.count("SELECT COUNT(*) FROM work_logs WHERE stage_id = $1", stage_id)
            .await
    }

    async fn count_work_logs_for_product(&mut self, product_id: ProductId) -> AppResult<i64> {
        self.count("SELECT COUNT(*) FROM work_logs WHERE product_id = $1", product_id)
            .await
    }

    async fn count_work_logs_for_order(&mut self, order_id: OrderId) -> AppResult<i64> {
        self.count("SELECT COUNT(*) FROM work_logs WHERE order_id = $1", order_id)
            .await
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> AppResult<PaymentRecord> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO salary_payments (worker_id, amount, payment_type, comment, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, worker_id, amount, payment_type, comment, created_by, created_at
            "#,
        )
        .bind(payment.worker_id)
        .bind(payment.amount)
        .bind(payment.payment_type.as_str())
        .bind(&payment.comment)
        .bind(payment.created_by)
        .fetch_one(&mut *self.tx)
        .await?;
        row.try_into()
    }

    async fn list_payments(&mut self, worker_id: Option<UserId>) -> AppResult<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, worker_id, amount, payment_type, comment, created_by, created_at
            FROM salary_payments
            WHERE ($1::BIGINT IS NULL OR worker_id = $1)
            ORDER BY id DESC
            "#,
        )
        .bind(worker_id)
        .fetch_all(&mut *self.tx)
        .await?;
        collect_rows(rows)
    }

    async fn worker_balance(&mut self, worker_id: UserId) -> AppResult<WorkerBalance> {
        let (earned, paid) = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE((SELECT SUM(payment) FROM work_logs WHERE worker_id = $1), 0),
                COALESCE((SELECT SUM(amount) FROM salary_payments WHERE worker_id = $1), 0)
            "#,
        )
        .bind(worker_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(WorkerBalance::new(earned, paid))
    }

    async fn insert_expense(&mut self, expense: &NewExpense) -> AppResult<Expense> {
        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            INSERT INTO expenses (name, amount, expense_type, description, product_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, amount, expense_type, description, product_id, created_at
            "#,
        )
        .bind(&expense.name)
        .bind(expense.amount)
        .bind(expense.expense_type.as_str())
        .bind(&expense.description)
        .bind(expense.product_id)
        .fetch_one(&mut *self.tx)
        .await?;
        row.try_into()
    }

    async fn get_expense(&mut self, id: ExpenseId) -> AppResult<Option<Expense>> {
        let row = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, name, amount, expense_type, description, product_id, created_at
            FROM expenses WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Expense::try_from).transpose()
    }

    async fn update_expense(&mut self, expense: &Expense) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE expenses
            SET name = $1, amount = $2, expense_type = $3, description = $4, product_id = $5
            WHERE id = $6
            "#,
        )
        .bind(&expense.name)
        .bind(expense.amount)
        .bind(expense.expense_type.as_str())
        .bind(&expense.description)
        .bind(expense.product_id)
        .bind(expense.id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_expense(&mut self, id: ExpenseId) -> AppResult<()> {
        sqlx::query("DELETE FROM expenses WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_expenses(&mut self) -> AppResult<Vec<Expense>> {
        let rows = sqlx::query_as::<_, ExpenseRow>(
            r#"
            SELECT id, name, amount, expense_type, description, product_id, created_at
            FROM expenses ORDER BY id DESC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;
        collect_rows(rows)
    }

    async fn insert_withdrawal(&mut self, withdrawal: &NewWithdrawal) -> AppResult<CashWithdrawal> {
        let row = sqlx::query_as::<_, WithdrawalRow>(
            r#"
            INSERT INTO cash_withdrawals (amount, purpose, withdrawn_by)
            VALUES ($1, $2, $3)
            RETURNING id, amount, purpose, withdrawn_by, created_at
            "#,
        )
        .bind(withdrawal.amount)
        .bind(&withdrawal.purpose)
        .bind(withdrawal.withdrawn_by)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn list_withdrawals(&mut self) -> AppResult<Vec<CashWithdrawal>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(
            "SELECT id, amount, purpose, withdrawn_by, created_at FROM cash_withdrawals ORDER BY id DESC",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_user(&mut self, user: &NewUser) -> AppResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, full_name, password_hash, role, phone, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, username, email, full_name, password_hash, role, phone, address,
                      is_active, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(&user.address)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_write_err(e, "user"))?;
        row.try_into()
    }

    async fn get_user(&mut self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, password_hash, role, phone, address,
                   is_active, created_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn lock_user(&mut self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, password_hash, role, phone, address,
                   is_active, created_at
            FROM users WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET username = $1, email = $2, full_name = $3, password_hash = $4, role = $5,
                phone = $6, address = $7, is_active = $8
            WHERE id = $9
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.is_active)
        .bind(user.id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_write_err(e, "user"))?;
        Ok(())
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, password_hash, role, phone, address,
                   is_active, created_at
            FROM users WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, password_hash, role, phone, address,
                   is_active, created_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&mut self, role: Option<Role>) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, full_name, password_hash, role, phone, address,
                   is_active, created_at
            FROM users
            WHERE ($1::TEXT IS NULL OR role = $1)
            ORDER BY id
            "#,
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;
        collect_rows(rows)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
