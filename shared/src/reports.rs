//! Read-only projections over the ledgers
//!
//! Every report is built from a [`LedgerSnapshot`] in one accumulation pass
//! into explicit row structs. Nothing here mutates state.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ledger::WorkerBalance;
use crate::models::{
    AvailableTask, CashWithdrawal, Expense, ExpenseType, InventoryLine, InventoryRecord, Order,
    OrderStatus, PaymentRecord, PaymentType, PipelineStage, Product, ProductPipeline, Stage, User,
    WorkLogEntry, HOLDING_AREA_NAME,
};
use crate::types::{DateRange, ProductId, StageSlot, UserId};

/// Everything the report projections read
#[derive(Debug, Clone, Copy)]
pub struct LedgerSnapshot<'a> {
    pub products: &'a [Product],
    pub orders: &'a [Order],
    pub work_logs: &'a [WorkLogEntry],
    pub payments: &'a [PaymentRecord],
    pub expenses: &'a [Expense],
    pub withdrawals: &'a [CashWithdrawal],
    pub users: &'a [User],
}

impl<'a> LedgerSnapshot<'a> {
    fn product(&self, id: ProductId) -> Option<&'a Product> {
        let products: &'a [Product] = self.products;
        products.iter().find(|p| p.id == id)
    }

    fn product_name(&self, id: ProductId) -> String {
        self.product(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "N/A".to_string())
    }

    fn delivered_in(&self, range: DateRange) -> impl Iterator<Item = &'a Order> + 'a {
        let orders: &'a [Order] = self.orders;
        orders.iter().filter(move |order| {
            order.status == OrderStatus::Delivered && range.contains_opt(order.delivered_at)
        })
    }

    /// Value of each line at its frozen price, falling back to the catalogue price
    fn line_values(&self, order: &Order) -> Vec<(ProductId, i32, Decimal)> {
        order
            .items
            .iter()
            .map(|item| {
                let price = item
                    .price_at_order
                    .or_else(|| self.product(item.product_id).map(|p| p.price))
                    .unwrap_or(Decimal::ZERO);
                (item.product_id, item.quantity, Decimal::from(item.quantity) * price)
            })
            .collect()
    }

    /// Revenue of a delivered order; a negotiated total wins over line values
    pub fn order_revenue(&self, order: &Order) -> Decimal {
        match order.total_price {
            Some(total) => total,
            None => self.line_values(order).iter().map(|(_, _, v)| *v).sum(),
        }
    }

    /// Revenue per line, spreading a negotiated total proportionally to line value
    pub fn allocate_revenue(&self, order: &Order) -> Vec<(ProductId, i32, Decimal)> {
        let lines = self.line_values(order);
        let total = match order.total_price {
            Some(total) => total,
            None => return lines,
        };
        if lines.is_empty() {
            return lines;
        }

        let value_sum: Decimal = lines.iter().map(|(_, _, v)| *v).sum();
        let quantity_sum: Decimal = lines.iter().map(|(_, q, _)| Decimal::from(*q)).sum();
        let weight = |(_, quantity, value): &(ProductId, i32, Decimal)| {
            if value_sum.is_zero() {
                (Decimal::from(*quantity), quantity_sum)
            } else {
                (*value, value_sum)
            }
        };

        let last = lines.len() - 1;
        let mut allocated = Decimal::ZERO;
        lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let share = if index == last {
                    total - allocated
                } else {
                    let (part, whole) = weight(line);
                    if whole.is_zero() {
                        Decimal::ZERO
                    } else {
                        (total * part / whole).round_dp(2)
                    }
                };
                allocated += share;
                (line.0, line.1, share)
            })
            .collect()
    }

    fn cost_of_goods(&self, order: &Order) -> Decimal {
        order
            .items
            .iter()
            .map(|item| {
                let cost = self.product(item.product_id).map_or(Decimal::ZERO, |p| p.cost);
                Decimal::from(item.quantity) * cost
            })
            .sum()
    }
}

// ============================================================================
// Cash report
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashReport {
    pub sales: Decimal,
    pub cost_of_goods: Decimal,
    pub cost_expenses: Decimal,
    pub other_expenses: Decimal,
    pub total_expenses: Decimal,
    /// Work log accrual, paid or not
    pub total_salaries: Decimal,
    pub paid_salaries: Decimal,
    pub unpaid_salaries: Decimal,
    /// Cash actually handed to workers, salary and advances
    pub total_disbursed: Decimal,
    pub total_withdrawals: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub cash_balance: Decimal,
}

pub fn cash_report(snapshot: &LedgerSnapshot<'_>, range: DateRange) -> CashReport {
    let mut report = CashReport::default();

    for order in snapshot.delivered_in(range) {
        report.sales += snapshot.order_revenue(order);
        report.cost_of_goods += snapshot.cost_of_goods(order);
    }

    for expense in snapshot.expenses.iter().filter(|e| range.contains(e.created_at)) {
        match expense.expense_type {
            ExpenseType::Cost => report.cost_expenses += expense.amount,
            ExpenseType::Other => report.other_expenses += expense.amount,
        }
    }
    report.total_expenses = report.cost_expenses + report.other_expenses;

    for log in snapshot.work_logs.iter().filter(|l| range.contains(l.completed_at)) {
        report.total_salaries += log.payment;
        if log.is_paid {
            report.paid_salaries += log.payment;
        } else {
            report.unpaid_salaries += log.payment;
        }
    }

    report.total_disbursed = snapshot
        .payments
        .iter()
        .filter(|p| range.contains(p.created_at))
        .map(|p| p.amount)
        .sum();
    report.total_withdrawals = snapshot
        .withdrawals
        .iter()
        .filter(|w| range.contains(w.created_at))
        .map(|w| w.amount)
        .sum();

    report.gross_profit = report.sales - report.cost_of_goods - report.cost_expenses;
    report.net_profit = report.gross_profit - report.other_expenses - report.total_salaries;
    report.cash_balance = report.sales
        - report.total_expenses
        - report.total_disbursed
        - report.total_withdrawals;

    report
}

// ============================================================================
// Sales report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub total_orders: usize,
    pub total_revenue: Decimal,
    pub sales_by_product: Vec<ProductSales>,
}

pub fn sales_report(snapshot: &LedgerSnapshot<'_>, range: DateRange) -> SalesReport {
    let mut report = SalesReport::default();
    let mut by_product: BTreeMap<ProductId, ProductSales> = BTreeMap::new();

    for order in snapshot.delivered_in(range) {
        report.total_orders += 1;
        for (product_id, quantity, revenue) in snapshot.allocate_revenue(order) {
            report.total_revenue += revenue;
            let row = by_product.entry(product_id).or_insert_with(|| ProductSales {
                product_id,
                product_name: snapshot.product_name(product_id),
                quantity_sold: 0,
                revenue: Decimal::ZERO,
            });
            row.quantity_sold += i64::from(quantity);
            row.revenue += revenue;
        }
    }

    report.sales_by_product = by_product.into_values().collect();
    report
        .sales_by_product
        .sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.product_name.cmp(&b.product_name)));
    report
}

// ============================================================================
// Worker report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReportRow {
    pub worker_id: UserId,
    pub worker_name: String,
    pub worker_phone: Option<String>,
    pub stages_completed: usize,
    pub units_completed: i64,
    pub total_earned: Decimal,
    pub total_paid: Decimal,
    pub total_unpaid: Decimal,
    /// All-time
    pub total_advances: Decimal,
    /// All-time earned minus all-time paid
    pub current_balance: Decimal,
    pub top_product: Option<String>,
    pub avg_daily: Decimal,
    pub days_active: usize,
}

#[derive(Default)]
struct WorkerAccumulator {
    stages_completed: usize,
    units_completed: i64,
    earned: Decimal,
    paid: Decimal,
    unpaid: Decimal,
    product_counts: HashMap<String, usize>,
    days: BTreeSet<NaiveDate>,
}

/// Most frequent product name; ties go to the alphabetically first name
fn top_product(counts: &HashMap<String, usize>) -> Option<String> {
    counts
        .iter()
        .max_by(|(name_a, count_a), (name_b, count_b)| {
            count_a.cmp(count_b).then_with(|| name_b.cmp(name_a))
        })
        .map(|(name, _)| name.clone())
}

pub fn worker_report(snapshot: &LedgerSnapshot<'_>, range: DateRange) -> Vec<WorkerReportRow> {
    let mut workers: BTreeMap<UserId, WorkerAccumulator> = BTreeMap::new();

    for log in snapshot.work_logs.iter().filter(|l| range.contains(l.completed_at)) {
        let acc = workers.entry(log.worker_id).or_default();
        acc.stages_completed += 1;
        acc.units_completed += i64::from(log.quantity);
        acc.earned += log.payment;
        if log.is_paid {
            acc.paid += log.payment;
        } else {
            acc.unpaid += log.payment;
        }
        *acc
            .product_counts
            .entry(snapshot.product_name(log.product_id))
            .or_insert(0) += 1;
        acc.days.insert(log.completed_at.date_naive());
    }

    workers
        .into_iter()
        .map(|(worker_id, acc)| {
            let user = snapshot.users.iter().find(|u| u.id == worker_id);
            let payments: Vec<PaymentRecord> = snapshot
                .payments
                .iter()
                .filter(|p| p.worker_id == worker_id)
                .cloned()
                .collect();
            let balance = WorkerBalance::from_ledgers(
                snapshot.work_logs.iter().filter(|l| l.worker_id == worker_id),
                &payments,
            );
            let days_active = acc.days.len();
            let avg_daily = if days_active == 0 {
                Decimal::ZERO
            } else {
                (acc.earned / Decimal::from(days_active)).round_dp(2)
            };

            WorkerReportRow {
                worker_id,
                worker_name: user.map_or_else(|| format!("Worker {}", worker_id), |u| u.full_name.clone()),
                worker_phone: user.and_then(|u| u.phone.clone()),
                stages_completed: acc.stages_completed,
                units_completed: acc.units_completed,
                total_earned: acc.earned,
                total_paid: acc.paid,
                total_unpaid: acc.unpaid,
                total_advances: crate::ledger::sum_of_type(&payments, PaymentType::Advance),
                current_balance: balance.balance(),
                top_product: top_product(&acc.product_counts),
                avg_daily,
                days_active,
            }
        })
        .collect()
}

// ============================================================================
// Dashboard
// ============================================================================

pub const DASHBOARD_DAYS: i64 = 30;
pub const DASHBOARD_TOP: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub daily_sales: Vec<DailySales>,
    pub top_products: Vec<RankedEntry>,
    pub worker_performance: Vec<RankedEntry>,
}

fn top_ranked(totals: HashMap<String, i64>) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = totals
        .into_iter()
        .map(|(name, value)| RankedEntry { name, value })
        .collect();
    ranked.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    ranked.truncate(DASHBOARD_TOP);
    ranked
}

pub fn dashboard(snapshot: &LedgerSnapshot<'_>, now: DateTime<Utc>) -> DashboardStats {
    let today = now.date_naive();
    let first_day = today - Duration::days(DASHBOARD_DAYS - 1);

    let mut daily: BTreeMap<NaiveDate, Decimal> = (0..DASHBOARD_DAYS)
        .map(|offset| (first_day + Duration::days(offset), Decimal::ZERO))
        .collect();
    let mut product_totals: HashMap<String, i64> = HashMap::new();

    for order in snapshot.delivered_in(DateRange::all()) {
        if let Some(delivered) = order.delivered_at {
            if let Some(amount) = daily.get_mut(&delivered.date_naive()) {
                *amount += snapshot.order_revenue(order);
            }
        }
        for item in &order.items {
            *product_totals
                .entry(snapshot.product_name(item.product_id))
                .or_insert(0) += i64::from(item.quantity);
        }
    }

    let window_start = now - Duration::days(DASHBOARD_DAYS);
    let mut worker_totals: HashMap<String, i64> = HashMap::new();
    for log in snapshot.work_logs.iter().filter(|l| l.completed_at >= window_start) {
        let name = snapshot
            .users
            .iter()
            .find(|u| u.id == log.worker_id)
            .map_or_else(|| format!("Worker {}", log.worker_id), |u| u.full_name.clone());
        *worker_totals.entry(name).or_insert(0) += 1;
    }

    DashboardStats {
        daily_sales: daily
            .into_iter()
            .map(|(date, amount)| DailySales { date, amount })
            .collect(),
        top_products: top_ranked(product_totals),
        worker_performance: top_ranked(worker_totals),
    }
}

// ============================================================================
// Production views
// ============================================================================

fn ordered_stages(product: &Product) -> Vec<&Stage> {
    let mut stages: Vec<&Stage> = product.stages.iter().collect();
    stages.sort_by_key(|s| s.position);
    stages
}

fn quantity_at(inventory: &[InventoryRecord], product_id: ProductId, slot: StageSlot) -> i32 {
    inventory
        .iter()
        .filter(|r| r.product_id == product_id && r.slot == slot)
        .map(|r| r.quantity)
        .sum()
}

/// WIP distribution for every product that has units in production
pub fn pipeline_view(products: &[Product], inventory: &[InventoryRecord]) -> Vec<ProductPipeline> {
    products
        .iter()
        .filter_map(|product| {
            let mut pipeline = vec![PipelineStage {
                slot: StageSlot::Holding,
                stage_name: HOLDING_AREA_NAME.to_string(),
                position: 0,
                piece_rate: None,
                quantity: quantity_at(inventory, product.id, StageSlot::Holding),
            }];
            pipeline.extend(ordered_stages(product).into_iter().map(|stage| PipelineStage {
                slot: StageSlot::Stage(stage.id),
                stage_name: stage.name.clone(),
                position: stage.position,
                piece_rate: Some(stage.piece_rate),
                quantity: quantity_at(inventory, product.id, StageSlot::Stage(stage.id)),
            }));

            let total_wip: i64 = pipeline.iter().map(|s| i64::from(s.quantity)).sum();
            (total_wip > 0).then(|| ProductPipeline {
                product_id: product.id,
                product_name: product.name.clone(),
                stock: product.stock,
                total_wip,
                pipeline,
            })
        })
        .collect()
}

/// Work waiting in front of a stage: one task per non-empty slot that has a next stage
pub fn available_tasks(products: &[Product], inventory: &[InventoryRecord]) -> Vec<AvailableTask> {
    let mut tasks = Vec::new();
    for product in products {
        let stages = ordered_stages(product);
        let slots = std::iter::once((StageSlot::Holding, HOLDING_AREA_NAME.to_string()))
            .chain(stages.iter().map(|s| (StageSlot::Stage(s.id), s.name.clone())));

        for (index, (slot, slot_name)) in slots.enumerate() {
            let available = quantity_at(inventory, product.id, slot);
            if available <= 0 {
                continue;
            }
            // slot `index` feeds stage `index` in the ordered list
            if let Some(next) = stages.get(index) {
                tasks.push(AvailableTask {
                    product_id: product.id,
                    product_name: product.name.clone(),
                    current_slot: slot,
                    current_stage_name: slot_name,
                    next_stage_id: next.id,
                    next_stage_name: next.name.clone(),
                    piece_rate: next.piece_rate,
                    available_quantity: available,
                });
            }
        }
    }
    tasks
}

/// Non-empty inventory rows with product and stage names resolved
pub fn inventory_lines(products: &[Product], inventory: &[InventoryRecord]) -> Vec<InventoryLine> {
    inventory
        .iter()
        .filter(|record| record.quantity > 0)
        .filter_map(|record| {
            let product = products.iter().find(|p| p.id == record.product_id)?;
            let stage_name = match record.slot {
                StageSlot::Holding => HOLDING_AREA_NAME.to_string(),
                StageSlot::Stage(id) => product.stages.iter().find(|s| s.id == id)?.name.clone(),
            };
            Some(InventoryLine {
                product_id: product.id,
                product_name: product.name.clone(),
                slot: record.slot,
                stage_name,
                quantity: record.quantity,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseType, OrderItem, Role};
    use chrono::TimeZone;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    fn chair() -> Product {
        Product {
            id: 1,
            name: "Chair".into(),
            description: None,
            price: dec(100),
            cost: dec(40),
            stock: 3,
            stages: vec![
                Stage { id: 11, product_id: 1, name: "Cut".into(), position: 1, piece_rate: dec(10) },
                Stage { id: 12, product_id: 1, name: "Assemble".into(), position: 2, piece_rate: dec(15) },
            ],
        }
    }

    fn table() -> Product {
        Product {
            id: 2,
            name: "Table".into(),
            description: None,
            price: dec(300),
            cost: dec(100),
            stock: 0,
            stages: vec![],
        }
    }

    fn order(id: i64, lines: &[(ProductId, i32, Option<i64>)], total: Option<i64>, day: u32) -> Order {
        Order {
            id,
            items: lines
                .iter()
                .enumerate()
                .map(|(i, (product_id, quantity, price))| OrderItem {
                    id: id * 10 + i as i64,
                    order_id: id,
                    product_id: *product_id,
                    quantity: *quantity,
                    price_at_order: price.map(Decimal::from),
                })
                .collect(),
            deadline: at(day),
            status: OrderStatus::Delivered,
            created_by: 1,
            wholesaler_id: None,
            customer_name: None,
            customer_phone: None,
            customer_address: None,
            total_price: total.map(Decimal::from),
            prepayment: Decimal::ZERO,
            payment_method: None,
            created_at: at(day),
            updated_at: at(day),
            delivered_at: Some(at(day)),
        }
    }

    fn log(worker_id: UserId, product_id: ProductId, payment: i64, is_paid: bool, day: u32) -> WorkLogEntry {
        WorkLogEntry {
            id: 0,
            worker_id,
            order_id: None,
            product_id,
            stage_id: 11,
            quantity: 1,
            payment: dec(payment),
            is_paid,
            paid_at: None,
            completed_at: at(day),
        }
    }

    fn worker(id: UserId, name: &str) -> User {
        User {
            id,
            username: name.to_lowercase(),
            email: format!("{}@example.com", name.to_lowercase()),
            full_name: name.into(),
            password_hash: String::new(),
            role: Role::Worker,
            phone: None,
            address: None,
            is_active: true,
            created_at: at(1),
        }
    }

    #[test]
    fn test_cash_report_formulas() {
        let products = vec![chair()];
        let orders = vec![order(1, &[(1, 2, None)], None, 5), order(2, &[(1, 1, None)], Some(90), 6)];
        let logs = vec![log(7, 1, 30, true, 5), log(7, 1, 20, false, 6)];
        let payments = vec![PaymentRecord {
            id: 1,
            worker_id: 7,
            amount: dec(30),
            payment_type: PaymentType::Salary,
            comment: None,
            created_by: None,
            created_at: at(6),
        }];
        let expenses = vec![
            Expense { id: 1, name: None, amount: dec(25), expense_type: ExpenseType::Cost, description: None, product_id: None, created_at: at(5) },
            Expense { id: 2, name: None, amount: dec(5), expense_type: ExpenseType::Other, description: None, product_id: None, created_at: at(5) },
        ];
        let withdrawals = vec![CashWithdrawal { id: 1, amount: dec(10), purpose: None, withdrawn_by: None, created_at: at(6) }];
        let snapshot = LedgerSnapshot {
            products: &products,
            orders: &orders,
            work_logs: &logs,
            payments: &payments,
            expenses: &expenses,
            withdrawals: &withdrawals,
            users: &[],
        };

        let report = cash_report(&snapshot, DateRange::all());
        assert_eq!(report.sales, dec(290));
        assert_eq!(report.cost_of_goods, dec(120));
        assert_eq!(report.total_expenses, dec(30));
        assert_eq!(report.total_salaries, dec(50));
        assert_eq!(report.paid_salaries, dec(30));
        assert_eq!(report.unpaid_salaries, dec(20));
        assert_eq!(report.gross_profit, dec(290 - 120 - 25));
        assert_eq!(report.net_profit, dec(290 - 120 - 25 - 5 - 50));
        assert_eq!(report.cash_balance, dec(290 - 30 - 30 - 10));

        // only day 5
        let day5 = cash_report(&snapshot, DateRange::new(Some(at(5) - Duration::hours(1)), Some(at(5))));
        assert_eq!(day5.sales, dec(200));
        assert_eq!(day5.total_disbursed, Decimal::ZERO);
        assert_eq!(day5.total_withdrawals, Decimal::ZERO);
    }

    #[test]
    fn test_undelivered_orders_are_not_sales() {
        let products = vec![chair()];
        let mut pending = order(1, &[(1, 2, None)], None, 5);
        pending.status = OrderStatus::Done;
        pending.delivered_at = None;
        let orders = vec![pending];
        let snapshot = LedgerSnapshot {
            products: &products,
            orders: &orders,
            work_logs: &[],
            payments: &[],
            expenses: &[],
            withdrawals: &[],
            users: &[],
        };

        assert_eq!(cash_report(&snapshot, DateRange::all()).sales, Decimal::ZERO);
        assert_eq!(sales_report(&snapshot, DateRange::all()).total_orders, 0);
    }

    #[test]
    fn test_sales_report_allocates_negotiated_total() {
        let products = vec![chair(), table()];
        // line values 100 and 300, negotiated down to 200
        let orders = vec![order(1, &[(1, 1, None), (2, 1, None)], Some(200), 5)];
        let snapshot = LedgerSnapshot {
            products: &products,
            orders: &orders,
            work_logs: &[],
            payments: &[],
            expenses: &[],
            withdrawals: &[],
            users: &[],
        };

        let report = sales_report(&snapshot, DateRange::all());
        assert_eq!(report.total_orders, 1);
        assert_eq!(report.total_revenue, dec(200));
        assert_eq!(report.sales_by_product[0].product_name, "Table");
        assert_eq!(report.sales_by_product[0].revenue, dec(150));
        assert_eq!(report.sales_by_product[1].revenue, dec(50));
    }

    #[test]
    fn test_allocation_last_line_absorbs_rounding() {
        let products = vec![chair()];
        let orders = vec![order(1, &[(1, 1, Some(1)), (1, 1, Some(1)), (1, 1, Some(1))], Some(100), 5)];
        let snapshot = LedgerSnapshot {
            products: &products,
            orders: &orders,
            work_logs: &[],
            payments: &[],
            expenses: &[],
            withdrawals: &[],
            users: &[],
        };

        let shares: Vec<Decimal> = snapshot
            .allocate_revenue(&orders[0])
            .into_iter()
            .map(|(_, _, share)| share)
            .collect();
        assert_eq!(shares[0], Decimal::new(3333, 2));
        assert_eq!(shares[1], Decimal::new(3333, 2));
        assert_eq!(shares[2], Decimal::new(3334, 2));
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec(100));
    }

    #[test]
    fn test_worker_report_balance_and_top_product() {
        let products = vec![chair(), table()];
        let users = vec![worker(7, "Alice")];
        let logs = vec![
            log(7, 1, 50, true, 5),
            log(7, 2, 75, false, 5),
            log(7, 2, 25, false, 6),
            log(7, 1, 10, false, 6),
        ];
        let payments = vec![
            PaymentRecord { id: 1, worker_id: 7, amount: dec(50), payment_type: PaymentType::Salary, comment: None, created_by: None, created_at: at(5) },
            PaymentRecord { id: 2, worker_id: 7, amount: dec(40), payment_type: PaymentType::Advance, comment: None, created_by: None, created_at: at(6) },
        ];
        let snapshot = LedgerSnapshot {
            products: &products,
            orders: &[],
            work_logs: &logs,
            payments: &payments,
            expenses: &[],
            withdrawals: &[],
            users: &users,
        };

        let rows = worker_report(&snapshot, DateRange::all());
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.worker_name, "Alice");
        assert_eq!(row.stages_completed, 4);
        assert_eq!(row.total_earned, dec(160));
        assert_eq!(row.total_paid, dec(50));
        assert_eq!(row.total_unpaid, dec(110));
        assert_eq!(row.total_advances, dec(40));
        assert_eq!(row.current_balance, dec(70));
        // two each, Chair sorts first
        assert_eq!(row.top_product.as_deref(), Some("Chair"));
        assert_eq!(row.days_active, 2);
        assert_eq!(row.avg_daily, dec(80));

        // balance stays all-time even for a narrow range
        let day6 = worker_report(&snapshot, DateRange::new(Some(at(6) - Duration::hours(1)), None));
        assert_eq!(day6[0].total_earned, dec(35));
        assert_eq!(day6[0].current_balance, dec(70));
    }

    #[test]
    fn test_dashboard_window_and_rankings() {
        let products = vec![chair(), table()];
        let users = vec![worker(7, "Alice"), worker(8, "Bob")];
        let orders = vec![order(1, &[(1, 2, None)], None, 20), order(2, &[(2, 5, None)], None, 21)];
        let logs = vec![log(7, 1, 1, false, 20), log(8, 1, 1, false, 20), log(8, 1, 1, false, 21)];
        let snapshot = LedgerSnapshot {
            products: &products,
            orders: &orders,
            work_logs: &logs,
            payments: &[],
            expenses: &[],
            withdrawals: &[],
            users: &users,
        };

        let stats = dashboard(&snapshot, at(25));
        assert_eq!(stats.daily_sales.len(), DASHBOARD_DAYS as usize);
        assert_eq!(stats.daily_sales.last().map(|d| d.date), Some(at(25).date_naive()));
        let day20 = stats.daily_sales.iter().find(|d| d.date == at(20).date_naive()).unwrap();
        assert_eq!(day20.amount, dec(200));

        assert_eq!(stats.top_products[0].name, "Table");
        assert_eq!(stats.top_products[0].value, 5);
        assert_eq!(stats.worker_performance[0].name, "Bob");
        assert_eq!(stats.worker_performance[0].value, 2);
    }

    #[test]
    fn test_pipeline_tasks_and_inventory_views() {
        let products = vec![chair(), table()];
        let inventory = vec![
            InventoryRecord { product_id: 1, slot: StageSlot::Holding, quantity: 4 },
            InventoryRecord { product_id: 1, slot: StageSlot::Stage(11), quantity: 2 },
            InventoryRecord { product_id: 1, slot: StageSlot::Stage(12), quantity: 1 },
            InventoryRecord { product_id: 2, slot: StageSlot::Holding, quantity: 0 },
        ];

        let pipeline = pipeline_view(&products, &inventory);
        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline[0].total_wip, 7);
        assert_eq!(pipeline[0].pipeline.len(), 3);
        assert_eq!(pipeline[0].pipeline[0].stage_name, HOLDING_AREA_NAME);
        assert_eq!(pipeline[0].stock, 3);

        let tasks = available_tasks(&products, &inventory);
        // the last stage feeds finished stock, not another task
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].next_stage_name, "Cut");
        assert_eq!(tasks[0].available_quantity, 4);
        assert_eq!(tasks[1].current_stage_name, "Cut");
        assert_eq!(tasks[1].next_stage_name, "Assemble");
        assert_eq!(tasks[1].piece_rate, dec(15));

        let lines = inventory_lines(&products, &inventory);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2].stage_name, "Assemble");
    }
}
