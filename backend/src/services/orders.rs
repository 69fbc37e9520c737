//! Order service: placement, operator transitions, delivery and deletion

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use shared::{
    check_field, validate_price, DomainError, NewOrder, NewOrderItem, Order, OrderFilter, OrderId,
    OrderStatus, ProductId, Role, StageSlot, UserId,
};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::inventory;
use crate::store::{Store, StoreTx};

/// Order service
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
}

/// One line of a new order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineInput {
    pub product_id: ProductId,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
}

/// Input for placing an order
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderInput {
    #[validate(length(min = 1, message = "An order needs at least one line"))]
    pub items: Vec<OrderLineInput>,
    pub deadline: DateTime<Utc>,
    /// Staff may place an order on behalf of a wholesaler
    pub wholesaler_id: Option<UserId>,
    #[validate(length(max = 200))]
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub total_price: Option<Decimal>,
    pub prepayment: Option<Decimal>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusInput {
    pub status: OrderStatus,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Place an order.
    ///
    /// Wholesaler orders wait in `Pending`. Staff orders start `Accepted` and
    /// put every line's quantity into the holding area straight away.
    pub async fn create_order(&self, actor: AuthUser, input: CreateOrderInput) -> AppResult<Order> {
        if !actor.role.can_place_orders() {
            return Err(AppError::forbidden("workers may not place orders"));
        }
        input.validate()?;
        for line in &input.items {
            line.validate()?;
        }
        if let Some(total) = input.total_price {
            check_field("total_price", validate_price(total))?;
        }
        let prepayment = input.prepayment.unwrap_or(Decimal::ZERO);
        check_field("prepayment", validate_price(prepayment))?;

        let mut tx = self.store.begin().await?;

        let wholesaler_id = match actor.role {
            Role::Wholesaler => Some(actor.user_id),
            _ => match input.wholesaler_id {
                Some(id) => Some(check_wholesaler(tx.as_mut(), id).await?),
                None => None,
            },
        };

        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = tx
                .get_product(line.product_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Product {}", line.product_id)))?;
            lines.push(NewOrderItem {
                product_id: product.id,
                quantity: line.quantity,
                price_at_order: Some(product.price),
            });
        }

        let status = OrderStatus::initial_for(actor.role);
        let order = tx
            .insert_order(
                &NewOrder {
                    deadline: input.deadline,
                    status,
                    created_by: actor.user_id,
                    wholesaler_id,
                    customer_name: input.customer_name,
                    customer_phone: input.customer_phone,
                    customer_address: input.customer_address,
                    total_price: input.total_price,
                    prepayment,
                    payment_method: input.payment_method,
                },
                &lines,
            )
            .await?;

        if status == OrderStatus::Accepted {
            intake_order(tx.as_mut(), &order).await?;
        }
        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            created_by = actor.user_id,
            status = %order.status,
            lines = order.items.len(),
            quantity = order.total_quantity(),
            "Order created"
        );
        Ok(order)
    }

    /// Orders visible to the caller, newest first
    pub async fn list_orders(
        &self,
        actor: AuthUser,
        status: Option<OrderStatus>,
    ) -> AppResult<Vec<Order>> {
        let mut filter = OrderFilter {
            status,
            ..OrderFilter::default()
        };
        match actor.role {
            Role::Admin | Role::Manager => {}
            // workers only see what is on the shop floor
            Role::Worker => filter.status = Some(OrderStatus::InProgress),
            Role::Wholesaler => filter.wholesaler_id = Some(actor.user_id),
        }

        let mut tx = self.store.begin().await?;
        let orders = tx.list_orders(&filter).await?;
        tracing::debug!(count = orders.len(), role = %actor.role, "Listed orders");
        Ok(orders)
    }

    pub async fn get_order(&self, actor: AuthUser, id: OrderId) -> AppResult<Order> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {}", id)))?;

        if actor.role == Role::Wholesaler && order.wholesaler_id != Some(actor.user_id) {
            return Err(AppError::forbidden("order belongs to another wholesaler"));
        }
        Ok(order)
    }

    /// Operator-driven status change.
    ///
    /// Accepting a pending order takes its lines into the holding area;
    /// delivering consumes finished stock for every line and stamps the
    /// delivery time. `Done` is only ever reached through stage completions.
    pub async fn update_status(
        &self,
        actor: AuthUser,
        id: OrderId,
        input: UpdateOrderStatusInput,
    ) -> AppResult<Order> {
        actor.require_staff("change order status")?;

        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {}", id)))?;

        let target = input.status;
        if let Err(err) = order.status.check_operator_transition(target) {
            tracing::warn!(order_id = id, from = %order.status, to = %target, "Rejected order transition");
            return Err(err.into());
        }

        let mut delivered_at = None;
        if target.triggers_intake_from(order.status) {
            intake_order(tx.as_mut(), &order).await?;
        }
        if target == OrderStatus::Delivered {
            for (product_id, quantity) in sorted_lines(&order) {
                inventory::take_stock(tx.as_mut(), product_id, quantity).await?;
            }
            delivered_at = Some(Utc::now());
        }

        tx.update_order_status(id, target, delivered_at).await?;
        let updated = tx
            .get_order(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {}", id)))?;
        tx.commit().await?;

        tracing::info!(
            order_id = id,
            from = %order.status,
            to = %target,
            changed_by = actor.user_id,
            "Order status changed"
        );
        Ok(updated)
    }

    /// Delete an order whose inventory effects can still be undone.
    ///
    /// Pending orders never moved anything. Accepted orders without work
    /// logs give their intake back out of the holding area. Anything further
    /// along has moved units through the pipeline and is kept.
    pub async fn delete_order(&self, actor: AuthUser, id: OrderId) -> AppResult<()> {
        actor.require_staff("delete orders")?;

        let mut tx = self.store.begin().await?;
        let order = tx
            .lock_order(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Order {}", id)))?;

        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Accepted => {
                if tx.count_work_logs_for_order(id).await? > 0 {
                    return Err(DomainError::conflict(
                        "order",
                        "Order already has recorded production work",
                    )
                    .into());
                }
                for (product_id, quantity) in sorted_lines(&order) {
                    tx.lock_product(product_id).await?;
                    inventory::remove_units(tx.as_mut(), product_id, StageSlot::Holding, quantity)
                        .await?;
                }
            }
            status => {
                return Err(DomainError::conflict(
                    "order",
                    format!("Order in status {} can no longer be deleted", status),
                )
                .into());
            }
        }

        tx.delete_order(id).await?;
        tx.commit().await?;

        tracing::info!(order_id = id, status = %order.status, deleted_by = actor.user_id, "Order deleted");
        Ok(())
    }
}

/// Line quantities per product, in product id order so that row locks are
/// always taken in the same sequence
fn sorted_lines(order: &Order) -> Vec<(ProductId, i32)> {
    let mut lines: Vec<(ProductId, i32)> = order
        .quantity_by_product()
        .into_iter()
        .map(|(product_id, qty)| (product_id, i32::try_from(qty).unwrap_or(i32::MAX)))
        .collect();
    lines.sort_by_key(|(product_id, _)| *product_id);
    lines
}

async fn intake_order(tx: &mut dyn StoreTx, order: &Order) -> AppResult<()> {
    for (product_id, quantity) in sorted_lines(order) {
        tx.lock_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {}", product_id)))?;
        inventory::add_units(tx, product_id, StageSlot::Holding, quantity).await?;
    }
    tracing::debug!(order_id = order.id, "Order intake added to holding area");
    Ok(())
}

async fn check_wholesaler(tx: &mut dyn StoreTx, id: UserId) -> AppResult<UserId> {
    match tx.get_user(id).await? {
        Some(user) if user.role == Role::Wholesaler => Ok(user.id),
        Some(_) => Err(DomainError::validation("wholesaler_id", "User is not a wholesaler").into()),
        None => Err(DomainError::validation(
            "wholesaler_id",
            format!("User {} does not exist", id),
        )
        .into()),
    }
}
