//! Order models and the order status machine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Role;
use crate::error::{DomainError, DomainResult};
use crate::types::{OrderId, OrderItemId, ProductId, UserId};

/// Order lifecycle: Pending → Accepted → InProgress → Done → Delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Accepted,
    InProgress,
    Done,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Done => "done",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Wholesalers place requests that staff must accept; staff orders skip Pending.
    pub fn initial_for(role: Role) -> Self {
        match role {
            Role::Wholesaler => OrderStatus::Pending,
            _ => OrderStatus::Accepted,
        }
    }

    /// Checks an operator-requested transition.
    ///
    /// Done is only ever set by the production latch, and Pending can only be
    /// left towards Accepted so that stage-0 intake always happens.
    pub fn check_operator_transition(self, target: OrderStatus) -> DomainResult<()> {
        let allowed = match (self, target) {
            (_, OrderStatus::Done) | (_, OrderStatus::Pending) => false,
            (OrderStatus::Pending, OrderStatus::Accepted) => true,
            (OrderStatus::Pending, _) => false,
            (from, to) => to > from,
        };

        if allowed {
            Ok(())
        } else {
            Err(DomainError::InvalidStateTransition(format!(
                "cannot move order from {} to {}",
                self, target
            )))
        }
    }

    /// Whether reaching this status from `from` performs the stage-0 intake.
    pub fn triggers_intake_from(self, from: OrderStatus) -> bool {
        from == OrderStatus::Pending && self == OrderStatus::Accepted
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "accepted" => Ok(OrderStatus::Accepted),
            "in_progress" => Ok(OrderStatus::InProgress),
            "done" => Ok(OrderStatus::Done),
            "delivered" => Ok(OrderStatus::Delivered),
            other => Err(DomainError::validation(
                "status",
                format!("unknown order status '{}'", other),
            )),
        }
    }
}

/// A customer order with one or more line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub deadline: DateTime<Utc>,
    pub status: OrderStatus,
    pub created_by: UserId,
    pub wholesaler_id: Option<UserId>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    /// Negotiated total; overrides the sum of line values in sales figures
    pub total_price: Option<Decimal>,
    pub prepayment: Decimal,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// First line item, the one legacy single-product orders carried
    pub fn primary_item(&self) -> Option<&OrderItem> {
        self.items.first()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// Ordered quantity per product, summing repeated lines
    pub fn quantity_by_product(&self) -> Vec<(ProductId, i64)> {
        let mut totals: Vec<(ProductId, i64)> = Vec::new();
        for item in &self.items {
            match totals.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, qty)) => *qty += i64::from(item.quantity),
                None => totals.push((item.product_id, i64::from(item.quantity))),
            }
        }
        totals
    }
}

/// A product line of an order with its price frozen at order time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub price_at_order: Option<Decimal>,
}

/// Line item as requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: ProductId,
    pub quantity: i32,
    pub price_at_order: Option<Decimal>,
}

/// Order header fields ready to be stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub deadline: DateTime<Utc>,
    pub status: OrderStatus,
    pub created_by: UserId,
    pub wholesaler_id: Option<UserId>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub total_price: Option<Decimal>,
    pub prepayment: Decimal,
    pub payment_method: Option<String>,
}

/// Query filter for order listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub wholesaler_id: Option<UserId>,
    pub delivered: Option<crate::types::DateRange>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.status.map_or(true, |status| order.status == status)
            && self
                .wholesaler_id
                .map_or(true, |id| order.wholesaler_id == Some(id))
            && self
                .delivered
                .map_or(true, |range| range.contains_opt(order.delivered_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_by_role() {
        assert_eq!(OrderStatus::initial_for(Role::Wholesaler), OrderStatus::Pending);
        assert_eq!(OrderStatus::initial_for(Role::Manager), OrderStatus::Accepted);
        assert_eq!(OrderStatus::initial_for(Role::Admin), OrderStatus::Accepted);
    }

    #[test]
    fn test_operator_transitions() {
        use OrderStatus::*;

        assert!(Pending.check_operator_transition(Accepted).is_ok());
        assert!(Accepted.check_operator_transition(InProgress).is_ok());
        assert!(Accepted.check_operator_transition(Delivered).is_ok());
        assert!(InProgress.check_operator_transition(Delivered).is_ok());
        assert!(Done.check_operator_transition(Delivered).is_ok());

        assert!(Pending.check_operator_transition(InProgress).is_err());
        assert!(Pending.check_operator_transition(Delivered).is_err());
        assert!(InProgress.check_operator_transition(Done).is_err());
        assert!(InProgress.check_operator_transition(Accepted).is_err());
        assert!(Delivered.check_operator_transition(Delivered).is_err());
        assert!(Accepted.check_operator_transition(Pending).is_err());
    }

    #[test]
    fn test_intake_only_when_leaving_pending() {
        assert!(OrderStatus::Accepted.triggers_intake_from(OrderStatus::Pending));
        assert!(!OrderStatus::InProgress.triggers_intake_from(OrderStatus::Accepted));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Accepted,
            OrderStatus::InProgress,
            OrderStatus::Done,
            OrderStatus::Delivered,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<OrderStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&OrderStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
