//! Work log ledger entries

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DateRange, OrderId, Pagination, ProductId, StageId, UserId, WorkLogId};

/// One stage completion by a worker. Only the paid flag and paid time ever change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLogEntry {
    pub id: WorkLogId,
    pub worker_id: UserId,
    pub order_id: Option<OrderId>,
    pub product_id: ProductId,
    pub stage_id: StageId,
    pub quantity: i32,
    /// quantity × piece rate at completion time
    pub payment: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkLog {
    pub worker_id: UserId,
    pub order_id: Option<OrderId>,
    pub product_id: ProductId,
    pub stage_id: StageId,
    pub quantity: i32,
    pub payment: Decimal,
}

/// Listing filter for the work log ledger
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkLogFilter {
    pub worker_id: Option<UserId>,
    pub order_id: Option<OrderId>,
    pub product_id: Option<ProductId>,
    pub is_paid: Option<bool>,
    pub completed: DateRange,
    #[serde(default)]
    pub page: Pagination,
}

impl WorkLogFilter {
    pub fn for_worker(worker_id: UserId) -> Self {
        Self {
            worker_id: Some(worker_id),
            page: Pagination {
                offset: 0,
                limit: u32::MAX,
            },
            ..Default::default()
        }
    }

    pub fn matches(&self, entry: &WorkLogEntry) -> bool {
        self.worker_id.map_or(true, |id| entry.worker_id == id)
            && self.order_id.map_or(true, |id| entry.order_id == Some(id))
            && self.product_id.map_or(true, |id| entry.product_id == id)
            && self.is_paid.map_or(true, |paid| entry.is_paid == paid)
            && self.completed.contains(entry.completed_at)
    }
}
