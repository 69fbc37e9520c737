//! Common types used across the platform

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ProductId = i64;
pub type StageId = i64;
pub type OrderId = i64;
pub type OrderItemId = i64;
pub type WorkLogId = i64;
pub type PaymentId = i64;
pub type ExpenseId = i64;
pub type WithdrawalId = i64;

/// A place inside a product's production pipeline where WIP units can sit.
///
/// `Holding` is the implicit pre-production area ("stage 0"). It is never a
/// stored stage; it only exists as an inventory key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "stage_id")]
pub enum StageSlot {
    Holding,
    Stage(StageId),
}

impl StageSlot {
    /// Storage key for the slot: 0 for the holding area, the stage id otherwise.
    pub fn as_db_id(&self) -> i64 {
        match self {
            StageSlot::Holding => 0,
            StageSlot::Stage(id) => *id,
        }
    }

    pub fn from_db_id(id: i64) -> Self {
        if id == 0 {
            StageSlot::Holding
        } else {
            StageSlot::Stage(id)
        }
    }

    pub fn stage_id(&self) -> Option<StageId> {
        match self {
            StageSlot::Holding => None,
            StageSlot::Stage(id) => Some(*id),
        }
    }
}

impl From<Option<StageId>> for StageSlot {
    fn from(stage: Option<StageId>) -> Self {
        stage.map_or(StageSlot::Holding, StageSlot::Stage)
    }
}

/// Offset/limit pagination parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

impl Pagination {
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Inclusive time range for ledger queries. Open on either side when unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        Self { from, to }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at <= to)
    }

    /// Like `contains`, but a missing timestamp only matches an unbounded range.
    pub fn contains_opt(&self, at: Option<DateTime<Utc>>) -> bool {
        match at {
            Some(at) => self.contains(at),
            None => self.from.is_none() && self.to.is_none(),
        }
    }
}
