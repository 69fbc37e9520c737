//! Work-in-progress inventory models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, StageId, StageSlot};

/// Quantity of a product sitting at one slot of its pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub product_id: ProductId,
    pub slot: StageSlot,
    pub quantity: i32,
}

/// One column of the pipeline view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub slot: StageSlot,
    pub stage_name: String,
    pub position: i32,
    pub piece_rate: Option<Decimal>,
    pub quantity: i32,
}

/// WIP distribution of a single product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPipeline {
    pub product_id: ProductId,
    pub product_name: String,
    pub stock: i32,
    pub total_wip: i64,
    pub pipeline: Vec<PipelineStage>,
}

/// Work that can be picked up: units waiting in front of `next_stage_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableTask {
    pub product_id: ProductId,
    pub product_name: String,
    pub current_slot: StageSlot,
    pub current_stage_name: String,
    pub next_stage_id: StageId,
    pub next_stage_name: String,
    pub piece_rate: Decimal,
    pub available_quantity: i32,
}

/// Flat inventory row with resolved names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub slot: StageSlot,
    pub stage_name: String,
    pub quantity: i32,
}

/// Display name of the holding area
pub const HOLDING_AREA_NAME: &str = "Holding area";
