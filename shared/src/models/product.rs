//! Product catalogue and production stage models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, StageId};

/// A manufactured product with its ordered production stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    /// Finished-goods count, fed by last-stage completions and drained by deliveries
    pub stock: i32,
    pub stages: Vec<Stage>,
}

/// One step of a product's pipeline, paid per unit completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub product_id: ProductId,
    pub name: String,
    /// 1-based, dense and unique within a product
    pub position: i32,
    pub piece_rate: Decimal,
}

/// Stage definition as submitted when creating or editing a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInput {
    pub name: String,
    pub position: i32,
    pub piece_rate: Decimal,
}

/// Product row fields without stages or stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
}

/// Partial product update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
}

impl ProductPatch {
    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(cost) = self.cost {
            product.cost = cost;
        }
    }
}
