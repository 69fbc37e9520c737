//! Product catalogue service
//!
//! Products own an ordered list of stages. Stage lists are edited by
//! position: a position that survives an edit keeps its stage id, so
//! inventory rows and work logs attached to it stay valid.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use shared::{
    check_field, plan_stage_update, validate_price, validate_stage_inputs, DomainError, NewProduct,
    Product, ProductId, ProductPatch, StageInput, StageSlot,
};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::store::{Store, StoreTx};

/// Product service
#[derive(Clone)]
pub struct ProductService {
    store: Arc<dyn Store>,
}

/// One stage of a submitted stage list
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StageRequest {
    #[validate(length(min = 1, max = 100, message = "Stage name is required"))]
    pub name: String,
    pub position: i32,
    pub piece_rate: Decimal,
}

impl From<StageRequest> for StageInput {
    fn from(req: StageRequest) -> Self {
        StageInput {
            name: req.name,
            position: req.position,
            piece_rate: req.piece_rate,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub stages: Vec<StageRequest>,
}

/// Input for updating a product. `stages`, when present, replaces the list.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub stages: Option<Vec<StageRequest>>,
}

impl ProductService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a product together with its stages
    pub async fn create_product(
        &self,
        actor: AuthUser,
        input: CreateProductInput,
    ) -> AppResult<Product> {
        actor.require_staff("create products")?;
        input.validate()?;
        for stage in &input.stages {
            stage.validate()?;
        }
        check_field("price", validate_price(input.price))?;
        check_field("cost", validate_price(input.cost))?;

        let stages: Vec<StageInput> = input.stages.into_iter().map(StageInput::from).collect();
        validate_stage_inputs(&stages)?;

        let mut tx = self.store.begin().await?;
        if tx.find_product_by_name(&input.name).await?.is_some() {
            return Err(name_taken(&input.name));
        }

        let product = tx
            .insert_product(&NewProduct {
                name: input.name,
                description: input.description,
                price: input.price,
                cost: input.cost,
            })
            .await?;
        for stage in &stages {
            tx.insert_stage(product.id, stage).await?;
        }
        let product = reload(tx.as_mut(), product.id).await?;
        tx.commit().await?;

        tracing::info!(
            product_id = product.id,
            name = %product.name,
            stages = product.stages.len(),
            "Product created"
        );
        Ok(product)
    }

    pub async fn get_product(&self, _actor: AuthUser, id: ProductId) -> AppResult<Product> {
        let mut tx = self.store.begin().await?;
        reload(tx.as_mut(), id).await
    }

    pub async fn list_products(&self, _actor: AuthUser) -> AppResult<Vec<Product>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        tracing::debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Update product fields and, optionally, its stage list
    pub async fn update_product(
        &self,
        actor: AuthUser,
        id: ProductId,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        actor.require_staff("update products")?;
        input.validate()?;
        for stage in input.stages.iter().flatten() {
            stage.validate()?;
        }
        if let Some(price) = input.price {
            check_field("price", validate_price(price))?;
        }
        if let Some(cost) = input.cost {
            check_field("cost", validate_price(cost))?;
        }

        let mut tx = self.store.begin().await?;
        let mut product = tx
            .lock_product(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {}", id)))?;

        if let Some(name) = &input.name {
            if name != &product.name {
                if let Some(other) = tx.find_product_by_name(name).await? {
                    if other.id != id {
                        return Err(name_taken(name));
                    }
                }
            }
        }

        let patch = ProductPatch {
            name: input.name,
            description: input.description,
            price: input.price,
            cost: input.cost,
        };
        patch.apply(&mut product);
        tx.update_product(&product).await?;

        if let Some(stages) = input.stages {
            let desired: Vec<StageInput> = stages.into_iter().map(StageInput::from).collect();
            let plan = plan_stage_update(&product.stages, &desired)?;

            for stage_id in &plan.remove {
                let held = tx.lock_inventory(id, StageSlot::Stage(*stage_id)).await?;
                if held > 0 {
                    return Err(DomainError::conflict(
                        "stages",
                        format!("Stage {} still holds {} units in progress", stage_id, held),
                    )
                    .into());
                }
                if tx.count_work_logs_for_stage(*stage_id).await? > 0 {
                    return Err(DomainError::conflict(
                        "stages",
                        format!("Stage {} is referenced by work logs", stage_id),
                    )
                    .into());
                }
            }

            // A kept stage that becomes the last one must be empty
            let current_last = product.stages.iter().max_by_key(|s| s.position).map(|s| s.id);
            let new_last = plan
                .update
                .iter()
                .map(|(stage_id, stage)| (*stage_id, stage.position))
                .max_by_key(|(_, position)| *position)
                .filter(|(_, position)| plan.insert.iter().all(|s| s.position < *position))
                .map(|(stage_id, _)| stage_id);
            if let Some(stage_id) = new_last.filter(|last| Some(*last) != current_last) {
                let held = tx.lock_inventory(id, StageSlot::Stage(stage_id)).await?;
                if held > 0 {
                    return Err(DomainError::conflict(
                        "stages",
                        format!(
                            "Stage {} would become the last stage while holding {} units in progress",
                            stage_id, held
                        ),
                    )
                    .into());
                }
            }

            // Removals first so that freed positions can be reused by inserts
            for stage_id in &plan.remove {
                tx.delete_stage(*stage_id).await?;
            }
            for (stage_id, stage) in &plan.update {
                tx.update_stage(*stage_id, stage).await?;
            }
            for stage in &plan.insert {
                tx.insert_stage(id, stage).await?;
            }

            tracing::info!(
                product_id = id,
                updated = plan.update.len(),
                inserted = plan.insert.len(),
                removed = plan.remove.len(),
                "Product stages replaced"
            );
        }

        let product = reload(tx.as_mut(), id).await?;
        tx.commit().await?;

        tracing::info!(product_id = id, "Product updated");
        Ok(product)
    }

    /// Delete a product that no order or work log refers to
    pub async fn delete_product(&self, actor: AuthUser, id: ProductId) -> AppResult<()> {
        actor.require_staff("delete products")?;

        let mut tx = self.store.begin().await?;
        tx.lock_product(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {}", id)))?;

        if tx.count_order_items_for_product(id).await? > 0 {
            return Err(DomainError::conflict("product", "Product is referenced by orders").into());
        }
        if tx.count_work_logs_for_product(id).await? > 0 {
            return Err(
                DomainError::conflict("product", "Product is referenced by work logs").into(),
            );
        }

        tx.delete_product(id).await?;
        tx.commit().await?;

        tracing::info!(product_id = id, deleted_by = actor.user_id, "Product deleted");
        Ok(())
    }
}

async fn reload(tx: &mut dyn StoreTx, id: ProductId) -> AppResult<Product> {
    tx.get_product(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {}", id)))
}

fn name_taken(name: &str) -> AppError {
    DomainError::conflict("name", format!("Product '{}' already exists", name)).into()
}
