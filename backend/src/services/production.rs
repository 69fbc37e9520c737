//! Production service: stage completions, intake and pipeline views

use std::sync::Arc;

use serde::Deserialize;
use validator::Validate;

use shared::reports::{available_tasks, inventory_lines, pipeline_view};
use shared::{
    piece_payment, AvailableTask, DomainError, InventoryLine, NewWorkLog, Order, OrderId,
    OrderStatus, ProductId, ProductPipeline, Role, SalarySummary, StageId, StageSlot,
    StageTopology, WorkLogEntry, WorkLogFilter,
};

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use crate::services::inventory;
use crate::store::{Store, StoreTx};

/// Production service
#[derive(Clone)]
pub struct ProductionService {
    store: Arc<dyn Store>,
}

/// A worker reporting units completed at a stage
#[derive(Debug, Deserialize, Validate)]
pub struct RecordCompletionInput {
    pub product_id: ProductId,
    pub stage_id: StageId,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
    pub order_id: Option<OrderId>,
}

/// A new batch of raw units entering the holding area
#[derive(Debug, Deserialize, Validate)]
pub struct IntakeInput {
    pub product_id: ProductId,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
}

impl ProductionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record units completed at a stage.
    ///
    /// Units move from the slot feeding the stage into the stage; completing
    /// the last stage sends them on into finished stock. The worker accrues
    /// `quantity × piece_rate` as an unpaid ledger entry. Everything happens
    /// in one transaction: an inventory shortfall leaves no trace.
    pub async fn record_completion(
        &self,
        actor: AuthUser,
        input: RecordCompletionInput,
    ) -> AppResult<WorkLogEntry> {
        actor.require_any(&[Role::Worker], "record stage completions")?;
        input.validate()?;

        let mut tx = self.store.begin().await?;

        let order = match input.order_id {
            Some(order_id) => Some(lock_linked_order(tx.as_mut(), order_id, input.product_id).await?),
            None => None,
        };

        let product = tx
            .lock_product(input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {}", input.product_id)))?;
        let topology = StageTopology::new(product.stages.clone())?;
        let stage = topology
            .stage(input.stage_id)
            .cloned()
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Stage {} of product {}",
                    input.stage_id, input.product_id
                ))
            })?;

        let from = topology.previous(stage.id)?;
        inventory::move_units(
            tx.as_mut(),
            product.id,
            from,
            StageSlot::Stage(stage.id),
            input.quantity,
        )
        .await?;

        let is_last = topology.is_last(stage.id);
        if is_last {
            inventory::finish_units(tx.as_mut(), product.id, StageSlot::Stage(stage.id), input.quantity)
                .await?;
        }

        let entry = tx
            .insert_work_log(&NewWorkLog {
                worker_id: actor.user_id,
                order_id: input.order_id,
                product_id: product.id,
                stage_id: stage.id,
                quantity: input.quantity,
                payment: piece_payment(input.quantity, stage.piece_rate),
            })
            .await?;

        if let (Some(order), true) = (order, is_last) {
            latch_done(tx.as_mut(), &order).await?;
        }

        tx.commit().await?;

        tracing::info!(
            work_log_id = entry.id,
            worker_id = actor.user_id,
            product_id = product.id,
            stage_id = stage.id,
            quantity = input.quantity,
            payment = %entry.payment,
            finished = is_last,
            "Stage completion recorded"
        );
        Ok(entry)
    }

    /// Put a new production batch into the holding area
    pub async fn intake(&self, actor: AuthUser, input: IntakeInput) -> AppResult<ProductPipeline> {
        actor.require_staff("add production batches")?;
        input.validate()?;

        let mut tx = self.store.begin().await?;
        let product = tx
            .lock_product(input.product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {}", input.product_id)))?;
        inventory::add_units(tx.as_mut(), product.id, StageSlot::Holding, input.quantity).await?;

        let records = tx.list_inventory().await?;
        tx.commit().await?;

        tracing::info!(
            product_id = product.id,
            quantity = input.quantity,
            added_by = actor.user_id,
            "Production batch added"
        );

        pipeline_view(std::slice::from_ref(&product), &records)
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal("intake left no work in progress".into()))
    }

    /// Ledger entries; workers only ever see their own
    pub async fn list_work_logs(
        &self,
        actor: AuthUser,
        mut filter: WorkLogFilter,
    ) -> AppResult<Vec<WorkLogEntry>> {
        actor.require_any(&[Role::Admin, Role::Manager, Role::Worker], "view work logs")?;
        if actor.role == Role::Worker {
            filter.worker_id = Some(actor.user_id);
        }

        let mut tx = self.store.begin().await?;
        let logs = tx.list_work_logs(&filter).await?;
        tracing::debug!(count = logs.len(), "Listed work logs");
        Ok(logs)
    }

    /// Pay overview for the calling worker
    pub async fn my_salary(&self, actor: AuthUser) -> AppResult<SalarySummary> {
        actor.require_any(&[Role::Worker], "view a salary summary")?;

        let mut tx = self.store.begin().await?;
        let logs = tx.list_work_logs(&WorkLogFilter::for_worker(actor.user_id)).await?;
        let payments = tx.list_payments(Some(actor.user_id)).await?;
        Ok(SalarySummary::build(&logs, &payments))
    }

    pub async fn pipeline(&self, _actor: AuthUser) -> AppResult<Vec<ProductPipeline>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        let records = tx.list_inventory().await?;
        Ok(pipeline_view(&products, &records))
    }

    pub async fn tasks(&self, _actor: AuthUser) -> AppResult<Vec<AvailableTask>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        let records = tx.list_inventory().await?;
        Ok(available_tasks(&products, &records))
    }

    pub async fn inventory(&self, _actor: AuthUser) -> AppResult<Vec<InventoryLine>> {
        let mut tx = self.store.begin().await?;
        let products = tx.list_products().await?;
        let records = tx.list_inventory().await?;
        Ok(inventory_lines(&products, &records))
    }
}

async fn lock_linked_order(
    tx: &mut dyn StoreTx,
    order_id: OrderId,
    product_id: ProductId,
) -> AppResult<Order> {
    let order = tx
        .lock_order(order_id)
        .await?
        .ok_or_else(|| DomainError::validation("order_id", format!("Order {} does not exist", order_id)))?;

    if !order.items.iter().any(|item| item.product_id == product_id) {
        return Err(DomainError::validation(
            "order_id",
            format!("Order {} does not include product {}", order_id, product_id),
        )
        .into());
    }
    Ok(order)
}

/// Moves an in-progress order to `Done` once every line has been completed
/// at its product's last stage. Recounts the order's ledger entries each time.
pub(crate) async fn latch_done(tx: &mut dyn StoreTx, order: &Order) -> AppResult<bool> {
    if order.status != OrderStatus::InProgress {
        return Ok(false);
    }

    for (product_id, ordered) in order.quantity_by_product() {
        let product = tx
            .get_product(product_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Product {}", product_id)))?;
        let topology = StageTopology::new(product.stages)?;
        let Some(last) = topology.last() else {
            return Ok(false);
        };
        if tx.completed_quantity(order.id, last.id).await? < ordered {
            return Ok(false);
        }
    }

    tx.update_order_status(order.id, OrderStatus::Done, None).await?;
    tracing::info!(order_id = order.id, "Order completed");
    Ok(true)
}
