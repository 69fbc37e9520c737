//! Inventory movements between pipeline slots and finished stock
//!
//! These run inside a caller's transaction and take row locks on every
//! quantity they read, so a check-then-write can never race with another
//! writer on the same (product, slot). None of them commit.

use shared::{DomainError, ProductId, StageSlot};

use crate::error::{AppError, AppResult};
use crate::store::StoreTx;

/// Adds units to a slot unconditionally, creating the row on first use
pub async fn add_units(
    tx: &mut dyn StoreTx,
    product_id: ProductId,
    slot: StageSlot,
    quantity: i32,
) -> AppResult<i32> {
    ensure_positive(quantity)?;
    let current = tx.lock_inventory(product_id, slot).await?;
    let updated = current
        .checked_add(quantity)
        .ok_or_else(|| AppError::Internal("inventory quantity overflow".into()))?;
    tx.set_inventory(product_id, slot, updated).await?;

    tracing::debug!(product_id, slot = slot.as_db_id(), quantity, updated, "Inventory added");
    Ok(updated)
}

/// Moves units from one slot to another
///
/// Fails with `InsufficientInventory` carrying the quantity available at
/// `from` when it holds fewer than `quantity` units.
pub async fn move_units(
    tx: &mut dyn StoreTx,
    product_id: ProductId,
    from: StageSlot,
    to: StageSlot,
    quantity: i32,
) -> AppResult<()> {
    take_units(tx, product_id, from, quantity).await?;
    add_units(tx, product_id, to, quantity).await?;
    Ok(())
}

/// Moves units out of the pipeline into the product's finished stock
pub async fn finish_units(
    tx: &mut dyn StoreTx,
    product_id: ProductId,
    from: StageSlot,
    quantity: i32,
) -> AppResult<i32> {
    take_units(tx, product_id, from, quantity).await?;

    let product = tx
        .lock_product(product_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {}", product_id)))?;
    let stock = product
        .stock
        .checked_add(quantity)
        .ok_or_else(|| AppError::Internal("stock overflow".into()))?;
    tx.set_product_stock(product_id, stock).await?;

    Ok(stock)
}

/// Withdraws units from a slot without putting them anywhere else.
/// Only used to compensate an intake that is being undone.
pub async fn remove_units(
    tx: &mut dyn StoreTx,
    product_id: ProductId,
    slot: StageSlot,
    quantity: i32,
) -> AppResult<i32> {
    take_units(tx, product_id, slot, quantity).await
}

/// Consumes finished stock for a delivery
pub async fn take_stock(tx: &mut dyn StoreTx, product_id: ProductId, quantity: i32) -> AppResult<i32> {
    ensure_positive(quantity)?;
    let product = tx
        .lock_product(product_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Product {}", product_id)))?;

    if product.stock < quantity {
        return Err(DomainError::InsufficientStock {
            product_id,
            available: product.stock,
            requested: quantity,
        }
        .into());
    }

    let remaining = product.stock - quantity;
    tx.set_product_stock(product_id, remaining).await?;
    Ok(remaining)
}

async fn take_units(
    tx: &mut dyn StoreTx,
    product_id: ProductId,
    slot: StageSlot,
    quantity: i32,
) -> AppResult<i32> {
    ensure_positive(quantity)?;
    let available = tx.lock_inventory(product_id, slot).await?;
    if available < quantity {
        return Err(DomainError::InsufficientInventory {
            available,
            requested: quantity,
        }
        .into());
    }

    let remaining = available - quantity;
    tx.set_inventory(product_id, slot, remaining).await?;
    Ok(remaining)
}

fn ensure_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity", "Quantity must be positive").into());
    }
    Ok(())
}
