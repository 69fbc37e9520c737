//! Order lifecycle tests
//!
//! Tests for orders including:
//! - Holding-area intake when an order is accepted
//! - Operator transitions and the completion-driven Done latch
//! - Delivery against finished stock
//! - Which orders may still be deleted

mod common;

use common::{order_input, Harness};
use production_backend::services::orders::UpdateOrderStatusInput;
use production_backend::services::production::RecordCompletionInput;
use production_backend::AppResult;
use shared::{DomainError, Order, OrderStatus, StageSlot};

async fn set_status(h: &Harness, order_id: i64, status: OrderStatus) -> AppResult<Order> {
    h.orders()
        .update_status(h.manager, order_id, UpdateOrderStatusInput { status })
        .await
}

// ============================================================================
// Placement and intake
// ============================================================================

#[tokio::test]
async fn test_staff_order_starts_accepted_with_intake() {
    let h = Harness::new().await;
    let chair = h.chair().await;

    let order = h.staff_order(&[(chair.id, 5)]).await;

    assert_eq!(order.status, OrderStatus::Accepted);
    assert_eq!(order.items[0].price_at_order, Some(chair.price));
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 5);
}

#[tokio::test]
async fn test_wholesaler_order_waits_for_acceptance() {
    let h = Harness::new().await;
    let chair = h.chair().await;

    let order = h
        .orders()
        .create_order(h.wholesaler, order_input(&[(chair.id, 4)]))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.wholesaler_id, Some(h.wholesaler.user_id));
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 0);

    let accepted = set_status(&h, order.id, OrderStatus::Accepted).await.unwrap();
    assert_eq!(accepted.status, OrderStatus::Accepted);
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 4);
}

#[tokio::test]
async fn test_every_line_is_taken_in() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let table = h.product("Table", &[("Plane", 20)]).await;

    h.staff_order(&[(chair.id, 2), (table.id, 3)]).await;

    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 2);
    assert_eq!(h.quantity_at(table.id, StageSlot::Holding).await, 3);
}

#[tokio::test]
async fn test_workers_cannot_place_orders() {
    let h = Harness::new().await;
    let chair = h.chair().await;

    let err = h
        .orders()
        .create_order(h.worker, order_input(&[(chair.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
}

#[tokio::test]
async fn test_order_visibility_by_role() {
    let h = Harness::new().await;
    let chair = h.chair().await;

    let mine = h
        .orders()
        .create_order(h.wholesaler, order_input(&[(chair.id, 1)]))
        .await
        .unwrap();
    let staff = h.staff_order(&[(chair.id, 2)]).await;
    set_status(&h, staff.id, OrderStatus::InProgress).await.unwrap();

    let wholesaler_view = h.orders().list_orders(h.wholesaler, None).await.unwrap();
    assert_eq!(wholesaler_view.len(), 1);
    assert_eq!(wholesaler_view[0].id, mine.id);

    let worker_view = h.orders().list_orders(h.worker, None).await.unwrap();
    assert_eq!(worker_view.len(), 1);
    assert_eq!(worker_view[0].id, staff.id);

    assert_eq!(h.orders().list_orders(h.admin, None).await.unwrap().len(), 2);

    let err = h.orders().get_order(h.wholesaler, staff.id).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn test_done_is_never_an_operator_target() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 1)]).await;
    set_status(&h, order.id, OrderStatus::InProgress).await.unwrap();

    let err = set_status(&h, order.id, OrderStatus::Done).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::InvalidStateTransition(_))));

    let err = set_status(&h, order.id, OrderStatus::Accepted).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::InvalidStateTransition(_))));

    assert_eq!(h.order(order.id).await.status, OrderStatus::InProgress);
}

#[tokio::test]
async fn test_only_staff_change_status() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 1)]).await;

    for actor in [h.worker, h.wholesaler] {
        let err = h
            .orders()
            .update_status(
                actor,
                order.id,
                UpdateOrderStatusInput {
                    status: OrderStatus::InProgress,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
    }
}

#[tokio::test]
async fn test_delivery_without_stock_fails_and_keeps_state() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 5)]).await;
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 5);

    let err = set_status(&h, order.id, OrderStatus::Delivered).await.unwrap_err();
    assert_eq!(
        err.domain(),
        Some(&DomainError::InsufficientStock {
            product_id: chair.id,
            available: 0,
            requested: 5
        })
    );

    let after = h.order(order.id).await;
    assert_eq!(after.status, OrderStatus::Accepted);
    assert!(after.delivered_at.is_none());
    assert_eq!(h.stock(chair.id).await, 0);
}

#[tokio::test]
async fn test_completions_latch_done_then_delivery_consumes_stock() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 5)]).await;
    set_status(&h, order.id, OrderStatus::InProgress).await.unwrap();

    h.complete(h.worker, &chair, 0, 5, Some(order.id)).await;
    h.complete(h.worker, &chair, 1, 3, Some(order.id)).await;
    assert_eq!(h.order(order.id).await.status, OrderStatus::InProgress);

    h.complete(h.other_worker, &chair, 1, 2, Some(order.id)).await;
    assert_eq!(h.order(order.id).await.status, OrderStatus::Done);
    assert_eq!(h.stock(chair.id).await, 5);

    let delivered = set_status(&h, order.id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert!(delivered.delivered_at.is_some());
    assert_eq!(h.stock(chair.id).await, 0);
}

#[tokio::test]
async fn test_latch_ignores_orders_not_in_progress() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 2)]).await;

    h.complete(h.worker, &chair, 0, 2, Some(order.id)).await;
    h.complete(h.worker, &chair, 1, 2, Some(order.id)).await;

    assert_eq!(h.order(order.id).await.status, OrderStatus::Accepted);
}

#[tokio::test]
async fn test_latch_waits_for_every_line() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let table = h.product("Table", &[("Plane", 20)]).await;
    let order = h.staff_order(&[(chair.id, 1), (table.id, 1)]).await;
    set_status(&h, order.id, OrderStatus::InProgress).await.unwrap();

    h.complete(h.worker, &chair, 0, 1, Some(order.id)).await;
    h.complete(h.worker, &chair, 1, 1, Some(order.id)).await;
    assert_eq!(h.order(order.id).await.status, OrderStatus::InProgress);

    h.complete(h.worker, &table, 0, 1, Some(order.id)).await;
    assert_eq!(h.order(order.id).await.status, OrderStatus::Done);
}

#[tokio::test]
async fn test_completion_linked_to_unrelated_order_is_rejected() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let table = h.product("Table", &[("Plane", 20)]).await;
    let order = h.staff_order(&[(table.id, 1)]).await;
    h.intake(chair.id, 1).await;

    let err = h
        .production()
        .record_completion(
            h.worker,
            RecordCompletionInput {
                product_id: chair.id,
                stage_id: chair.stages[0].id,
                quantity: 1,
                order_id: Some(order.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Validation { .. })));
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 1);
}

// ============================================================================
// Deletion
// ============================================================================

#[tokio::test]
async fn test_pending_order_is_deleted_outright() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h
        .orders()
        .create_order(h.wholesaler, order_input(&[(chair.id, 3)]))
        .await
        .unwrap();

    h.orders().delete_order(h.manager, order.id).await.unwrap();
    let err = h.orders().get_order(h.admin, order.id).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::NotFound(_))));
}

#[tokio::test]
async fn test_accepted_order_deletion_returns_its_intake() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    h.intake(chair.id, 2).await;
    let order = h.staff_order(&[(chair.id, 5)]).await;
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 7);

    h.orders().delete_order(h.admin, order.id).await.unwrap();
    assert_eq!(h.quantity_at(chair.id, StageSlot::Holding).await, 2);
}

#[tokio::test]
async fn test_consumed_intake_blocks_deletion() {
    let h = Harness::new().await;
    let chair = h.chair().await;
    let order = h.staff_order(&[(chair.id, 5)]).await;
    h.complete(h.worker, &chair, 0, 4, None).await;

    let err = h.orders().delete_order(h.admin, order.id).await.unwrap_err();
    assert!(matches!(
        err.domain(),
        Some(DomainError::InsufficientInventory { available: 1, .. })
    ));
    assert_eq!(h.order(order.id).await.id, order.id);
}

#[tokio::test]
async fn test_orders_with_production_work_are_kept() {
    let h = Harness::new().await;
    let chair = h.chair().await;

    let linked = h.staff_order(&[(chair.id, 2)]).await;
    h.complete(h.worker, &chair, 0, 1, Some(linked.id)).await;
    let err = h.orders().delete_order(h.admin, linked.id).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Conflict { .. })));

    let started = h.staff_order(&[(chair.id, 1)]).await;
    set_status(&h, started.id, OrderStatus::InProgress).await.unwrap();
    let err = h.orders().delete_order(h.admin, started.id).await.unwrap_err();
    assert!(matches!(err.domain(), Some(DomainError::Conflict { .. })));
}
