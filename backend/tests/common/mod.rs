//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use production_backend::config::Config;
use production_backend::middleware::AuthUser;
use production_backend::services::orders::{CreateOrderInput, OrderLineInput};
use production_backend::services::production::{IntakeInput, RecordCompletionInput};
use production_backend::services::products::{CreateProductInput, StageRequest};
use production_backend::services::{
    OrderService, PayrollService, ProductService, ProductionService,
};
use production_backend::{MemoryStore, Store};
use shared::{NewUser, Order, Product, ProductId, Role, StageSlot, WorkLogEntry};

pub const JWT_SECRET: &str = "integration-test-secret";

pub struct Harness {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub admin: AuthUser,
    pub manager: AuthUser,
    pub worker: AuthUser,
    pub other_worker: AuthUser,
    pub wholesaler: AuthUser,
}

impl Harness {
    pub async fn new() -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let admin = add_user(&store, "admin", Role::Admin).await;
        let manager = add_user(&store, "manager", Role::Manager).await;
        let worker = add_user(&store, "worker1", Role::Worker).await;
        let other_worker = add_user(&store, "worker2", Role::Worker).await;
        let wholesaler = add_user(&store, "wholesale", Role::Wholesaler).await;

        Self {
            store,
            config: Config::for_memory(JWT_SECRET),
            admin,
            manager,
            worker,
            other_worker,
            wholesaler,
        }
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.store.clone())
    }

    pub fn production(&self) -> ProductionService {
        ProductionService::new(self.store.clone())
    }

    pub fn orders(&self) -> OrderService {
        OrderService::new(self.store.clone())
    }

    pub fn payroll(&self) -> PayrollService {
        PayrollService::new(self.store.clone())
    }

    /// "Chair": Cut (position 1, rate 10) then Assemble (position 2, rate 15)
    pub async fn chair(&self) -> Product {
        self.product("Chair", &[("Cut", 10), ("Assemble", 15)]).await
    }

    pub async fn product(&self, name: &str, stages: &[(&str, i64)]) -> Product {
        self.products()
            .create_product(
                self.manager,
                CreateProductInput {
                    name: name.to_string(),
                    description: None,
                    price: Decimal::from(100),
                    cost: Decimal::from(40),
                    stages: stages
                        .iter()
                        .enumerate()
                        .map(|(i, (stage, rate))| StageRequest {
                            name: stage.to_string(),
                            position: i as i32 + 1,
                            piece_rate: Decimal::from(*rate),
                        })
                        .collect(),
                },
            )
            .await
            .expect("create product")
    }

    pub async fn intake(&self, product_id: ProductId, quantity: i32) {
        self.production()
            .intake(self.manager, IntakeInput { product_id, quantity })
            .await
            .expect("intake");
    }

    pub async fn complete(
        &self,
        worker: AuthUser,
        product: &Product,
        stage_index: usize,
        quantity: i32,
        order_id: Option<i64>,
    ) -> WorkLogEntry {
        self.production()
            .record_completion(
                worker,
                RecordCompletionInput {
                    product_id: product.id,
                    stage_id: product.stages[stage_index].id,
                    quantity,
                    order_id,
                },
            )
            .await
            .expect("record completion")
    }

    pub async fn staff_order(&self, lines: &[(ProductId, i32)]) -> Order {
        self.orders()
            .create_order(self.manager, order_input(lines))
            .await
            .expect("create order")
    }

    /// Quantity at a slot, 0 when the slot was never used
    pub async fn quantity_at(&self, product_id: ProductId, slot: StageSlot) -> i32 {
        let mut tx = self.store.begin().await.unwrap();
        tx.lock_inventory(product_id, slot).await.unwrap()
    }

    pub async fn stock(&self, product_id: ProductId) -> i32 {
        let mut tx = self.store.begin().await.unwrap();
        tx.get_product(product_id).await.unwrap().unwrap().stock
    }

    pub async fn order(&self, order_id: i64) -> Order {
        let mut tx = self.store.begin().await.unwrap();
        tx.get_order(order_id).await.unwrap().unwrap()
    }

    pub async fn balance(&self, worker: AuthUser) -> Decimal {
        let mut tx = self.store.begin().await.unwrap();
        tx.worker_balance(worker.user_id).await.unwrap().balance()
    }
}

pub fn order_input(lines: &[(ProductId, i32)]) -> CreateOrderInput {
    CreateOrderInput {
        items: lines
            .iter()
            .map(|(product_id, quantity)| OrderLineInput {
                product_id: *product_id,
                quantity: *quantity,
            })
            .collect(),
        deadline: Utc::now() + Duration::days(14),
        wholesaler_id: None,
        customer_name: Some("Test customer".to_string()),
        customer_phone: None,
        customer_address: None,
        total_price: None,
        prepayment: None,
        payment_method: None,
    }
}

pub async fn add_user(store: &Arc<dyn Store>, username: &str, role: Role) -> AuthUser {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .insert_user(&NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            full_name: username.to_string(),
            password_hash: String::new(),
            role,
            phone: None,
            address: None,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    AuthUser::new(user.id, user.role)
}

pub fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}
