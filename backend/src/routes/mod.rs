//! Route definitions for the Production Management backend

use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Auth routes (public)
        .route("/auth/login", post(handlers::login))
        // Everything else requires a bearer token
        .merge(protected_routes(state))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/production", production_routes())
        .nest("/orders", order_routes())
        .nest("/payroll", payroll_routes())
        .nest("/finance", finance_routes())
        .nest("/reports", report_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// User management routes
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route("/me", get(handlers::me))
        .route("/wholesalers", get(handlers::list_wholesalers))
        .route(
            "/:user_id",
            patch(handlers::update_user).delete(handlers::deactivate_user),
        )
}

/// Product catalogue routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
}

/// Production floor routes
fn production_routes() -> Router<AppState> {
    Router::new()
        .route("/complete", post(handlers::record_completion))
        .route("/intake", post(handlers::intake))
        .route("/pipeline", get(handlers::pipeline))
        .route("/tasks", get(handlers::tasks))
        .route("/inventory", get(handlers::inventory))
        .route("/work-logs", get(handlers::list_work_logs))
        .route("/my-salary", get(handlers::my_salary))
}

/// Order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders).post(handlers::create_order))
        .route(
            "/:order_id",
            get(handlers::get_order).delete(handlers::delete_order),
        )
        .route("/:order_id/status", put(handlers::update_order_status))
}

/// Payroll routes
fn payroll_routes() -> Router<AppState> {
    Router::new()
        .route("/mark-paid", post(handlers::mark_paid))
        .route("/payments", post(handlers::create_payment))
        .route("/payments/me", get(handlers::my_payment_history))
        .route("/payments/:worker_id", get(handlers::payment_history))
}

/// Expense and withdrawal routes
fn finance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expense),
        )
        .route(
            "/expenses/:expense_id",
            get(handlers::get_expense)
                .put(handlers::update_expense)
                .delete(handlers::delete_expense),
        )
        .route(
            "/withdrawals",
            get(handlers::list_withdrawals).post(handlers::create_withdrawal),
        )
}

/// Report routes
fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/cash", get(handlers::cash_report))
        .route("/sales", get(handlers::sales_report))
        .route("/workers", get(handlers::worker_report))
        .route("/dashboard", get(handlers::dashboard))
}
