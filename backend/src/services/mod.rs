//! Business logic services for the Production Management backend

pub mod auth;
pub mod finance;
pub mod inventory;
pub mod orders;
pub mod payroll;
pub mod production;
pub mod products;
pub mod reporting;
pub mod users;

pub use auth::AuthService;
pub use finance::FinanceService;
pub use orders::OrderService;
pub use payroll::PayrollService;
pub use production::ProductionService;
pub use products::ProductService;
pub use reporting::ReportingService;
pub use users::UserService;
