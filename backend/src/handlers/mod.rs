//! HTTP handlers

pub mod auth;
pub mod finance;
pub mod health;
pub mod orders;
pub mod payroll;
pub mod production;
pub mod products;
pub mod reports;

pub use auth::*;
pub use finance::*;
pub use health::*;
pub use orders::*;
pub use payroll::*;
pub use production::*;
pub use products::*;
pub use reports::*;
