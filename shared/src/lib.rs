//! Shared types and domain logic for the Production Management backend
//!
//! Everything in this crate is pure: entity models, the stage topology of a
//! product, worker balance arithmetic, order status rules and the report
//! projections. Persistence and transport live in the `backend` crate.

pub mod error;
pub mod ledger;
pub mod models;
pub mod reports;
pub mod topology;
pub mod types;
pub mod validation;

pub use error::*;
pub use ledger::*;
pub use models::*;
pub use topology::*;
pub use types::*;
pub use validation::*;
