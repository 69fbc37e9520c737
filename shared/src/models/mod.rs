//! Domain models for the Production Management backend

mod expense;
mod inventory;
mod order;
mod payment;
mod product;
mod user;
mod work_log;

pub use expense::*;
pub use inventory::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use user::*;
pub use work_log::*;
