//! Domain models for the Warehouse Inventory Platform

mod activity;
mod adjustment;
mod category;
mod material;
mod status;
mod stock_in;
mod stock_out;
mod supplier;
mod user;

pub use activity::*;
pub use adjustment::*;
pub use category::*;
pub use material::*;
pub use status::*;
pub use stock_in::*;
pub use stock_out::*;
pub use supplier::*;
pub use user::*;
