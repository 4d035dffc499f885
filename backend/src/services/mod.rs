//! Business logic services for the Warehouse Inventory Platform

pub mod activity_log;
pub mod adjustment;
pub mod auth;
pub mod category;
pub mod material;
pub mod reporting;
pub mod role;
pub mod stock_in;
pub mod stock_ledger;
pub mod stock_out;
pub mod supplier;
pub mod user;

pub use activity_log::{ActivityLogService, Actor};
pub use adjustment::AdjustmentService;
pub use auth::AuthService;
pub use category::CategoryService;
pub use material::MaterialService;
pub use reporting::ReportingService;
pub use role::RoleService;
pub use stock_in::StockInService;
pub use stock_out::StockOutService;
pub use supplier::SupplierService;
pub use user::UserService;
