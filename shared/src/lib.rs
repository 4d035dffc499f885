//! Shared types and models for the Warehouse Inventory Platform
//!
//! This crate contains the domain rules shared between the backend, browser
//! forms (via WASM), and tests: stock register arithmetic, reference number
//! generation, request models and validation.

pub mod models;
pub mod reference;
pub mod stock;
pub mod types;
pub mod validation;

pub use models::*;
pub use reference::*;
pub use stock::*;
pub use types::*;
pub use validation::*;
