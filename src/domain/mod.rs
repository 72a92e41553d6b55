//! Core domain types and logic.

pub mod price;
pub mod returns;
pub mod factor_table;
pub mod ols;
pub mod rolling;
pub mod prediction;
pub mod apt;
pub mod analysis;
pub mod report;
pub mod config_validation;
pub mod error;
