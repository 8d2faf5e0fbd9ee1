//! Core domain types and logic, independent of the listing site

pub mod config;
pub mod log;
pub mod models;
pub mod parse;
pub mod resolve;
pub mod store;

// Re-export main types for cleaner imports
pub use models::{Fund, FundClass, FundClassCost, FundClassPrice, Manager, ScrapedPricingRow};
pub use resolve::{CanonicalNames, FundCatalog, MatchRule, Resolution};
pub use store::FundStore;
