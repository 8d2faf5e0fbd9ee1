//! Persistence abstraction for ingested records

use crate::core::models::{Fund, FundClass, FundClassCost, FundClassPrice, Manager};
use anyhow::Result;
use async_trait::async_trait;

/// Idempotent storage of managers, funds and fund class data.
///
/// Upserts are keyed as follows and replace every non-key attribute:
/// managers by id, funds by trust number, classes by `(fund_id, class_name)`,
/// costs and prices by `(fund_class_id, date)`.
#[async_trait]
pub trait FundStore: Send + Sync {
    async fn upsert_managers(&self, managers: &[Manager]) -> Result<()>;

    async fn upsert_funds(&self, funds: &[Fund]) -> Result<()>;

    /// Stores the class and returns its id. The id assigned on first insert is kept
    /// by later upserts of the same `(fund_id, class_name)`.
    async fn upsert_fund_class(&self, fund_class: &FundClass) -> Result<u64>;

    async fn upsert_fund_class_cost(&self, cost: &FundClassCost) -> Result<()>;

    async fn upsert_fund_class_price(&self, price: &FundClassPrice) -> Result<()>;

    /// Exact, case-sensitive name lookup of a single fund. The prices pass does not
    /// call this per row; it resolves names against a `FundCatalog` snapshot, whose
    /// exact rule answers the same question.
    async fn find_fund_id_by_name(&self, name: &str) -> Result<Option<i32>>;

    async fn list_managers(&self) -> Result<Vec<Manager>>;

    async fn list_funds(&self) -> Result<Vec<Fund>>;

    async fn list_fund_classes(&self) -> Result<Vec<FundClass>>;

    async fn list_fund_class_costs(&self) -> Result<Vec<FundClassCost>>;

    async fn list_fund_class_prices(&self) -> Result<Vec<FundClassPrice>>;
}
