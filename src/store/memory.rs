use crate::core::models::{Fund, FundClass, FundClassCost, FundClassPrice, Manager};
use crate::core::store::FundStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Tables {
    managers: BTreeMap<i32, Manager>,
    funds: BTreeMap<i32, Fund>,
    classes: BTreeMap<(i32, String), FundClass>,
    costs: BTreeMap<(u64, Option<NaiveDate>), FundClassCost>,
    prices: BTreeMap<(u64, Option<NaiveDate>), FundClassPrice>,
    next_class_id: u64,
}

/// In-memory store, mainly for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FundStore for MemoryStore {
    async fn upsert_managers(&self, managers: &[Manager]) -> Result<()> {
        let mut tables = self.inner.lock().await;
        for manager in managers {
            tables.managers.insert(manager.id, manager.clone());
        }
        debug!("Upserted {} managers", managers.len());
        Ok(())
    }

    async fn upsert_funds(&self, funds: &[Fund]) -> Result<()> {
        let mut tables = self.inner.lock().await;
        for fund in funds {
            tables.funds.insert(fund.trust_no, fund.clone());
        }
        debug!("Upserted {} funds", funds.len());
        Ok(())
    }

    async fn upsert_fund_class(&self, fund_class: &FundClass) -> Result<u64> {
        let mut tables = self.inner.lock().await;
        let key = (fund_class.fund_id, fund_class.class_name.clone());
        let id = match tables.classes.get(&key) {
            Some(existing) => existing.id,
            None => {
                tables.next_class_id += 1;
                tables.next_class_id
            }
        };
        tables.classes.insert(
            key,
            FundClass {
                id,
                ..fund_class.clone()
            },
        );
        Ok(id)
    }

    async fn upsert_fund_class_cost(&self, cost: &FundClassCost) -> Result<()> {
        let mut tables = self.inner.lock().await;
        tables
            .costs
            .insert((cost.fund_class_id, cost.effective_date), cost.clone());
        Ok(())
    }

    async fn upsert_fund_class_price(&self, price: &FundClassPrice) -> Result<()> {
        let mut tables = self.inner.lock().await;
        tables
            .prices
            .insert((price.fund_class_id, price.price_date), price.clone());
        Ok(())
    }

    async fn find_fund_id_by_name(&self, name: &str) -> Result<Option<i32>> {
        let tables = self.inner.lock().await;
        Ok(tables
            .funds
            .values()
            .find(|fund| fund.name == name)
            .map(|fund| fund.trust_no))
    }

    async fn list_managers(&self) -> Result<Vec<Manager>> {
        Ok(self.inner.lock().await.managers.values().cloned().collect())
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        Ok(self.inner.lock().await.funds.values().cloned().collect())
    }

    async fn list_fund_classes(&self) -> Result<Vec<FundClass>> {
        let tables = self.inner.lock().await;
        let mut classes: Vec<FundClass> = tables.classes.values().cloned().collect();
        classes.sort_by_key(|class| class.id);
        Ok(classes)
    }

    async fn list_fund_class_costs(&self) -> Result<Vec<FundClassCost>> {
        Ok(self.inner.lock().await.costs.values().cloned().collect())
    }

    async fn list_fund_class_prices(&self) -> Result<Vec<FundClassPrice>> {
        Ok(self.inner.lock().await.prices.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::check_store_contract;

    #[tokio::test]
    async fn test_memory_store_contract() {
        check_store_contract(&MemoryStore::new()).await;
    }
}
