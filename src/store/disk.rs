use crate::core::models::{Fund, FundClass, FundClassCost, FundClassPrice, Manager};
use crate::core::store::FundStore;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const CLASS_SEQUENCE_KEY: &str = "fund_class_seq";

/// Store backed by a fjall keyspace with one partition per record type.
///
/// Keys are zero padded so partitions iterate in id order. Values are JSON.
pub struct DiskStore {
    keyspace: Keyspace,
    managers: PartitionHandle,
    funds: PartitionHandle,
    classes: PartitionHandle,
    costs: PartitionHandle,
    prices: PartitionHandle,
    meta: PartitionHandle,
    // Serialises fund class id assignment
    class_lock: Mutex<()>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;

        let keyspace = Config::new(path.join("store"))
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;

        let open = |name: &str| {
            keyspace
                .open_partition(name, PartitionCreateOptions::default())
                .with_context(|| format!("Failed to open partition: {name}"))
        };

        let store = Self {
            managers: open("managers")?,
            funds: open("funds")?,
            classes: open("fund_classes")?,
            costs: open("fund_class_costs")?,
            prices: open("fund_class_prices")?,
            meta: open("meta")?,
            keyspace,
            class_lock: Mutex::new(()),
        };
        debug!("Opened store at {}", path.display());
        Ok(store)
    }

    /// Flushes the journal to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist store")
    }

    fn next_class_id(&self) -> Result<u64> {
        let current = match self.meta.get(CLASS_SEQUENCE_KEY)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .to_vec()
                    .try_into()
                    .map_err(|_| anyhow!("Corrupt fund class sequence"))?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.meta
            .insert(CLASS_SEQUENCE_KEY, next.to_be_bytes().to_vec())?;
        Ok(next)
    }
}

fn id_key(id: impl Into<u64>) -> String {
    format!("{:020}", id.into())
}

/// Shifts signed ids into the unsigned range so keys keep numeric order.
fn entity_key(id: i32) -> String {
    id_key(u64::from(id.abs_diff(i32::MIN)))
}

fn class_key(fund_id: i32, class_name: &str) -> String {
    format!("{}/{}", entity_key(fund_id), class_name)
}

fn dated_key(fund_class_id: u64, date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => format!("{}/{}", id_key(fund_class_id), date),
        None => format!("{}/", id_key(fund_class_id)),
    }
}

fn put<T: Serialize>(partition: &PartitionHandle, key: String, value: &T) -> Result<()> {
    partition.insert(key, serde_json::to_vec(value)?)?;
    Ok(())
}

fn get<T: DeserializeOwned>(partition: &PartitionHandle, key: &str) -> Result<Option<T>> {
    match partition.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn scan<T: DeserializeOwned>(partition: &PartitionHandle) -> Result<Vec<T>> {
    partition
        .iter()
        .map(|item| -> Result<T> {
            let (_, value) = item?;
            Ok(serde_json::from_slice(&value)?)
        })
        .collect()
}

#[async_trait]
impl FundStore for DiskStore {
    async fn upsert_managers(&self, managers: &[Manager]) -> Result<()> {
        for manager in managers {
            put(&self.managers, entity_key(manager.id), manager)
                .with_context(|| format!("Failed to store manager {}", manager.id))?;
        }
        debug!("Upserted {} managers", managers.len());
        Ok(())
    }

    async fn upsert_funds(&self, funds: &[Fund]) -> Result<()> {
        for fund in funds {
            put(&self.funds, entity_key(fund.trust_no), fund)
                .with_context(|| format!("Failed to store fund {}", fund.trust_no))?;
        }
        debug!("Upserted {} funds", funds.len());
        Ok(())
    }

    async fn upsert_fund_class(&self, fund_class: &FundClass) -> Result<u64> {
        let _guard = self.class_lock.lock().await;
        let key = class_key(fund_class.fund_id, &fund_class.class_name);

        let id = match get::<FundClass>(&self.classes, &key)? {
            Some(existing) => existing.id,
            None => self.next_class_id()?,
        };

        let stored = FundClass {
            id,
            ..fund_class.clone()
        };
        put(&self.classes, key, &stored).with_context(|| {
            format!(
                "Failed to store class '{}' of fund {}",
                fund_class.class_name, fund_class.fund_id
            )
        })?;
        Ok(id)
    }

    async fn upsert_fund_class_cost(&self, cost: &FundClassCost) -> Result<()> {
        put(
            &self.costs,
            dated_key(cost.fund_class_id, cost.effective_date),
            cost,
        )
        .with_context(|| format!("Failed to store cost of class {}", cost.fund_class_id))
    }

    async fn upsert_fund_class_price(&self, price: &FundClassPrice) -> Result<()> {
        put(
            &self.prices,
            dated_key(price.fund_class_id, price.price_date),
            price,
        )
        .with_context(|| format!("Failed to store price of class {}", price.fund_class_id))
    }

    async fn find_fund_id_by_name(&self, name: &str) -> Result<Option<i32>> {
        Ok(scan::<Fund>(&self.funds)?
            .into_iter()
            .find(|fund| fund.name == name)
            .map(|fund| fund.trust_no))
    }

    async fn list_managers(&self) -> Result<Vec<Manager>> {
        scan(&self.managers).context("Failed to list managers")
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        scan(&self.funds).context("Failed to list funds")
    }

    async fn list_fund_classes(&self) -> Result<Vec<FundClass>> {
        let mut classes: Vec<FundClass> =
            scan(&self.classes).context("Failed to list fund classes")?;
        classes.sort_by_key(|class| class.id);
        Ok(classes)
    }

    async fn list_fund_class_costs(&self) -> Result<Vec<FundClassCost>> {
        scan(&self.costs).context("Failed to list fund class costs")
    }

    async fn list_fund_class_prices(&self) -> Result<Vec<FundClassPrice>> {
        scan(&self.prices).context("Failed to list fund class prices")
    }
}
