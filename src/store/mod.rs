pub mod disk;
pub mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use crate::core::config::AppConfig;
use anyhow::Result;
use tracing::debug;

/// Opens the on-disk store under the configured data path.
pub fn open_store(config: &AppConfig) -> Result<DiskStore> {
    let path = config.data_path()?;
    debug!("Using data path {}", path.display());
    DiskStore::open(&path)
}
