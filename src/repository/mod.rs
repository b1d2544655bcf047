//! Repository layer: the inventory record store

pub mod csv_store;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{error::AppResult, models::Tool};

pub use csv_store::CsvRecordStore;
pub use memory::MemoryRecordStore;

/// Whole-set persistence for tool records.
///
/// `save` always replaces everything previously stored.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records in stored order; empty when nothing was ever saved
    async fn load(&self) -> AppResult<Vec<Tool>>;

    async fn save(&self, tools: &[Tool]) -> AppResult<()>;
}

/// Main repository struct holding the record store
#[derive(Clone)]
pub struct Repository {
    pub tools: Arc<dyn RecordStore>,
}

impl Repository {
    pub fn new(tools: Arc<dyn RecordStore>) -> Self {
        Self { tools }
    }

    /// Repository backed by a CSV file
    pub fn csv(path: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(CsvRecordStore::new(path)))
    }

    /// Repository kept in memory
    pub fn in_memory(tools: Vec<Tool>) -> Self {
        Self::new(Arc::new(MemoryRecordStore::with_tools(tools)))
    }
}
