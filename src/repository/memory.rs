//! In-memory record store

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::RecordStore;
use crate::{error::AppResult, models::Tool};

#[derive(Default)]
pub struct MemoryRecordStore {
    tools: RwLock<Vec<Tool>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tools(tools: Vec<Tool>) -> Self {
        Self {
            tools: RwLock::new(tools),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn load(&self) -> AppResult<Vec<Tool>> {
        Ok(self.tools.read().await.clone())
    }

    async fn save(&self, tools: &[Tool]) -> AppResult<()> {
        *self.tools.write().await = tools.to_vec();
        Ok(())
    }
}
