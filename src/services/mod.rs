//! Business logic services

pub mod inventory;
pub mod labels;

use std::sync::Arc;

use crate::{config::LabelsConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub inventory: inventory::InventoryService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, labels_config: &LabelsConfig) -> Self {
        let labels: Arc<dyn labels::LabelGenerator> = if labels_config.enabled {
            Arc::new(labels::LabelFolder::new(&labels_config.folder))
        } else {
            Arc::new(labels::NoLabels)
        };

        Self {
            inventory: inventory::InventoryService::new(
                repository,
                labels,
                labels_config.public_base_url.clone(),
            ),
        }
    }
}
