// =====================================================================================
// COLLABORATOR PORTS - ASSET DIRECTORY AND MAINTENANCE HISTORY
// =====================================================================================

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, instrument};

use shared_models::{Asset, MaintenanceEvent};

use crate::error::MaintenanceError;

/// Read-only view of the equipment inventory.
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    async fn list_monitored_assets(&self) -> Result<Vec<Asset>, MaintenanceError>;

    /// `Ok(None)` when no asset has this id.
    async fn get_asset(&self, asset_id: &str) -> Result<Option<Asset>, MaintenanceError>;
}

#[async_trait]
pub trait MaintenanceHistoryStore: Send + Sync {
    /// Completed interventions for one asset, most recent first.
    async fn list_completed_events(&self, asset_id: &str) -> Result<Vec<MaintenanceEvent>, MaintenanceError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryDocument {
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub maintenance_events: Vec<MaintenanceEvent>,
}

/// Both ports backed by one JSON document on disk, held in memory after load.
#[derive(Debug)]
pub struct JsonInventory {
    path: Option<PathBuf>,
    document: RwLock<InventoryDocument>,
}

impl JsonInventory {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MaintenanceError> {
        let path = path.as_ref().to_path_buf();
        let document = read_document(&path).await?;
        info!(
            path = %path.display(),
            assets = document.assets.len(),
            events = document.maintenance_events.len(),
            "Asset inventory loaded"
        );

        Ok(Self {
            path: Some(path),
            document: RwLock::new(document),
        })
    }

    pub fn from_document(document: InventoryDocument) -> Self {
        Self {
            path: None,
            document: RwLock::new(document),
        }
    }

    /// Re-reads the backing file. In-memory inventories are left unchanged.
    pub async fn reload(&self) -> Result<(), MaintenanceError> {
        if let Some(path) = &self.path {
            let document = read_document(path).await?;
            *self.document.write().await = document;
        }
        Ok(())
    }
}

async fn read_document(path: &Path) -> Result<InventoryDocument, MaintenanceError> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        MaintenanceError::Inventory(format!("cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[async_trait]
impl AssetDirectory for JsonInventory {
    #[instrument(skip(self))]
    async fn list_monitored_assets(&self) -> Result<Vec<Asset>, MaintenanceError> {
        let document = self.document.read().await;
        Ok(document
            .assets
            .iter()
            .filter(|asset| asset.monitored_host().is_some())
            .cloned()
            .collect())
    }

    async fn get_asset(&self, asset_id: &str) -> Result<Option<Asset>, MaintenanceError> {
        let document = self.document.read().await;
        Ok(document.assets.iter().find(|asset| asset.id == asset_id).cloned())
    }
}

#[async_trait]
impl MaintenanceHistoryStore for JsonInventory {
    async fn list_completed_events(&self, asset_id: &str) -> Result<Vec<MaintenanceEvent>, MaintenanceError> {
        let document = self.document.read().await;
        let mut events: Vec<MaintenanceEvent> = document
            .maintenance_events
            .iter()
            .filter(|event| event.asset_id == asset_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(events)
    }
}
