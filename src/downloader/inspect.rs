//! Diagnostic manifest inventory
//!
//! Reports what each item's manifest offers without selecting, transferring or
//! writing anything. The completion ledger is not consulted.

use super::{BatchRequest, Downloader, Selection};
use crate::config::DeviceManifestMode;
use crate::error::{Error, Result};
use crate::manifest::{self, ManifestDocument, ManifestInventory};
use crate::types::{Account, AudioTrait, Item, QualityTier};
use futures::stream::{self, StreamExt};
use serde::Serialize;

/// Inventory of one item
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemInventory {
    /// 1-based position in the collection
    pub ordinal: usize,
    /// Item title
    pub name: String,
    /// What the manifest offers, when one could be read
    pub inventory: Option<ManifestInventory>,
    /// Why no inventory is available
    pub error: Option<String>,
}

impl Downloader {
    /// Inventory every selected item using the storefront's main account
    ///
    /// Items without an enhanced manifest report an error instead of an inventory.
    ///
    /// # Errors
    ///
    /// Unknown storefront or an unreadable collection.
    pub async fn inventory(&self, request: &BatchRequest) -> Result<Vec<ItemInventory>> {
        let main = self
            .config
            .account_for_storefront(&request.collection.storefront)?;
        let collection = self
            .services
            .catalog
            .fetch_collection(&request.collection, main)
            .await?;

        let items: Vec<&Item> = match &request.selection {
            Selection::All => collection.items.iter().collect(),
            Selection::Item(id) => collection.items.iter().filter(|i| &i.id == id).collect(),
            Selection::Ordinals(ordinals) => ordinals
                .iter()
                .filter_map(|&n| collection.item(n))
                .collect(),
        };

        let concurrency = self
            .config
            .concurrency_for(QualityTier::for_items(items.iter().copied()));
        let reports = stream::iter(items.into_iter().map(|item| async move {
            match self.inventory_document(item, main).await {
                Ok(doc) => match manifest::summarize(&doc) {
                    Ok(inventory) => ItemInventory {
                        ordinal: item.ordinal,
                        name: item.name.clone(),
                        inventory: Some(inventory),
                        error: None,
                    },
                    Err(e) => failed(item, &e),
                },
                Err(e) => failed(item, &e),
            }
        }))
        .buffered(concurrency)
        .collect()
        .await;
        Ok(reports)
    }

    async fn inventory_document(&self, item: &Item, account: &Account) -> Result<ManifestDocument> {
        let wanted = match self.config.manifest.device_manifest {
            DeviceManifestMode::Off => false,
            DeviceManifestMode::HiRes => item.has_trait(AudioTrait::HiResLossless),
            DeviceManifestMode::All => true,
        };
        if wanted && let Some(locator) = &self.services.locator {
            match locator.locate(&item.id, account).await {
                Ok(Some(url)) => return self.services.fetcher.fetch(&url).await,
                Ok(None) => {}
                Err(e) => tracing::debug!(error = %e, item_id = %item.id, "Device lookup failed"),
            }
        }

        self.services
            .catalog
            .fetch_manifest(item, account, &account.storefront)
            .await?
            .ok_or_else(|| Error::NoVariant {
                reason: "no enhanced manifest for this item".to_string(),
            })
    }
}

fn failed(item: &Item, error: &Error) -> ItemInventory {
    ItemInventory {
        ordinal: item.ordinal,
        name: item.name.clone(),
        inventory: None,
        error: Some(error.to_string()),
    }
}
