//! Preflight - account probing and worker pool sizing

use super::Downloader;
use crate::error::{Error, Result};
use crate::types::{Account, Collection, Item, QualityTier};
use futures::future::join_all;

/// Outcome of preflight for one batch
#[derive(Clone, Debug)]
pub struct PreflightReport {
    /// Accounts that could access the probe item, in configured order
    pub working: Vec<Account>,
    /// Quality tier of the selected items
    pub tier: QualityTier,
    /// Worker pool size for the tier
    pub pool_size: usize,
}

impl PreflightReport {
    /// Uppercased working regions, sorted and de-duplicated, joined with ` / `
    pub fn regions(&self) -> String {
        let mut regions: Vec<String> = self
            .working
            .iter()
            .map(Account::region_label)
            .filter(|r| !r.is_empty())
            .collect();
        regions.sort();
        regions.dedup();
        regions.join(" / ")
    }
}

impl Downloader {
    /// Probe every configured account against the collection's first item
    ///
    /// # Errors
    ///
    /// [`Error::NoWorkingAccounts`] when no account can access the collection.
    pub(crate) async fn preflight(
        &self,
        collection: &Collection,
        selected: &[&Item],
    ) -> Result<PreflightReport> {
        let Some(probe_item) = collection.items.first() else {
            return Err(Error::NoWorkingAccounts {
                collection_id: collection.id.clone(),
            });
        };

        let catalog = &self.services.catalog;
        let probes = self.config.accounts.iter().map(|account| async move {
            let result = catalog
                .fetch_manifest(probe_item, account, &account.storefront)
                .await;
            (account, result)
        });

        let mut working = Vec::new();
        for (account, result) in join_all(probes).await {
            match result {
                Ok(_) => working.push(account.clone()),
                Err(e) => {
                    let denied = Error::AccessDenied {
                        account: account.name.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(
                        collection_id = %collection.id,
                        error = %denied,
                        "Account cannot access collection, skipping it for this batch"
                    );
                }
            }
        }

        if working.is_empty() {
            return Err(Error::NoWorkingAccounts {
                collection_id: collection.id.clone(),
            });
        }

        let tier = QualityTier::for_items(selected.iter().copied());
        let pool_size = self.config.concurrency_for(tier);
        Ok(PreflightReport {
            working,
            tier,
            pool_size,
        })
    }
}
