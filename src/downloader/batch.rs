//! Batch dispatch, draining and the final report

use super::context::{BatchContext, CompletionLedger, ItemOutcome};
use super::folders::FolderLayout;
use super::worker::{self, BatchEnv};
use super::{BatchRequest, Downloader, Selection};
use crate::error::{Error, Result};
use crate::manifest::{self, AudioPreference};
use crate::retry::RetryPolicy;
use crate::types::{
    Account, AudioMode, BatchReport, Collection, CollectionKind, Item, ItemStatus, StatusTone,
};
use crate::ui::ProgressRenderer;
use crate::ui::format::STATUS_WAITING;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Quality label for items without an enhanced manifest
const LEGACY_DISPLAY_QUALITY: &str = "AAC 256kbps";
/// Quality label when the manifest could not be read
const UNKNOWN_QUALITY: &str = "N/A";

impl Downloader {
    /// Run one batch pass over the requested items
    ///
    /// Items already in `ledger` are counted as skipped without any network work.
    /// Per-item failures never abort the batch; they end up in the returned report.
    ///
    /// # Errors
    ///
    /// Setup failures: an unknown storefront, an unreadable collection, an empty
    /// selection, or [`Error::NoWorkingAccounts`] from preflight.
    pub async fn run_batch(
        &self,
        request: &BatchRequest,
        ledger: Arc<CompletionLedger>,
    ) -> Result<BatchReport> {
        let main = self
            .config
            .account_for_storefront(&request.collection.storefront)?
            .clone();
        let collection = self
            .services
            .catalog
            .fetch_collection(&request.collection, &main)
            .await?;
        let items = select_items(&collection, &request.selection)?;

        let (folder_quality, folder_codec) =
            self.folder_quality(&collection, &items, request.mode, &main).await;
        let layout = FolderLayout::plan(
            &self.config,
            &collection,
            request.mode,
            &folder_quality,
            folder_codec,
        );

        let selected: Vec<&Item> = items.iter().collect();
        let preflight = self.preflight(&collection, &selected).await?;
        tracing::info!(
            collection_id = %collection.id,
            regions = %preflight.regions(),
            tier = ?preflight.tier,
            pool_size = preflight.pool_size,
            accounts = preflight.working.len(),
            items = items.len(),
            "Starting batch"
        );

        let rows = self
            .initial_rows(&collection, &items, &main, preflight.pool_size)
            .await;
        let renderer_terminal = (self.terminal)();
        let ctx = Arc::new(BatchContext::new(rows, renderer_terminal.width()));
        let renderer = ProgressRenderer::spawn(
            ctx.clone(),
            renderer_terminal,
            self.control.clone(),
            self.config.ui.refresh_interval,
        );

        let env = Arc::new(BatchEnv {
            config: self.config.clone(),
            services: self.services.clone(),
            collection: Arc::new(collection),
            layout,
            mode: request.mode,
            preference: AudioPreference::new(request.mode, &self.config.quality),
            accounts: preflight.working,
            policy: RetryPolicy::from(&self.config.retry),
            ledger,
        });

        let gate = Arc::new(Semaphore::new(preflight.pool_size.max(1)));
        let mut handles: Vec<(usize, JoinHandle<ItemOutcome>)> = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let env = env.clone();
            let ctx = ctx.clone();
            let gate = gate.clone();
            let handle = tokio::spawn(async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        let outcome = ItemOutcome::Failed(format!("worker gate closed: {e}"));
                        ctx.record_outcome(index, &outcome).await;
                        return outcome;
                    }
                };
                worker::run_item(env, ctx, index, item).await
            });
            handles.push((index, handle));
        }

        for (index, handle) in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, index, "Worker task panicked");
                ctx.record_outcome(index, &ItemOutcome::Failed("worker panicked".to_string()))
                    .await;
            }
        }

        renderer.finish().await;

        let report = ctx.report(&env.collection.id).await;
        tracing::info!(
            collection_id = %report.collection_id,
            failed_ordinals = ?report.failed_ordinals,
            "{}",
            report.counters.summary_line()
        );
        Ok(report)
    }

    /// `{Quality}`/`{Codec}` values for the collection folder
    ///
    /// The manifest is only consulted when the folder template uses `{Quality}`.
    async fn folder_quality(
        &self,
        collection: &Collection,
        items: &[Item],
        mode: AudioMode,
        main: &Account,
    ) -> (String, &'static str) {
        let template = match collection.kind {
            CollectionKind::Playlist => &self.config.naming.playlist_folder_format,
            CollectionKind::Album | CollectionKind::Single => &self.config.naming.album_folder_format,
        };
        let codec = mode.codec_label();
        let Some(first) = items.first() else {
            return (String::new(), codec);
        };
        if !template.contains("Quality") {
            return (String::new(), codec);
        }

        let preference = AudioPreference::new(mode, &self.config.quality);
        match self
            .services
            .catalog
            .fetch_manifest(first, main, &main.storefront)
            .await
        {
            Ok(Some(doc)) => match manifest::resolve_audio(&doc, &preference) {
                Ok(stream) => (stream.filename_quality, codec),
                Err(e) => {
                    tracing::debug!(error = %e, item_id = %first.id, "No folder quality");
                    (String::new(), codec)
                }
            },
            Ok(None) => ("256kbps".to_string(), AudioMode::Aac.codec_label()),
            Err(e) => {
                tracing::debug!(error = %e, item_id = %first.id, "No folder quality");
                (String::new(), codec)
            }
        }
    }

    /// One `Waiting` row per item, with the quality label from the main account
    ///
    /// At most `concurrency` manifest lookups are in flight at once.
    async fn initial_rows(
        &self,
        collection: &Collection,
        items: &[Item],
        main: &Account,
        concurrency: usize,
    ) -> Vec<ItemStatus> {
        let catalog = &self.services.catalog;
        let labels: Vec<String> = stream::iter(items.iter().map(|item| async move {
            match catalog.fetch_manifest(item, main, &main.storefront).await {
                Ok(Some(doc)) => match manifest::summarize(&doc) {
                    Ok(inventory) => inventory.display_quality,
                    Err(_) => UNKNOWN_QUALITY.to_string(),
                },
                Ok(None) => LEGACY_DISPLAY_QUALITY.to_string(),
                Err(_) => UNKNOWN_QUALITY.to_string(),
            }
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

        let total = collection.total();
        items
            .iter()
            .zip(labels)
            .enumerate()
            .map(|(index, (item, label))| ItemStatus {
                index,
                ordinal: item.ordinal,
                total,
                name: item.name.clone(),
                quality: format!("({label})"),
                status: STATUS_WAITING.to_string(),
                tone: StatusTone::Pending,
            })
            .collect()
    }
}

/// Resolve a selection against the collection, keeping the selection order
fn select_items(collection: &Collection, selection: &Selection) -> Result<Vec<Item>> {
    let items: Vec<Item> = match selection {
        Selection::All => collection.items.clone(),
        Selection::Item(id) => {
            let item = collection
                .items
                .iter()
                .find(|item| &item.id == id)
                .ok_or_else(|| {
                    Error::InvalidTarget(format!("item {id} not found in {}", collection.id))
                })?;
            vec![item.clone()]
        }
        Selection::Ordinals(ordinals) => ordinals
            .iter()
            .filter_map(|&n| {
                let item = collection.item(n);
                if item.is_none() {
                    tracing::warn!(ordinal = n, collection_id = %collection.id, "No such item, skipping");
                }
                item.cloned()
            })
            .collect(),
    };

    if items.is_empty() {
        return Err(Error::InvalidTarget(format!(
            "nothing selected in collection {}",
            collection.id
        )));
    }
    Ok(items)
}
