//! One item: the failover loop and a single acquisition attempt

use super::context::{BatchContext, ItemOutcome};
use super::folders::FolderLayout;
use super::Services;
use crate::config::{Config, DeviceManifestMode};
use crate::error::{Error, Result};
use crate::manifest::{self, AudioPreference, ManifestDocument, resolver};
use crate::naming;
use crate::retry::{FailoverError, RetryPolicy, run_with_failover};
use crate::services::{MediaSource, ProgressSink, TagSet, TransferRequest};
use crate::types::{
    Account, AudioMode, AudioTrait, Collection, CollectionKind, Item, MediaKind, ProgressEvent,
    StatusTone,
};
use crate::ui::format::{STATUS_TAGGING, account_failed_status, progress_status};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use super::CompletionLedger;

/// Capacity of the per-item progress channel
const PROGRESS_CHANNEL_CAPACITY: usize = 10;

/// Quality string used for legacy compressed streams
const LEGACY_QUALITY: &str = "256kbps";

/// Everything a worker needs, shared by all items of a batch
pub(crate) struct BatchEnv {
    pub(crate) config: Arc<Config>,
    pub(crate) services: Services,
    pub(crate) collection: Arc<Collection>,
    pub(crate) layout: FolderLayout,
    pub(crate) mode: AudioMode,
    pub(crate) preference: AudioPreference,
    pub(crate) accounts: Vec<Account>,
    pub(crate) policy: RetryPolicy,
    pub(crate) ledger: Arc<CompletionLedger>,
}

/// How a successful attempt ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Acquired {
    /// File transferred and tagged
    Transferred,
    /// File already existed at the destination
    AlreadyPresent,
}

/// Acquire one item and record its outcome in `ctx`
///
/// Rotation starts at `index`, so consecutive items start on different accounts.
pub(crate) async fn run_item(
    env: Arc<BatchEnv>,
    ctx: Arc<BatchContext>,
    index: usize,
    item: Item,
) -> ItemOutcome {
    let collection_id = env.collection.id.as_str();
    if env.ledger.contains(collection_id, item.ordinal).await {
        tracing::debug!(item_id = %item.id, ordinal = item.ordinal, "Already complete, skipping");
        let outcome = ItemOutcome::Skipped;
        ctx.record_outcome(index, &outcome).await;
        return outcome;
    }

    let (sink, progress_rx) = ProgressSink::channel(PROGRESS_CHANNEL_CAPACITY);
    let (region_tx, region_rx) = watch::channel(String::new());
    let region_tx = Arc::new(region_tx);
    let consumer = tokio::spawn(consume_progress(ctx.clone(), index, progress_rx, region_rx));

    let result = run_with_failover(
        &env.policy,
        &env.accounts,
        index,
        |account: Account, attempt: u32| {
            let env = env.clone();
            let ctx = ctx.clone();
            let item = item.clone();
            let sink = sink.clone();
            let region_tx = region_tx.clone();
            async move {
                region_tx.send_replace(account.region_label());
                tracing::debug!(
                    item_id = %item.id,
                    account = %account.name,
                    attempt,
                    "Starting attempt"
                );
                acquire_once(&env, &ctx, index, &item, &account, sink).await
            }
        },
        |account: Account, _last: String| {
            let ctx = ctx.clone();
            async move {
                ctx.update_status(index, &account_failed_status(&account.name), StatusTone::Warning)
                    .await;
                ctx.record_warning().await;
            }
        },
    )
    .await;

    // The failover closures owned the last senders; the consumer ends once they are gone
    drop(sink);
    if let Err(e) = consumer.await {
        tracing::warn!(error = %e, item_id = %item.id, "Progress consumer failed");
    }

    let outcome = match result {
        Ok(Acquired::Transferred) => ItemOutcome::Success,
        Ok(Acquired::AlreadyPresent) => ItemOutcome::Skipped,
        Err(FailoverError::Exhausted { accounts, last }) => {
            let message = last.to_string();
            let error = Error::AllAccountsExhausted {
                item_id: item.id.clone(),
                accounts,
                last: Box::new(last),
            };
            tracing::error!(error = %error, ordinal = item.ordinal, "Item failed");
            ItemOutcome::Failed(message)
        }
        Err(FailoverError::NoAccounts) => ItemOutcome::Failed("no working accounts".to_string()),
    };
    ctx.record_outcome(index, &outcome).await;
    outcome
}

/// Turn progress events into status text until every sender is dropped
async fn consume_progress(
    ctx: Arc<BatchContext>,
    index: usize,
    mut events: mpsc::Receiver<ProgressEvent>,
    region: watch::Receiver<String>,
) {
    while let Some(event) = events.recv().await {
        let label = region.borrow().clone();
        ctx.update_status(index, &progress_status(&label, &event), StatusTone::Active)
            .await;
    }
}

/// What one attempt will transfer and how its file is named
struct Plan {
    source: MediaSource,
    file_name: String,
}

/// One acquisition attempt of `item` under `account`
pub(crate) async fn acquire_once(
    env: &BatchEnv,
    ctx: &BatchContext,
    index: usize,
    item: &Item,
    account: &Account,
    sink: ProgressSink,
) -> Result<Acquired> {
    let plan = match item.kind {
        MediaKind::Song => plan_song(env, item, account).await?,
        MediaKind::Video => plan_video(env, item, account).await?,
    };

    let placed = env.layout.place(&plan.file_name);
    if !placed.fits {
        let warning = Error::PathUnshortenable {
            path: placed.path(&env.layout.base),
            max_len: env.layout.max_len,
        };
        tracing::warn!(error = %warning, item_id = %item.id, "Using best-effort path");
    }
    let destination = placed.path(&env.layout.base);

    let collection_id = env.collection.id.as_str();
    if env.services.probe.exists(&destination).await {
        env.ledger.mark(collection_id, item.ordinal).await;
        return Ok(Acquired::AlreadyPresent);
    }

    tokio::fs::create_dir_all(placed.dir(&env.layout.base)).await?;

    let request = TransferRequest {
        item: item.clone(),
        source: plan.source,
        destination: destination.clone(),
        account: account.clone(),
    };
    env.services.transfer.transfer(request, sink).await?;

    ctx.update_status(index, STATUS_TAGGING, StatusTone::Notice).await;
    let tags = TagSet::for_item(item, &env.collection);
    env.services.tagger.embed_tags(&destination, &tags).await?;

    env.ledger.mark(collection_id, item.ordinal).await;
    tracing::info!(
        item_id = %item.id,
        account = %account.name,
        path = %destination.display(),
        "Item acquired"
    );
    Ok(Acquired::Transferred)
}

async fn plan_song(env: &BatchEnv, item: &Item, account: &Account) -> Result<Plan> {
    let enhanced = if env.mode == AudioMode::Aac && env.config.quality.wants_legacy_aac() {
        None
    } else {
        env.services
            .catalog
            .fetch_manifest(item, account, &account.storefront)
            .await?
    };

    let Some(catalog_doc) = enhanced else {
        if env.mode == AudioMode::Atmos {
            return Err(Error::NoVariant {
                reason: "spatial audio unavailable for this item".to_string(),
            });
        }
        if !account.has_media_token() {
            return Err(Error::MissingMediaToken {
                account: account.name.clone(),
            });
        }
        return Ok(Plan {
            source: MediaSource::Legacy {
                item_id: item.id.clone(),
            },
            file_name: song_file_name(env, item, LEGACY_QUALITY, AudioMode::Aac.codec_label()),
        });
    };

    let doc = match device_manifest(env, item, account).await {
        Some(doc) => doc,
        None => catalog_doc,
    };
    let stream = manifest::resolve_audio(&doc, &env.preference)?;
    Ok(Plan {
        file_name: song_file_name(env, item, &stream.filename_quality, env.mode.codec_label()),
        source: MediaSource::Stream(stream.url),
    })
}

/// Manifest from the account's device endpoint, when configured and available
///
/// Lookup failures fall back to the catalog manifest.
async fn device_manifest(env: &BatchEnv, item: &Item, account: &Account) -> Option<ManifestDocument> {
    let wanted = match env.config.manifest.device_manifest {
        DeviceManifestMode::Off => false,
        DeviceManifestMode::HiRes => item.has_trait(AudioTrait::HiResLossless),
        DeviceManifestMode::All => true,
    };
    let locator = env.services.locator.as_ref()?;
    if !wanted || account.device_endpoint.is_none() {
        return None;
    }

    let url = match locator.locate(&item.id, account).await {
        Ok(Some(url)) => url,
        Ok(None) => return None,
        Err(e) => {
            tracing::debug!(error = %e, item_id = %item.id, "Device lookup failed, using catalog manifest");
            return None;
        }
    };
    match env.services.fetcher.fetch(&url).await {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(error = %e, url = %url, "Device manifest fetch failed, using catalog manifest");
            None
        }
    }
}

async fn plan_video(env: &BatchEnv, item: &Item, account: &Account) -> Result<Plan> {
    if !account.has_media_token() {
        return Err(Error::MissingMediaToken {
            account: account.name.clone(),
        });
    }
    let doc = env
        .services
        .catalog
        .fetch_manifest(item, account, &account.storefront)
        .await?
        .ok_or_else(|| Error::NoVariant {
            reason: "no video manifest for this item".to_string(),
        })?;

    let playlist = doc.parse()?;
    let video = resolver::select_video(&doc.url, &playlist, env.config.quality.mv_max)?;
    let audio =
        match resolver::select_video_audio(&doc.url, &playlist, env.config.quality.mv_audio_type) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::debug!(error = %e, item_id = %item.id, "No separate video audio");
                None
            }
        };

    let standalone = env.collection.kind == CollectionKind::Single;
    let stem = naming::video_file_stem(&env.config.naming, item, standalone);
    Ok(Plan {
        source: MediaSource::Video {
            video: video.url,
            audio,
        },
        file_name: format!("{stem}.mp4"),
    })
}

fn song_file_name(env: &BatchEnv, item: &Item, quality: &str, codec: &str) -> String {
    let stem = naming::song_file_stem(&env.config.naming, item, quality, codec);
    format!("{stem}.m4a")
}
