//! Collaborator interfaces consumed by the downloader
//!
//! The catalog API, the transfer/decrypt step and tagging live outside this
//! crate. Hosts plug them in through these traits; tests use in-memory fakes.

use crate::error::Result;
use crate::manifest::ManifestDocument;
use crate::types::{Account, Collection, CollectionRef, ContentRating, Item, ProgressEvent};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use url::Url;

/// Remote catalog API client
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch collection metadata and its items
    ///
    /// Implementations must follow pagination so `items` is complete.
    async fn fetch_collection(&self, target: &CollectionRef, account: &Account) -> Result<Collection>;

    /// Fetch the enhanced manifest for an item
    ///
    /// `Ok(None)` means the catalog offers no enhanced manifest for this item,
    /// which routes it to the legacy compressed path.
    async fn fetch_manifest(
        &self,
        item: &Item,
        account: &Account,
        storefront: &str,
    ) -> Result<Option<ManifestDocument>>;

    /// Album that contains a single song
    async fn containing_collection(
        &self,
        item_id: &str,
        account: &Account,
        storefront: &str,
    ) -> Result<CollectionRef>;
}

/// Where the transfer collaborator should read media from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MediaSource {
    /// Resolved audio media playlist
    Stream(Url),
    /// Music video: video playlist plus optional separate audio rendition
    Video {
        /// Video media playlist
        video: Url,
        /// Audio rendition, muxed by the collaborator when present
        audio: Option<Url>,
    },
    /// Legacy compressed stream looked up by item id
    Legacy {
        /// Catalog id of the item
        item_id: String,
    },
}

/// One transfer handed to [`MediaTransfer`]
#[derive(Clone, Debug)]
pub struct TransferRequest {
    /// Item being acquired
    pub item: Item,
    /// Media location
    pub source: MediaSource,
    /// Final file path
    pub destination: PathBuf,
    /// Account the attempt runs under
    pub account: Account,
}

/// Bounded sender for granular progress
///
/// [`emit`](Self::emit) waits while the queue is full, so a slow consumer
/// throttles the producer instead of growing memory.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSink {
    /// Create a sink and the receiver draining it
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Send one event; returns `false` once the consumer is gone
    pub async fn emit(&self, event: ProgressEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }
}

/// Transfer and decryption collaborator
#[async_trait]
pub trait MediaTransfer: Send + Sync {
    /// Fetch, decrypt and write `request.destination`
    ///
    /// Implementations report progress through `progress` and must leave no
    /// partial file behind on failure.
    async fn transfer(&self, request: TransferRequest, progress: ProgressSink) -> Result<()>;
}

/// Metadata written into a finished file
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    /// Track title
    pub title: String,
    /// Track artist
    pub artist: String,
    /// Album or playlist name
    pub album: String,
    /// Album artist
    pub album_artist: String,
    /// Track number
    pub track: u32,
    /// Tracks in the collection
    pub track_total: u32,
    /// Disc number
    pub disc: u32,
    /// Content rating
    pub rating: ContentRating,
    /// Copyright line
    pub copyright: Option<String>,
    /// Barcode
    pub upc: Option<String>,
    /// Release date
    pub release_date: Option<String>,
}

impl TagSet {
    /// Tags for `item` as a member of `collection`
    pub fn for_item(item: &Item, collection: &Collection) -> Self {
        Self {
            title: item.name.clone(),
            artist: item.artist_name.clone(),
            album: collection.name.clone(),
            album_artist: collection.artist_name.clone(),
            track: item.track_number,
            track_total: u32::try_from(collection.total()).unwrap_or(u32::MAX),
            disc: item.disc_number,
            rating: item.content_rating,
            copyright: collection.copyright.clone(),
            upc: collection.upc.clone(),
            release_date: collection.release_date.clone(),
        }
    }
}

/// Tagging collaborator, called only after a successful transfer
#[async_trait]
pub trait Tagger: Send + Sync {
    /// Embed `tags` into the file at `path`
    async fn embed_tags(&self, path: &Path, tags: &TagSet) -> Result<()>;
}

/// [`Tagger`] that leaves files untouched
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpTagger;

#[async_trait]
impl Tagger for NoOpTagger {
    async fn embed_tags(&self, path: &Path, _tags: &TagSet) -> Result<()> {
        tracing::debug!(path = %path.display(), "Tagging disabled, skipping");
        Ok(())
    }
}

/// Existence check used to skip finished items
#[async_trait]
pub trait PathProbe: Send + Sync {
    /// Whether `path` already exists
    async fn exists(&self, path: &Path) -> bool;
}

/// [`PathProbe`] backed by the local filesystem
#[derive(Clone, Copy, Debug, Default)]
pub struct FsPathProbe;

#[async_trait]
impl PathProbe for FsPathProbe {
    async fn exists(&self, path: &Path) -> bool {
        match tokio::fs::try_exists(path).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Existence check failed");
                false
            }
        }
    }
}
