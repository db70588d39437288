//! Shared fakes for building Downloader instances in tests.

use crate::config::Config;
use crate::downloader::{Downloader, Services};
use crate::error::{Error, Result};
use crate::manifest::{ManifestDocument, ManifestFetcher};
use crate::services::{
    CatalogClient, FsPathProbe, MediaTransfer, ProgressSink, TagSet, Tagger, TransferRequest,
};
use crate::types::{
    Account, AudioTrait, Collection, CollectionKind, CollectionRef, Item, ProgressEvent,
    ProgressStage,
};
use crate::ui::BufferTerminal;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// Master playlist with two ALAC variants
pub(crate) const ALAC_MANIFEST: &str = "#EXTM3U\n\
    #EXT-X-STREAM-INF:BANDWIDTH=1500000,AVERAGE-BANDWIDTH=1400000,CODECS=\"alac\",AUDIO=\"audio-alac-stereo-48000-16\"\n\
    alac/48.m3u8\n\
    #EXT-X-STREAM-INF:BANDWIDTH=4500000,AVERAGE-BANDWIDTH=4000000,CODECS=\"alac\",AUDIO=\"audio-alac-stereo-96000-24\"\n\
    alac/96.m3u8\n";

pub(crate) fn account(name: &str, storefront: &str) -> Account {
    Account {
        id: name.to_lowercase(),
        name: name.to_string(),
        storefront: storefront.to_string(),
        authorization_token: format!("token-{name}"),
        media_user_token: Some(format!("media-{name}")),
        device_endpoint: None,
    }
}

pub(crate) fn album(id: &str, tracks: usize) -> Collection {
    Collection {
        id: id.to_string(),
        kind: CollectionKind::Album,
        name: format!("Album {id}"),
        artist_name: "Test Artist".into(),
        items: (1..=tracks)
            .map(|n| Item {
                id: format!("{id}-{n}"),
                ordinal: n,
                name: format!("Track {n}"),
                artist_name: "Test Artist".into(),
                traits: vec![AudioTrait::Lossless],
                disc_number: 1,
                track_number: n as u32,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Catalog serving fixed collections and one manifest body for every item
pub(crate) struct FakeCatalog {
    collections: HashMap<String, Collection>,
    /// Accounts (by name) whose manifest requests are refused
    pub(crate) denied: HashSet<String>,
    /// Items served without an enhanced manifest
    pub(crate) legacy_items: HashSet<String>,
    pub(crate) manifest_calls: AtomicUsize,
    manifest_in_flight: AtomicUsize,
    /// Most manifest requests seen in flight at once
    pub(crate) manifest_peak: AtomicUsize,
    pub(crate) manifest_latency: Duration,
}

impl FakeCatalog {
    pub(crate) fn new(collections: Vec<Collection>) -> Self {
        Self {
            collections: collections.into_iter().map(|c| (c.id.clone(), c)).collect(),
            denied: HashSet::new(),
            legacy_items: HashSet::new(),
            manifest_calls: AtomicUsize::new(0),
            manifest_in_flight: AtomicUsize::new(0),
            manifest_peak: AtomicUsize::new(0),
            manifest_latency: Duration::ZERO,
        }
    }

    pub(crate) fn deny(mut self, account_name: &str) -> Self {
        self.denied.insert(account_name.to_string());
        self
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn fetch_collection(&self, target: &CollectionRef, _account: &Account) -> Result<Collection> {
        self.collections
            .get(&target.id)
            .cloned()
            .ok_or_else(|| Error::FetchFailure(format!("unknown collection {}", target.id)))
    }

    async fn fetch_manifest(
        &self,
        item: &Item,
        account: &Account,
        _storefront: &str,
    ) -> Result<Option<ManifestDocument>> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.manifest_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.manifest_peak.fetch_max(now, Ordering::SeqCst);
        if !self.manifest_latency.is_zero() {
            tokio::time::sleep(self.manifest_latency).await;
        }
        self.manifest_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.denied.contains(&account.name) {
            return Err(Error::FetchFailure(format!("403 for {}", account.name)));
        }
        if self.legacy_items.contains(&item.id) {
            return Ok(None);
        }
        let url = Url::parse(&format!("https://cdn.example.com/{}/master.m3u8", item.id))
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Some(ManifestDocument::new(url, ALAC_MANIFEST)))
    }

    async fn containing_collection(
        &self,
        item_id: &str,
        _account: &Account,
        storefront: &str,
    ) -> Result<CollectionRef> {
        self.collections
            .values()
            .find(|c| c.items.iter().any(|i| i.id == item_id))
            .map(|c| CollectionRef {
                kind: c.kind,
                id: c.id.clone(),
                storefront: storefront.to_string(),
            })
            .ok_or_else(|| Error::FetchFailure(format!("no album for {item_id}")))
    }
}

/// Transfer that writes a small file and can fail on chosen accounts
#[derive(Default)]
pub(crate) struct FakeTransfer {
    /// Accounts (by name) whose transfers always fail
    pub(crate) failing: HashSet<String>,
    /// Items (by id) that fail on every account
    pub(crate) broken_items: HashSet<String>,
    /// Items (by id) that fail this many more times, then succeed
    pub(crate) flaky: Mutex<HashMap<String, usize>>,
    /// Every attempt as `(item id, account name)`
    pub(crate) calls: Mutex<Vec<(String, String)>>,
    pub(crate) in_flight: AtomicUsize,
    /// Highest number of concurrent transfers observed
    pub(crate) peak: AtomicUsize,
    /// Time each transfer takes
    pub(crate) latency: Duration,
    /// Time before a transfer reports its first progress
    pub(crate) start_delay: Duration,
}

impl FakeTransfer {
    pub(crate) fn failing_on(accounts: &[&str]) -> Self {
        Self {
            failing: accounts.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_for(&self, item_id: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(id, _)| id == item_id)
            .map(|(_, account)| account)
            .collect()
    }
}

#[async_trait]
impl MediaTransfer for FakeTransfer {
    async fn transfer(&self, request: TransferRequest, progress: ProgressSink) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((request.item.id.clone(), request.account.name.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.start_delay).await;
        progress
            .emit(ProgressEvent {
                stage: ProgressStage::Download,
                percentage: 50,
                speed_bytes_per_sec: 1_048_576.0,
            })
            .await;
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let flaky = {
            let mut flaky = self.flaky.lock().unwrap();
            match flaky.get_mut(&request.item.id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if flaky
            || self.failing.contains(&request.account.name)
            || self.broken_items.contains(&request.item.id)
        {
            return Err(Error::TransferFailure(format!(
                "connection reset on {}",
                request.account.name
            )));
        }
        progress
            .emit(ProgressEvent {
                stage: ProgressStage::Decrypt,
                percentage: 100,
                speed_bytes_per_sec: 0.0,
            })
            .await;
        tokio::fs::write(&request.destination, b"media").await?;
        Ok(())
    }
}

/// Tagger that records which files it saw
#[derive(Default)]
pub(crate) struct RecordingTagger {
    pub(crate) tagged: Mutex<Vec<(PathBuf, TagSet)>>,
}

#[async_trait]
impl Tagger for RecordingTagger {
    async fn embed_tags(&self, path: &std::path::Path, tags: &TagSet) -> Result<()> {
        self.tagged
            .lock()
            .unwrap()
            .push((path.to_path_buf(), tags.clone()));
        Ok(())
    }
}

/// Fetcher for tests that never expect a device manifest
pub(crate) struct UnusedFetcher;

#[async_trait]
impl ManifestFetcher for UnusedFetcher {
    async fn fetch(&self, url: &Url) -> Result<ManifestDocument> {
        Err(Error::FetchFailure(format!("unexpected fetch of {url}")))
    }
}

/// Config with the given accounts, output under `dir`, and no retry delays
pub(crate) fn test_config(dir: &TempDir, accounts: Vec<Account>) -> Config {
    let mut config = Config {
        accounts,
        ..Default::default()
    };
    let root = dir.path().join("music");
    config.output.alac_save_folder = root.clone();
    config.output.atmos_save_folder = root.join("atmos");
    config.output.aac_save_folder = root.join("aac");
    config.output.max_path_length = Some(4096);
    config.retry.attempt_delay = Duration::ZERO;
    config.retry.account_pause = Duration::ZERO;
    config.ui.refresh_interval = Duration::from_millis(10);
    config
}

/// Everything a downloader test needs to inspect afterwards
pub(crate) struct Harness {
    pub(crate) downloader: Downloader,
    pub(crate) catalog: Arc<FakeCatalog>,
    pub(crate) transfer: Arc<FakeTransfer>,
    pub(crate) tagger: Arc<RecordingTagger>,
    pub(crate) terminal: BufferTerminal,
    pub(crate) _dir: TempDir,
}

/// Build a downloader over the given fakes, rendering into a [`BufferTerminal`]
pub(crate) fn create_test_downloader(
    accounts: Vec<Account>,
    catalog: FakeCatalog,
    transfer: FakeTransfer,
) -> Harness {
    create_test_downloader_with(accounts, catalog, transfer, |_| {})
}

/// Like [`create_test_downloader`], with a chance to adjust the config
pub(crate) fn create_test_downloader_with(
    accounts: Vec<Account>,
    catalog: FakeCatalog,
    transfer: FakeTransfer,
    tweak: impl FnOnce(&mut Config),
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir, accounts);
    tweak(&mut config);
    let catalog = Arc::new(catalog);
    let transfer = Arc::new(transfer);
    let tagger = Arc::new(RecordingTagger::default());
    let services = Services {
        catalog: catalog.clone(),
        transfer: transfer.clone(),
        tagger: tagger.clone(),
        probe: Arc::new(FsPathProbe),
        fetcher: Arc::new(UnusedFetcher),
        locator: None,
    };
    let terminal = BufferTerminal::new(100);
    let factory_terminal = terminal.clone();
    let downloader = Downloader::new(config, services)
        .unwrap()
        .with_terminal(move || Box::new(factory_terminal.clone()));
    Harness {
        downloader,
        catalog,
        transfer,
        tagger,
        terminal,
        _dir: dir,
    }
}
