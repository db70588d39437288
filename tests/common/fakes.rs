//! Collaborator fakes built only on the public API

use super::fixtures::CATALOG_MANIFEST;
use async_trait::async_trait;
use media_dl::services::{ProgressSink, TransferRequest};
use media_dl::types::{ProgressEvent, ProgressStage};
use media_dl::{
    Account, CatalogClient, Collection, CollectionRef, Error, Item, ManifestDocument,
    MediaTransfer, Result,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Catalog serving one collection and [`CATALOG_MANIFEST`] for each item
pub struct StaticCatalog {
    pub collection: Collection,
    /// Items without an enhanced manifest
    pub legacy: HashSet<String>,
}

impl StaticCatalog {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            legacy: HashSet::new(),
        }
    }
}

#[async_trait]
impl CatalogClient for StaticCatalog {
    async fn fetch_collection(&self, target: &CollectionRef, _account: &Account) -> Result<Collection> {
        if target.id == self.collection.id {
            Ok(self.collection.clone())
        } else {
            Err(Error::FetchFailure(format!("unknown collection {}", target.id)))
        }
    }

    async fn fetch_manifest(
        &self,
        item: &Item,
        _account: &Account,
        _storefront: &str,
    ) -> Result<Option<ManifestDocument>> {
        if self.legacy.contains(&item.id) {
            return Ok(None);
        }
        let url = Url::parse(&format!("https://catalog.example.com/{}/master.m3u8", item.id))
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Some(ManifestDocument::new(url, CATALOG_MANIFEST)))
    }

    async fn containing_collection(
        &self,
        item_id: &str,
        _account: &Account,
        storefront: &str,
    ) -> Result<CollectionRef> {
        if self.collection.items.iter().any(|i| i.id == item_id) {
            Ok(CollectionRef {
                kind: self.collection.kind,
                id: self.collection.id.clone(),
                storefront: storefront.to_string(),
            })
        } else {
            Err(Error::FetchFailure(format!("no album for {item_id}")))
        }
    }
}

/// Transfer that records the source it was given and writes a stub file
#[derive(Default)]
pub struct FileTransfer {
    pub requests: Mutex<Vec<TransferRequest>>,
}

impl FileTransfer {
    pub fn destinations(&self) -> Vec<PathBuf> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.destination.clone())
            .collect()
    }
}

#[async_trait]
impl MediaTransfer for FileTransfer {
    async fn transfer(&self, request: TransferRequest, progress: ProgressSink) -> Result<()> {
        for percentage in [25, 75, 100] {
            progress
                .emit(ProgressEvent {
                    stage: ProgressStage::Download,
                    percentage,
                    speed_bytes_per_sec: 512_000.0,
                })
                .await;
        }
        tokio::fs::write(&request.destination, b"stub").await?;
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

/// Device endpoint answering every request with `manifest_url`
///
/// Returns the `host:port` to put in [`Account::device_endpoint`].
pub async fn spawn_device(manifest_url: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let reply = format!("{manifest_url}\n");
            tokio::spawn(async move {
                let len = socket.read_u8().await.unwrap();
                let mut id = vec![0u8; len as usize];
                socket.read_exact(&mut id).await.unwrap();
                socket.write_all(reply.as_bytes()).await.unwrap();
            });
        }
    });
    addr.to_string()
}
