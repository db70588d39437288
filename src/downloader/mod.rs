//! Acquisition orchestrator split into focused submodules.
//!
//! The `Downloader` struct and its methods are organized by batch phase:
//! - [`context`] - Shared status table, counters and completion ledger
//! - [`preflight`] - Account probing and worker pool sizing
//! - [`folders`] - Output folder layout for a collection
//! - [`batch`] - Dispatch, draining and the batch report
//! - [`worker`] - One item: failover loop and a single acquisition attempt
//! - [`inspect`] - Diagnostic manifest inventory (no file writes)
//! - [`session`] - Whole-batch reruns until a clean pass

mod batch;
pub mod context;
mod folders;
mod inspect;
mod preflight;
pub mod session;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{BatchContext, CompletionLedger, ItemOutcome};
pub use folders::FolderLayout;
pub use inspect::ItemInventory;
pub use preflight::PreflightReport;
pub use session::{Acknowledge, RetryUpTo, Session, SessionReport};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::manifest::{HttpManifestFetcher, ManifestFetcher, ManifestLocator};
use crate::services::{CatalogClient, FsPathProbe, MediaTransfer, PathProbe, Tagger};
use crate::target::{CatalogTarget, TargetKind};
use crate::types::{AudioMode, CollectionKind, CollectionRef};
use crate::ui::{AnsiTerminal, RenderControl, TerminalRenderer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Which items of a collection a batch covers
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Selection {
    /// Every item
    #[default]
    All,
    /// One item by catalog id
    Item(String),
    /// 1-based ordinals, e.g. from [`crate::target::parse_track_selection`]
    Ordinals(Vec<usize>),
}

/// One entry of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Collection to acquire from
    pub collection: CollectionRef,
    /// Items to acquire
    #[serde(default)]
    pub selection: Selection,
    /// Audio family to acquire
    #[serde(default)]
    pub mode: AudioMode,
}

impl BatchRequest {
    /// Request every item of `collection`
    pub fn all(collection: CollectionRef, mode: AudioMode) -> Self {
        Self {
            collection,
            selection: Selection::All,
            mode,
        }
    }
}

/// Builds the terminal a batch renders on
pub type TerminalFactory = Arc<dyn Fn() -> Box<dyn TerminalRenderer> + Send + Sync>;

/// External collaborators the downloader drives
#[derive(Clone)]
pub struct Services {
    /// Catalog API client
    pub catalog: Arc<dyn CatalogClient>,
    /// Transfer and decryption
    pub transfer: Arc<dyn MediaTransfer>,
    /// Metadata embedding
    pub tagger: Arc<dyn Tagger>,
    /// Existence checks for finished files
    pub probe: Arc<dyn PathProbe>,
    /// Manifest download for device-provided URLs
    pub fetcher: Arc<dyn ManifestFetcher>,
    /// Device manifest lookup, if any account has an endpoint
    pub locator: Option<Arc<dyn ManifestLocator>>,
}

impl Services {
    /// Collaborators with the filesystem probe and HTTP manifest fetcher filled in
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        transfer: Arc<dyn MediaTransfer>,
        tagger: Arc<dyn Tagger>,
    ) -> Result<Self> {
        Ok(Self {
            catalog,
            transfer,
            tagger,
            probe: Arc::new(FsPathProbe),
            fetcher: Arc::new(HttpManifestFetcher::new()?),
            locator: None,
        })
    }
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Downloader {
    pub(crate) config: Arc<Config>,
    pub(crate) services: Services,
    pub(crate) terminal: TerminalFactory,
    pub(crate) control: RenderControl,
}

impl Downloader {
    /// Create a downloader drawing progress on standard output
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the configuration fails validation.
    pub fn new(config: Config, services: Services) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            services,
            terminal: Arc::new(|| Box::new(AnsiTerminal::stdout())),
            control: RenderControl::new(),
        })
    }

    /// Render on terminals produced by `factory` instead of standard output
    pub fn with_terminal<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TerminalRenderer> + Send + Sync + 'static,
    {
        self.terminal = Arc::new(factory);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Suspend/resume switch for the live progress table
    pub fn render_control(&self) -> &RenderControl {
        &self.control
    }

    /// Turn a parsed catalog URL into a batch entry
    ///
    /// Songs are looked up to find their album and select only themselves.
    pub async fn request_for_target(
        &self,
        target: &CatalogTarget,
        mode: AudioMode,
    ) -> Result<BatchRequest> {
        if let Some(collection) = target.collection_ref() {
            let selection = match &target.item_id {
                Some(item_id) => Selection::Item(item_id.clone()),
                None => Selection::All,
            };
            return Ok(BatchRequest {
                collection,
                selection,
                mode,
            });
        }

        debug_assert_eq!(target.kind, TargetKind::Song);
        let account = self.config.account_for_storefront(&target.storefront)?;
        let album = self
            .services
            .catalog
            .containing_collection(&target.id, account, &target.storefront)
            .await?;
        if album.kind == CollectionKind::Playlist {
            return Err(Error::InvalidTarget(format!(
                "song {} resolved to a playlist",
                target.id
            )));
        }
        tracing::debug!(song_id = %target.id, album_id = %album.id, "Resolved song to album");
        Ok(BatchRequest {
            collection: album,
            selection: Selection::Item(target.id.clone()),
            mode,
        })
    }
}
