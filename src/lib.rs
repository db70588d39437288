//! # media-dl
//!
//! Concurrent multi-account media acquisition pipeline.
//!
//! ## Design Philosophy
//!
//! media-dl is designed to be:
//! - **Account-aware** - Every configured storefront account is probed before a
//!   batch starts, and items fail over between the working ones
//! - **Bounded** - The worker pool is sized from the quality tier of the batch
//! - **Library-first** - Catalog access, transfer and tagging are traits the host
//!   supplies; the crate owns orchestration, naming and progress display
//! - **Restartable** - A completion ledger lets whole-batch reruns skip finished work
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{BatchRequest, Config, Downloader, Services, Session, RetryUpTo};
//! use media_dl::target::CatalogTarget;
//! use media_dl::types::{Account, AudioMode};
//! # fn services() -> media_dl::Result<Services> { unimplemented!() }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         accounts: vec![Account {
//!             id: "main".to_string(),
//!             name: "Main".to_string(),
//!             storefront: "us".to_string(),
//!             authorization_token: "token".to_string(),
//!             media_user_token: None,
//!             device_endpoint: None,
//!         }],
//!         ..Default::default()
//!     };
//!
//!     let downloader = Downloader::new(config, services()?)?;
//!     let target = CatalogTarget::parse("https://music.example.com/us/album/name/1440818839")?;
//!     let request = downloader.request_for_target(&target, AudioMode::Alac).await?;
//!
//!     let report = Session::new(downloader)
//!         .run(&[request], &RetryUpTo { max_passes: 3 })
//!         .await;
//!     println!("{}", report.totals.summary_line());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Acquisition orchestrator (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Streaming manifest parsing and variant resolution
pub mod manifest;
/// Folder and file naming templates
pub mod naming;
/// Path length fitting
pub mod path_safety;
/// Per-item retry with account failover
pub mod retry;
/// Collaborator traits the host implements
pub mod services;
/// Catalog URL and track selection parsing
pub mod target;
/// Core types
pub mod types;
/// Live terminal progress table
pub mod ui;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DeviceManifestMode};
pub use downloader::{
    Acknowledge, BatchRequest, CompletionLedger, Downloader, ItemInventory, RetryUpTo, Selection,
    Services, Session, SessionReport,
};
pub use error::{Error, Result};
pub use manifest::{AudioPreference, ManifestDocument, ManifestInventory};
pub use services::{CatalogClient, MediaTransfer, NoOpTagger, PathProbe, Tagger};
pub use types::{
    Account, AudioMode, BatchReport, Collection, CollectionRef, Counters, Item, ItemStatus,
    StatusTone,
};
pub use ui::{RenderControl, TerminalRenderer};
