//! Manifest variant resolution
//!
//! This module parses HLS master playlists and picks the variant to acquire:
//! - [`parser`] - master playlist parsing into variants and renditions
//! - [`resolver`] - audio, video and music-video audio selection under ceilings
//! - [`inventory`] - per-family quality summary for display and diagnostics
//! - [`fetch`] - manifest retrieval over HTTP and from device endpoints

pub mod fetch;
pub mod inventory;
pub mod parser;
pub mod resolver;

use crate::error::Result;
use url::Url;

pub use fetch::{DeviceManifestLocator, HttpManifestFetcher, ManifestFetcher, ManifestLocator};
pub use inventory::{FamilySummary, ManifestInventory, NOT_AVAILABLE, VariantRow};
pub use parser::{MasterPlaylist, Rendition, VariantStream, parse_master};
pub use resolver::{AudioPreference, ResolvedStream, ResolvedVideo};

/// An already-fetched manifest and the URL it came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestDocument {
    /// Location of the document; relative variant URIs resolve against it
    pub url: Url,
    /// Raw playlist text
    pub body: String,
}

impl ManifestDocument {
    /// Pair a body with its source URL
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    /// Parse the body as a master playlist
    pub fn parse(&self) -> Result<MasterPlaylist> {
        parse_master(&self.body)
    }
}

/// What [`resolve`] should do
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveMode {
    /// Pick the best variant under the given constraints
    Select(AudioPreference),
    /// Report what the manifest offers without choosing
    Inventory,
}

/// Output of [`resolve`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// Selected stream
    Stream(ResolvedStream),
    /// Diagnostic report
    Inventory(ManifestInventory),
}

/// Resolve an audio manifest
///
/// # Errors
///
/// [`crate::Error::ParseFailure`] for malformed documents and
/// [`crate::Error::NoVariant`] when a selection finds no variants at all.
pub fn resolve(doc: &ManifestDocument, mode: &ResolveMode) -> Result<Resolved> {
    let playlist = doc.parse()?;
    match mode {
        ResolveMode::Select(preference) => {
            resolver::select_audio(&doc.url, &playlist, preference).map(Resolved::Stream)
        }
        ResolveMode::Inventory => Ok(Resolved::Inventory(inventory::inventory(&playlist))),
    }
}

/// Select the audio stream, shorthand for [`resolve`] in select mode
pub fn resolve_audio(doc: &ManifestDocument, preference: &AudioPreference) -> Result<ResolvedStream> {
    let playlist = doc.parse()?;
    resolver::select_audio(&doc.url, &playlist, preference)
}

/// Summarize a manifest, shorthand for [`resolve`] in inventory mode
pub fn summarize(doc: &ManifestDocument) -> Result<ManifestInventory> {
    Ok(inventory::inventory(&doc.parse()?))
}
