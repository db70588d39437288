//! Core types for media-dl

use serde::{Deserialize, Serialize};

/// Credentials for one catalog storefront
///
/// Loaded once by the host from configuration; the pipeline only borrows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, unique within the configured account list
    pub id: String,

    /// Display name used in status rows and warnings
    pub name: String,

    /// Storefront (region) code, e.g. "us" or "jp"
    pub storefront: String,

    /// Bearer-style token for catalog requests
    pub authorization_token: String,

    /// Long-lived session token enabling protected-content access
    #[serde(default)]
    pub media_user_token: Option<String>,

    /// `host:port` of a device that hands out manifest URLs out of band
    #[serde(default)]
    pub device_endpoint: Option<String>,
}

impl Account {
    /// Whether this account can fetch protected content (legacy streams, music videos)
    pub fn has_media_token(&self) -> bool {
        self.media_user_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// Uppercased storefront, as shown in progress rows
    pub fn region_label(&self) -> String {
        self.storefront.to_uppercase()
    }
}

/// Content rating of an item or collection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentRating {
    /// No rating supplied
    #[default]
    None,
    /// Explicit lyrics
    Explicit,
    /// Edited version of an explicit release
    Clean,
}

/// Media type of an item
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Audio track
    #[default]
    Song,
    /// Music video
    Video,
}

/// Audio capability flags advertised by the catalog
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioTrait {
    /// Lossless above 48 kHz
    HiResLossless,
    /// CD-quality lossless
    Lossless,
    /// Spatial audio
    Atmos,
    /// Spatial audio rendered as object-based mix
    Spatial,
}

/// One downloadable unit inside a collection
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Stable catalog identifier
    pub id: String,
    /// 1-based position within the containing collection
    pub ordinal: usize,
    /// Display name
    pub name: String,
    /// Performing artist
    #[serde(default)]
    pub artist_name: String,
    /// Content rating tag
    #[serde(default)]
    pub content_rating: ContentRating,
    /// Song or video
    #[serde(default)]
    pub kind: MediaKind,
    /// Audio trait flags
    #[serde(default)]
    pub traits: Vec<AudioTrait>,
    /// Disc number within the release
    #[serde(default = "default_one")]
    pub disc_number: u32,
    /// Track number within the disc
    #[serde(default)]
    pub track_number: u32,
    /// Carries the mastered-for-streaming badge
    #[serde(default)]
    pub is_mastered: bool,
}

fn default_one() -> u32 {
    1
}

impl Item {
    /// Whether the catalog advertises `t` for this item
    pub fn has_trait(&self, t: AudioTrait) -> bool {
        self.traits.contains(&t)
    }
}

/// Kind of collection a batch operates on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionKind {
    /// Album release
    #[default]
    Album,
    /// User or editorial playlist
    Playlist,
    /// Wrapper around a single standalone item (e.g. a music video)
    Single,
}

/// Reference to a collection in the catalog
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionRef {
    /// Kind of collection
    pub kind: CollectionKind,
    /// Catalog identifier
    pub id: String,
    /// Storefront the collection was requested from
    pub storefront: String,
}

/// An album, playlist or single-item wrapper
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Catalog identifier
    pub id: String,
    /// Kind of collection
    #[serde(default)]
    pub kind: CollectionKind,
    /// Album or playlist name
    pub name: String,
    /// Album artist, or curator for playlists
    #[serde(default)]
    pub artist_name: String,
    /// Catalog id of the album artist
    #[serde(default)]
    pub artist_id: Option<String>,
    /// Release date, `YYYY-MM-DD`
    #[serde(default)]
    pub release_date: Option<String>,
    /// Universal product code
    #[serde(default)]
    pub upc: Option<String>,
    /// Record label
    #[serde(default)]
    pub record_label: Option<String>,
    /// Copyright notice
    #[serde(default)]
    pub copyright: Option<String>,
    /// Content rating of the release
    #[serde(default)]
    pub content_rating: ContentRating,
    /// Carries the mastered-for-streaming badge
    #[serde(default)]
    pub is_mastered: bool,
    /// Items in catalog order
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Collection {
    /// Number of items in the collection
    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Look up an item by its 1-based ordinal
    pub fn item(&self, ordinal: usize) -> Option<&Item> {
        self.items.iter().find(|item| item.ordinal == ordinal)
    }
}

/// Severity tag driving a status row's color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    /// Not started yet
    #[default]
    Pending,
    /// Transfer or decrypt in progress
    Active,
    /// Informational step (e.g. tagging)
    Notice,
    /// Non-fatal problem, item still running
    Warning,
    /// Item acquired
    Success,
    /// Item was already on disk
    Skipped,
    /// Item failed
    Failed,
}

impl StatusTone {
    /// Terminal tones never change again within a batch
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StatusTone::Success | StatusTone::Skipped | StatusTone::Failed
        )
    }
}

/// One row of the live progress table
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemStatus {
    /// Dense row index (0..n-1)
    pub index: usize,
    /// 1-based ordinal within the collection
    pub ordinal: usize,
    /// Number of items in the collection
    pub total: usize,
    /// Item display name
    pub name: String,
    /// Quality annotation, e.g. "(24bit/96.0kHz)"
    pub quality: String,
    /// Free-text status
    pub status: String,
    /// Severity tag
    pub tone: StatusTone,
}

/// Aggregate outcome counters for one batch pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Items that reached a terminal state
    pub total: usize,
    /// Items acquired in this pass
    pub success: usize,
    /// Items that failed on every account
    pub failed: usize,
    /// Non-fatal warnings (account failovers)
    pub warned: usize,
    /// Items skipped because they were already complete
    pub skipped: usize,
}

impl Counters {
    /// Fold another pass's counters into this one
    pub fn absorb(&mut self, other: &Counters) {
        self.total += other.total;
        self.success += other.success;
        self.failed += other.failed;
        self.warned += other.warned;
        self.skipped += other.skipped;
    }

    /// One-line summary shown at the end of a pass
    pub fn summary_line(&self) -> String {
        format!(
            "Completed: {}/{} | Warnings: {} | Errors: {}",
            self.success + self.skipped,
            self.total,
            self.warned,
            self.failed
        )
    }
}

/// Phase a progress event belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    /// Bytes are being transferred
    Download,
    /// Content is being decrypted
    Decrypt,
}

/// Granular progress reported by the transfer collaborator
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Current phase
    pub stage: ProgressStage,
    /// Completion percentage, 0-100
    pub percentage: u8,
    /// Current throughput
    pub speed_bytes_per_sec: f64,
}

/// Overall quality tier of a batch, used to size the worker pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityTier {
    /// At least one selected item is Hi-Res lossless
    HiRes,
    /// At least one selected item is lossless
    Lossless,
    /// Compressed only
    Compressed,
}

impl QualityTier {
    /// Scan the selected items; the first Hi-Res item short-circuits
    pub fn for_items<'a>(items: impl IntoIterator<Item = &'a Item>) -> Self {
        let mut tier = QualityTier::Compressed;
        for item in items {
            if item.has_trait(AudioTrait::HiResLossless) {
                return QualityTier::HiRes;
            }
            if item.has_trait(AudioTrait::Lossless) {
                tier = QualityTier::Lossless;
            }
        }
        tier
    }
}

/// Audio stream family requested for a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// Lossless ALAC, capped by sample rate
    #[default]
    Alac,
    /// Spatial audio, capped by bitrate
    Atmos,
    /// Compressed stereo of a configured group type
    Aac,
}

impl AudioMode {
    /// Codec label used in folder and file templates
    pub fn codec_label(self) -> &'static str {
        match self {
            AudioMode::Alac => "ALAC",
            AudioMode::Atmos => "ATMOS",
            AudioMode::Aac => "AAC",
        }
    }
}

/// Outcome of one batch pass
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Collection the batch ran against
    pub collection_id: String,
    /// Final counters
    pub counters: Counters,
    /// Ordinals that failed on every account
    pub failed_ordinals: Vec<usize>,
}

impl BatchReport {
    /// Whether every dispatched item succeeded or was already present
    pub fn is_clean(&self) -> bool {
        self.counters.failed == 0
    }
}
