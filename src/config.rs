//! Configuration types for media-dl

use crate::error::{Error, Result};
use crate::types::{Account, AudioMode, QualityTier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Fields are organized into logical sub-configs:
/// - [`quality`](QualityConfig) - per-mode ceilings used by the variant resolver
/// - [`concurrency`](ConcurrencyConfig) - worker pool size per quality tier
/// - [`output`](OutputConfig) - save folders and path length limit
/// - [`naming`](NamingConfig) - folder and file name templates
/// - [`manifest`](ManifestConfig) - out-of-band manifest lookup
///
/// Sub-config fields are flattened, so the serialized form is a single flat map
/// (`alac_max`, `song_file_format`, ...). `retry` and `ui` stay nested.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Catalog accounts (at least one required)
    pub accounts: Vec<Account>,

    /// Resolver ceilings
    #[serde(flatten)]
    pub quality: QualityConfig,

    /// Worker pool sizes
    #[serde(flatten)]
    pub concurrency: ConcurrencyConfig,

    /// Output directories and limits
    #[serde(flatten)]
    pub output: OutputConfig,

    /// Name templates
    #[serde(flatten)]
    pub naming: NamingConfig,

    /// Out-of-band manifest lookup
    #[serde(flatten)]
    pub manifest: ManifestConfig,

    /// Per-item retry and account failover
    #[serde(default)]
    pub retry: RetryConfig,

    /// Progress renderer settings
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Check settings the pipeline cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.accounts.is_empty() {
            return Err(Error::config(
                "at least one account is required",
                "accounts",
            ));
        }
        for account in &self.accounts {
            if account.storefront.trim().is_empty() {
                return Err(Error::config(
                    format!("account {} has no storefront", account.name),
                    "accounts.storefront",
                ));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "max_attempts must be at least 1",
                "retry.max_attempts",
            ));
        }
        if self.naming.limit_max == 0 {
            return Err(Error::config("limit_max must be positive", "limit_max"));
        }
        Ok(())
    }

    /// Account whose storefront matches `storefront`, falling back to the first one
    pub fn account_for_storefront(&self, storefront: &str) -> Result<&Account> {
        if let Some(account) = self
            .accounts
            .iter()
            .find(|a| a.storefront.eq_ignore_ascii_case(storefront))
        {
            return Ok(account);
        }
        let first = self
            .accounts
            .first()
            .ok_or_else(|| Error::config("no accounts configured", "accounts"))?;
        tracing::warn!(
            storefront,
            fallback = %first.name,
            "No account configured for storefront, using first account"
        );
        Ok(first)
    }

    /// Worker pool size for a batch of the given tier (never below 1)
    pub fn concurrency_for(&self, tier: QualityTier) -> usize {
        let threads = match tier {
            QualityTier::HiRes => self.concurrency.hires_download_threads,
            QualityTier::Lossless => self.concurrency.lossless_download_threads,
            QualityTier::Compressed => self.concurrency.aac_download_threads,
        };
        threads.max(1)
    }

    /// Root folder for a batch in the given audio mode
    pub fn save_folder(&self, mode: AudioMode) -> &Path {
        match mode {
            AudioMode::Alac => &self.output.alac_save_folder,
            AudioMode::Atmos => &self.output.atmos_save_folder,
            AudioMode::Aac => &self.output.aac_save_folder,
        }
    }

    /// Effective path length limit
    pub fn max_path_length(&self) -> usize {
        self.output
            .max_path_length
            .filter(|len| *len > 0)
            .unwrap_or_else(default_platform_path_length)
    }
}

/// Ceilings the resolver compares variants against
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Highest ALAC sample rate to accept, in Hz (default: 192000)
    #[serde(default = "default_alac_max")]
    pub alac_max: u32,

    /// Highest spatial-audio bitrate to accept, in kbps (default: 2768)
    #[serde(default = "default_atmos_max")]
    pub atmos_max: u32,

    /// Compressed stereo group to accept (default: "aac-lc")
    ///
    /// `aac-lc` selects the legacy stream; `aac`, `aac-binaural` and `aac-downmix`
    /// select a group from the enhanced manifest.
    #[serde(default = "default_aac_type")]
    pub aac_type: String,

    /// Highest music-video height to accept (default: 2160)
    #[serde(default = "default_mv_max")]
    pub mv_max: u32,

    /// Preferred music-video audio family (default: atmos)
    #[serde(default)]
    pub mv_audio_type: MvAudioType,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            alac_max: default_alac_max(),
            atmos_max: default_atmos_max(),
            aac_type: default_aac_type(),
            mv_max: default_mv_max(),
            mv_audio_type: MvAudioType::default(),
        }
    }
}

impl QualityConfig {
    /// Whether AAC batches use the legacy (non-manifest) stream
    pub fn wants_legacy_aac(&self) -> bool {
        self.aac_type == "aac-lc"
    }
}

/// Music-video audio preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MvAudioType {
    /// Spatial first, then surround, then stereo
    #[default]
    Atmos,
    /// Surround, then stereo
    Ac3,
    /// Stereo only
    Aac,
}

/// Worker pool sizes per batch quality tier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Concurrent items for Hi-Res batches (default: 1)
    #[serde(default = "default_hires_threads")]
    pub hires_download_threads: usize,

    /// Concurrent items for lossless batches (default: 3)
    #[serde(default = "default_lossless_threads")]
    pub lossless_download_threads: usize,

    /// Concurrent items for compressed batches (default: 5)
    #[serde(default = "default_aac_threads")]
    pub aac_download_threads: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            hires_download_threads: default_hires_threads(),
            lossless_download_threads: default_lossless_threads(),
            aac_download_threads: default_aac_threads(),
        }
    }
}

/// Output directories and path limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root folder for lossless batches (default: "./downloads/alac")
    #[serde(default = "default_alac_folder")]
    pub alac_save_folder: PathBuf,

    /// Root folder for spatial-audio batches (default: "./downloads/atmos")
    #[serde(default = "default_atmos_folder")]
    pub atmos_save_folder: PathBuf,

    /// Root folder for compressed batches (default: "./downloads/aac")
    #[serde(default = "default_aac_folder")]
    pub aac_save_folder: PathBuf,

    /// Maximum full path length in characters (default: platform limit)
    #[serde(default)]
    pub max_path_length: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            alac_save_folder: default_alac_folder(),
            atmos_save_folder: default_atmos_folder(),
            aac_save_folder: default_aac_folder(),
            max_path_length: None,
        }
    }
}

/// Folder and file name templates
///
/// Placeholders are written as `{Name}`; see [`crate::naming`] for the full list.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Artist folder template (default: "{ArtistName}"; empty disables the folder)
    #[serde(default = "default_artist_folder_format")]
    pub artist_folder_format: String,

    /// Album folder template (default: "{AlbumName}")
    #[serde(default = "default_album_folder_format")]
    pub album_folder_format: String,

    /// Playlist folder template (default: "{PlaylistName}")
    #[serde(default = "default_playlist_folder_format")]
    pub playlist_folder_format: String,

    /// Song file template, without extension (default: "{SongNumber}. {SongName}")
    #[serde(default = "default_song_file_format")]
    pub song_file_format: String,

    /// Maximum characters kept from any single catalog name (default: 200)
    #[serde(default = "default_limit_max")]
    pub limit_max: usize,

    /// Tag text for explicit content (default: "[E]")
    #[serde(default = "default_explicit_choice")]
    pub explicit_choice: String,

    /// Tag text for clean content (default: "[C]")
    #[serde(default = "default_clean_choice")]
    pub clean_choice: String,

    /// Tag text for mastered-for-streaming content (default: "[M]")
    #[serde(default = "default_mastered_choice")]
    pub mastered_choice: String,

    /// Artist folder name used for playlists (default: "Playlists")
    #[serde(default = "default_playlist_artist")]
    pub playlist_artist: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            artist_folder_format: default_artist_folder_format(),
            album_folder_format: default_album_folder_format(),
            playlist_folder_format: default_playlist_folder_format(),
            song_file_format: default_song_file_format(),
            limit_max: default_limit_max(),
            explicit_choice: default_explicit_choice(),
            clean_choice: default_clean_choice(),
            mastered_choice: default_mastered_choice(),
            playlist_artist: default_playlist_artist(),
        }
    }
}

/// When to ask an account's device endpoint for the manifest URL
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceManifestMode {
    /// Always use the catalog manifest
    #[default]
    Off,
    /// Only for items advertising Hi-Res lossless
    HiRes,
    /// For every song
    All,
}

/// Out-of-band manifest lookup
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// When to consult the device endpoint (default: off)
    #[serde(default)]
    pub device_manifest: DeviceManifestMode,

    /// Timeout for one device lookup (default: 10 seconds)
    #[serde(default = "default_device_timeout", with = "duration_serde")]
    pub device_timeout: Duration,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            device_manifest: DeviceManifestMode::default(),
            device_timeout: default_device_timeout(),
        }
    }
}

/// Per-item retry and account failover settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per account before rotating (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pause between attempts on the same account (default: 2 seconds)
    #[serde(default = "default_attempt_delay", with = "duration_serde")]
    pub attempt_delay: Duration,

    /// Pause after exhausting an account (default: 1 second)
    #[serde(default = "default_account_pause", with = "duration_serde")]
    pub account_pause: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_delay: default_attempt_delay(),
            account_pause: default_account_pause(),
        }
    }
}

/// Progress renderer settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UiConfig {
    /// Redraw interval (default: 300 ms)
    #[serde(default = "default_refresh_interval", with = "millis_serde")]
    pub refresh_interval: Duration,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
        }
    }
}

#[cfg(windows)]
fn default_platform_path_length() -> usize {
    255
}

#[cfg(not(windows))]
fn default_platform_path_length() -> usize {
    4096
}

fn default_alac_max() -> u32 {
    192_000
}

fn default_atmos_max() -> u32 {
    2768
}

fn default_aac_type() -> String {
    "aac-lc".to_string()
}

fn default_mv_max() -> u32 {
    2160
}

fn default_hires_threads() -> usize {
    1
}

fn default_lossless_threads() -> usize {
    3
}

fn default_aac_threads() -> usize {
    5
}

fn default_alac_folder() -> PathBuf {
    PathBuf::from("./downloads/alac")
}

fn default_atmos_folder() -> PathBuf {
    PathBuf::from("./downloads/atmos")
}

fn default_aac_folder() -> PathBuf {
    PathBuf::from("./downloads/aac")
}

fn default_artist_folder_format() -> String {
    "{ArtistName}".to_string()
}

fn default_album_folder_format() -> String {
    "{AlbumName}".to_string()
}

fn default_playlist_folder_format() -> String {
    "{PlaylistName}".to_string()
}

fn default_song_file_format() -> String {
    "{SongNumber}. {SongName}".to_string()
}

fn default_limit_max() -> usize {
    200
}

fn default_explicit_choice() -> String {
    "[E]".to_string()
}

fn default_clean_choice() -> String {
    "[C]".to_string()
}

fn default_mastered_choice() -> String {
    "[M]".to_string()
}

fn default_playlist_artist() -> String {
    "Playlists".to_string()
}

fn default_device_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_attempt_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_account_pause() -> Duration {
    Duration::from_secs(1)
}

fn default_refresh_interval() -> Duration {
    Duration::from_millis(300)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration helper for sub-second intervals
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
