//! Output folder layout for a collection

use crate::config::Config;
use crate::naming;
use crate::path_safety::{FitOutcome, fit};
use crate::types::{AudioMode, Collection, ContentRating, Item};
use std::path::PathBuf;

/// Quality string used to size folders for the longest possible file name
const PLACEHOLDER_QUALITY: &str = "24B-192.0kHz";

/// Artist and collection folders under a save root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FolderLayout {
    /// Save root for the batch's audio mode
    pub base: PathBuf,
    /// Artist folder, empty when disabled
    pub artist: String,
    /// Album or playlist folder
    pub collection: String,
    /// Path length limit
    pub max_len: usize,
}

impl FolderLayout {
    /// Plan folders for `collection`
    ///
    /// `quality` and `codec` fill the folder templates. The folders are shortened
    /// up front so the longest file name the song template can produce still fits.
    pub fn plan(
        config: &Config,
        collection: &Collection,
        mode: AudioMode,
        quality: &str,
        codec: &str,
    ) -> Self {
        let base = config.save_folder(mode).to_path_buf();
        let max_len = config.max_path_length();
        let artist = naming::artist_folder(&config.naming, collection);
        let folder = naming::collection_folder(&config.naming, collection, quality, codec);

        let longest = longest_file_name(config, collection);
        let outcome = fit(&base, &artist, &folder, &longest, max_len);
        if outcome.outer != artist || outcome.inner != folder {
            tracing::debug!(
                artist = %outcome.outer,
                folder = %outcome.inner,
                max_len,
                "Shortened folders to fit path limit"
            );
        }

        Self {
            base,
            artist: outcome.outer,
            collection: outcome.inner,
            max_len,
        }
    }

    /// Fit `file_name` into this layout
    pub fn place(&self, file_name: &str) -> FitOutcome {
        fit(
            &self.base,
            &self.artist,
            &self.collection,
            file_name,
            self.max_len,
        )
    }
}

/// Song file name built from the longest item fields and widest placeholders
fn longest_file_name(config: &Config, collection: &Collection) -> String {
    fn longest<'a>(items: &'a [Item], field: impl Fn(&'a Item) -> &'a str) -> &'a str {
        items
            .iter()
            .map(field)
            .max_by_key(|value| value.chars().count())
            .unwrap_or_default()
    }

    let items = &collection.items;
    let widest_ordinal = items
        .iter()
        .map(|item| item.ordinal)
        .chain([collection.total(), 99])
        .max()
        .unwrap_or(99);
    let probe = Item {
        id: longest(items, |item| item.id.as_str()).to_string(),
        ordinal: widest_ordinal,
        name: longest(items, |item| item.name.as_str()).to_string(),
        artist_name: longest(items, |item| item.artist_name.as_str()).to_string(),
        content_rating: ContentRating::Explicit,
        is_mastered: true,
        track_number: items.iter().map(|item| item.track_number).max().unwrap_or(0).max(99),
        disc_number: items.iter().map(|item| item.disc_number).max().unwrap_or(0).max(9),
        ..Default::default()
    };
    let stem = naming::song_file_stem(
        &config.naming,
        &probe,
        PLACEHOLDER_QUALITY,
        AudioMode::Atmos.codec_label(),
    );
    format!("{stem}.m4a")
}
