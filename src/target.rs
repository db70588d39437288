//! Batch targets: catalog URLs, batch files and track selections

use crate::error::{Error, Result};
use crate::types::{CollectionKind, CollectionRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

/// What a catalog URL points at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    /// Whole album (or one item of it with `?i=`)
    Album,
    /// Playlist
    Playlist,
    /// Single song; resolved to its album at run time
    Song,
    /// Standalone music video
    MusicVideo,
}

/// Parsed catalog URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTarget {
    /// Storefront code from the first path segment
    pub storefront: String,
    /// Kind of resource
    pub kind: TargetKind,
    /// Catalog id
    pub id: String,
    /// Item picked inside an album via `?i=<id>`
    pub item_id: Option<String>,
}

impl CatalogTarget {
    /// Parse `https://<host>/<storefront>/<kind>[/<slug>]/<id>[?i=<item>]`
    ///
    /// # Examples
    ///
    /// ```
    /// use media_dl::target::{CatalogTarget, TargetKind};
    ///
    /// let t = CatalogTarget::parse("https://music.example.com/us/album/some-album/1440818839?i=1440818840").unwrap();
    /// assert_eq!(t.kind, TargetKind::Album);
    /// assert_eq!(t.id, "1440818839");
    /// assert_eq!(t.item_id.as_deref(), Some("1440818840"));
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| Error::InvalidTarget(format!("{input}: {e}")))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        let [storefront, kind, .., id] = segments.as_slice() else {
            return Err(Error::InvalidTarget(format!("{input}: too few path segments")));
        };
        if storefront.len() != 2 || !storefront.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidTarget(format!(
                "{input}: {storefront} is not a storefront code"
            )));
        }
        let kind = match *kind {
            "album" => TargetKind::Album,
            "playlist" => TargetKind::Playlist,
            "song" => TargetKind::Song,
            "music-video" => TargetKind::MusicVideo,
            other => {
                return Err(Error::InvalidTarget(format!(
                    "{input}: unsupported resource type {other}"
                )));
            }
        };
        if segments.len() > 4 {
            return Err(Error::InvalidTarget(format!("{input}: unexpected path")));
        }

        let id = id.strip_prefix("id").unwrap_or(id).to_string();
        let valid_id = match kind {
            TargetKind::Playlist => id.starts_with("pl."),
            _ => !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()),
        };
        if !valid_id {
            return Err(Error::InvalidTarget(format!("{input}: invalid id {id}")));
        }

        let item_id = match kind {
            TargetKind::Album => url
                .query_pairs()
                .find(|(key, _)| key == "i")
                .map(|(_, value)| value.into_owned()),
            _ => None,
        };

        Ok(Self {
            storefront: storefront.to_lowercase(),
            kind,
            id,
            item_id,
        })
    }

    /// Collection to fetch, unless the target is a song that needs a lookup first
    pub fn collection_ref(&self) -> Option<CollectionRef> {
        let kind = match self.kind {
            TargetKind::Album => CollectionKind::Album,
            TargetKind::Playlist => CollectionKind::Playlist,
            TargetKind::MusicVideo => CollectionKind::Single,
            TargetKind::Song => return None,
        };
        Some(CollectionRef {
            kind,
            id: self.id.clone(),
            storefront: self.storefront.clone(),
        })
    }
}

/// Lines of a newline-delimited batch file, skipping blanks and `#` comments
pub fn read_batch_file(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Parse a track selection such as `all`, `1,3,5` or `2-4 7`
///
/// Returns sorted, de-duplicated 1-based ordinals. Numbers outside `1..=total` are
/// dropped with a warning.
pub fn parse_track_selection(input: &str, total: usize) -> Result<Vec<usize>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("all") {
        return Ok((1..=total).collect());
    }

    let mut picked = BTreeSet::new();
    for token in input.split([',', ' ']).filter(|t| !t.is_empty()) {
        let (start, end) = match token.split_once('-') {
            Some((a, b)) => (parse_ordinal(a, token)?, parse_ordinal(b, token)?),
            None => {
                let n = parse_ordinal(token, token)?;
                (n, n)
            }
        };
        if start > end {
            return Err(Error::InvalidTarget(format!("reversed range {token}")));
        }
        let (low, high) = (start.max(1), end.min(total));
        if low != start || high != end {
            tracing::warn!(range = %token, total, "Ignoring out-of-range track numbers");
        }
        picked.extend(low..=high);
    }

    if picked.is_empty() {
        return Err(Error::InvalidTarget(format!("no tracks selected by {input:?}")));
    }
    Ok(picked.into_iter().collect())
}

fn parse_ordinal(s: &str, token: &str) -> Result<usize> {
    s.trim()
        .parse()
        .map_err(|_| Error::InvalidTarget(format!("invalid track selection {token}")))
}
