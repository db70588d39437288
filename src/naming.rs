//! Folder and file name templates
//!
//! Templates use `{Placeholder}` tokens. Rendered names have path-hostile
//! characters replaced with `_` and are cut to `limit_max` code points.
//!
//! | Template | Placeholders |
//! |----------|--------------|
//! | artist folder | `{ArtistName}` `{ArtistId}` `{UrlArtistName}` |
//! | album folder | `{AlbumName}` `{AlbumId}` `{ArtistName}` `{ReleaseDate}` `{ReleaseYear}` `{UPC}` `{RecordLabel}` `{Copyright}` `{Quality}` `{Codec}` `{Tag}` |
//! | playlist folder | `{PlaylistName}` `{PlaylistId}` `{ArtistName}` `{Quality}` `{Codec}` `{Tag}` |
//! | song file | `{SongId}` `{SongNumber}` `{SongName}` `{DiscNumber}` `{TrackNumber}` `{ArtistName}` `{Quality}` `{Codec}` `{Tag}` |

use crate::config::NamingConfig;
use crate::types::{Collection, CollectionKind, ContentRating, Item};
use crate::utils::{limit_chars, static_regex};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Replace characters that are invalid in file names on common platforms
pub fn sanitize(name: &str) -> String {
    static FORBIDDEN: OnceLock<Regex> = OnceLock::new();
    static_regex(&FORBIDDEN, r#"[/\\<>:"|?*]"#)
        .replace_all(name, "_")
        .into_owned()
}

/// Substitute `{Key}` tokens
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in values {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Sanitize, cut and tidy a rendered component; empty results become `fallback`
fn finish(rendered: &str, config: &NamingConfig, fallback: &str) -> String {
    let clean = sanitize(rendered);
    let limited = limit_chars(clean.trim(), config.limit_max);
    let tidy = limited.trim_end_matches(['.', ' ']);
    if tidy.is_empty() {
        sanitize(fallback)
    } else {
        tidy.to_string()
    }
}

/// Space-separated content tags (mastered, explicit, clean)
pub fn tags(config: &NamingConfig, rating: ContentRating, is_mastered: bool) -> String {
    let mut parts = Vec::new();
    if is_mastered && !config.mastered_choice.is_empty() {
        parts.push(config.mastered_choice.as_str());
    }
    match rating {
        ContentRating::Explicit if !config.explicit_choice.is_empty() => {
            parts.push(config.explicit_choice.as_str());
        }
        ContentRating::Clean if !config.clean_choice.is_empty() => {
            parts.push(config.clean_choice.as_str());
        }
        _ => {}
    }
    parts.join(" ")
}

/// Lowercase, dash-separated form of a name as it appears in catalog URLs
pub fn url_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn release_year(date: Option<&str>) -> String {
    let Some(date) = date else {
        return String::new();
    };
    match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed.year().to_string(),
        Err(_) => date.chars().take(4).collect(),
    }
}

/// Artist folder name, or an empty string when the template is empty
pub fn artist_folder(config: &NamingConfig, collection: &Collection) -> String {
    if config.artist_folder_format.trim().is_empty() {
        return String::new();
    }
    let artist = match collection.kind {
        CollectionKind::Playlist => config.playlist_artist.as_str(),
        _ => collection.artist_name.as_str(),
    };
    let slug = url_slug(artist);
    let rendered = render(
        &config.artist_folder_format,
        &[
            ("ArtistName", artist),
            ("ArtistId", collection.artist_id.as_deref().unwrap_or_default()),
            ("UrlArtistName", slug.as_str()),
        ],
    );
    finish(&rendered, config, artist)
}

/// Album or playlist folder name
///
/// `quality` and `codec` fill `{Quality}` and `{Codec}`.
pub fn collection_folder(
    config: &NamingConfig,
    collection: &Collection,
    quality: &str,
    codec: &str,
) -> String {
    let tag = tags(config, collection.content_rating, collection.is_mastered);
    let rendered = match collection.kind {
        CollectionKind::Playlist => render(
            &config.playlist_folder_format,
            &[
                ("PlaylistName", collection.name.as_str()),
                ("PlaylistId", collection.id.as_str()),
                ("ArtistName", collection.artist_name.as_str()),
                ("Quality", quality),
                ("Codec", codec),
                ("Tag", tag.as_str()),
            ],
        ),
        CollectionKind::Album | CollectionKind::Single => {
            let year = release_year(collection.release_date.as_deref());
            render(
                &config.album_folder_format,
                &[
                    ("AlbumName", collection.name.as_str()),
                    ("AlbumId", collection.id.as_str()),
                    ("ArtistName", collection.artist_name.as_str()),
                    ("ReleaseDate", collection.release_date.as_deref().unwrap_or_default()),
                    ("ReleaseYear", year.as_str()),
                    ("UPC", collection.upc.as_deref().unwrap_or_default()),
                    ("RecordLabel", collection.record_label.as_deref().unwrap_or_default()),
                    ("Copyright", collection.copyright.as_deref().unwrap_or_default()),
                    ("Quality", quality),
                    ("Codec", codec),
                    ("Tag", tag.as_str()),
                ],
            )
        }
    };
    finish(&rendered, config, &collection.id)
}

/// Song file name without extension
pub fn song_file_stem(config: &NamingConfig, item: &Item, quality: &str, codec: &str) -> String {
    let tag = tags(config, item.content_rating, item.is_mastered);
    let song_number = format!("{:02}", item.ordinal);
    let track_number = format!("{:02}", item.track_number);
    let disc_number = item.disc_number.to_string();
    let rendered = render(
        &config.song_file_format,
        &[
            ("SongId", item.id.as_str()),
            ("SongNumber", song_number.as_str()),
            ("SongName", item.name.as_str()),
            ("DiscNumber", disc_number.as_str()),
            ("TrackNumber", track_number.as_str()),
            ("ArtistName", item.artist_name.as_str()),
            ("Quality", quality),
            ("Codec", codec),
            ("Tag", tag.as_str()),
        ],
    );
    // Collapse doubled spaces left by empty placeholders
    let rendered = rendered.split_whitespace().collect::<Vec<_>>().join(" ");
    finish(&rendered, config, &item.id)
}

/// Music video file name without extension
///
/// Inside a collection the ordinal leads; standalone videos carry the artist.
pub fn video_file_stem(config: &NamingConfig, item: &Item, standalone: bool) -> String {
    let rendered = if standalone {
        format!("{} - {}", item.artist_name, item.name)
    } else {
        format!("{:02}. {}", item.ordinal, item.name)
    };
    finish(&rendered, config, &item.id)
}
