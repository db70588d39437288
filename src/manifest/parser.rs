//! HLS master playlist parsing
//!
//! Only the tags the resolver needs are interpreted: `#EXT-X-STREAM-INF` (variant
//! streams) and `#EXT-X-MEDIA` (alternative renditions). Media playlists are
//! rejected.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// One `#EXT-X-STREAM-INF` entry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantStream {
    /// Media playlist URI as written in the document (may be relative)
    pub uri: String,
    /// Peak bandwidth in bits per second
    pub bandwidth: u64,
    /// Average bandwidth; falls back to `bandwidth` when absent
    pub average_bandwidth: u64,
    /// Codec identifier (e.g. `alac`, `ec-3`, `mp4a.40.2`)
    pub codecs: String,
    /// Audio group id, which doubles as the quality descriptor
    /// (e.g. `audio-alac-stereo-96000-24`)
    pub audio_group: String,
    /// Declared `RESOLUTION`, for video variants
    pub resolution: Option<(u32, u32)>,
}

impl VariantStream {
    /// `-`-separated segments of the audio group id
    pub fn group_segments(&self) -> Vec<&str> {
        self.audio_group.split('-').collect()
    }
}

/// One `#EXT-X-MEDIA` entry
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rendition {
    /// `TYPE` attribute (`AUDIO`, `SUBTITLES`, ...)
    pub media_type: String,
    /// `GROUP-ID` attribute
    pub group_id: String,
    /// `NAME` attribute
    pub name: String,
    /// Rendition URI, absent for renditions muxed into the variant
    pub uri: Option<String>,
}

/// Parsed master playlist
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MasterPlaylist {
    /// Variant streams in document order
    pub variants: Vec<VariantStream>,
    /// Alternative renditions in document order
    pub renditions: Vec<Rendition>,
}

impl MasterPlaylist {
    /// Variants sorted by descending average bandwidth (stable for ties)
    pub fn variants_by_bandwidth(&self) -> Vec<&VariantStream> {
        let mut sorted: Vec<&VariantStream> = self.variants.iter().collect();
        sorted.sort_by(|a, b| b.average_bandwidth.cmp(&a.average_bandwidth));
        sorted
    }
}

/// Parse a master playlist document
pub fn parse_master(body: &str) -> Result<MasterPlaylist> {
    let mut lines = body
        .lines()
        .map(|line| line.trim().trim_start_matches('\u{feff}'))
        .filter(|line| !line.is_empty());

    match lines.next() {
        Some("#EXTM3U") => {}
        _ => {
            return Err(Error::ParseFailure(
                "document does not start with #EXTM3U".to_string(),
            ));
        }
    }

    let mut playlist = MasterPlaylist::default();
    let mut pending: Option<VariantStream> = None;

    for line in lines {
        if let Some(attrs) = line.strip_prefix("#EXT-X-STREAM-INF:") {
            if pending.is_some() {
                return Err(Error::ParseFailure(
                    "#EXT-X-STREAM-INF without a URI line".to_string(),
                ));
            }
            pending = Some(parse_stream_inf(attrs)?);
        } else if let Some(attrs) = line.strip_prefix("#EXT-X-MEDIA:") {
            playlist.renditions.push(parse_media(attrs));
        } else if line.starts_with("#EXTINF") || line.starts_with("#EXT-X-TARGETDURATION") {
            return Err(Error::ParseFailure(
                "media playlist given where a master playlist was expected".to_string(),
            ));
        } else if line.starts_with('#') {
            continue;
        } else if let Some(mut variant) = pending.take() {
            variant.uri = line.to_string();
            playlist.variants.push(variant);
        }
    }

    if pending.is_some() {
        return Err(Error::ParseFailure(
            "#EXT-X-STREAM-INF without a URI line".to_string(),
        ));
    }

    Ok(playlist)
}

fn parse_stream_inf(attrs: &str) -> Result<VariantStream> {
    let attrs = parse_attributes(attrs);

    let bandwidth = match attrs.get("BANDWIDTH") {
        Some(value) => value.parse::<u64>().map_err(|_| {
            Error::ParseFailure(format!("invalid BANDWIDTH value: {value}"))
        })?,
        None => {
            return Err(Error::ParseFailure(
                "#EXT-X-STREAM-INF is missing BANDWIDTH".to_string(),
            ));
        }
    };
    let average_bandwidth = attrs
        .get("AVERAGE-BANDWIDTH")
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(bandwidth);
    let resolution = attrs.get("RESOLUTION").and_then(|value| {
        let (w, h) = value.split_once(['x', 'X'])?;
        Some((w.parse().ok()?, h.parse().ok()?))
    });

    Ok(VariantStream {
        uri: String::new(),
        bandwidth,
        average_bandwidth,
        codecs: attrs.get("CODECS").cloned().unwrap_or_default(),
        audio_group: attrs.get("AUDIO").cloned().unwrap_or_default(),
        resolution,
    })
}

fn parse_media(attrs: &str) -> Rendition {
    let mut attrs = parse_attributes(attrs);
    Rendition {
        media_type: attrs.remove("TYPE").unwrap_or_default(),
        group_id: attrs.remove("GROUP-ID").unwrap_or_default(),
        name: attrs.remove("NAME").unwrap_or_default(),
        uri: attrs.remove("URI"),
    }
}

/// Split an attribute list on commas outside quoted strings
fn parse_attributes(input: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut flush = |field: &mut String| {
        if let Some((key, value)) = field.split_once('=') {
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            attrs.insert(key.trim().to_string(), value.to_string());
        }
        field.clear();
    };

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                field.push(c);
            }
            ',' if !in_quotes => flush(&mut field),
            _ => field.push(c),
        }
    }
    flush(&mut field);

    attrs
}
