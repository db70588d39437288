//! Catalog fixtures and manifest bodies

use media_dl::types::{AudioTrait, CollectionKind};
use media_dl::{Account, Collection, CollectionRef, Item};

/// Catalog manifest topping out at CD-adjacent quality
pub const CATALOG_MANIFEST: &str = "#EXTM3U\n\
    #EXT-X-STREAM-INF:BANDWIDTH=1500000,AVERAGE-BANDWIDTH=1400000,CODECS=\"alac\",AUDIO=\"audio-alac-stereo-48000-16\"\n\
    alac/48.m3u8\n\
    #EXT-X-STREAM-INF:BANDWIDTH=256000,AVERAGE-BANDWIDTH=250000,CODECS=\"mp4a.40.2\",AUDIO=\"audio-stereo-256\"\n\
    aac/256.m3u8\n";

/// Device manifest that also carries a Hi-Res variant
pub const HIRES_MANIFEST: &str = "#EXTM3U\n\
    #EXT-X-STREAM-INF:BANDWIDTH=9000000,AVERAGE-BANDWIDTH=8500000,CODECS=\"alac\",AUDIO=\"audio-alac-stereo-192000-24\"\n\
    alac/192.m3u8\n\
    #EXT-X-STREAM-INF:BANDWIDTH=1500000,AVERAGE-BANDWIDTH=1400000,CODECS=\"alac\",AUDIO=\"audio-alac-stereo-48000-16\"\n\
    alac/48.m3u8\n";

/// Device manifest carrying a spatial variant the catalog manifest lacks
pub const SPATIAL_MANIFEST: &str = "#EXTM3U\n\
    #EXT-X-STREAM-INF:BANDWIDTH=2800000,AVERAGE-BANDWIDTH=2768000,CODECS=\"ec-3\",AUDIO=\"audio-atmos-2768\"\n\
    atmos/2768.m3u8\n\
    #EXT-X-STREAM-INF:BANDWIDTH=1500000,AVERAGE-BANDWIDTH=1400000,CODECS=\"alac\",AUDIO=\"audio-alac-stereo-48000-16\"\n\
    alac/48.m3u8\n";

/// Account with a media token on `storefront`
pub fn account(name: &str, storefront: &str) -> Account {
    Account {
        id: name.to_lowercase(),
        name: name.to_string(),
        storefront: storefront.to_string(),
        authorization_token: format!("token-{name}"),
        media_user_token: Some(format!("media-{name}")),
        device_endpoint: None,
    }
}

/// Album `id` with `tracks` lossless items named `Track N`
pub fn album(id: &str, tracks: usize) -> Collection {
    Collection {
        id: id.to_string(),
        kind: CollectionKind::Album,
        name: format!("Album {id}"),
        artist_name: "Pipeline Artist".into(),
        release_date: Some("2021-06-04".into()),
        items: (1..=tracks)
            .map(|n| Item {
                id: format!("{id}{n:02}"),
                ordinal: n,
                name: format!("Track {n}"),
                artist_name: "Pipeline Artist".into(),
                traits: vec![AudioTrait::Lossless, AudioTrait::HiResLossless],
                disc_number: 1,
                track_number: n as u32,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// Reference to album `id` on the US storefront
pub fn album_ref(id: &str) -> CollectionRef {
    CollectionRef {
        kind: CollectionKind::Album,
        id: id.to_string(),
        storefront: "us".into(),
    }
}
