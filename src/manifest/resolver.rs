//! Variant selection under configured ceilings
//!
//! Every selection walks variants by descending average bandwidth and accepts the
//! first one within the ceiling for the active mode. When nothing qualifies the
//! first variant is used. Only an empty manifest is an error.

use super::inventory::{FamilySummary, lossless_params};
use super::parser::{MasterPlaylist, VariantStream};
use crate::config::{MvAudioType, QualityConfig};
use crate::error::{Error, Result};
use crate::types::AudioMode;
use crate::utils::static_regex;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

/// Audio selection constraints
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioPreference {
    /// Active family
    pub mode: AudioMode,
    /// Highest ALAC sample rate accepted
    pub alac_max: u32,
    /// Highest spatial bitrate accepted
    pub atmos_max: u32,
    /// Compressed stereo group to accept (`aac`, `aac-binaural`, `aac-downmix`)
    pub aac_type: String,
}

impl AudioPreference {
    /// Constraints for `mode` taken from the quality config
    pub fn new(mode: AudioMode, quality: &QualityConfig) -> Self {
        Self {
            mode,
            alac_max: quality.alac_max,
            atmos_max: quality.atmos_max,
            aac_type: quality.aac_type.clone(),
        }
    }
}

/// Chosen audio stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedStream {
    /// Absolute media playlist URL
    pub url: Url,
    /// Quality string for file names (empty when the fallback variant was used)
    pub filename_quality: String,
    /// Quality label for the status table
    pub display_quality: String,
}

/// Chosen video stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedVideo {
    /// Absolute media playlist URL
    pub url: Url,
    /// `(width, height)` if known
    pub resolution: Option<(u32, u32)>,
}

/// Select the audio variant for `preference`
pub fn select_audio(
    base: &Url,
    playlist: &MasterPlaylist,
    preference: &AudioPreference,
) -> Result<ResolvedStream> {
    let sorted = playlist.variants_by_bandwidth();
    let Some(first) = sorted.first() else {
        return Err(Error::NoVariant {
            reason: "manifest lists no variants".to_string(),
        });
    };
    let display_quality = FamilySummary::from_sorted(&sorted).display_quality();

    let chosen = match preference.mode {
        AudioMode::Atmos => pick_atmos(&sorted, preference.atmos_max),
        AudioMode::Aac => pick_aac(&sorted, &preference.aac_type),
        AudioMode::Alac => pick_alac(&sorted, preference.alac_max),
    };

    let (variant, filename_quality) = match chosen {
        Some(hit) => hit,
        None => {
            tracing::debug!(
                mode = ?preference.mode,
                fallback = %first.audio_group,
                "No variant within ceiling, using first variant"
            );
            (*first, String::new())
        }
    };

    Ok(ResolvedStream {
        url: join_uri(base, &variant.uri)?,
        filename_quality,
        display_quality,
    })
}

fn pick_atmos<'a>(sorted: &[&'a VariantStream], ceiling: u32) -> Option<(&'a VariantStream, String)> {
    for &variant in sorted {
        let segments = variant.group_segments();
        let suffix = segments.last().copied().unwrap_or_default();
        match variant.codecs.as_str() {
            "ec-3" if variant.audio_group.contains("atmos") => {
                if let Ok(kbps) = suffix.parse::<u32>()
                    && kbps <= ceiling
                {
                    return Some((variant, format!("{suffix} kbps")));
                }
            }
            "ac-3" => return Some((variant, format!("{suffix} kbps"))),
            _ => {}
        }
    }
    None
}

fn pick_aac<'a>(sorted: &[&'a VariantStream], aac_type: &str) -> Option<(&'a VariantStream, String)> {
    static STEREO: OnceLock<Regex> = OnceLock::new();
    let stereo = static_regex(&STEREO, r"audio-stereo-\d+");

    sorted
        .iter()
        .filter(|v| v.codecs == "mp4a.40.2")
        .find(|v| stereo.replace_all(&v.audio_group, "aac") == aac_type)
        .map(|v| {
            let bitrate = v.group_segments().get(2).copied().unwrap_or_default().to_string();
            (*v, format!("{bitrate} kbps"))
        })
}

fn pick_alac<'a>(sorted: &[&'a VariantStream], ceiling: u32) -> Option<(&'a VariantStream, String)> {
    sorted
        .iter()
        .filter(|v| v.codecs == "alac")
        .find_map(|v| {
            let (sample_rate, bit_depth) = lossless_params(v)?;
            (sample_rate <= ceiling).then(|| {
                (
                    *v,
                    format!("{bit_depth}B-{:.1}kHz", f64::from(sample_rate) / 1000.0),
                )
            })
        })
}

/// Select the video variant no taller than `max_height`
pub fn select_video(base: &Url, playlist: &MasterPlaylist, max_height: u32) -> Result<ResolvedVideo> {
    let sorted = playlist.variants_by_bandwidth();
    let Some(first) = sorted.first() else {
        return Err(Error::NoVariant {
            reason: "manifest lists no video variants".to_string(),
        });
    };

    let chosen = sorted
        .iter()
        .map(|v| (*v, video_resolution(v)))
        .find(|(_, res)| res.is_some_and(|(_, h)| h <= max_height))
        .unwrap_or((*first, video_resolution(first)));

    Ok(ResolvedVideo {
        url: join_uri(base, &chosen.0.uri)?,
        resolution: chosen.1,
    })
}

/// Resolution from the `_<w>x<h>` marker in the URI, else the declared attribute
fn video_resolution(variant: &VariantStream) -> Option<(u32, u32)> {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    let marker = static_regex(&MARKER, r"_(\d+)x(\d+)");

    marker
        .captures(&variant.uri)
        .and_then(|caps| Some((caps[1].parse().ok()?, caps[2].parse().ok()?)))
        .or(variant.resolution)
}

/// Select the music-video audio rendition
///
/// Groups are tried in preference order; inside a group the highest `_gr<N>_`
/// rank wins.
pub fn select_video_audio(
    base: &Url,
    playlist: &MasterPlaylist,
    preference: MvAudioType,
) -> Result<Url> {
    static RANK: OnceLock<Regex> = OnceLock::new();
    let rank_marker = static_regex(&RANK, r"_gr(\d+)_");

    let groups: &[&str] = match preference {
        MvAudioType::Atmos => &["audio-atmos", "audio-ac3", "audio-stereo-256"],
        MvAudioType::Ac3 => &["audio-ac3", "audio-stereo-256"],
        MvAudioType::Aac => &["audio-stereo-256"],
    };

    for group in groups {
        let best = playlist
            .renditions
            .iter()
            .filter(|r| r.media_type.eq_ignore_ascii_case("AUDIO") && r.group_id == *group)
            .filter_map(|r| {
                let uri = r.uri.as_deref()?;
                let rank = rank_marker
                    .captures(uri)
                    .and_then(|caps| caps[1].parse::<u32>().ok())
                    .unwrap_or(0);
                Some((rank, uri))
            })
            .max_by_key(|(rank, _)| *rank);

        if let Some((_, uri)) = best {
            return join_uri(base, uri);
        }
    }

    Err(Error::NoVariant {
        reason: format!("no music video audio rendition for {preference:?}"),
    })
}

fn join_uri(base: &Url, uri: &str) -> Result<Url> {
    base.join(uri)
        .map_err(|e| Error::ParseFailure(format!("invalid variant URI {uri}: {e}")))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::super::parser::parse_master;
    use super::*;

    fn base() -> Url {
        Url::parse("https://cdn.example.com/item/1440/master.m3u8").unwrap()
    }

    fn audio_playlist(entries: &[(&str, &str, u64, &str)]) -> MasterPlaylist {
        let mut body = String::from("#EXTM3U\n");
        for (codec, group, bw, uri) in entries {
            body.push_str(&format!(
                "#EXT-X-STREAM-INF:BANDWIDTH={bw},AVERAGE-BANDWIDTH={bw},CODECS=\"{codec}\",AUDIO=\"{group}\"\n{uri}\n"
            ));
        }
        parse_master(&body).unwrap()
    }

    fn pref(mode: AudioMode) -> AudioPreference {
        AudioPreference::new(mode, &QualityConfig::default())
    }

    #[test]
    fn alac_picks_highest_rate_within_ceiling() {
        let p = audio_playlist(&[
            ("alac", "audio-alac-stereo-48000-16", 1_500_000, "alac_48.m3u8"),
            ("alac", "audio-alac-stereo-96000-24", 4_500_000, "alac_96.m3u8"),
        ]);
        let mut preference = pref(AudioMode::Alac);
        preference.alac_max = 96_000;

        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert_eq!(stream.url.as_str(), "https://cdn.example.com/item/1440/alac_96.m3u8");
        assert_eq!(stream.filename_quality, "24B-96.0kHz");
        assert_eq!(stream.display_quality, "24bit/96.0kHz");
    }

    #[test]
    fn alac_ceiling_skips_higher_rates() {
        let p = audio_playlist(&[
            ("alac", "audio-alac-stereo-192000-24", 9_000_000, "alac_192.m3u8"),
            ("alac", "audio-alac-stereo-44100-16", 1_400_000, "alac_44.m3u8"),
        ]);
        let mut preference = pref(AudioMode::Alac);
        preference.alac_max = 48_000;

        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert!(stream.url.as_str().ends_with("alac_44.m3u8"));
        assert_eq!(stream.filename_quality, "16B-44.1kHz");
    }

    #[test]
    fn selection_is_deterministic() {
        let p = audio_playlist(&[
            ("alac", "audio-alac-stereo-48000-24", 2_000_000, "a.m3u8"),
            ("alac", "audio-alac-stereo-48000-24", 2_000_000, "b.m3u8"),
        ]);
        let first = select_audio(&base(), &p, &pref(AudioMode::Alac)).unwrap();
        let second = select_audio(&base(), &p, &pref(AudioMode::Alac)).unwrap();
        assert_eq!(first, second);
        assert!(first.url.as_str().ends_with("a.m3u8"), "ties keep document order");
    }

    #[test]
    fn atmos_compares_raw_suffix_against_ceiling() {
        let p = audio_playlist(&[
            ("ec-3", "audio-atmos-2768", 900_000, "atmos_2768.m3u8"),
            ("ec-3", "audio-atmos-448", 500_000, "atmos_448.m3u8"),
        ]);
        let mut preference = pref(AudioMode::Atmos);

        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert!(stream.url.as_str().ends_with("atmos_2768.m3u8"));
        assert_eq!(stream.filename_quality, "2768 kbps");
        assert_eq!(stream.display_quality, "Dolby Atmos");

        preference.atmos_max = 1000;
        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert!(stream.url.as_str().ends_with("atmos_448.m3u8"));
        assert_eq!(stream.filename_quality, "448 kbps");
    }

    #[test]
    fn atmos_accepts_surround_when_reached_first() {
        let p = audio_playlist(&[
            ("ec-3", "audio-atmos-2768", 900_000, "atmos.m3u8"),
            ("ac-3", "audio-ac3-640", 700_000, "ac3.m3u8"),
        ]);
        let mut preference = pref(AudioMode::Atmos);
        preference.atmos_max = 700;

        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert!(stream.url.as_str().ends_with("ac3.m3u8"));
        assert_eq!(stream.filename_quality, "640 kbps");
    }

    #[test]
    fn aac_matches_normalized_group_type() {
        let p = audio_playlist(&[
            ("mp4a.40.2", "audio-stereo-256-binaural", 300_000, "binaural.m3u8"),
            ("mp4a.40.2", "audio-stereo-256", 280_000, "stereo.m3u8"),
        ]);
        let mut preference = pref(AudioMode::Aac);
        preference.aac_type = "aac".to_string();

        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert!(stream.url.as_str().ends_with("stereo.m3u8"));
        assert_eq!(stream.filename_quality, "256 kbps");

        preference.aac_type = "aac-binaural".to_string();
        let stream = select_audio(&base(), &p, &preference).unwrap();
        assert!(stream.url.as_str().ends_with("binaural.m3u8"));
    }

    #[test]
    fn falls_back_to_first_variant() {
        let p = audio_playlist(&[
            ("mp4a.40.2", "audio-stereo-64", 70_000, "low.m3u8"),
            ("mp4a.40.2", "audio-stereo-256", 280_000, "high.m3u8"),
        ]);
        let stream = select_audio(&base(), &p, &pref(AudioMode::Alac)).unwrap();
        assert!(stream.url.as_str().ends_with("high.m3u8"), "first by bandwidth");
        assert_eq!(stream.filename_quality, "");
    }

    #[test]
    fn empty_manifest_is_no_variant() {
        let err = select_audio(&base(), &MasterPlaylist::default(), &pref(AudioMode::Alac))
            .unwrap_err();
        assert!(matches!(err, Error::NoVariant { .. }));
    }

    const VIDEO: &str = r#"#EXTM3U
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-stereo-256",NAME="Stereo",URI="audio/stereo_gr256_main.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-atmos",NAME="Atmos",URI="audio/atmos_gr300_main.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-atmos",NAME="Atmos alt",URI="audio/atmos_gr200_alt.m3u8"
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="audio-ac3",NAME="Surround",URI="audio/ac3_gr150_main.m3u8"
#EXT-X-STREAM-INF:BANDWIDTH=25000000,CODECS="hvc1",AUDIO="audio-atmos"
video/clip_3840x2160_25000.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=8000000,CODECS="avc1",AUDIO="audio-atmos"
video/clip_1920x1080_8000.m3u8
#EXT-X-STREAM-INF:BANDWIDTH=3000000,CODECS="avc1",RESOLUTION=1280x720,AUDIO="audio-atmos"
video/clip_hd.m3u8
"#;

    #[test]
    fn video_respects_height_ceiling() {
        let p = parse_master(VIDEO).unwrap();

        let video = select_video(&base(), &p, 2160).unwrap();
        assert!(video.url.as_str().ends_with("clip_3840x2160_25000.m3u8"));
        assert_eq!(video.resolution, Some((3840, 2160)));

        let video = select_video(&base(), &p, 1080).unwrap();
        assert!(video.url.as_str().ends_with("clip_1920x1080_8000.m3u8"));

        let video = select_video(&base(), &p, 720).unwrap();
        assert_eq!(video.resolution, Some((1280, 720)), "declared RESOLUTION used");

        let video = select_video(&base(), &p, 480).unwrap();
        assert!(video.url.as_str().ends_with("clip_3840x2160_25000.m3u8"), "fallback to first");
    }

    #[test]
    fn video_audio_prefers_group_then_rank() {
        let p = parse_master(VIDEO).unwrap();

        let url = select_video_audio(&base(), &p, MvAudioType::Atmos).unwrap();
        assert!(url.as_str().ends_with("atmos_gr300_main.m3u8"));

        let url = select_video_audio(&base(), &p, MvAudioType::Ac3).unwrap();
        assert!(url.as_str().ends_with("ac3_gr150_main.m3u8"));

        let url = select_video_audio(&base(), &p, MvAudioType::Aac).unwrap();
        assert!(url.as_str().ends_with("stereo_gr256_main.m3u8"));
    }

    #[test]
    fn video_audio_without_renditions_is_no_variant() {
        let p = audio_playlist(&[("alac", "audio-alac-stereo-48000-16", 1, "a.m3u8")]);
        assert!(matches!(
            select_video_audio(&base(), &p, MvAudioType::Atmos),
            Err(Error::NoVariant { .. })
        ));
    }
}
