//! Per-family quality summary of a master playlist
//!
//! Used for the display quality shown next to each item and for the diagnostic
//! listing. Building a summary never selects a variant.

use super::parser::{MasterPlaylist, VariantStream};
use serde::Serialize;

/// Placeholder for families missing from the manifest
pub const NOT_AVAILABLE: &str = "Not Available";

/// Best quality found per codec family
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FamilySummary {
    /// Lossless above 48 kHz, e.g. `24bit/192.0kHz`
    pub hires: Option<String>,
    /// Lossless up to 48 kHz, e.g. `24bit/48.0kHz`
    pub lossless: Option<String>,
    /// Spatial audio bitrate, e.g. `768 kbps`
    pub atmos: Option<String>,
    /// Legacy surround bitrate
    pub dolby_audio: Option<String>,
    /// Compressed stereo bitrate
    pub aac: Option<String>,
}

impl FamilySummary {
    /// Summarize variants that are already sorted by descending bandwidth
    pub fn from_sorted(variants: &[&VariantStream]) -> Self {
        let mut summary = FamilySummary::default();
        let mut atmos_best = None;
        let mut dolby_best = None;
        let mut aac_best = None;

        for variant in variants {
            let segments = variant.group_segments();
            match variant.codecs.as_str() {
                "alac" => {
                    let Some((sample_rate, bit_depth)) = lossless_params(variant) else {
                        continue;
                    };
                    let label = lossless_display(sample_rate, bit_depth);
                    // First hit is the highest-bandwidth one
                    if sample_rate > 48_000 {
                        summary.hires.get_or_insert(label);
                    } else {
                        summary.lossless.get_or_insert(label);
                    }
                }
                "ec-3" if variant.audio_group.contains("atmos") => {
                    if let Some(kbps) = segments.last().and_then(|s| atmos_display_bitrate(s)) {
                        atmos_best = atmos_best.max(Some(kbps));
                    }
                }
                "ac-3" => {
                    if let Some(kbps) = segments.last().and_then(|s| s.parse::<u32>().ok()) {
                        dolby_best = dolby_best.max(Some(kbps));
                    }
                }
                "mp4a.40.2" => {
                    if let Some(kbps) = segments.get(2).and_then(|s| s.parse::<u32>().ok()) {
                        aac_best = aac_best.max(Some(kbps));
                    }
                }
                _ => {}
            }
        }

        summary.atmos = atmos_best.map(|kbps| format!("{kbps} kbps"));
        summary.dolby_audio = dolby_best.map(|kbps| format!("{kbps} kbps"));
        summary.aac = aac_best.map(|kbps| format!("{kbps} kbps"));
        summary
    }

    /// Single quality label, best family first
    pub fn display_quality(&self) -> String {
        if let Some(hires) = &self.hires {
            hires.clone()
        } else if let Some(lossless) = &self.lossless {
            lossless.clone()
        } else if self.atmos.is_some() {
            "Dolby Atmos".to_string()
        } else if self.dolby_audio.is_some() {
            "Dolby Audio".to_string()
        } else {
            "AAC".to_string()
        }
    }

    /// `(family, quality)` rows with missing families marked [`NOT_AVAILABLE`]
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        let show = |value: &Option<String>| {
            value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };
        vec![
            ("Hi-Res Lossless", show(&self.hires)),
            ("Lossless", show(&self.lossless)),
            ("Dolby Atmos", show(&self.atmos)),
            ("Dolby Audio", show(&self.dolby_audio)),
            ("AAC", show(&self.aac)),
        ]
    }
}

/// One row of the diagnostic variant table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VariantRow {
    /// Codec identifier
    pub codecs: String,
    /// Audio group id
    pub audio_group: String,
    /// Peak bandwidth
    pub bandwidth: u64,
    /// Average bandwidth
    pub average_bandwidth: u64,
}

/// Diagnostic report for one manifest
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ManifestInventory {
    /// Label shown in the status table
    pub display_quality: String,
    /// Per-family summary
    pub families: FamilySummary,
    /// Variants by descending average bandwidth
    pub variants: Vec<VariantRow>,
}

/// Build the diagnostic report
pub fn inventory(playlist: &MasterPlaylist) -> ManifestInventory {
    let sorted = playlist.variants_by_bandwidth();
    let families = FamilySummary::from_sorted(&sorted);
    ManifestInventory {
        display_quality: families.display_quality(),
        variants: sorted
            .iter()
            .map(|v| VariantRow {
                codecs: v.codecs.clone(),
                audio_group: v.audio_group.clone(),
                bandwidth: v.bandwidth,
                average_bandwidth: v.average_bandwidth,
            })
            .collect(),
        families,
    }
}

/// `(sample_rate, bit_depth)` from the last two segments of an ALAC group id
pub(crate) fn lossless_params(variant: &VariantStream) -> Option<(u32, u32)> {
    let segments = variant.group_segments();
    let [.., rate, depth] = segments.as_slice() else {
        return None;
    };
    Some((rate.parse().ok()?, depth.parse().ok()?))
}

fn lossless_display(sample_rate: u32, bit_depth: u32) -> String {
    format!("{bit_depth}bit/{:.1}kHz", f64::from(sample_rate) / 1000.0)
}

/// Spatial-audio bitrate for display.
///
/// Workaround: some catalogs encode the bitrate suffix as a 4-character value with
/// a spurious leading `2` (e.g. `2768` for 768 kbps). Only that exact shape is
/// corrected; selection compares the raw suffix against the ceiling.
fn atmos_display_bitrate(suffix: &str) -> Option<u32> {
    let digits = match suffix.strip_prefix('2') {
        Some(rest) if suffix.len() == 4 => rest,
        _ => suffix,
    };
    digits.parse().ok()
}
