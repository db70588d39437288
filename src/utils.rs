//! Utility functions for text measurement and formatting

use regex::Regex;
use std::sync::OnceLock;

/// Compile a hard-coded pattern once and cache it in `cell`
#[allow(clippy::expect_used)]
pub(crate) fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("hard-coded pattern is valid"))
}

/// Number of Unicode code points in `s`
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Keep at most `max` code points of `s`
///
/// # Examples
///
/// ```
/// use media_dl::utils::limit_chars;
///
/// assert_eq!(limit_chars("Kyōto Nights", 5), "Kyōto");
/// assert_eq!(limit_chars("short", 10), "short");
/// ```
pub fn limit_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

/// Truncate `s` to fit in `avail` code points, ending with `...` when cut
///
/// When `avail` is 3 or less only the ellipsis is returned.
///
/// # Examples
///
/// ```
/// use media_dl::utils::truncate_ellipsis;
///
/// assert_eq!(truncate_ellipsis("Bohemian Rhapsody", 10), "Bohemia...");
/// assert_eq!(truncate_ellipsis("Intro", 10), "Intro");
/// assert_eq!(truncate_ellipsis("Intro", 3), "...");
/// ```
pub fn truncate_ellipsis(s: &str, avail: usize) -> String {
    if char_len(s) <= avail {
        return s.to_string();
    }
    if avail <= 3 {
        return "...".to_string();
    }
    format!("{}...", limit_chars(s, avail - 3))
}

/// Human-readable transfer speed (`B/s`, `KB/s`, `MB/s`) with one decimal
///
/// # Examples
///
/// ```
/// use media_dl::utils::format_speed;
///
/// assert_eq!(format_speed(512.0), "512.0 B/s");
/// assert_eq!(format_speed(1536.0), "1.5 KB/s");
/// assert_eq!(format_speed(3.0 * 1024.0 * 1024.0), "3.0 MB/s");
/// ```
pub fn format_speed(bytes_per_sec: f64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    let speed = if bytes_per_sec.is_finite() {
        bytes_per_sec.max(0.0)
    } else {
        0.0
    };
    if speed < KIB {
        format!("{speed:.1} B/s")
    } else if speed < MIB {
        format!("{:.1} KB/s", speed / KIB)
    } else {
        format!("{:.1} MB/s", speed / MIB)
    }
}
