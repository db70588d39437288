//! Width-adaptive layout of one progress row
//!
//! Rows degrade through four tiers as the terminal narrows:
//!
//! | Width | Row |
//! |-------|-----|
//! | 60+ | `Track 1 of 14: Name (24bit/96.0kHz) - Status` |
//! | 40+ | `Track 1 of 14: Name - Status` |
//! | 25+ | `[1/14] Name - Status` |
//! | less | `[1/14] Status` |
//!
//! All measurements are in code points.

use crate::types::{ItemStatus, StatusTone};
use crate::utils::{char_len, limit_chars, truncate_ellipsis};
use crossterm::style::{StyledContent, Stylize};

/// Width used when the terminal size cannot be read
pub const DEFAULT_WIDTH: usize = 80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tier {
    Full,
    NoQuality,
    Compact,
    StatusOnly,
}

impl Tier {
    fn for_width(width: usize) -> Self {
        match width {
            w if w >= 60 => Tier::Full,
            w if w >= 40 => Tier::NoQuality,
            w if w >= 25 => Tier::Compact,
            _ => Tier::StatusOnly,
        }
    }

    /// Name budget floor; the name keeps at least this many code points
    fn min_name_budget(self) -> usize {
        match self {
            Tier::Full => 10,
            Tier::NoQuality => 8,
            Tier::Compact => 5,
            Tier::StatusOnly => 0,
        }
    }
}

/// Text of a row before the status, e.g. `Track 1 of 14: Name (16bit/44.1kHz) - `
fn row_head(row: &ItemStatus, width: usize) -> String {
    let tier = Tier::for_width(width);
    let prefix = match tier {
        Tier::Full | Tier::NoQuality => format!("Track {} of {}: ", row.ordinal, row.total),
        Tier::Compact | Tier::StatusOnly => format!("[{}/{}] ", row.ordinal, row.total),
    };
    if tier == Tier::StatusOnly {
        return prefix;
    }

    let quality = match tier {
        Tier::Full if !row.quality.is_empty() => format!(" {}", row.quality),
        _ => String::new(),
    };
    let suffix_len = char_len(&quality) + 3 + char_len(&row.status);
    let budget = width
        .saturating_sub(char_len(&prefix) + suffix_len + 1)
        .max(tier.min_name_budget());

    format!(
        "{prefix}{}{quality} - ",
        truncate_ellipsis(&row.name, budget)
    )
}

/// Uncoloured row text for `width`
pub fn plain_line(row: &ItemStatus, width: usize) -> String {
    let line = format!("{}{}", row_head(row, width), row.status);
    if char_len(&line) <= width {
        line
    } else if width <= 3 {
        limit_chars(&line, width).to_string()
    } else {
        format!("{}...", limit_chars(&line, width - 3))
    }
}

/// Row text for `width` with the status coloured by tone
///
/// Lines that needed the final safety cut are returned without colour.
pub fn compose_line(row: &ItemStatus, width: usize) -> String {
    let head = row_head(row, width);
    if char_len(&head) + char_len(&row.status) > width {
        return plain_line(row, width);
    }
    format!("{head}{}", styled_status(&row.status, row.tone))
}

fn styled_status(status: &str, tone: StatusTone) -> StyledContent<&str> {
    match tone {
        StatusTone::Pending => status.dark_grey(),
        StatusTone::Active => status.cyan(),
        StatusTone::Notice => status.blue(),
        StatusTone::Warning => status.yellow(),
        StatusTone::Success => status.green(),
        StatusTone::Skipped => status.dark_green(),
        StatusTone::Failed => status.red(),
    }
}
