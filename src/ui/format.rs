//! Status text for progress rows

use crate::types::{ProgressEvent, ProgressStage};
use crate::utils::{format_speed, truncate_ellipsis};

/// Row text before a worker picks the item up
pub const STATUS_WAITING: &str = "Waiting";
/// Row text while tags are written
pub const STATUS_TAGGING: &str = "Writing tags...";
/// Row text after a successful acquisition
pub const STATUS_DONE: &str = "Done";
/// Row text for items found on disk or in the ledger
pub const STATUS_PRESENT: &str = "Already present";

/// Live transfer line, e.g. `US downloading 42% (1.2 MB/s)`
pub fn progress_status(region: &str, event: &ProgressEvent) -> String {
    let verb = match event.stage {
        ProgressStage::Download => "downloading",
        ProgressStage::Decrypt => "decrypting",
    };
    format!(
        "{region} {verb} {}% ({})",
        event.percentage.min(100),
        format_speed(event.speed_bytes_per_sec)
    )
}

/// Warning shown once when an account gives up on an item
pub fn account_failed_status(account_name: &str) -> String {
    format!("Account {account_name} failed, trying next...")
}

/// Terminal failure text bounded by the terminal width
pub fn failed_status(error: &str, width: usize) -> String {
    format!("Failed: {}", truncate_error(error, width))
}

/// Cut an error message to 60, 40 or 30 code points depending on `width`
pub fn truncate_error(message: &str, width: usize) -> String {
    let limit = if width > 60 {
        60
    } else if width > 40 {
        40
    } else {
        30
    };
    // Multi-line errors only show their first line in a row
    let first_line = message.lines().next().unwrap_or_default();
    truncate_ellipsis(first_line, limit)
}
