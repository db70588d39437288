//! Path length fitting
//!
//! [`fit`] shortens the components of `base/outer/inner/file_name` until the joined
//! path fits within a maximum length. The file name's stem goes first (keeping any
//! leading track-number prefix such as `"03. "`), then the inner directory, then the
//! outer directory. Directories keep at least one character. Lengths are counted in
//! Unicode code points.

use crate::utils::static_regex;
use regex::Regex;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::sync::OnceLock;

/// Result of [`fit`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FitOutcome {
    /// Outer directory component (e.g. artist folder)
    pub outer: String,
    /// Inner directory component (e.g. album folder)
    pub inner: String,
    /// File name including extension
    pub file_name: String,
    /// Whether the joined path is within the limit
    ///
    /// `false` means nothing could shrink further; the components are still the
    /// best effort and callers should use them.
    pub fits: bool,
}

impl FitOutcome {
    /// Join the components under `base`, skipping empty ones
    pub fn path(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        for part in [&self.outer, &self.inner, &self.file_name] {
            if !part.is_empty() {
                path.push(part);
            }
        }
        path
    }

    /// Directory holding the file
    pub fn dir(&self, base: &Path) -> PathBuf {
        let mut path = base.to_path_buf();
        for part in [&self.outer, &self.inner] {
            if !part.is_empty() {
                path.push(part);
            }
        }
        path
    }
}

fn ordinal_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    static_regex(&PREFIX, r"^(\d+[\s.\-]*)")
}

/// Length in code points of the joined path, skipping empty components
pub fn joined_len(base: &Path, outer: &str, inner: &str, file_name: &str) -> usize {
    let base = base.to_string_lossy();
    let mut len = 0;
    let mut parts = 0;
    for part in [base.as_ref(), outer, inner, file_name] {
        if part.is_empty() {
            continue;
        }
        if parts > 0 {
            len += 1;
        }
        len += part.chars().count();
        parts += 1;
    }
    // A base ending in a separator (e.g. "/") already provides it
    if base.ends_with(MAIN_SEPARATOR) && parts > 1 {
        len -= 1;
    }
    len
}

/// Shorten components until the joined path length is at most `max_len`
///
/// Never fails. If no component can shrink further the returned outcome has
/// `fits == false`.
pub fn fit(base: &Path, outer: &str, inner: &str, file_name: &str, max_len: usize) -> FitOutcome {
    let mut outer = outer.to_string();
    let mut inner = inner.to_string();
    let mut file_name = file_name.to_string();

    loop {
        let current = joined_len(base, &outer, &inner, &file_name);
        if current <= max_len {
            return FitOutcome {
                outer,
                inner,
                file_name,
                fits: true,
            };
        }
        let overage = current - max_len;

        let (stem, ext) = split_extension(&file_name);
        let (prefix, name_part) = match ordinal_prefix().find(stem) {
            Some(m) => stem.split_at(m.end()),
            None => ("", stem),
        };

        let name_len = name_part.chars().count();
        if name_len > 0 {
            let name = drop_trailing(name_part, overage.min(name_len));
            let prefix = if name.is_empty() {
                prefix.trim_end_matches([' ', '.', '-'])
            } else {
                prefix
            };
            file_name = format!("{prefix}{name}{ext}");
            continue;
        }

        let inner_len = inner.chars().count();
        if inner_len > 1 {
            inner = drop_trailing(&inner, overage.min(inner_len - 1)).to_string();
            continue;
        }

        let outer_len = outer.chars().count();
        if outer_len > 1 {
            outer = drop_trailing(&outer, overage.min(outer_len - 1)).to_string();
            continue;
        }

        tracing::debug!(
            length = current,
            max_len,
            "Path cannot be shortened further"
        );
        return FitOutcome {
            outer,
            inner,
            file_name,
            fits: false,
        };
    }
}

/// Split `file_name` into stem and extension (with its dot)
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(dot) => file_name.split_at(dot),
        None => (file_name, ""),
    }
}

/// Remove `count` trailing code points
fn drop_trailing(s: &str, count: usize) -> &str {
    let keep = s.chars().count().saturating_sub(count);
    match s.char_indices().nth(keep) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}
