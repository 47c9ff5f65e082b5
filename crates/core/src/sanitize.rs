// SPDX-License-Identifier: MIT

//! Cross-platform filesystem-safe name sanitization.
//!
//! NFC-normalizes first (`unicodedata.normalize('NFC', name)` in the
//! original), then applies the forbidden-character / reserved-name /
//! byte-length rules of the original service's sanitizer.

use std::borrow::Cow;

use unicode_normalization::UnicodeNormalization;

const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const MAX_BYTES: usize = 240;
const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Produce a filesystem-safe name from arbitrary user-supplied text.
///
/// `sanitize(sanitize(x)) == sanitize(x)` for all `x` (see `sanitize_tests`).
pub fn sanitize(raw: &str) -> String {
    if raw.trim().is_empty() {
        return "Untitled".to_string();
    }

    let normalized: String = raw.nfc().collect();
    let collapsed = collapse_forbidden(&normalized);
    let trimmed = trim_whitespace_and_dots(&collapsed);
    let guarded = guard_reserved_name(trimmed);
    let truncated = truncate_preserving_extension(&guarded, MAX_BYTES);

    let result = trim_whitespace_and_dots(&truncated);
    if result.is_empty() || result.chars().all(|c| c == '.') {
        "Untitled".to_string()
    } else {
        result.to_string()
    }
}

fn collapse_forbidden(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut run = false;
    for ch in raw.chars() {
        let forbidden = ch.is_control() || FORBIDDEN.contains(&ch);
        if forbidden {
            if !run {
                out.push('-');
                run = true;
            }
        } else {
            out.push(ch);
            run = false;
        }
    }
    collapse_whitespace(&out)
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !run {
                out.push(' ');
                run = true;
            }
        } else {
            out.push(ch);
            run = false;
        }
    }
    out
}

fn trim_whitespace_and_dots(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '.')
}

/// If the stem (the part before the final `.`) case-insensitively matches a
/// Windows-reserved device name, prefix it with `_` so `CON.txt` becomes
/// `_CON.txt` rather than silently colliding with a device file.
fn guard_reserved_name(s: &str) -> Cow<'_, str> {
    let stem = match s.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => s,
    };
    if RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
        Cow::Owned(format!("_{s}"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Truncate to at most `max_bytes` UTF-8 bytes, preferring to cut the stem and
/// keep the extension intact.
fn truncate_preserving_extension(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let (stem, ext) = match s.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < max_bytes => (stem, Some(ext)),
        _ => (s, None),
    };

    let ext_len = ext.map(|e| e.len() + 1).unwrap_or(0);
    let budget = max_bytes.saturating_sub(ext_len);
    let truncated_stem = floor_char_boundary(stem, budget);

    match ext {
        Some(ext) => format!("{truncated_stem}.{ext}"),
        None => truncated_stem.to_string(),
    }
}

/// `str::floor_char_boundary` is not yet stable; this is the same algorithm.
fn floor_char_boundary(s: &str, index: usize) -> &str {
    if index >= s.len() {
        return s;
    }
    let mut idx = index;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    &s[..idx]
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
