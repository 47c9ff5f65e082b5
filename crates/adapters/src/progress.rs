// SPDX-License-Identifier: MIT

//! Classifies one line of merged stdout/stderr from the extractor process.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A `status: "downloading"` progress tick.
    Downloading {
        downloaded_bytes: Option<u64>,
        total_bytes: Option<u64>,
        speed_bytes_per_sec: Option<f64>,
        eta_seconds: Option<u64>,
    },
    /// A `status: "finished"` tick — the download is done, post-processing follows.
    Finished,
    /// A per-item info object (`_type: "video"`), carrying metadata used to
    /// resolve the destination folder on the first item of a run.
    ItemInfo {
        title: Option<String>,
        playlist_title: Option<String>,
        thumbnail: Option<String>,
        playlist_index: Option<u32>,
        playlist_count: Option<u32>,
    },
    /// A post-processing banner line (`[ExtractAudio]`, `[Merger]`, `[Fixup...`).
    Processing,
    /// Anything else — logged verbatim, not otherwise interpreted.
    LogLine,
}

const PROCESSING_MARKERS: &[&str] = &["[ExtractAudio]", "[Merger]", "[Fixup"];

/// Stateless line classifier. A struct (rather than a free function) so it
/// can grow per-run state (e.g. a compiled matcher) without changing callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressParser;

impl ProgressParser {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, line: &str) -> ProgressEvent {
        let trimmed = line.trim();
        if trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Self::classify_json(&value);
            }
        }
        if PROCESSING_MARKERS.iter().any(|m| trimmed.contains(m)) {
            return ProgressEvent::Processing;
        }
        ProgressEvent::LogLine
    }

    fn classify_json(value: &Value) -> ProgressEvent {
        match value.get("status").and_then(Value::as_str) {
            Some("downloading") => {
                return ProgressEvent::Downloading {
                    downloaded_bytes: value.get("downloaded_bytes").and_then(Value::as_u64),
                    total_bytes: value
                        .get("total_bytes")
                        .or_else(|| value.get("total_bytes_estimate"))
                        .and_then(Value::as_u64),
                    speed_bytes_per_sec: value.get("speed").and_then(Value::as_f64),
                    eta_seconds: value.get("eta").and_then(Value::as_u64),
                };
            }
            Some("finished") => return ProgressEvent::Finished,
            _ => {}
        }

        if value.get("_type").and_then(Value::as_str) == Some("video") {
            return ProgressEvent::ItemInfo {
                title: value.get("title").and_then(Value::as_str).map(str::to_string),
                playlist_title: value
                    .get("playlist_title")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                thumbnail: value
                    .get("thumbnail")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                playlist_index: value
                    .get("playlist_index")
                    .and_then(Value::as_u64)
                    .map(|n| n as u32),
                playlist_count: value
                    .get("n_entries")
                    .or_else(|| value.get("playlist_count"))
                    .and_then(Value::as_u64)
                    .map(|n| n as u32),
            };
        }

        ProgressEvent::LogLine
    }
}

impl ProgressEvent {
    /// Percentage complete, when this event is a downloading tick with both
    /// a byte count and a known or estimated total.
    pub fn percent(&self) -> Option<f32> {
        match self {
            ProgressEvent::Downloading {
                downloaded_bytes: Some(done),
                total_bytes: Some(total),
                ..
            } if *total > 0 => Some(100.0 * (*done as f32) / (*total as f32)),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
