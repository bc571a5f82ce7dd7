//! Sidecar metadata files: `{stem}.meta.json` next to a document.
//!
//! Sidecars carry sender/subject/timestamp/language hints. They are always
//! optional, and a malformed sidecar degrades to empty metadata — a bad
//! hint file must never block the document it describes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Sidecar suffix appended to the document stem.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Metadata key carrying the upstream receive time.
pub const RECEIVED_TIMESTAMP_KEY: &str = "received_timestamp";

/// Path of the sidecar belonging to `document`: `invoice.pdf` → `invoice.meta.json`.
pub fn sidecar_path(document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    document.with_file_name(format!("{stem}{SIDECAR_SUFFIX}"))
}

/// True if `path` itself is a sidecar file.
pub fn is_sidecar(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(SIDECAR_SUFFIX))
}

/// Load sidecar metadata for a document as a flat string map.
///
/// Non-string JSON values are stringified. Missing, unreadable, or
/// malformed sidecars all yield an empty map.
pub fn load_metadata(document: &Path) -> BTreeMap<String, String> {
    let path = sidecar_path(document);
    if !path.exists() {
        return BTreeMap::new();
    }

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read sidecar — ignoring");
            return BTreeMap::new();
        }
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&raw) {
        Ok(map) => map
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed sidecar — ignoring");
            BTreeMap::new()
        }
    }
}

/// Parse an ISO-8601 timestamp, tolerant of a trailing UTC `Z` marker
/// and of a missing offset (treated as UTC).
pub fn parse_received_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let trimmed = value.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    None
}
