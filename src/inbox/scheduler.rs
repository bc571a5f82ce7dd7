//! Inbox scanning and archival.
//!
//! `scan` builds a FIFO queue of unprocessed documents ordered by effective
//! timestamp (sidecar `received_timestamp` when present, filesystem mtime
//! otherwise), so processing order is deterministic even when files arrive
//! out of wall-clock order. `archive` moves a document and its sidecar out
//! of the inbox unconditionally after a pipeline run; failures are logged
//! and the file is simply re-scanned next cycle (at-least-once delivery).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::sidecar;
use super::InboxError;

/// Extensions the pipeline can extract text from.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "json"];

/// One discovered, not-yet-processed document plus its sidecar metadata.
#[derive(Debug, Clone)]
pub struct Job {
    pub source_path: PathBuf,
    pub metadata: BTreeMap<String, String>,
    /// Effective priority timestamp used for queue ordering.
    pub discovered_at: DateTime<Utc>,
}

impl Job {
    pub fn file_name(&self) -> String {
        self.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Watches an inbox directory and archives finished documents.
pub struct InboxScheduler {
    watch_dir: PathBuf,
    processed_dir: PathBuf,
}

impl InboxScheduler {
    /// Create a scheduler, ensuring both directories exist.
    pub fn new(watch_dir: &Path, processed_dir: &Path) -> Result<Self, InboxError> {
        for dir in [watch_dir, processed_dir] {
            std::fs::create_dir_all(dir).map_err(|source| InboxError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        Ok(Self {
            watch_dir: watch_dir.to_path_buf(),
            processed_dir: processed_dir.to_path_buf(),
        })
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    /// Enumerate pending documents in ascending effective-timestamp order.
    ///
    /// Hidden files, sidecar files, and unsupported extensions are skipped.
    /// A file that disappears mid-scan is skipped, not an error — an
    /// external mover may have raced us.
    pub fn scan(&self) -> Result<Vec<Job>, InboxError> {
        let entries = std::fs::read_dir(&self.watch_dir).map_err(|source| InboxError::ReadDir {
            path: self.watch_dir.clone(),
            source,
        })?;

        let mut jobs = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            if !is_candidate(&path) {
                continue;
            }

            let metadata = sidecar::load_metadata(&path);
            let Some(discovered_at) = effective_timestamp(&path, &metadata) else {
                // File vanished between listing and stat
                tracing::debug!(path = %path.display(), "Candidate disappeared mid-scan — skipping");
                continue;
            };

            tracing::info!(file = %path.display(), "New invoice detected");
            jobs.push(Job {
                source_path: path,
                metadata,
                discovered_at,
            });
        }

        jobs.sort_by(|a, b| {
            a.discovered_at
                .cmp(&b.discovered_at)
                .then_with(|| a.source_path.cmp(&b.source_path))
        });

        Ok(jobs)
    }

    /// Move a processed document and its sidecar into the archive,
    /// prefixing both with a timestamp to avoid name collisions.
    ///
    /// Idempotent against a missing source; never returns an error — an
    /// unarchived file is picked up again on the next scan.
    pub fn archive(&self, path: &Path) {
        let prefix = Utc::now().format("%Y%m%d%H%M%S");

        for target in [path.to_path_buf(), sidecar::sidecar_path(path)] {
            let Some(name) = target.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if !target.exists() {
                if target == path {
                    tracing::warn!(file = %path.display(), "Archive target already gone — skipping");
                }
                continue;
            }

            let destination = self.processed_dir.join(format!("{prefix}_{name}"));
            match std::fs::rename(&target, &destination) {
                Ok(()) => {
                    tracing::info!(from = %target.display(), to = %destination.display(), "Archived")
                }
                Err(e) => {
                    tracing::error!(
                        file = %target.display(),
                        error = %e,
                        "Archive failed — file stays in inbox"
                    );
                }
            }
        }
    }
}

fn is_candidate(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if name.starts_with('.') || sidecar::is_sidecar(path) {
        return false;
    }

    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
}

/// Sidecar `received_timestamp` wins; filesystem mtime is the fallback.
/// `None` only when the file cannot be stat'd at all.
fn effective_timestamp(
    path: &Path,
    metadata: &BTreeMap<String, String>,
) -> Option<DateTime<Utc>> {
    if let Some(raw) = metadata.get(sidecar::RECEIVED_TIMESTAMP_KEY) {
        match sidecar::parse_received_timestamp(raw) {
            Some(ts) => return Some(ts),
            None => {
                tracing::warn!(
                    file = %path.display(),
                    value = %raw,
                    "Unparseable received_timestamp — falling back to mtime"
                );
            }
        }
    }

    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}
