pub mod scheduler;
pub mod sidecar;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InboxError {
    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read watch directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}
