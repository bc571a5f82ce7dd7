pub mod crosscheck;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErpError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed reference file {path}: {reason}")]
    MalformedFile { path: PathBuf, reason: String },
}
