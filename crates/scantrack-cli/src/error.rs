use std::path::PathBuf;

use thiserror::Error;

use scantrack_core::error::ScantrackError;
use scantrack_runtime::{RuntimeError, TrackerError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ScantrackError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Selection(String),

    #[error("{} already exists; pass --force to overwrite", .0.display())]
    ConfigExists(PathBuf),

    #[error("not signed in; run `scantrack login` first")]
    SignedOut,
}
