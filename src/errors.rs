use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a run. Everything recoverable is reported through the
/// run summary instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input directory '{0}' does not exist or is not a directory")]
    InputDirMissing(PathBuf),
    #[error("failed to write archive '{path}': {source}")]
    Archive { path: PathBuf, source: io::Error },
    #[error("failed to write report '{path}': {source}")]
    Report { path: PathBuf, source: io::Error },
    #[error("failed to persist alert store '{path}': {source}")]
    AlertStore { path: PathBuf, source: io::Error },
    #[error("failed to write outbox file '{path}': {source}")]
    Outbox { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Io(#[from] io::Error),
}
