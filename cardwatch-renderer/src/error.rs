//! Error types for cardwatch-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while producing a card.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Filesystem error while loading templates or writing a card.
    #[error("card io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// The capture command could not be started or exited unsuccessfully.
    #[error("capture command `{program}` failed: {message}")]
    Capture { program: String, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}
