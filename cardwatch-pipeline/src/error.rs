//! Error types for cardwatch-pipeline.

use thiserror::Error;

use cardwatch_core::LedgerError;

/// Errors that stop a single repository check.
///
/// Fetch failures and render failures are not here: the former are reported
/// as a classification, the latter are logged and skipped.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Loading or saving the ledger failed.
    #[error("ledger error: {0}")]
    Storage(#[from] LedgerError),

    /// The requested repository has no ledger entry.
    #[error("repository {owner}/{repo} is not subscribed; run `cardwatch add {owner} {repo}` first")]
    NotSubscribed { owner: String, repo: String },

    /// The entry disappeared between the fetch and the revision write.
    #[error("ledger entry {owner}/{repo} vanished during the check")]
    LedgerDrift { owner: String, repo: String },
}

impl PipelineError {
    pub(crate) fn from_update(err: LedgerError) -> Self {
        match err {
            LedgerError::NotFound { owner, repo } => PipelineError::LedgerDrift { owner, repo },
            other => PipelineError::Storage(other),
        }
    }
}
