//! Remote revision fetcher contract.
//!
//! The change detector only ever sees a [`HeadResult`] or a [`FetchError`];
//! how they are produced (GitHub REST, a test script, …) lives behind
//! [`RevisionFetcher`].

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::{CommitSummary, Credential};

/// Default cap on commits returned per fetch.
pub const DEFAULT_MAX_COMMITS: usize = 10;

/// Default per-request timeout.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Inputs for one head lookup.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
    pub credential: &'a Credential,
    /// Last known revision; empty when the entry was never checked.
    pub since: &'a str,
}

/// How the requested `since` revision relates to the fetched head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinceRelation {
    /// `since` was empty, or the remote could not tell.
    Unknown,
    /// `since` is the head.
    Identical,
    /// `since` is an ancestor of head; `total` is the true number of commits
    /// between them, which may exceed the commits actually returned.
    Ancestor { total: usize },
    /// `since` is not reachable from head (history rewritten).
    NotAncestor,
}

/// Successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadResult {
    pub head_revision: String,
    /// Metadata for the head commit, when the remote provided it.
    pub head_commit: Option<CommitSummary>,
    /// Commits after `since` up to and including head, oldest first, capped.
    pub commits_since: Vec<CommitSummary>,
    pub relation: SinceRelation,
}

/// Payload-free classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    Unauthorized,
    NotFound,
    RateLimited,
    Network,
    Unknown,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchErrorKind::Unauthorized => "unauthorized",
            FetchErrorKind::NotFound => "not_found",
            FetchErrorKind::RateLimited => "rate_limited",
            FetchErrorKind::Network => "network",
            FetchErrorKind::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Why a fetch failed. All variants are non-fatal to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Transport failures, timeouts and server-side errors.
    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected remote response: {0}")]
    Unknown(String),
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Unauthorized(_) => FetchErrorKind::Unauthorized,
            FetchError::NotFound(_) => FetchErrorKind::NotFound,
            FetchError::RateLimited { .. } => FetchErrorKind::RateLimited,
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Unknown(_) => FetchErrorKind::Unknown,
        }
    }

    /// Server-provided hold-off, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            FetchError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Looks up the current head of a branch.
///
/// Implementations must bound every network call with a timeout (reported as
/// [`FetchError::Network`]) and cap `commits_since`.
pub trait RevisionFetcher: Send + Sync {
    fn fetch_head(&self, request: &FetchRequest<'_>) -> Result<HeadResult, FetchError>;
}

/// Keep the newest `max` commits of an oldest-first list.
pub fn keep_newest(mut commits: Vec<CommitSummary>, max: usize) -> Vec<CommitSummary> {
    if commits.len() > max {
        commits.drain(..commits.len() - max);
    }
    commits
}
