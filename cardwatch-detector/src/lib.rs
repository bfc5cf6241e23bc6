//! Change detection for `cardwatch-detector`.
//!
//! [`classify`] compares a fetched head against the revision stored for a
//! subscription and decides what, if anything, should be announced. Rules are
//! applied in order:
//!
//! 1. never checked → one card for the newest commit only
//! 2. head equals the stored revision → unchanged
//! 3. stored revision is an ancestor → one card per new commit, oldest first
//! 4. otherwise the history was rewritten → one card for the new head
//!
//! Fetch errors become [`CheckResult::Failed`] and never touch the ledger.

use std::fmt;

use cardwatch_core::{
    CommitSummary, FetchError, FetchRequest, HeadResult, RepositoryEntry, RevisionFetcher,
    SinceRelation, Credential,
};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Outcome of one check of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckResult {
    /// Head matches the stored revision.
    Unchanged,
    /// New commits on top of the stored revision, oldest first.
    Advanced {
        head_revision: String,
        commits: Vec<CommitSummary>,
        /// The remote had more new commits than it returned.
        truncated: bool,
    },
    /// The stored revision is no longer reachable from head.
    Divergent {
        head_revision: String,
        head_commit: CommitSummary,
    },
    /// The fetch failed; retried on the next tick.
    Failed(FetchError),
}

/// Payload-free label for a [`CheckResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Unchanged,
    Advanced,
    Divergent,
    Failed,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Unchanged => write!(f, "unchanged"),
            Classification::Advanced => write!(f, "advanced"),
            Classification::Divergent => write!(f, "divergent"),
            Classification::Failed => write!(f, "failed"),
        }
    }
}

impl CheckResult {
    pub fn classification(&self) -> Classification {
        match self {
            CheckResult::Unchanged => Classification::Unchanged,
            CheckResult::Advanced { .. } => Classification::Advanced,
            CheckResult::Divergent { .. } => Classification::Divergent,
            CheckResult::Failed(_) => Classification::Failed,
        }
    }

    /// Revision the ledger should move to, if any.
    pub fn new_revision(&self) -> Option<&str> {
        match self {
            CheckResult::Advanced { head_revision, .. }
            | CheckResult::Divergent { head_revision, .. } => Some(head_revision),
            CheckResult::Unchanged | CheckResult::Failed(_) => None,
        }
    }

    /// Number of cards this result asks for.
    pub fn card_count(&self) -> usize {
        match self {
            CheckResult::Advanced { commits, .. } => commits.len(),
            CheckResult::Divergent { .. } => 1,
            CheckResult::Unchanged | CheckResult::Failed(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fetch the head for `entry` and classify it.
pub fn detect(
    entry: &RepositoryEntry,
    fetcher: &dyn RevisionFetcher,
    credential: &Credential,
) -> CheckResult {
    let request = FetchRequest {
        owner: &entry.owner,
        repo: &entry.repo,
        branch: &entry.branch,
        credential,
        since: &entry.last_revision,
    };
    classify(entry, fetcher.fetch_head(&request))
}

/// Classify a fetch outcome against the revision stored in `entry`.
pub fn classify(entry: &RepositoryEntry, fetched: Result<HeadResult, FetchError>) -> CheckResult {
    let head = match fetched {
        Ok(head) => head,
        Err(err) => return CheckResult::Failed(err),
    };
    if head.head_revision.is_empty() {
        return CheckResult::Failed(FetchError::Unknown(
            "remote returned an empty head revision".to_string(),
        ));
    }

    if entry.never_checked() {
        let newest = newest_commit(&head);
        return CheckResult::Advanced {
            head_revision: head.head_revision,
            commits: vec![newest],
            truncated: false,
        };
    }

    if head.head_revision == entry.last_revision {
        return CheckResult::Unchanged;
    }

    match head.relation {
        SinceRelation::Ancestor { total } => {
            let commits = if head.commits_since.is_empty() {
                vec![newest_commit(&head)]
            } else {
                head.commits_since
            };
            CheckResult::Advanced {
                truncated: total > commits.len(),
                head_revision: head.head_revision,
                commits,
            }
        }
        // Identical with a different head id means the remote contradicted
        // itself; treat it like any other unverifiable history.
        SinceRelation::NotAncestor | SinceRelation::Unknown | SinceRelation::Identical => {
            CheckResult::Divergent {
                head_commit: newest_commit(&head),
                head_revision: head.head_revision,
            }
        }
    }
}

/// The head commit's metadata, falling back to the last listed commit and
/// finally to a bare summary carrying only the head id.
fn newest_commit(head: &HeadResult) -> CommitSummary {
    if let Some(commit) = head
        .head_commit
        .as_ref()
        .filter(|c| c.revision == head.head_revision)
    {
        return commit.clone();
    }
    if let Some(commit) = head
        .commits_since
        .last()
        .filter(|c| c.revision == head.head_revision)
    {
        return commit.clone();
    }
    head.head_commit
        .clone()
        .or_else(|| head.commits_since.last().cloned())
        .unwrap_or_else(|| CommitSummary::bare(head.head_revision.clone()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
