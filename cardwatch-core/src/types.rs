//! Domain types shared by every cardwatch crate.
//!
//! All path fields use `PathBuf`. Types that cross the JSON boundary derive
//! serde; ephemeral pipeline values (commits, jobs) do too so they can be
//! logged or fed to templates.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Branch tracked when a subscription does not name one.
pub const DEFAULT_BRANCH: &str = "main";

// ---------------------------------------------------------------------------
// Credential
// ---------------------------------------------------------------------------

/// Bearer token used for remote API calls.
///
/// May be empty; unauthenticated requests are allowed but rate-limited harder.
/// `Debug` and `Display` never print the secret.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw token, for building an `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Credential(<empty>)")
        } else {
            f.write_str("Credential(<redacted>)")
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<unset>")
        } else {
            f.write_str("<set>")
        }
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// Repository entry
// ---------------------------------------------------------------------------

/// One subscription in the ledger. `(owner, repo)` is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Last observed head revision; empty means the entry was never checked.
    pub last_revision: String,
}

impl RepositoryEntry {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, branch: impl Into<String>) -> Self {
        let branch = branch.into();
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: if branch.is_empty() { DEFAULT_BRANCH.to_string() } else { branch },
            last_revision: String::new(),
        }
    }

    pub fn matches(&self, owner: &str, repo: &str) -> bool {
        self.owner == owner && self.repo == repo
    }

    pub fn never_checked(&self) -> bool {
        self.last_revision.is_empty()
    }

    /// `owner/repo`
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

// ---------------------------------------------------------------------------
// Commit metadata
// ---------------------------------------------------------------------------

/// Metadata for one fetched commit. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub revision: String,
    pub author: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl CommitSummary {
    /// A summary that only knows its revision id.
    pub fn bare(revision: impl Into<String>) -> Self {
        Self {
            revision: revision.into(),
            author: String::new(),
            message: String::new(),
            timestamp: None,
            html_url: None,
            avatar_url: None,
        }
    }

    /// First line of the commit message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim_end()
    }

    /// First seven characters of the revision id.
    pub fn short_revision(&self) -> &str {
        short_revision(&self.revision)
    }
}

/// First seven characters of `revision` (char-boundary safe).
pub fn short_revision(revision: &str) -> &str {
    match revision.char_indices().nth(7) {
        Some((idx, _)) => &revision[..idx],
        None => revision,
    }
}

// ---------------------------------------------------------------------------
// Render jobs
// ---------------------------------------------------------------------------

/// What a card announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    /// A new commit on the tracked branch.
    #[default]
    Commit,
    /// The branch history was rewritten; the card shows the new head.
    HistoryRewritten,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardKind::Commit => write!(f, "commit"),
            CardKind::HistoryRewritten => write!(f, "history_rewritten"),
        }
    }
}

/// Template and output settings for rendering cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TemplateConfig {
    /// Directory holding user template overrides (`card.html.tera`).
    pub style_dir: PathBuf,
    /// Directory cards are written to.
    pub output_dir: PathBuf,
    /// Directory of background images; `None` disables backgrounds.
    pub background_dir: Option<PathBuf>,
    /// Display name of the operator (`GitHub.username`).
    pub subscriber: String,
}

/// One card to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderJob {
    pub repository: RepositoryEntry,
    pub commit: CommitSummary,
    pub kind: CardKind,
    /// 1-based position of this card within its batch.
    pub position: usize,
    /// Number of cards in the batch.
    pub total: usize,
    pub template: TemplateConfig,
    /// Requested artifact path; renderers may return a different final path.
    pub output_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
