//! Template context: serializable rendering payload built from a [`RenderJob`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardwatch_core::{CardKind, RenderJob};

use crate::error::RenderError;

/// Batches at or below this size get the `few-commits` layout.
const FEW_COMMITS: usize = 2;
/// Batches at or above this size get the `many-commits` layout.
const MANY_COMMITS: usize = 6;

/// Everything a card template can reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardContext {
    /// `owner/repo`
    pub title: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// `commit` or `history_rewritten`.
    pub kind: String,
    /// Human headline for the card kind.
    pub headline: String,
    pub commit: CommitCtx,
    pub position: usize,
    pub total: usize,
    /// `few-commits`, `many-commits` or empty.
    pub list_class: String,
    pub subscriber: String,
    pub background_image: Option<String>,
    pub generated_at: String,
    pub meta: MetaCtx,
}

/// Commit fields, pre-formatted for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitCtx {
    pub sha: String,
    pub short_sha: String,
    pub author: String,
    pub title: String,
    pub message: String,
    /// `YYYY-MM-DD HH:MM:SS UTC`, empty when unknown.
    pub date: String,
    pub html_url: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaCtx {
    pub cardwatch_version: String,
}

impl CardContext {
    /// Build a [`CardContext`] for `job`.
    ///
    /// `background_image` is resolved by the caller so the context stays pure.
    pub fn from_job(job: &RenderJob, background_image: Option<String>, now: DateTime<Utc>) -> Self {
        let repo = &job.repository;
        let commit = &job.commit;

        let headline = match job.kind {
            CardKind::Commit => "New commit".to_string(),
            CardKind::HistoryRewritten => "History rewritten".to_string(),
        };
        let list_class = if job.total <= FEW_COMMITS {
            "few-commits"
        } else if job.total >= MANY_COMMITS {
            "many-commits"
        } else {
            ""
        };

        CardContext {
            title: repo.slug(),
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            branch: repo.branch.clone(),
            kind: job.kind.to_string(),
            headline,
            commit: CommitCtx {
                sha: commit.revision.clone(),
                short_sha: commit.short_revision().to_string(),
                author: commit.author.clone(),
                title: commit.title().to_string(),
                message: commit.message.replace("\r\n", "\n"),
                date: commit
                    .timestamp
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_default(),
                html_url: commit.html_url.clone(),
                avatar_url: commit.avatar_url.clone(),
            },
            position: job.position,
            total: job.total,
            list_class: list_class.to_string(),
            subscriber: job.template.subscriber.clone(),
            background_image,
            generated_at: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            meta: MetaCtx {
                cardwatch_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}
