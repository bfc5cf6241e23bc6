//! One check of one subscription: load → fetch → classify → render → persist.
//!
//! This is the shared entrypoint used by `cardwatch check` and the poll
//! scheduler. The ledger is re-read at the start and the revision write is a
//! fresh read-modify-write, so edits made by another process in between
//! survive.

use std::path::PathBuf;
use std::sync::Arc;

use cardwatch_core::{Ledger, LedgerStore, RevisionFetcher, TemplateConfig};
use cardwatch_detector::{detect, CheckResult};
use cardwatch_renderer::CardRenderer;

use crate::error::PipelineError;
use crate::trigger::{build_jobs, render_all};

/// Everything a check needs. Cheap to clone.
#[derive(Clone)]
pub struct CheckContext {
    pub store: LedgerStore,
    pub fetcher: Arc<dyn RevisionFetcher>,
    pub renderer: Arc<dyn CardRenderer>,
    pub style_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// What a check did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub owner: String,
    pub repo: String,
    /// Revision stored before the check.
    pub previous_revision: String,
    pub result: CheckResult,
    /// Paths of cards that were produced, in render order.
    pub cards: Vec<PathBuf>,
    /// Cards that failed to render.
    pub render_failures: usize,
}

impl CheckContext {
    fn template_config(&self, ledger: &Ledger) -> TemplateConfig {
        TemplateConfig {
            style_dir: self.style_dir.clone(),
            output_dir: self.output_dir.clone(),
            background_dir: ledger.background_dir(),
            subscriber: ledger.username().to_string(),
        }
    }

    /// Check `owner/repo` once.
    ///
    /// Fetch failures come back as [`CheckResult::Failed`] in an `Ok` report
    /// with the ledger untouched. Only storage problems are errors.
    pub fn check_entry(&self, owner: &str, repo: &str) -> Result<CheckReport, PipelineError> {
        let ledger = self.store.load()?;
        let entry = ledger
            .find(owner, repo)
            .cloned()
            .ok_or_else(|| PipelineError::NotSubscribed {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })?;

        let result = detect(&entry, self.fetcher.as_ref(), ledger.credential());
        let mut report = CheckReport {
            owner: entry.owner.clone(),
            repo: entry.repo.clone(),
            previous_revision: entry.last_revision.clone(),
            result,
            cards: vec![],
            render_failures: 0,
        };

        match &report.result {
            CheckResult::Failed(err) => {
                tracing::warn!(
                    owner = %entry.owner,
                    repo = %entry.repo,
                    kind = %err.kind(),
                    error = %err,
                    "check failed"
                );
                return Ok(report);
            }
            CheckResult::Unchanged => {
                tracing::debug!(owner = %entry.owner, repo = %entry.repo, "unchanged");
                return Ok(report);
            }
            CheckResult::Advanced { truncated: true, commits, .. } => {
                tracing::info!(
                    owner = %entry.owner,
                    repo = %entry.repo,
                    shown = commits.len(),
                    "more new commits than fetched; older ones are skipped"
                );
            }
            CheckResult::Advanced { .. } | CheckResult::Divergent { .. } => {}
        }

        let jobs = build_jobs(&entry, &report.result, &self.template_config(&ledger));
        let outcome = render_all(self.renderer.as_ref(), &jobs);
        report.cards = outcome.cards;
        report.render_failures = outcome.failures;

        if let Some(revision) = report.result.new_revision() {
            self.store
                .update(|ledger| ledger.update_revision(owner, repo, revision))
                .map_err(PipelineError::from_update)?;
            tracing::info!(
                owner = %entry.owner,
                repo = %entry.repo,
                from = %entry.last_revision,
                revision = %revision,
                classification = %report.result.classification(),
                cards = report.cards.len(),
                "revision advanced"
            );
        }
        Ok(report)
    }
}
