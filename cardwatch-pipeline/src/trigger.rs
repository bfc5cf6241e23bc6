//! Render trigger: turns a [`CheckResult`] into cards.

use std::path::{Path, PathBuf};

use cardwatch_core::types::short_revision;
use cardwatch_core::{CardKind, CommitSummary, RenderJob, RepositoryEntry, TemplateConfig};
use cardwatch_detector::CheckResult;
use cardwatch_renderer::CardRenderer;

/// Outcome of rendering a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    pub cards: Vec<PathBuf>,
    pub failures: usize,
}

/// `{output_dir}/{owner}_{repo}_{short_sha}.html`
pub fn output_path(output_dir: &Path, entry: &RepositoryEntry, revision: &str) -> PathBuf {
    let name = format!(
        "{}_{}_{}.html",
        sanitize(&entry.owner),
        sanitize(&entry.repo),
        sanitize(short_revision(revision))
    );
    output_dir.join(name)
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// One job per commit for `Advanced`, one `HistoryRewritten` job for
/// `Divergent`, none otherwise.
pub fn build_jobs(
    entry: &RepositoryEntry,
    result: &CheckResult,
    template: &TemplateConfig,
) -> Vec<RenderJob> {
    let (commits, kind): (Vec<&CommitSummary>, CardKind) = match result {
        CheckResult::Advanced { commits, .. } => (commits.iter().collect(), CardKind::Commit),
        CheckResult::Divergent { head_commit, .. } => (vec![head_commit], CardKind::HistoryRewritten),
        CheckResult::Unchanged | CheckResult::Failed(_) => return vec![],
    };
    let total = commits.len();
    commits
        .into_iter()
        .enumerate()
        .map(|(i, commit)| RenderJob {
            repository: entry.clone(),
            commit: commit.clone(),
            kind,
            position: i + 1,
            total,
            template: template.clone(),
            output_path: output_path(&template.output_dir, entry, &commit.revision),
        })
        .collect()
}

/// Render `jobs` in order. A failed job is logged and skipped.
pub fn render_all(renderer: &dyn CardRenderer, jobs: &[RenderJob]) -> RenderOutcome {
    let mut outcome = RenderOutcome::default();
    for job in jobs {
        match renderer.render(job) {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "card written");
                outcome.cards.push(path);
            }
            Err(err) => {
                tracing::warn!(
                    owner = %job.repository.owner,
                    repo = %job.repository.repo,
                    revision = %job.commit.revision,
                    error = %err,
                    "card render failed"
                );
                outcome.failures += 1;
            }
        }
    }
    outcome
}
