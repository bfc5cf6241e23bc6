//! `cardwatch test-card`: render sample cards to check templates and capture.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;

use cardwatch_core::types::DEFAULT_BRANCH;
use cardwatch_core::{CommitSummary, RepositoryEntry, TemplateConfig};
use cardwatch_detector::CheckResult;
use cardwatch_pipeline::build_jobs;
use cardwatch_renderer::CardRenderer;

use super::GlobalArgs;

const DEMO_MESSAGES: &[&str] = &[
    "feat: add card rendering\n\nCards are rendered from card.html.tera.",
    "fix: keep commit order stable",
    "docs: describe the config file",
    "refactor: split the fetcher from the detector",
    "test: cover rewritten history",
    "chore: bump dependencies",
];

/// Arguments for `cardwatch test-card`.
#[derive(Args, Debug)]
pub struct TestCardArgs {
    /// Number of demo commits in the batch.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub count: u8,
}

impl TestCardArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let locations = global.locations()?;
        let store = global.store()?;
        let ledger = store
            .load()
            .with_context(|| format!("failed to load {}", store.path().display()))?;

        let subscriber = if ledger.username().is_empty() {
            "cardwatch".to_string()
        } else {
            ledger.username().to_string()
        };
        let template = TemplateConfig {
            style_dir: locations.style_dir,
            output_dir: locations.output_dir,
            background_dir: ledger.background_dir(),
            subscriber,
        };

        let entry = RepositoryEntry::new("cardwatch", "demo", DEFAULT_BRANCH);
        let commits = demo_commits(usize::from(self.count));
        let result = CheckResult::Advanced {
            head_revision: commits
                .last()
                .map(|c| c.revision.clone())
                .unwrap_or_default(),
            commits,
            truncated: false,
        };

        let renderer = global.renderer();
        for job in build_jobs(&entry, &result, &template) {
            let path = renderer
                .render(&job)
                .with_context(|| format!("failed to render demo card {}", job.position))?;
            println!("✓ {}", path.display());
        }
        Ok(())
    }
}

fn demo_commits(count: usize) -> Vec<CommitSummary> {
    let now = Utc::now();
    (0..count)
        .map(|i| {
            let mut commit = CommitSummary::bare(format!("{:07x}{:033x}", 0x5eed_000 + i, 0));
            commit.author = "octocat".to_string();
            commit.message = DEMO_MESSAGES[i % DEMO_MESSAGES.len()].to_string();
            commit.timestamp = Some(now - Duration::hours((count - i) as i64));
            commit
        })
        .collect()
}
