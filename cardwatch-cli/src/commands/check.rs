//! `cardwatch check`: check one repository now.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use cardwatch_core::types::short_revision;
use cardwatch_daemon::init_tracing;
use cardwatch_detector::CheckResult;
use cardwatch_pipeline::CheckReport;

use super::GlobalArgs;

/// Arguments for `cardwatch check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Repository owner.
    pub owner: String,

    /// Repository name.
    pub repo: String,
}

impl CheckArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        init_tracing();
        let ctx = global.check_context()?;
        let report = ctx
            .check_entry(&self.owner, &self.repo)
            .with_context(|| format!("check failed for {}/{}", self.owner, self.repo))?;
        print_report(&report)
    }
}

fn print_report(report: &CheckReport) -> Result<()> {
    let slug = format!("{}/{}", report.owner, report.repo);
    match &report.result {
        CheckResult::Unchanged => {
            println!(
                "• {slug} unchanged at {}",
                short_revision(&report.previous_revision)
            );
        }
        CheckResult::Advanced { head_revision, commits, truncated } => {
            let from = if report.previous_revision.is_empty() {
                "first check".to_string()
            } else {
                short_revision(&report.previous_revision).to_string()
            };
            println!(
                "{} {slug} advanced {from} → {} ({} card{})",
                "✓".green(),
                short_revision(head_revision),
                commits.len(),
                if commits.len() == 1 { "" } else { "s" }
            );
            if *truncated {
                println!("  older new commits were skipped; only the newest are shown");
            }
        }
        CheckResult::Divergent { head_revision, .. } => {
            println!(
                "{} {slug} history rewritten; now at {}",
                "!".yellow(),
                short_revision(head_revision)
            );
        }
        CheckResult::Failed(err) => {
            bail!("{slug}: {} ({err})", err.kind());
        }
    }

    for card in &report.cards {
        println!("  → {}", card.display());
    }
    if report.render_failures > 0 {
        eprintln!(
            "{} {} card(s) failed to render; the revision was still recorded",
            "warning:".yellow(),
            report.render_failures
        );
    }
    Ok(())
}
