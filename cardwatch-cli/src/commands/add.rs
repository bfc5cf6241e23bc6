//! `cardwatch add`: subscribe to a repository branch.

use anyhow::{bail, Context, Result};
use clap::Args;

use cardwatch_core::types::DEFAULT_BRANCH;
use cardwatch_core::Upsert;

use super::GlobalArgs;

/// Arguments for `cardwatch add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Repository owner (user or organisation).
    pub owner: String,

    /// Repository name.
    pub repo: String,

    /// Branch to watch.
    #[arg(default_value = DEFAULT_BRANCH)]
    pub branch: String,
}

impl AddArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let owner = self.owner.trim();
        let repo = self.repo.trim();
        if owner.is_empty() || repo.is_empty() {
            bail!("owner and repo must not be empty");
        }

        let store = global.store()?;
        let outcome = store
            .update(|ledger| Ok(ledger.upsert(owner, repo, self.branch.trim())))
            .with_context(|| format!("failed to update {}", store.path().display()))?;

        match outcome {
            Upsert::Added => println!("✓ subscribed to {owner}/{repo} ({})", self.branch.trim()),
            Upsert::AlreadyExists => println!("• {owner}/{repo} is already subscribed"),
        }
        Ok(())
    }
}
