//! `cardwatch set-token`: store the GitHub API token.

use anyhow::{bail, Context, Result};
use clap::Args;

use cardwatch_core::Credential;

use super::GlobalArgs;

/// Arguments for `cardwatch set-token`.
#[derive(Args, Debug)]
pub struct SetTokenArgs {
    /// Personal access token. Stored in config.json (mode 0600).
    pub token: String,
}

impl SetTokenArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let token = self.token.trim();
        if token.is_empty() {
            bail!("token must not be empty");
        }
        let store = global.store()?;
        store
            .update(|ledger| {
                ledger.set_credential(Credential::new(token));
                Ok(())
            })
            .with_context(|| format!("failed to update {}", store.path().display()))?;
        println!("✓ token saved to {}", store.path().display());
        Ok(())
    }
}
