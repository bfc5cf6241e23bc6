//! `cardwatch list`: subscribed repositories.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use cardwatch_core::types::short_revision;
use cardwatch_core::Ledger;

use super::GlobalArgs;

/// Arguments for `cardwatch list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ListRow {
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "branch")]
    branch: String,
    #[tabled(rename = "last revision")]
    last_revision: String,
}

#[derive(Serialize)]
struct ListJson {
    token: bool,
    repositories: Vec<RepositoryJson>,
}

#[derive(Serialize)]
struct RepositoryJson {
    owner: String,
    repo: String,
    branch: String,
    last_revision: Option<String>,
}

impl ListArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let store = global.store()?;
        let ledger = store
            .load()
            .with_context(|| format!("failed to load {}", store.path().display()))?;

        if self.json {
            print_json(&ledger)
        } else {
            print_table(&ledger);
            Ok(())
        }
    }
}

fn print_json(ledger: &Ledger) -> Result<()> {
    let payload = ListJson {
        token: !ledger.credential().is_empty(),
        repositories: ledger
            .entries()
            .map(|e| RepositoryJson {
                owner: e.owner.clone(),
                repo: e.repo.clone(),
                branch: e.branch.clone(),
                last_revision: (!e.never_checked()).then(|| e.last_revision.clone()),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize list JSON")?
    );
    Ok(())
}

fn print_table(ledger: &Ledger) {
    let token = if ledger.credential().is_empty() {
        "unset".yellow().to_string()
    } else {
        "set".green().to_string()
    };
    println!(
        "cardwatch v{} | {} repositories | token {token}",
        env!("CARGO_PKG_VERSION"),
        ledger.len()
    );

    if ledger.is_empty() {
        println!("No repositories subscribed. Run `cardwatch add <owner> <repo>` first.");
        return;
    }

    let rows: Vec<ListRow> = ledger
        .entries()
        .map(|e| ListRow {
            repository: e.slug(),
            branch: e.branch.clone(),
            last_revision: if e.never_checked() {
                "-".to_string()
            } else {
                short_revision(&e.last_revision).to_string()
            },
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
