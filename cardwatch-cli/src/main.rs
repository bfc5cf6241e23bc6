//! cardwatch: commit cards for watched GitHub repositories.
//!
//! # Usage
//!
//! ```text
//! cardwatch add <owner> <repo> [branch]
//! cardwatch check <owner> <repo>
//! cardwatch monitor [interval_minutes]
//! cardwatch list [--json]
//! cardwatch set-token <token>
//! cardwatch test-card
//!
//! global: --config <dir> --style <dir> --output <dir> --capture <command>
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    add::AddArgs, check::CheckArgs, list::ListArgs, monitor::MonitorArgs,
    set_token::SetTokenArgs, test_card::TestCardArgs, GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "cardwatch",
    version,
    about = "Watch GitHub repositories and render a card for every new commit",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Subscribe to a repository branch.
    Add(AddArgs),

    /// Check one repository now and render cards for new commits.
    Check(CheckArgs),

    /// Check every repository periodically until interrupted.
    Monitor(MonitorArgs),

    /// Show subscribed repositories.
    List(ListArgs),

    /// Store the GitHub API token.
    SetToken(SetTokenArgs),

    /// Render sample cards with demo commits.
    TestCard(TestCardArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Usage errors exit 1 like every other failure; help and version exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    let global = cli.global;
    match cli.command {
        Commands::Add(args) => args.run(&global),
        Commands::Check(args) => args.run(&global),
        Commands::Monitor(args) => args.run(&global),
        Commands::List(args) => args.run(&global),
        Commands::SetToken(args) => args.run(&global),
        Commands::TestCard(args) => args.run(&global),
    }
}
