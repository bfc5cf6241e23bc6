//! Subcommands and the global flags they share.

pub mod add;
pub mod check;
pub mod list;
pub mod monitor;
pub mod set_token;
pub mod test_card;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use cardwatch_core::{paths, LedgerStore};
use cardwatch_pipeline::github::DEFAULT_API_BASE;
use cardwatch_pipeline::{CheckContext, GithubConfig, GithubFetcher};
use cardwatch_renderer::{CaptureCommand, HtmlCardRenderer};

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Directory holding config.json [default: ~/.cardwatch/config]
    #[arg(long, global = true, value_name = "DIR")]
    pub config: Option<PathBuf>,

    /// Directory with card templates and assets [default: ~/.cardwatch/style]
    #[arg(long, global = true, value_name = "DIR")]
    pub style: Option<PathBuf>,

    /// Directory cards are written to [default: ~/.cardwatch/output]
    #[arg(long, global = true, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Command turning each HTML card into an image, e.g.
    /// "node screenshot.js {input} {output}"
    #[arg(long, global = true, value_name = "COMMAND")]
    pub capture: Option<String>,

    /// GitHub API base URL.
    #[arg(
        long,
        global = true,
        env = "CARDWATCH_API_BASE",
        default_value = DEFAULT_API_BASE,
        value_name = "URL"
    )]
    pub api_base: String,
}

/// Resolved directories.
#[derive(Debug, Clone)]
pub struct Locations {
    pub config_dir: PathBuf,
    pub style_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl GlobalArgs {
    pub fn locations(&self) -> Result<Locations> {
        let home = || paths::home().context("could not determine home directory");
        let config_dir = match &self.config {
            Some(dir) => dir.clone(),
            None => paths::config_dir_at(&home()?),
        };
        let style_dir = match &self.style {
            Some(dir) => dir.clone(),
            None => paths::style_dir_at(&home()?),
        };
        let output_dir = match &self.output {
            Some(dir) => dir.clone(),
            None => paths::output_dir_at(&home()?),
        };
        Ok(Locations {
            config_dir,
            style_dir,
            output_dir,
        })
    }

    pub fn store(&self) -> Result<LedgerStore> {
        let locations = self.locations()?;
        Ok(LedgerStore::new(paths::config_path_in(&locations.config_dir)))
    }

    pub fn renderer(&self) -> HtmlCardRenderer {
        HtmlCardRenderer::with_capture(self.capture.as_deref().and_then(CaptureCommand::parse))
    }

    /// Everything `check` and `monitor` need, with output directories created.
    pub fn check_context(&self) -> Result<CheckContext> {
        let locations = self.locations()?;
        for dir in [&locations.style_dir, &locations.output_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let fetcher = GithubFetcher::new(GithubConfig {
            api_base: self.api_base.clone(),
            ..GithubConfig::default()
        });
        Ok(CheckContext {
            store: LedgerStore::new(paths::config_path_in(&locations.config_dir)),
            fetcher: Arc::new(fetcher),
            renderer: Arc::new(self.renderer()),
            style_dir: locations.style_dir,
            output_dir: locations.output_dir,
        })
    }
}
