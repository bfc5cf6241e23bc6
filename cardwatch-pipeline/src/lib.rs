//! # cardwatch-pipeline
//!
//! The per-repository check pipeline and the GitHub fetcher it normally runs
//! against.
//!
//! Call [`CheckContext::check_entry`] to check one subscription, render its
//! cards and advance the ledger.

pub mod check;
pub mod error;
pub mod github;
pub mod trigger;

pub use check::{CheckContext, CheckReport};
pub use error::PipelineError;
pub use github::{Comparison, GithubConfig, GithubFetcher, MAX_RETRY_AFTER};
pub use trigger::{build_jobs, output_path, render_all, RenderOutcome};
