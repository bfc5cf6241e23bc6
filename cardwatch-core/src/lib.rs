//! cardwatch core library: domain types, ledger persistence, fetcher contract.
//!
//! - [`types`]: subscriptions, commits, render jobs
//! - [`ledger`]: load / save / upsert / update-revision
//! - [`fetch`]: the [`RevisionFetcher`] contract
//! - [`paths`]: default locations under `~/.cardwatch`
//! - [`error`]: [`LedgerError`]

pub mod error;
pub mod fetch;
pub mod ledger;
pub mod paths;
pub mod types;

pub use error::LedgerError;
pub use fetch::{FetchError, FetchErrorKind, FetchRequest, HeadResult, RevisionFetcher, SinceRelation};
pub use ledger::{Ledger, LedgerStore, Upsert};
pub use types::{
    CardKind, CommitSummary, Credential, RenderJob, RepositoryEntry, TemplateConfig,
};
