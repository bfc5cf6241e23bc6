//! Repository ledger and its JSON projection.
//!
//! # Storage layout
//!
//! ```text
//! <config_dir>/config.json   (mode 0600, holds the API token)
//! ```
//!
//! ```json
//! { "GitHub": { "username": "", "backgrounds": "", "token": "",
//!               "repository": [ { "owner": "", "branch": "main", "repo": "", "lastsha": "" } ] } }
//! ```
//!
//! [`Ledger`] is the in-memory model; [`ConfigDocument`] is the on-disk shape.
//! Keys this crate does not understand are carried through untouched so a
//! hand-edited file survives a load/save cycle.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{io_err, LedgerError};
use crate::types::{Credential, RepositoryEntry, DEFAULT_BRANCH};

// ---------------------------------------------------------------------------
// 1. On-disk document
// ---------------------------------------------------------------------------

/// Root of `config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(rename = "GitHub", default)]
    pub github: GithubSection,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `GitHub` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GithubSection {
    #[serde(default)]
    pub username: String,
    #[serde(default, deserialize_with = "string_or_bool")]
    pub backgrounds: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub repository: Vec<RepositoryRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One element of `GitHub.repository`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub owner: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    pub repo: String,
    #[serde(default)]
    pub lastsha: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// Older configs stored `"backgrounds": true|false`; neither names a directory.
fn string_or_bool<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(path) if path != "true" && path != "false" => path,
        _ => String::new(),
    })
}

// ---------------------------------------------------------------------------
// 2. In-memory ledger
// ---------------------------------------------------------------------------

/// Result of [`Ledger::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    AlreadyExists,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Passthrough {
    root: Map<String, Value>,
    github: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    entry: RepositoryEntry,
    extra: Map<String, Value>,
}

/// Subscriptions plus the process-wide settings stored beside them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    slots: Vec<Slot>,
    credential: Credential,
    username: String,
    backgrounds: String,
    passthrough: Passthrough,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &RepositoryEntry> + '_ {
        self.slots.iter().map(|slot| &slot.entry)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn find(&self, owner: &str, repo: &str) -> Option<&RepositoryEntry> {
        self.entries().find(|entry| entry.matches(owner, repo))
    }

    /// Subscribe to `(owner, repo)`. An existing pair is left untouched,
    /// including its branch.
    pub fn upsert(&mut self, owner: &str, repo: &str, branch: &str) -> Upsert {
        if self.find(owner, repo).is_some() {
            return Upsert::AlreadyExists;
        }
        self.slots.push(Slot {
            entry: RepositoryEntry::new(owner, repo, branch),
            extra: Map::new(),
        });
        Upsert::Added
    }

    /// Record the newest observed head for `(owner, repo)`.
    ///
    /// An empty `revision` is ignored so an entry never drops back to
    /// "never checked".
    pub fn update_revision(
        &mut self,
        owner: &str,
        repo: &str,
        revision: &str,
    ) -> Result<(), LedgerError> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.entry.matches(owner, repo))
            .ok_or_else(|| LedgerError::NotFound {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })?;
        if !revision.is_empty() {
            slot.entry.last_revision = revision.to_string();
        }
        Ok(())
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn set_credential(&mut self, credential: Credential) {
        self.credential = credential;
    }

    /// Operator name shown on cards.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Background image directory, if configured.
    pub fn background_dir(&self) -> Option<PathBuf> {
        if self.backgrounds.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.backgrounds))
        }
    }

    /// Build a ledger from its on-disk shape. Duplicate `(owner, repo)` records
    /// keep the first occurrence.
    pub fn from_document(document: ConfigDocument) -> Self {
        let ConfigDocument { github, extra } = document;
        let mut ledger = Ledger {
            slots: Vec::with_capacity(github.repository.len()),
            credential: Credential::new(github.token),
            username: github.username,
            backgrounds: github.backgrounds,
            passthrough: Passthrough {
                root: extra,
                github: github.extra,
            },
        };
        for record in github.repository {
            if ledger.find(&record.owner, &record.repo).is_some() {
                continue;
            }
            let mut entry = RepositoryEntry::new(record.owner, record.repo, record.branch);
            entry.last_revision = record.lastsha;
            ledger.slots.push(Slot {
                entry,
                extra: record.extra,
            });
        }
        ledger
    }

    /// Project the ledger onto its on-disk shape.
    pub fn to_document(&self) -> ConfigDocument {
        ConfigDocument {
            github: GithubSection {
                username: self.username.clone(),
                backgrounds: self.backgrounds.clone(),
                token: self.credential.expose().to_string(),
                repository: self
                    .slots
                    .iter()
                    .map(|slot| RepositoryRecord {
                        owner: slot.entry.owner.clone(),
                        branch: slot.entry.branch.clone(),
                        repo: slot.entry.repo.clone(),
                        lastsha: slot.entry.last_revision.clone(),
                        extra: slot.extra.clone(),
                    })
                    .collect(),
                extra: self.passthrough.github.clone(),
            },
            extra: self.passthrough.root.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Load / save (atomic)
// ---------------------------------------------------------------------------

/// Load the ledger at `path`. A missing file yields an empty ledger.
pub fn load(path: &Path) -> Result<Ledger, LedgerError> {
    if !path.exists() {
        return Ok(Ledger::new());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Ledger::new());
    }
    let document: ConfigDocument = serde_json::from_str(&contents).map_err(|e| {
        LedgerError::Parse {
            path: path.to_path_buf(),
            source: e,
        }
    })?;
    Ok(Ledger::from_document(document))
}

/// Atomically save `ledger` to `path`.
///
/// Write flow: serialize → `<name>.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` file sits in the target directory so the rename never crosses
/// filesystems.
pub fn save(path: &Path, ledger: &Ledger) -> Result<(), LedgerError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    let mut json = serde_json::to_string_pretty(&ledger.to_document())?;
    json.push('\n');

    let tmp = tmp_path(path);
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config.json".to_string());
    path.with_file_name(format!("{name}.tmp"))
}

/// Handle on a ledger file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Ledger, LedgerError> {
        load(&self.path)
    }

    pub fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        save(&self.path, ledger)
    }

    /// Read-modify-write: load, apply `mutate`, save durably.
    ///
    /// Nothing is written if `mutate` fails.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut Ledger) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut ledger = self.load()?;
        let value = mutate(&mut ledger)?;
        self.save(&ledger)?;
        Ok(value)
    }
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), LedgerError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), LedgerError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
