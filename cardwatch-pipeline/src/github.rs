//! GitHub REST implementation of [`RevisionFetcher`].
//!
//! Two calls per check at most:
//!
//! 1. `GET /repos/{owner}/{repo}/commits/{branch}` resolves the head.
//! 2. `GET /repos/{owner}/{repo}/compare/{since}...{head}` lists the delta,
//!    skipped when `since` is empty or already the head.
//!
//! Compare lists the delta oldest first and only one page of it. When the
//! page stops short of `ahead_by`, a third call,
//! `GET /repos/{owner}/{repo}/commits?sha={head}`, supplies the newest commits.
//!
//! Status codes are folded into [`FetchError`] by [`error_for_status`], which
//! is pure so the mapping can be tested without a server.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use cardwatch_core::fetch::{keep_newest, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_COMMITS};
use cardwatch_core::{
    CommitSummary, FetchError, FetchRequest, HeadResult, RevisionFetcher, SinceRelation,
};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Hold-off used when the server rate-limits without saying for how long.
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Upper bound on any server-supplied hold-off.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// GitHub's largest `per_page`.
const MAX_PER_PAGE: usize = 100;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubConfig {
    /// Base URL without a trailing slash.
    pub api_base: String,
    pub timeout: Duration,
    pub max_commits: usize,
    pub user_agent: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        GithubConfig {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_commits: DEFAULT_MAX_COMMITS,
            user_agent: format!("cardwatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CommitPayload {
    sha: String,
    #[serde(default)]
    html_url: Option<String>,
    commit: CommitDetail,
    /// The linked GitHub account; null for unknown emails.
    #[serde(default)]
    author: Option<AccountPayload>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    author: Option<SignaturePayload>,
}

#[derive(Debug, Deserialize)]
struct SignaturePayload {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    #[serde(default)]
    login: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ComparePayload {
    status: String,
    #[serde(default)]
    ahead_by: usize,
    #[serde(default)]
    commits: Vec<CommitPayload>,
}

impl From<CommitPayload> for CommitSummary {
    fn from(payload: CommitPayload) -> Self {
        let (name, timestamp) = match payload.commit.author {
            Some(sig) => (sig.name, sig.date),
            None => (String::new(), None),
        };
        let (login, avatar_url) = match payload.author {
            Some(account) => (account.login, account.avatar_url),
            None => (String::new(), None),
        };
        CommitSummary {
            revision: payload.sha,
            author: if name.is_empty() { login } else { name },
            message: payload.commit.message,
            timestamp,
            html_url: payload.html_url,
            avatar_url,
        }
    }
}

/// Parse a single-commit response body.
pub fn parse_commit(body: &str) -> Result<CommitSummary, FetchError> {
    serde_json::from_str::<CommitPayload>(body)
        .map(CommitSummary::from)
        .map_err(|e| FetchError::Unknown(format!("malformed commit response: {e}")))
}

/// A parsed compare response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub relation: SinceRelation,
    /// Newest `max_commits` of the listed delta, oldest first.
    pub commits: Vec<CommitSummary>,
    /// Fewer commits were listed than `ahead_by`; head is not among them.
    pub truncated: bool,
}

/// Parse a compare response body into a relation and the capped delta.
pub fn parse_compare(body: &str, max_commits: usize) -> Result<Comparison, FetchError> {
    let payload: ComparePayload = serde_json::from_str(body)
        .map_err(|e| FetchError::Unknown(format!("malformed compare response: {e}")))?;
    let relation = match payload.status.as_str() {
        "ahead" => SinceRelation::Ancestor {
            total: payload.ahead_by.max(payload.commits.len()),
        },
        "identical" => SinceRelation::Identical,
        "behind" | "diverged" => SinceRelation::NotAncestor,
        other => return Err(FetchError::Unknown(format!("unknown compare status `{other}`"))),
    };
    let truncated = matches!(relation, SinceRelation::Ancestor { .. })
        && payload.ahead_by > payload.commits.len();
    let commits = match relation {
        SinceRelation::Ancestor { .. } => keep_newest(
            payload.commits.into_iter().map(CommitSummary::from).collect(),
            max_commits,
        ),
        _ => vec![],
    };
    Ok(Comparison {
        relation,
        commits,
        truncated,
    })
}

/// Parse a newest-first commit listing into at most `max_commits` commits
/// after `since`, oldest first.
pub fn parse_commit_list(
    body: &str,
    since: &str,
    max_commits: usize,
) -> Result<Vec<CommitSummary>, FetchError> {
    let payload: Vec<CommitPayload> = serde_json::from_str(body)
        .map_err(|e| FetchError::Unknown(format!("malformed commit list: {e}")))?;
    let mut commits: Vec<CommitSummary> = payload
        .into_iter()
        .take_while(|c| c.sha != since)
        .take(max_commits)
        .map(CommitSummary::from)
        .collect();
    commits.reverse();
    Ok(commits)
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

/// Rate-limit related response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitHeaders {
    pub retry_after: Option<String>,
    pub ratelimit_remaining: Option<String>,
    pub ratelimit_reset: Option<String>,
}

impl LimitHeaders {
    fn from_response(response: &ureq::Response) -> Self {
        LimitHeaders {
            retry_after: response.header("retry-after").map(str::to_string),
            ratelimit_remaining: response.header("x-ratelimit-remaining").map(str::to_string),
            ratelimit_reset: response.header("x-ratelimit-reset").map(str::to_string),
        }
    }

    /// `retry-after` seconds, else the distance to `x-ratelimit-reset`,
    /// capped at [`MAX_RETRY_AFTER`].
    fn hold_off(&self, now: DateTime<Utc>) -> Duration {
        let secs = if let Some(secs) =
            self.retry_after.as_deref().and_then(|v| v.trim().parse::<u64>().ok())
        {
            secs
        } else if let Some(reset) = self
            .ratelimit_reset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
        {
            reset.saturating_sub(now.timestamp()).max(1).unsigned_abs()
        } else {
            return FALLBACK_RETRY_AFTER;
        };
        Duration::from_secs(secs).min(MAX_RETRY_AFTER)
    }
}

/// Map a non-success HTTP status to a [`FetchError`].
pub fn error_for_status(
    status: u16,
    headers: &LimitHeaders,
    what: &str,
    now: DateTime<Utc>,
) -> FetchError {
    let exhausted = headers.ratelimit_remaining.as_deref().map(str::trim) == Some("0");
    match status {
        429 => FetchError::RateLimited { retry_after: headers.hold_off(now) },
        403 if exhausted => FetchError::RateLimited { retry_after: headers.hold_off(now) },
        401 | 403 => FetchError::Unauthorized(format!("{what}: HTTP {status}")),
        404 => FetchError::NotFound(what.to_string()),
        500..=599 => FetchError::Network(format!("{what}: HTTP {status}")),
        _ => FetchError::Unknown(format!("{what}: HTTP {status}")),
    }
}

// ---------------------------------------------------------------------------
// GithubFetcher
// ---------------------------------------------------------------------------

/// Blocking GitHub client. Call from a blocking context.
pub struct GithubFetcher {
    agent: ureq::Agent,
    config: GithubConfig,
}

/// A failed request: either already classified, or a status the caller may
/// want to treat specially.
enum CallError {
    Status(u16, LimitHeaders),
    Fetch(FetchError),
}

impl GithubFetcher {
    pub fn new(config: GithubConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();
        GithubFetcher { agent, config }
    }

    pub fn config(&self) -> &GithubConfig {
        &self.config
    }

    fn url(&self, request: &FetchRequest<'_>, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.config.api_base.trim_end_matches('/'),
            request.owner,
            request.repo,
            tail
        )
    }

    fn get(&self, url: &str, request: &FetchRequest<'_>) -> Result<String, CallError> {
        let mut call = self
            .agent
            .get(url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28");
        if !request.credential.is_empty() {
            call = call.set(
                "Authorization",
                &format!("Bearer {}", request.credential.expose()),
            );
        }
        match call.call() {
            Ok(response) => response
                .into_string()
                .map_err(|e| CallError::Fetch(FetchError::Network(e.to_string()))),
            Err(ureq::Error::Status(code, response)) => {
                Err(CallError::Status(code, LimitHeaders::from_response(&response)))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(CallError::Fetch(FetchError::Network(transport.to_string())))
            }
        }
    }

    fn classify(&self, err: CallError, what: &str) -> FetchError {
        match err {
            CallError::Status(code, headers) => error_for_status(code, &headers, what, Utc::now()),
            CallError::Fetch(err) => err,
        }
    }
}

impl RevisionFetcher for GithubFetcher {
    fn fetch_head(&self, request: &FetchRequest<'_>) -> Result<HeadResult, FetchError> {
        let slug = format!("{}/{}@{}", request.owner, request.repo, request.branch);

        let head_url = self.url(request, &format!("commits/{}", request.branch));
        let body = self
            .get(&head_url, request)
            .map_err(|e| self.classify(e, &slug))?;
        let head = parse_commit(&body)?;
        let head_revision = head.revision.clone();

        if request.since.is_empty() {
            return Ok(HeadResult {
                head_revision,
                head_commit: Some(head),
                commits_since: vec![],
                relation: SinceRelation::Unknown,
            });
        }
        if request.since == head_revision {
            return Ok(HeadResult {
                head_revision,
                head_commit: Some(head),
                commits_since: vec![],
                relation: SinceRelation::Identical,
            });
        }

        let compare_url = self.url(
            request,
            &format!("compare/{}...{}", request.since, head_revision),
        );
        let comparison = match self.get(&compare_url, request) {
            Ok(body) => parse_compare(&body, self.config.max_commits)?,
            // The base commit no longer exists upstream.
            Err(CallError::Status(404 | 422, _)) => Comparison {
                relation: SinceRelation::NotAncestor,
                commits: vec![],
                truncated: false,
            },
            Err(err) => return Err(self.classify(err, &slug)),
        };
        let relation = comparison.relation;
        let commits_since = if comparison.truncated {
            let list_url = self.url(
                request,
                &format!(
                    "commits?sha={}&per_page={}",
                    head_revision,
                    self.config.max_commits.clamp(1, MAX_PER_PAGE)
                ),
            );
            let body = self
                .get(&list_url, request)
                .map_err(|e| self.classify(e, &slug))?;
            parse_commit_list(&body, request.since, self.config.max_commits)?
        } else {
            comparison.commits
        };

        Ok(HeadResult {
            head_revision,
            head_commit: Some(head),
            commits_since,
            relation,
        })
    }
}
