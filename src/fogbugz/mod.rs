//! FogBugz-style issue tracker client.
//!
//! Every operation is a single `GET {base_url}api.php` exchange with
//! query-string parameters; responses are XML. Any `<error>` element in a
//! response aborts the run. No retries.

mod error;

pub use error::{Result, TrackerError};

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TrackerConfig;
use crate::issues::Issue;
use crate::release::Milestone;

/// Sentinel milestone the tracker uses for unscheduled work.
const UNDECIDED_MILESTONE: &str = "Undecided";

const SEARCH_COLUMNS: &str = "ixBug,sTitle,sStatus,sPersonAssignedTo,dtResolved";

/// Opaque API session token returned by logon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tracker API operations the pipeline needs.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// Open an API session.
    async fn logon(&self) -> Result<SessionToken>;

    /// List the project's release milestones, excluding the "Undecided"
    /// sentinel, sorted ascending by due date.
    async fn list_milestones(&self, token: &SessionToken) -> Result<Vec<Milestone>>;

    /// Search for issues whose release field equals the given milestone name.
    async fn search_issues(&self, token: &SessionToken, release: &str) -> Result<Vec<Issue>>;

    /// Close the API session. Callers treat failures as best-effort.
    async fn logoff(&self, token: &SessionToken) -> Result<()>;
}

/// Production implementation over reqwest.
pub struct FogBugzClient {
    http: reqwest::Client,
    api_url: String,
    email: String,
    password: String,
    project_id: u32,
}

impl FogBugzClient {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_url: format!("{}/api.php", config.base_url.trim_end_matches('/')),
            email: config.email.clone(),
            password: config.password.clone(),
            project_id: config.project_id,
        })
    }

    async fn request(&self, params: &[(&str, &str)]) -> Result<ApiResponse> {
        debug!(cmd = params.first().map(|(_, v)| *v).unwrap_or(""), "tracker request");
        let body = self
            .http
            .get(&self.api_url)
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let response: ApiResponse =
            quick_xml::de::from_str(&body).map_err(|e| TrackerError::Malformed(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(TrackerError::Api {
                code: error.code.unwrap_or_default(),
                message: error.message.unwrap_or_default(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Tracker for FogBugzClient {
    async fn logon(&self) -> Result<SessionToken> {
        let response = self
            .request(&[
                ("cmd", "logon"),
                ("email", &self.email),
                ("password", &self.password),
            ])
            .await?;

        response
            .token
            .filter(|t| !t.is_empty())
            .map(SessionToken)
            .ok_or_else(|| TrackerError::Malformed("logon response carried no token".to_string()))
    }

    async fn list_milestones(&self, token: &SessionToken) -> Result<Vec<Milestone>> {
        let project_id = self.project_id.to_string();
        let response = self
            .request(&[
                ("cmd", "listFixFors"),
                ("token", token.as_str()),
                ("ixProject", &project_id),
            ])
            .await?;

        let fixfors = response.fixfors.map(|f| f.items).unwrap_or_default();
        let mut milestones = Vec::new();
        for fixfor in fixfors {
            if fixfor.name == UNDECIDED_MILESTONE {
                continue;
            }
            let Some(due) = fixfor.due.as_deref().and_then(parse_due_date) else {
                warn!(milestone = %fixfor.name, "skipping milestone without a usable due date");
                continue;
            };
            milestones.push(Milestone {
                name: fixfor.name,
                due,
            });
        }
        milestones.sort_by_key(|m| m.due);
        Ok(milestones)
    }

    async fn search_issues(&self, token: &SessionToken, release: &str) -> Result<Vec<Issue>> {
        let query = format!("release:\"{release}\"");
        let response = self
            .request(&[
                ("cmd", "search"),
                ("token", token.as_str()),
                ("q", &query),
                ("cols", SEARCH_COLUMNS),
            ])
            .await?;

        let cases = response.cases.map(|c| c.items).unwrap_or_default();
        Ok(cases.into_iter().map(Case::into_issue).collect())
    }

    async fn logoff(&self, token: &SessionToken) -> Result<()> {
        self.request(&[("cmd", "logoff"), ("token", token.as_str())])
            .await?;
        Ok(())
    }
}

/// Milestone due dates carry a date plus an arbitrary time of day; the page
/// cares about the calendar day, so normalize to end-of-day.
fn parse_due_date(raw: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()?;
    date.and_hms_opt(23, 59, 59)
}

fn parse_resolved_date(raw: &str) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    token: Option<String>,
    error: Option<ApiError>,
    fixfors: Option<FixForList>,
    cases: Option<CaseList>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "@code")]
    code: Option<String>,
    #[serde(rename = "$text")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixForList {
    #[serde(rename = "fixfor", default)]
    items: Vec<FixFor>,
}

#[derive(Debug, Deserialize)]
struct FixFor {
    #[serde(rename = "sFixFor")]
    name: String,
    #[serde(rename = "dt")]
    due: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaseList {
    #[serde(rename = "case", default)]
    items: Vec<Case>,
}

#[derive(Debug, Deserialize)]
struct Case {
    #[serde(rename = "ixBug")]
    id: u64,
    #[serde(rename = "sTitle")]
    title: String,
    #[serde(rename = "sStatus")]
    status: String,
    #[serde(rename = "sPersonAssignedTo", default)]
    assignee: String,
    #[serde(rename = "dtResolved")]
    resolved: Option<String>,
}

impl Case {
    fn into_issue(self) -> Issue {
        let resolved = self.resolved.as_deref().and_then(parse_resolved_date);
        Issue {
            id: self.id,
            title: self.title,
            assignee: self.assignee,
            status: self.status,
            resolved,
        }
    }
}

/// In-memory `Tracker` for pipeline tests.
#[cfg(test)]
pub mod mock {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    pub struct MockTracker {
        pub milestones: Vec<Milestone>,
        pub issues: Vec<Issue>,
        /// When set, `search_issues` fails with an API error.
        pub fail_search: bool,
        pub logoff_calls: Arc<AtomicUsize>,
    }

    impl MockTracker {
        pub fn new(milestones: Vec<Milestone>, issues: Vec<Issue>) -> Self {
            Self {
                milestones,
                issues,
                ..Self::default()
            }
        }

        pub fn logoff_count(&self) -> usize {
            self.logoff_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Tracker for MockTracker {
        async fn logon(&self) -> Result<SessionToken> {
            Ok(SessionToken("test-token".to_string()))
        }

        async fn list_milestones(&self, _token: &SessionToken) -> Result<Vec<Milestone>> {
            Ok(self.milestones.clone())
        }

        async fn search_issues(&self, _token: &SessionToken, _release: &str) -> Result<Vec<Issue>> {
            if self.fail_search {
                return Err(TrackerError::Api {
                    code: "3".to_string(),
                    message: "Not logged on".to_string(),
                });
            }
            Ok(self.issues.clone())
        }

        async fn logoff(&self, _token: &SessionToken) -> Result<()> {
            self.logoff_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
