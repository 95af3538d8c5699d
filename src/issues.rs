//! Classification of tracker issues against the latest build.

use chrono::NaiveDateTime;
use tracing::debug;

/// An issue returned by the milestone search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: u64,
    pub title: String,
    pub assignee: String,
    pub status: String,
    pub resolved: Option<NaiveDateTime>,
}

/// The bucket an issue lands in relative to the latest build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Still being worked on.
    Open,
    /// Resolved before the build was made, so the fix should be present and
    /// awaits manual verification.
    FixedPendingVerification,
    /// Fix already confirmed present in a build.
    ClosedVerified,
}

const RESOLVED_STATUSES: [&str; 4] = [
    "Resolved (Fixed)",
    "Resolved (By Design)",
    "Resolved (Not Reproducible)",
    "Resolved (Implemented)",
];

const CLOSED_STATUSES: [&str; 4] = [
    "Closed (Fixed)",
    "Closed (Implemented)",
    "Closed (Not Reproducible)",
    "Closed (By Design)",
];

/// Classify a single issue. Returns `None` for statuses that should not be
/// rendered, including resolved issues whose fix postdates the build.
pub fn classify(
    status: &str,
    resolved: Option<NaiveDateTime>,
    latest_build: NaiveDateTime,
) -> Option<Bucket> {
    if status == "Active" {
        return Some(Bucket::Open);
    }
    if RESOLVED_STATUSES.contains(&status) {
        return match resolved {
            Some(date) if date < latest_build => Some(Bucket::FixedPendingVerification),
            _ => None,
        };
    }
    if CLOSED_STATUSES.contains(&status) {
        return Some(Bucket::ClosedVerified);
    }
    None
}

/// Issues partitioned into disjoint buckets, preserving tracker order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClassifiedIssues {
    pub open: Vec<Issue>,
    pub fixed_pending: Vec<Issue>,
    pub closed_verified: Vec<Issue>,
}

pub fn classify_issues(issues: Vec<Issue>, latest_build: NaiveDateTime) -> ClassifiedIssues {
    let mut buckets = ClassifiedIssues::default();
    for issue in issues {
        match classify(&issue.status, issue.resolved, latest_build) {
            Some(Bucket::Open) => buckets.open.push(issue),
            Some(Bucket::FixedPendingVerification) => buckets.fixed_pending.push(issue),
            Some(Bucket::ClosedVerified) => buckets.closed_verified.push(issue),
            None => {
                debug!(id = issue.id, status = %issue.status, "dropping unrecognized issue status");
            }
        }
    }
    buckets
}
