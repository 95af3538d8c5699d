//! The `generate` command: scan, fetch, classify, render, write.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::artifacts::{self, BuildHistory};
use crate::config::{self, Config};
use crate::fogbugz::{FogBugzClient, SessionToken, Tracker};
use crate::issues::{self, Issue};
use crate::page::{self, PageContext};
use crate::release::{self, Milestone};

#[derive(Args, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write the page to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[tokio::main]
pub async fn run(args: &GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    run_inner(args).await?;
    Ok(())
}

async fn run_inner(args: &GenerateArgs) -> anyhow::Result<()> {
    let config = config::load_config(args.config.as_deref())?;
    let history = artifacts::scan_downloads(&config.downloads.dir)
        .context("Failed to scan the downloads directory")?;
    let client = FogBugzClient::new(&config.tracker)?;

    let html = build_page(&client, &config, &history).await?;

    match &args.output {
        Some(path) => fs::write(path, html)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => io::stdout().write_all(html.as_bytes())?,
    }

    Ok(())
}

/// Run the tracker half of the pipeline and render the page. Fail-fast: any
/// error aborts with no partial page.
pub(crate) async fn build_page<T: Tracker>(
    tracker: &T,
    config: &Config,
    history: &BuildHistory,
) -> anyhow::Result<String> {
    let token = tracker.logon().await.context("Tracker logon failed")?;

    // Everything that needs the session happens before logoff, so the
    // session is released even when a fetch fails mid-way.
    let fetched = fetch_release_issues(tracker, &token, config, history).await;

    if let Err(e) = tracker.logoff(&token).await {
        warn!(error = %e, "tracker logoff failed");
    }

    let (release, issues) = fetched?;
    let classified = issues::classify_issues(issues, history.latest.timestamp);
    info!(
        release = %release.name,
        open = classified.open.len(),
        fixed_pending = classified.fixed_pending.len(),
        closed_verified = classified.closed_verified.len(),
        "rendering status page"
    );

    Ok(page::render_page(&PageContext {
        config,
        release: &release,
        history,
        issues: &classified,
    }))
}

async fn fetch_release_issues<T: Tracker>(
    tracker: &T,
    token: &SessionToken,
    config: &Config,
    history: &BuildHistory,
) -> anyhow::Result<(Milestone, Vec<Issue>)> {
    let milestones = tracker
        .list_milestones(token)
        .await
        .with_context(|| format!("Failed to list milestones for project {}", config.tracker.project_id))?;

    let release = release::match_release(&milestones, history.latest.timestamp)?.clone();

    let issues = tracker
        .search_issues(token, &release.name)
        .await
        .with_context(|| format!("Failed to search issues for release {}", release.name))?;

    Ok((release, issues))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::BuildArtifact;
    use crate::fogbugz::mock::MockTracker;
    use crate::release::MatchError;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn test_config() -> Config {
        serde_yaml::from_str(
            "\
tracker:
  base_url: https://bugs.example.org/
  email: builds@example.org
  password: hunter2
downloads:
  dir: /srv/downloads
  url_prefix: https://example.org/downloads/
",
        )
        .unwrap()
    }

    fn history() -> BuildHistory {
        BuildHistory {
            latest: BuildArtifact {
                timestamp: day(2023, 3, 1),
                filename: "proj-NIGHTLY-win-20230301000000.exe".to_string(),
            },
            previous: vec![BuildArtifact {
                timestamp: day(2023, 1, 1),
                filename: "proj-NIGHTLY-win-20230101000000.exe".to_string(),
            }],
        }
    }

    fn milestone(name: &str, y: i32, m: u32, d: u32) -> Milestone {
        Milestone {
            name: name.to_string(),
            due: NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap(),
        }
    }

    #[tokio::test]
    async fn renders_page_for_the_matched_release() {
        let tracker = MockTracker::new(
            vec![milestone("R1", 2023, 2, 15), milestone("R2", 2023, 4, 10)],
            vec![
                Issue {
                    id: 1,
                    title: "Crash on open".to_string(),
                    assignee: "alex".to_string(),
                    status: "Resolved (Fixed)".to_string(),
                    resolved: Some(day(2023, 1, 10)),
                },
                Issue {
                    id: 2,
                    title: "Verified fix".to_string(),
                    assignee: "sam".to_string(),
                    status: "Closed (Fixed)".to_string(),
                    resolved: None,
                },
            ],
        );

        let html = build_page(&tracker, &test_config(), &history())
            .await
            .unwrap();

        assert!(html.contains("Latest snapshot build for release - R2"));
        assert!(html.contains("Case 1: Crash on open"));
        assert!(html.contains("Case 2: Verified fix"));
        assert_eq!(tracker.logoff_count(), 1);
    }

    #[tokio::test]
    async fn logoff_runs_even_when_search_fails() {
        let mut tracker = MockTracker::new(vec![milestone("R2", 2023, 4, 10)], vec![]);
        tracker.fail_search = true;

        let err = build_page(&tracker, &test_config(), &history())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Failed to search issues"));
        assert_eq!(tracker.logoff_count(), 1);
    }

    #[tokio::test]
    async fn no_upcoming_release_aborts_the_run() {
        let tracker = MockTracker::new(vec![milestone("R1", 2023, 1, 15)], vec![]);

        let err = build_page(&tracker, &test_config(), &history())
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<MatchError>().is_some());
        // The session is still released.
        assert_eq!(tracker.logoff_count(), 1);
    }
}
