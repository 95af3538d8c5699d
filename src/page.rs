//! HTML rendering of the status page.
//!
//! Pure string formatting: everything here is driven by data the pipeline
//! already fetched and classified. Writing into a `String` cannot fail, so
//! rendering is infallible; output I/O errors belong to the caller.

use chrono::{Datelike, NaiveDateTime, Timelike};
use indoc::{formatdoc, indoc};

use crate::artifacts::BuildHistory;
use crate::config::Config;
use crate::issues::{ClassifiedIssues, Issue};
use crate::release::Milestone;

pub struct PageContext<'a> {
    pub config: &'a Config,
    pub release: &'a Milestone,
    pub history: &'a BuildHistory,
    pub issues: &'a ClassifiedIssues,
}

/// Render the complete status page.
pub fn render_page(ctx: &PageContext) -> String {
    let title = escape_html(&ctx.config.page.title);
    let release_name = escape_html(&ctx.release.name);
    let due = format_day(ctx.release.due);
    let download_url = escape_html(&join_url(
        &ctx.config.downloads.url_prefix,
        &ctx.history.latest.filename,
    ));
    let download_name = escape_html(&ctx.history.latest.filename);
    let open_count = ctx.issues.open.len();

    let mut html = formatdoc! {r#"
        <!DOCTYPE html>
        <html>
        <head>
        <meta charset="utf-8">
        <title>{title}</title>
        <style>
        table.bodyTable {{ border-collapse: collapse; width: 100%; }}
        table.bodyTable th, table.bodyTable td {{ padding: 4px 8px; text-align: left; }}
        table.bodyTable tr.a {{ background-color: #eee; }}
        table.bodyTable tr.b {{ background-color: #fff; }}
        </style>
        </head>
        <body>
        <h1>{title}</h1>
        <h2>Latest snapshot build for release - {release_name}</h2>
        <h3>(due {due})</h3>
        <p>This page contains the latest snapshot builds. They contain the very
        latest development work and can be unstable; please help by testing the
        newest features.</p>
        <h3>Build Download:</h3>
        <strong><a href="{download_url}">{download_name}</a></strong>
        <h3>Build Status ({open_count} issues still open):</h3>
    "#};

    render_fixed_pending_table(&mut html, ctx);
    render_closed_verified_table(&mut html, ctx);
    render_previous_builds_table(&mut html, ctx);

    html.push_str(indoc! {"
        </body>
        </html>
    "});

    html
}

fn render_fixed_pending_table(html: &mut String, ctx: &PageContext) {
    html.push_str(indoc! {r#"
        <table class="bodyTable">
        <tr class="a"><th>Fixes included in this build that require verification:</th></tr>
    "#});

    for (index, issue) in ctx.issues.fixed_pending.iter().enumerate() {
        let assignee = escape_html(&issue.assignee);
        let link = issue_link(ctx, issue);
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{assignee} still needs to verify that {link} has been fixed in this build.</td></tr>\n",
            stripe(index),
        ));
    }

    html.push_str("</table>\n");
}

fn render_closed_verified_table(html: &mut String, ctx: &PageContext) {
    html.push_str(indoc! {r#"
        <table class="bodyTable">
        <tr class="a"><th>Fixes that have been verified to be included in this build:</th></tr>
    "#});

    for (index, issue) in ctx.issues.closed_verified.iter().enumerate() {
        let link = issue_link(ctx, issue);
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{link}</td></tr>\n",
            stripe(index),
        ));
    }

    html.push_str("</table>\n");
}

fn render_previous_builds_table(html: &mut String, ctx: &PageContext) {
    html.push_str(indoc! {r#"
        <h2>Previous snapshot builds:</h2>
        <table class="bodyTable">
        <tr class="a"><th>Date</th><th>Build</th></tr>
    "#});

    for (index, build) in ctx.history.previous.iter().enumerate() {
        let url = escape_html(&join_url(
            &ctx.config.downloads.url_prefix,
            &build.filename,
        ));
        let name = escape_html(&build.filename);
        html.push_str(&format!(
            "<tr class=\"{}\"><td>{}</td><td><a href=\"{url}\">{name}</a></td></tr>\n",
            stripe(index),
            format_build_time(build.timestamp),
        ));
    }

    html.push_str("</table>\n");
}

/// Case link into the tracker's event view, with the render-time truncated
/// title.
fn issue_link(ctx: &PageContext, issue: &Issue) -> String {
    let url = escape_html(&format!(
        "{}/default.php?pgx=EV&ixBug={}",
        ctx.config.tracker.base_url.trim_end_matches('/'),
        issue.id
    ));
    let title = escape_html(&truncate_title(
        &issue.title,
        ctx.config.page.summary_length,
    ));
    format!("<a href=\"{url}\">Case {}: {title}</a>", issue.id)
}

/// Each table restarts its own striping, first row `b` then `a`.
fn stripe(index: usize) -> &'static str {
    if index % 2 == 0 { "b" } else { "a" }
}

fn join_url(prefix: &str, filename: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), filename)
}

/// Truncate an issue title to `max_length` characters, marking the cut with
/// a trailing ellipsis. Char-based so multi-byte text is never split.
fn truncate_title(title: &str, max_length: usize) -> String {
    let char_count = title.chars().count();
    if char_count > max_length {
        let truncated: String = title.chars().take(max_length).collect();
        format!("{truncated}...")
    } else {
        title.to_string()
    }
}

/// "1st March 2023"
fn format_day(date: NaiveDateTime) -> String {
    let day = date.day();
    format!(
        "{day}{} {} {}",
        ordinal_suffix(day),
        date.format("%B"),
        date.year()
    )
}

/// "1st March 2023 - 4:05am"
fn format_build_time(date: NaiveDateTime) -> String {
    let (is_pm, hour) = date.hour12();
    let meridiem = if is_pm { "pm" } else { "am" };
    format!(
        "{} - {hour}:{:02}{meridiem}",
        format_day(date),
        date.minute()
    )
}

fn ordinal_suffix(day: u32) -> &'static str {
    match day {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
