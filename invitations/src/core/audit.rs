//! Markdown rendering for the forum audit topics
//!
//! Two topics are maintained: a monthly membership table with one row per
//! invited member, and a monthly log post that collects the captured log
//! records of every run inside collapsible `[details]` blocks.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::core::content::month_number;

pub const TABLE_HEADER: &str = "|date|name|e-mail|response-id|campaign-id|discourse-user| \n |-|-|-|-|-|-|";
const DETAILS_CLOSE: &str = "\n[/details]";

/// One archived member as recorded in the membership table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    pub date: NaiveDate,
    pub contact_id: String,
    pub full_name: String,
    pub email: String,
    pub response_id: String,
    pub discourse_handle: String,
    /// `None` for members that were not age verified
    pub campaign_id: Option<String>,
}

/// Link targets used when rendering table rows
#[derive(Clone, Debug)]
pub struct AuditLinks {
    pub website_url: String,
    pub forum_url: String,
    pub contact_url: String,
    pub survey_result_url: String,
    pub report_url: String,
}

impl AuditLinks {
    fn contact(&self, contact_id: &str) -> String {
        format!("{}{}", self.contact_url, contact_id)
    }

    fn survey_result(&self, response_id: &str) -> String {
        self.survey_result_url.replace("{response_id}", response_id)
    }
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"# Membership invites (\w+) (\d{4})").expect("static heading pattern"))
}

fn month_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\b\s+(\d{4})",
        )
        .expect("static month pattern")
    })
}

fn month_year(captures: &regex::Captures<'_>) -> Option<(i32, u32)> {
    let month = month_number(captures.get(1)?.as_str())?;
    let year = captures.get(2)?.as_str().parse().ok()?;
    Some((year, month))
}

/// Heading and header row that open a month of the membership table
pub fn table_heading(today: NaiveDate) -> String {
    format!("# Membership invites {} \n{}", today.format("%B %Y"), TABLE_HEADER)
}

/// Whether the latest membership post lacks a heading for the current month
pub fn heading_needs_refresh(latest_raw: &str, today: NaiveDate) -> bool {
    match heading_pattern().captures(latest_raw).as_ref().and_then(month_year) {
        Some(found) => (today.year(), today.month()) > found,
        None => true,
    }
}

/// Markdown row for one member
pub fn membership_row(entry: &AuditEntry, links: &AuditLinks) -> String {
    let last_name = entry
        .full_name
        .split(' ')
        .filter(|part| !part.is_empty())
        .last()
        .unwrap_or_default();

    let (date, email, campaign) = match &entry.campaign_id {
        Some(campaign_id) => (entry.date.to_string(), entry.email.clone(), campaign_id.clone()),
        None => (
            format!(":warning: {}", entry.date),
            format!(":warning: {}", entry.email),
            ":warning: NOT_18+".to_string(),
        ),
    };

    format!(
        "\n |{}|[{}]({}/wp-admin/users.php?s={})|[{}]({})|[{}]({})|[{}]({})|[{}]({}/u/{})|",
        date,
        entry.full_name,
        links.website_url,
        last_name,
        email,
        links.contact(&entry.contact_id),
        entry.response_id,
        links.survey_result(&entry.response_id),
        campaign,
        links.report_url,
        entry.discourse_handle,
        links.forum_url,
        entry.discourse_handle,
    )
}

/// Opening post of a month in the log topic
pub fn log_post_opening(today: NaiveDate) -> String {
    let month_year = today.format("%B %Y");
    format!("## SLMSchimp Logs {month_year}\n[details =\"SLMSchimp Logs {month_year}\"]\n{DETAILS_CLOSE}")
}

/// Whether the latest log post already belongs to the current month
pub fn log_post_is_current(latest_raw: &str, today: NaiveDate) -> bool {
    match month_year_pattern().captures(latest_raw).as_ref().and_then(month_year) {
        Some(found) => found >= (today.year(), today.month()),
        None => false,
    }
}

/// Insert a run's records into the outer details block of a log post
pub fn append_log_entry(latest_raw: &str, records: &[String], now: NaiveDateTime) -> String {
    let body = latest_raw.strip_suffix(DETAILS_CLOSE).unwrap_or(latest_raw);
    format!(
        "{}\n[details =\"{}\"]\n{}{}{}",
        body,
        now.format("%Y-%m-%d | %H:%M"),
        records.join("\n"),
        DETAILS_CLOSE,
        DETAILS_CLOSE
    )
}
