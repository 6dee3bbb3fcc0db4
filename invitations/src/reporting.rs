//! Audit publishing and the console status table
//!
//! Publishing never fails a run: every forum error is logged and the
//! remaining steps are skipped.

use chrono::{NaiveDate, NaiveDateTime};
use shared::{ForumPost, SubscriptionStatus};
use tracing::{error, info};

use crate::config::Settings;
use crate::core::audit::{append_log_entry, heading_needs_refresh, log_post_is_current, log_post_opening, table_heading};
use crate::traits::Forum;

/// One line of the `--status` table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusRow {
    pub index: usize,
    pub email: String,
    pub status: Option<SubscriptionStatus>,
    pub adult: bool,
    pub response_id: String,
    pub invited: bool,
}

/// Plain-text table of respondent states
pub fn render_status_table(rows: &[StatusRow]) -> String {
    let email_width = rows.iter().map(|r| r.email.len()).max().unwrap_or(0).max("email".len());
    let mut table = format!(
        "{:>4}  {:<email_width$}  {:<12}  {:<5}  {:<12}  {}",
        "#", "email", "status", "18+", "response", "invited"
    );
    for row in rows {
        let status = row.status.map(|s| s.to_string()).unwrap_or_else(|| "unknown".to_string());
        table.push_str(&format!(
            "\n{:>4}  {:<email_width$}  {:<12}  {:<5}  {:<12}  {}",
            row.index, row.email, status, row.adult, row.response_id, row.invited
        ));
    }
    table
}

/// Writes the membership table and run logs to their forum topics
pub struct AuditReporter<'a, F: ?Sized> {
    forum: &'a F,
    settings: &'a Settings,
    today: NaiveDate,
}

impl<'a, F: Forum + ?Sized> AuditReporter<'a, F> {
    pub fn new(forum: &'a F, settings: &'a Settings, today: NaiveDate) -> Self {
        Self { forum, settings, today }
    }

    fn edit_reason(&self) -> String {
        format!("slmschimp-{}", self.today)
    }

    /// Latest post of a topic, retried once after a short pause
    async fn latest_post(&self, topic_id: u64) -> Option<ForumPost> {
        match self.forum.latest_post(topic_id).await {
            Ok(post) => return Some(post),
            Err(e) => error!("audit: {}. Retrying.", e),
        }
        tokio::time::sleep(self.settings.discourse.retry_delay).await;
        match self.forum.latest_post(topic_id).await {
            Ok(post) => Some(post),
            Err(e) => {
                error!("audit: {}", e);
                None
            }
        }
    }

    /// Append rows to the membership table, opening a new month if needed
    pub async fn publish_membership_table(&self, rows: &[String]) {
        if rows.is_empty() {
            return;
        }
        let topic_id = self.settings.discourse.welcome_table_topic_id;

        let Some(latest) = self.latest_post(topic_id).await else {
            return;
        };
        let post = if heading_needs_refresh(&latest.raw, self.today) {
            info!("audit: Creating new membership table post with heading.");
            if let Err(e) = self.forum.create_post(topic_id, &table_heading(self.today)).await {
                error!("audit: {}", e);
                return;
            }
            match self.latest_post(topic_id).await {
                Some(post) => post,
                None => return,
            }
        } else {
            latest
        };

        let updated = format!("{}{}", post.raw, rows.concat());
        match self.forum.update_post(post.id, &updated, &self.edit_reason()).await {
            Ok(()) => info!("audit: Posted {} membership row(s).", rows.len()),
            Err(e) => error!("audit: {}", e),
        }
    }

    /// Append this run's captured records to the log topic
    pub async fn publish_logs(&self, records: &[String], now: NaiveDateTime) {
        if records.is_empty() {
            return;
        }
        let topic_id = self.settings.discourse.log_topic_id;

        let Some(mut post) = self.latest_post(topic_id).await else {
            return;
        };
        if !log_post_is_current(&post.raw, self.today) {
            info!("audit: New month, creating new log post.");
            if let Err(e) = self.forum.create_post(topic_id, &log_post_opening(self.today)).await {
                error!("audit: {}", e);
                return;
            }
            post = match self.latest_post(topic_id).await {
                Some(post) => post,
                None => return,
            };
        }

        let updated = append_log_entry(&post.raw, records, now);
        if let Err(e) = self.forum.update_post(post.id, &updated, &self.edit_reason()).await {
            error!("audit: {}", e);
        }
    }
}
