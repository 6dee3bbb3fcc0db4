//! Test fixtures and data for invitation runs

use chrono::{DateTime, NaiveDate};
use invitations::Settings;
use shared::{CalendarTopic, Member, SubscriptionStatus, SurveyContact, SurveyResponse};
use std::collections::HashMap;
use std::time::Duration;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    pub const ADULT_TAG: &'static str = "18+";
    pub const MARKER_TAG: &'static str = "slmschimp";
    pub const NO_SEND_TAG: &'static str = "NoSend";
    pub const FORUM_URL: &'static str = "https://discourse.southlondonmakerspace.org";
    pub const LOG_TOPIC: u64 = 101;
    pub const TABLE_TOPIC: u64 = 202;

    /// Tuesday before the 2023-09-06 Open Evening
    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 9, 5).unwrap()
    }

    pub fn stamp() -> String {
        format!("Invited-{}", Self::today())
    }

    /// Settings with all blocking waits removed
    pub fn settings() -> Settings {
        let env = HashMap::from([
            ("DC", "us3"),
            ("API_KEY", "test-key-us3"),
            ("LIST_ID", "59cc0c8cb4"),
            ("SURVEY_ID", "3410"),
            ("USER_API_KEY", "forum-key"),
            ("USER_API_CLIENT_ID", "forum-client"),
            ("LOG_TOPIC_ID", "101"),
            ("WELCOME_TABLE_TOPIC_ID", "202"),
        ]);
        let mut settings = Settings::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        settings.automation.settle_delay = Duration::ZERO;
        settings.automation.poll_interval = Duration::ZERO;
        settings.discourse.retry_delay = Duration::ZERO;
        settings
    }

    pub fn member(contact_id: &str, status: SubscriptionStatus) -> Member {
        Member {
            contact_id: contact_id.to_string(),
            email: format!("{contact_id}@example.org"),
            full_name: format!("Maker {}", contact_id.to_uppercase()),
            status: Some(status),
        }
    }

    pub fn response(contact_id: &str, status: SubscriptionStatus) -> SurveyResponse {
        SurveyResponse {
            response_id: format!("r-{contact_id}"),
            submitted_at: DateTime::parse_from_rfc3339("2023-09-01T10:00:00+00:00").ok(),
            contact: SurveyContact {
                contact_id: contact_id.to_string(),
                email: format!(" {contact_id}@example.org "),
                full_name: format!("Maker {}", contact_id.to_uppercase()),
                status: Some(status),
            },
        }
    }

    pub fn event_url() -> String {
        format!("{}/t/open-evening-6-september/5678", Self::FORUM_URL)
    }

    pub fn open_evening_topic(start: &str) -> CalendarTopic {
        CalendarTopic {
            id: 5678,
            slug: "open-evening-6-september".to_string(),
            title: "Open Evening 6 September".to_string(),
            event_start: Some(start.to_string()),
        }
    }

    /// Body of the previous invitation, advertising the last event
    pub fn previous_invitation() -> String {
        format!(
            "<p>Our next Open Evening is on Wednesday, 23rd August from 7pm.</p>\
             <p><a href=\"{}/t/open-evening-23-august/5555\">Sign up here</a></p>",
            Self::FORUM_URL
        )
    }

    pub fn log_post() -> String {
        "## SLMSchimp Logs September 2023\n[details =\"SLMSchimp Logs September 2023\"]\n\n[/details]".to_string()
    }

    pub fn table_post() -> String {
        "# Membership invites September 2023 \n|date|name|e-mail|response-id|campaign-id|discourse-user| \n |-|-|-|-|-|-|"
            .to_string()
    }
}
