//! Service-specific tests against a local mock HTTP server

#[cfg(test)]
mod discourse;

#[cfg(test)]
pub mod common {
    use crate::config::{DiscourseSettings, MailchimpSettings};
    use std::time::Duration;

    pub const API_KEY: &str = "test-key-us3";
    pub const LIST_ID: &str = "59cc0c8cb4";

    /// Mailing-list settings pointing at a mock server
    pub fn mailchimp_settings(uri: &str) -> MailchimpSettings {
        let mut settings = MailchimpSettings::new("us3", API_KEY, LIST_ID, "3410");
        settings.api_url = uri.to_string();
        settings
    }

    /// Forum settings pointing at a mock server
    pub fn discourse_settings(uri: &str) -> DiscourseSettings {
        DiscourseSettings {
            base_url: uri.to_string(),
            api_key: "forum-key".to_string(),
            client_id: "forum-client".to_string(),
            log_topic_id: 101,
            welcome_table_topic_id: 202,
            retry_delay: Duration::from_millis(1),
        }
    }
}
