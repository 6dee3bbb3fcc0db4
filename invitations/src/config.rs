//! Runtime configuration loaded from the environment
//!
//! Values are read from:
//! 1. `.env` file in the current directory or parent directories (if present)
//! 2. System environment variables
//!
//! ## Required variables
//! - `DC`, `API_KEY`, `LIST_ID`, `SURVEY_ID`: mailing-list account
//! - `USER_API_KEY`, `USER_API_CLIENT_ID`: forum user API credentials
//! - `LOG_TOPIC_ID`, `WELCOME_TABLE_TOPIC_ID`: forum audit topics
//!
//! ## Optional variables
//! - `DISCOURSE_URL`: forum base URL
//! - `SAVED_SEGMENT_ID`, `TEMPLATE_ID`: campaign recipients and template
//! - `OPEN_EVENING_REFERENCE`: a known event day (`YYYY-MM-DD`)
//! - `AGE_QUESTION_ID`, `DISCOURSE_QUESTION_ID`: survey question ids
//! - `SETTLE_DELAY_SECS`, `POLL_INTERVAL_SECS`: blocking wait lengths

use chrono::NaiveDate;
use std::time::Duration;
use url::Url;

use crate::error::{InvitationError, InvitationResult};
use shared::MemberTag;

pub const DEFAULT_DISCOURSE_URL: &str = "https://discourse.southlondonmakerspace.org";
pub const DEFAULT_WEBSITE_URL: &str = "https://southlondonmakerspace.org";

/// Reference to a provider tag, matched by id when known and by name otherwise
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRef {
    pub id: Option<u64>,
    pub name: String,
}

impl TagRef {
    pub fn named(name: &str) -> Self {
        Self { id: None, name: name.to_string() }
    }

    pub fn with_id(id: u64, name: &str) -> Self {
        Self { id: Some(id), name: name.to_string() }
    }

    pub fn matches(&self, tag: &MemberTag) -> bool {
        self.id == Some(tag.id) || tag.name == self.name
    }
}

/// Tag vocabulary used for eligibility and idempotency
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagVocabulary {
    /// Platform-level age tag stamped by the provider
    pub adult: TagRef,
    /// "Already invited" marker
    pub invite_marker: TagRef,
    /// Permanent exclusion marker
    pub no_send: String,
    /// Prefix of the dated audit stamp
    pub stamp_prefix: String,
}

impl TagVocabulary {
    pub fn stamp(&self, date: NaiveDate) -> String {
        format!("{}{}", self.stamp_prefix, date.format("%Y-%m-%d"))
    }
}

impl Default for TagVocabulary {
    fn default() -> Self {
        Self {
            adult: TagRef::with_id(10181290, "18+"),
            invite_marker: TagRef::with_id(10201605, "slmschimp"),
            no_send: "NoSend".to_string(),
            stamp_prefix: "Invited-".to_string(),
        }
    }
}

/// Fixed campaign settings used when a new draft has to be created
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CampaignTemplate {
    pub subject_line: String,
    pub preview_text: String,
    pub title_prefix: String,
    pub from_name: String,
    pub reply_to: String,
    pub saved_segment_id: Option<u64>,
    pub template_id: Option<u64>,
}

impl Default for CampaignTemplate {
    fn default() -> Self {
        Self {
            subject_line: "Membership Invite to the Makerspace".to_string(),
            preview_text: "Please join us as a member!".to_string(),
            title_prefix: "Membership invite".to_string(),
            from_name: "South London Makerspace".to_string(),
            reply_to: "info@southlondonmakerspace.org".to_string(),
            saved_segment_id: Some(10201693),
            template_id: Some(10091262),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailchimpSettings {
    pub api_url: String,
    pub admin_url: String,
    pub api_key: String,
    pub list_id: String,
    pub survey_id: String,
    /// Lower bound for campaign queries
    pub campaigns_since: String,
    pub campaign: CampaignTemplate,
}

impl MailchimpSettings {
    pub fn new(dc: &str, api_key: &str, list_id: &str, survey_id: &str) -> Self {
        Self {
            api_url: format!("https://{dc}.api.mailchimp.com/3.0"),
            admin_url: format!("https://{dc}.admin.mailchimp.com"),
            api_key: api_key.to_string(),
            list_id: list_id.to_string(),
            survey_id: survey_id.to_string(),
            campaigns_since: "2023-08-08T08:08:00+00:00".to_string(),
            campaign: CampaignTemplate::default(),
        }
    }

    /// Report link for a sent campaign
    pub fn report_url(&self, web_id: u64) -> String {
        format!("{}/reports/summary?id={}", self.admin_url, web_id)
    }

    pub fn contact_url(&self, contact_id: &str) -> String {
        format!("{}/audience/contact-profile?contact_id={}", self.admin_url, contact_id)
    }

    pub fn survey_result_url(&self, response_id: &str) -> String {
        format!(
            "{}/lists/surveys/results?survey_id={}&tab=0&response_id={}&view=INDIVIDUAL_VIEW",
            self.admin_url, self.survey_id, response_id
        )
    }
}

#[derive(Clone, Debug)]
pub struct DiscourseSettings {
    pub base_url: String,
    pub api_key: String,
    pub client_id: String,
    pub log_topic_id: u64,
    pub welcome_table_topic_id: u64,
    /// Pause before the single retry of a failed topic read
    pub retry_delay: Duration,
}

/// Knobs of the reconciliation pass itself
#[derive(Clone, Debug)]
pub struct AutomationSettings {
    /// Pause between the forced unsubscribe and subscribe calls
    pub settle_delay: Duration,
    /// Interval for polling a sending campaign
    pub poll_interval: Duration,
    /// A known Open Evening; events recur every 14 days from here
    pub reference_date: NaiveDate,
    pub tags: TagVocabulary,
    pub age_question_id: Option<String>,
    pub discourse_question_id: String,
    pub calendar_url: String,
    pub website_url: String,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            poll_interval: Duration::from_secs(5),
            reference_date: NaiveDate::from_ymd_opt(2023, 8, 9).unwrap_or_default(),
            tags: TagVocabulary::default(),
            age_question_id: None,
            discourse_question_id: "29030".to_string(),
            calendar_url: DEFAULT_DISCOURSE_URL.to_string(),
            website_url: DEFAULT_WEBSITE_URL.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub mailchimp: MailchimpSettings,
    pub discourse: DiscourseSettings,
    pub automation: AutomationSettings,
}

impl Settings {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "DC",
        "API_KEY",
        "LIST_ID",
        "SURVEY_ID",
        "USER_API_KEY",
        "USER_API_CLIENT_ID",
        "LOG_TOPIC_ID",
        "WELCOME_TABLE_TOPIC_ID",
    ];

    /// Load settings from `.env` and the process environment
    pub fn from_env() -> InvitationResult<Self> {
        // Silently ignored when no .env file exists
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> InvitationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&str> = Self::REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| value(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(InvitationError::config(format!(
                "missing required environment variables: {}",
                missing.join(", ")
            )));
        }
        let required = |key: &str| value(key).unwrap_or_default();

        let mut mailchimp = MailchimpSettings::new(
            &required("DC"),
            &required("API_KEY"),
            &required("LIST_ID"),
            &required("SURVEY_ID"),
        );
        if let Some(segment) = value("SAVED_SEGMENT_ID") {
            mailchimp.campaign.saved_segment_id = Some(parse_number("SAVED_SEGMENT_ID", &segment)?);
        }
        if let Some(template) = value("TEMPLATE_ID") {
            mailchimp.campaign.template_id = Some(parse_number("TEMPLATE_ID", &template)?);
        }
        validate_url("DC", &mailchimp.api_url)?;

        let base_url = value("DISCOURSE_URL")
            .unwrap_or_else(|| DEFAULT_DISCOURSE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        validate_url("DISCOURSE_URL", &base_url)?;

        let discourse = DiscourseSettings {
            base_url: base_url.clone(),
            api_key: required("USER_API_KEY"),
            client_id: required("USER_API_CLIENT_ID"),
            log_topic_id: parse_number("LOG_TOPIC_ID", &required("LOG_TOPIC_ID"))?,
            welcome_table_topic_id: parse_number("WELCOME_TABLE_TOPIC_ID", &required("WELCOME_TABLE_TOPIC_ID"))?,
            retry_delay: Duration::from_secs(2),
        };

        let mut automation = AutomationSettings {
            calendar_url: base_url,
            age_question_id: value("AGE_QUESTION_ID"),
            ..AutomationSettings::default()
        };
        if let Some(question) = value("DISCOURSE_QUESTION_ID") {
            automation.discourse_question_id = question;
        }
        if let Some(reference) = value("OPEN_EVENING_REFERENCE") {
            automation.reference_date = NaiveDate::parse_from_str(&reference, "%Y-%m-%d")
                .map_err(|_| InvitationError::config(format!("OPEN_EVENING_REFERENCE = {reference}")))?;
        }
        if let Some(secs) = value("SETTLE_DELAY_SECS") {
            automation.settle_delay = Duration::from_secs(parse_number("SETTLE_DELAY_SECS", &secs)?);
        }
        if let Some(secs) = value("POLL_INTERVAL_SECS") {
            automation.poll_interval = Duration::from_secs(parse_number("POLL_INTERVAL_SECS", &secs)?);
        }

        Ok(Self {
            mailchimp,
            discourse,
            automation,
        })
    }
}

fn parse_number(key: &str, raw: &str) -> InvitationResult<u64> {
    raw.parse::<u64>()
        .map_err(|_| InvitationError::config(format!("{key} = {raw}")))
}

fn validate_url(key: &str, raw: &str) -> InvitationResult<()> {
    Url::parse(raw)
        .map(|_| ())
        .map_err(|e| InvitationError::config(format!("{key}: invalid URL {raw}: {e}")))
}
