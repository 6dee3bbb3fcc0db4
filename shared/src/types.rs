//! Core shared types for members, survey responses, campaigns and events

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

/// Opaque key identifying a list member across the directory and survey snapshots
pub type ContactId = String;

/// Subscription status of a list member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
    Archived,
}

impl SubscriptionStatus {
    /// Wire value used when patching a member
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Subscribed => "subscribed",
            SubscriptionStatus::Unsubscribed => "unsubscribed",
            SubscriptionStatus::Archived => "archived",
        }
    }
}

impl FromStr for SubscriptionStatus {
    type Err = SharedError;

    /// Survey contacts report "Subscribed", list members report "subscribed"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscribed" => Ok(SubscriptionStatus::Subscribed),
            "unsubscribed" => Ok(SubscriptionStatus::Unsubscribed),
            "archived" => Ok(SubscriptionStatus::Archived),
            _ => Err(SharedError::InvalidStatus { input: s.to_string() }),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubscriptionStatus::Subscribed => "Subscribed",
            SubscriptionStatus::Unsubscribed => "Unsubscribed",
            SubscriptionStatus::Archived => "Archived",
        };
        write!(f, "{label}")
    }
}

/// Entry of the list member listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub contact_id: ContactId,
    pub email: String,
    pub full_name: String,
    pub status: Option<SubscriptionStatus>,
}

/// Member listing with the provider's reported total
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberListing {
    pub total_items: usize,
    pub members: Vec<Member>,
}

/// A tag as reported on a member
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTag {
    pub id: u64,
    pub name: String,
}

/// Contact details embedded in a survey response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyContact {
    pub contact_id: ContactId,
    pub email: String,
    pub full_name: String,
    pub status: Option<SubscriptionStatus>,
}

/// One survey response from the bulk listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub response_id: String,
    pub submitted_at: Option<DateTime<FixedOffset>>,
    pub contact: SurveyContact,
}

/// Answers of a single survey response keyed by question id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyAnswers(pub BTreeMap<String, String>);

impl SurveyAnswers {
    pub fn answer(&self, question_id: &str) -> Option<&str> {
        self.0.get(question_id).map(String::as_str)
    }
}

/// Campaign lifecycle as far as the automation cares
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
}

impl CampaignStatus {
    /// Provider filter value; drafts are reported as "save"
    pub fn as_api_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "save",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
        }
    }
}

impl FromStr for CampaignStatus {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save" | "draft" => Ok(CampaignStatus::Draft),
            "sending" => Ok(CampaignStatus::Sending),
            "sent" => Ok(CampaignStatus::Sent),
            other => Err(SharedError::InvalidStatus { input: other.to_string() }),
        }
    }
}

/// Email campaign summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub web_id: u64,
    pub status: CampaignStatus,
    pub send_time: Option<String>,
}

/// Result page of a campaign query; `total_items` counts all matches
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CampaignPage {
    pub total_items: usize,
    pub campaigns: Vec<Campaign>,
}

impl CampaignPage {
    pub fn latest(&self) -> Option<&Campaign> {
        self.campaigns.first()
    }
}

/// Next occurrence of the recurring event as published on the calendar
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    pub url: String,
}

impl CalendarEvent {
    pub fn new(date: NaiveDate, url: impl Into<String>) -> Self {
        Self { date, url: url.into() }
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.date.format("%A, %d %B"), self.url)
    }
}

/// Calendar topic as listed by the forum
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarTopic {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub event_start: Option<String>,
}

/// Latest post of a forum topic
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumPost {
    pub id: u64,
    pub raw: String,
}
