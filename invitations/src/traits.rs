//! Collaborator traits with mockall annotations for testing
//!
//! The automation core only talks to the outside world through these two
//! seams: the mailing-list/campaign provider and the forum that hosts the
//! event calendar and the audit topics.

use shared::{
    Campaign, CampaignPage, CampaignStatus, CalendarTopic, ForumPost, MemberListing, MemberTag,
    SubscriptionStatus, SurveyAnswers, SurveyResponse,
};

use crate::error::InvitationResult;

/// Mailing-list, survey and campaign operations
#[mockall::automock]
#[async_trait::async_trait]
pub trait MailingList: Send + Sync {
    /// List members of the audience with the provider's total count
    async fn list_members(&self) -> InvitationResult<MemberListing>;

    /// Bulk survey responses for the configured survey
    async fn survey_responses(&self) -> InvitationResult<Vec<SurveyResponse>>;

    /// Answers of a single survey response
    async fn survey_answers(&self, response_id: &str) -> InvitationResult<SurveyAnswers>;

    /// Live tag set of a member
    async fn member_tags(&self, contact_id: &str) -> InvitationResult<Vec<MemberTag>>;

    /// Mark a tag active on a member; applying an active tag again is a no-op
    async fn add_tag(&self, contact_id: &str, tag: &str) -> InvitationResult<()>;

    /// Mark a tag inactive on a member
    async fn remove_tag(&self, contact_id: &str, tag: &str) -> InvitationResult<()>;

    /// Patch the subscription status of a member
    async fn set_status(&self, contact_id: &str, status: SubscriptionStatus) -> InvitationResult<()>;

    /// Archive a member
    async fn archive(&self, contact_id: &str) -> InvitationResult<()>;

    /// Newest-first campaigns of the list with the given status
    ///
    /// # Parameters
    /// - `status`: Campaign status filter
    /// - `count`: Page size; `total_items` in the result still counts every match
    async fn campaigns(&self, status: CampaignStatus, count: usize) -> InvitationResult<CampaignPage>;

    /// Create a new draft campaign addressed to the invitation segment
    async fn create_campaign(&self, title: &str) -> InvitationResult<Campaign>;

    async fn delete_campaign(&self, campaign_id: &str) -> InvitationResult<()>;

    /// HTML body of a campaign
    async fn campaign_content(&self, campaign_id: &str) -> InvitationResult<String>;

    async fn set_campaign_content(&self, campaign_id: &str, html: &str) -> InvitationResult<()>;

    /// Send a draft campaign; any error means the send was not accepted
    async fn send_campaign(&self, campaign_id: &str) -> InvitationResult<()>;
}

/// Forum operations: event calendar and audit topics
#[mockall::automock]
#[async_trait::async_trait]
pub trait Forum: Send + Sync {
    /// Topics of the events calendar category
    async fn calendar_topics(&self) -> InvitationResult<Vec<CalendarTopic>>;

    /// Most recent post of a topic
    async fn latest_post(&self, topic_id: u64) -> InvitationResult<ForumPost>;

    /// Reply to a topic
    async fn create_post(&self, topic_id: u64, raw: &str) -> InvitationResult<()>;

    /// Replace the raw body of a post
    async fn update_post(&self, post_id: u64, raw: &str, edit_reason: &str) -> InvitationResult<()>;
}
