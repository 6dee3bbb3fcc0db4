//! Stateful in-memory collaborators and an orchestrator builder

use async_trait::async_trait;
use invitations::{InvitationError, InvitationResult, Orchestrator, Settings};
use invitations::{Forum, MailingList};
use shared::{
    Campaign, CampaignPage, CampaignStatus, CalendarTopic, ForumPost, Member, MemberListing, MemberTag,
    SubscriptionStatus, SurveyAnswers, SurveyResponse,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use super::fixtures::TestFixtures;

#[derive(Default)]
pub struct ListState {
    pub members: Vec<Member>,
    pub responses: Vec<SurveyResponse>,
    pub answers: HashMap<String, SurveyAnswers>,
    pub tags: HashMap<String, BTreeSet<String>>,
    pub statuses: HashMap<String, SubscriptionStatus>,
    pub archived: Vec<String>,
    /// Newest first
    pub drafts: Vec<Campaign>,
    /// Newest first
    pub sent: Vec<Campaign>,
    pub contents: HashMap<String, String>,
    pub reject_send: bool,
    pub sending_polls: usize,
    pub created: usize,
    /// Every mutating call and sending poll, in order
    pub calls: Vec<String>,
}

/// Mailing list backed by shared in-memory state
#[derive(Clone, Default)]
pub struct FakeMailingList {
    state: Arc<Mutex<ListState>>,
}

impl FakeMailingList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listed member with a matching survey response
    pub fn with_respondent(self, contact_id: &str, status: SubscriptionStatus, tags: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.members.push(TestFixtures::member(contact_id, status));
            state.responses.push(TestFixtures::response(contact_id, status));
            state.statuses.insert(contact_id.to_string(), status);
            state
                .tags
                .insert(contact_id.to_string(), tags.iter().map(|t| t.to_string()).collect());
        }
        self
    }

    /// Answer on the respondent's survey response
    pub fn with_answer(self, contact_id: &str, question_id: &str, answer: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .answers
            .entry(format!("r-{contact_id}"))
            .or_default()
            .0
            .insert(question_id.to_string(), answer.to_string());
        self
    }

    pub fn with_sent_campaign(self, id: &str, web_id: u64, html: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.sent.insert(
                0,
                Campaign {
                    id: id.to_string(),
                    web_id,
                    status: CampaignStatus::Sent,
                    send_time: Some("2023-08-22T10:00:00+00:00".to_string()),
                },
            );
            state.contents.insert(id.to_string(), html.to_string());
        }
        self
    }

    pub fn with_draft(self, id: &str, web_id: u64, html: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.drafts.push(Campaign {
                id: id.to_string(),
                web_id,
                status: CampaignStatus::Draft,
                send_time: None,
            });
            state.contents.insert(id.to_string(), html.to_string());
        }
        self
    }

    pub fn rejecting_sends(self) -> Self {
        self.state.lock().unwrap().reject_send = true;
        self
    }

    pub fn sending_for(self, polls: usize) -> Self {
        self.state.lock().unwrap().sending_polls = polls;
        self
    }

    pub fn tags_of(&self, contact_id: &str) -> BTreeSet<String> {
        self.state.lock().unwrap().tags.get(contact_id).cloned().unwrap_or_default()
    }

    pub fn status_of(&self, contact_id: &str) -> Option<SubscriptionStatus> {
        self.state.lock().unwrap().statuses.get(contact_id).copied()
    }

    pub fn archived(&self) -> Vec<String> {
        self.state.lock().unwrap().archived.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn drafts(&self) -> Vec<Campaign> {
        self.state.lock().unwrap().drafts.clone()
    }

    pub fn sent(&self) -> Vec<Campaign> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn content_of(&self, campaign_id: &str) -> Option<String> {
        self.state.lock().unwrap().contents.get(campaign_id).cloned()
    }
}

fn tag_id(name: &str) -> u64 {
    match name {
        TestFixtures::ADULT_TAG => 10181290,
        TestFixtures::MARKER_TAG => 10201605,
        _ => 1,
    }
}

#[async_trait]
impl MailingList for FakeMailingList {
    async fn list_members(&self) -> InvitationResult<MemberListing> {
        let state = self.state.lock().unwrap();
        Ok(MemberListing {
            total_items: state.members.len(),
            members: state.members.clone(),
        })
    }

    async fn survey_responses(&self) -> InvitationResult<Vec<SurveyResponse>> {
        Ok(self.state.lock().unwrap().responses.clone())
    }

    async fn survey_answers(&self, response_id: &str) -> InvitationResult<SurveyAnswers> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .answers
            .get(response_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn member_tags(&self, contact_id: &str) -> InvitationResult<Vec<MemberTag>> {
        let state = self.state.lock().unwrap();
        let tags = state.tags.get(contact_id).cloned().unwrap_or_default();
        Ok(tags
            .into_iter()
            .map(|name| MemberTag { id: tag_id(&name), name })
            .collect())
    }

    async fn add_tag(&self, contact_id: &str, tag: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("add_tag {contact_id} {tag}"));
        state.tags.entry(contact_id.to_string()).or_default().insert(tag.to_string());
        Ok(())
    }

    async fn remove_tag(&self, contact_id: &str, tag: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("remove_tag {contact_id} {tag}"));
        if let Some(tags) = state.tags.get_mut(contact_id) {
            tags.remove(tag);
        }
        Ok(())
    }

    async fn set_status(&self, contact_id: &str, status: SubscriptionStatus) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set_status {contact_id} {status}"));
        state.statuses.insert(contact_id.to_string(), status);
        Ok(())
    }

    async fn archive(&self, contact_id: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("archive {contact_id}"));
        state.archived.push(contact_id.to_string());
        state.statuses.insert(contact_id.to_string(), SubscriptionStatus::Archived);
        Ok(())
    }

    async fn campaigns(&self, status: CampaignStatus, count: usize) -> InvitationResult<CampaignPage> {
        let mut state = self.state.lock().unwrap();
        let all = match status {
            CampaignStatus::Draft => state.drafts.clone(),
            CampaignStatus::Sent => state.sent.clone(),
            CampaignStatus::Sending => {
                state.calls.push("campaigns Sending".to_string());
                if state.sending_polls == 0 {
                    Vec::new()
                } else {
                    state.sending_polls -= 1;
                    state.sent.first().cloned().into_iter().collect()
                }
            }
        };
        Ok(CampaignPage {
            total_items: all.len(),
            campaigns: all.into_iter().take(count).collect(),
        })
    }

    async fn create_campaign(&self, title: &str) -> InvitationResult<Campaign> {
        let mut state = self.state.lock().unwrap();
        state.created += 1;
        let campaign = Campaign {
            id: format!("new-{}", state.created),
            web_id: 900 + state.created as u64,
            status: CampaignStatus::Draft,
            send_time: None,
        };
        state.calls.push(format!("create_campaign {title}"));
        state.drafts.insert(0, campaign.clone());
        state.contents.insert(campaign.id.clone(), "<p>template</p>".to_string());
        Ok(campaign)
    }

    async fn delete_campaign(&self, campaign_id: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_campaign {campaign_id}"));
        state.drafts.retain(|c| c.id != campaign_id);
        Ok(())
    }

    async fn campaign_content(&self, campaign_id: &str) -> InvitationResult<String> {
        self.state
            .lock()
            .unwrap()
            .contents
            .get(campaign_id)
            .cloned()
            .ok_or_else(|| InvitationError::status("campaign_content", 404))
    }

    async fn set_campaign_content(&self, campaign_id: &str, html: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set_campaign_content {campaign_id}"));
        state.contents.insert(campaign_id.to_string(), html.to_string());
        Ok(())
    }

    async fn send_campaign(&self, campaign_id: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("send_campaign {campaign_id}"));
        if state.reject_send {
            return Err(InvitationError::status("send_campaign", 400));
        }
        let Some(position) = state.drafts.iter().position(|c| c.id == campaign_id) else {
            return Err(InvitationError::status("send_campaign", 404));
        };
        let mut campaign = state.drafts.remove(position);
        campaign.status = CampaignStatus::Sent;
        campaign.send_time = Some("2023-09-05T09:00:00+00:00".to_string());
        state.sent.insert(0, campaign);
        Ok(())
    }
}

#[derive(Default)]
pub struct ForumState {
    pub topics: Vec<CalendarTopic>,
    pub posts: HashMap<u64, Vec<ForumPost>>,
    pub next_post_id: u64,
    pub edit_reasons: Vec<String>,
}

/// Forum backed by shared in-memory state
#[derive(Clone, Default)]
pub struct FakeForum {
    state: Arc<Mutex<ForumState>>,
}

impl FakeForum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(self, topic: CalendarTopic) -> Self {
        self.state.lock().unwrap().topics.push(topic);
        self
    }

    pub fn with_post(self, topic_id: u64, raw: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.next_post_id += 1;
            let post = ForumPost { id: state.next_post_id, raw: raw.to_string() };
            state.posts.entry(topic_id).or_default().push(post);
        }
        self
    }

    pub fn posts(&self, topic_id: u64) -> Vec<ForumPost> {
        self.state.lock().unwrap().posts.get(&topic_id).cloned().unwrap_or_default()
    }

    pub fn edit_reasons(&self) -> Vec<String> {
        self.state.lock().unwrap().edit_reasons.clone()
    }
}

#[async_trait]
impl Forum for FakeForum {
    async fn calendar_topics(&self) -> InvitationResult<Vec<CalendarTopic>> {
        Ok(self.state.lock().unwrap().topics.clone())
    }

    async fn latest_post(&self, topic_id: u64) -> InvitationResult<ForumPost> {
        self.state
            .lock()
            .unwrap()
            .posts
            .get(&topic_id)
            .and_then(|posts| posts.last().cloned())
            .ok_or_else(|| InvitationError::status("latest_post", 404))
    }

    async fn create_post(&self, topic_id: u64, raw: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.next_post_id += 1;
        let post = ForumPost { id: state.next_post_id, raw: raw.to_string() };
        state.posts.entry(topic_id).or_default().push(post);
        Ok(())
    }

    async fn update_post(&self, post_id: u64, raw: &str, edit_reason: &str) -> InvitationResult<()> {
        let mut state = self.state.lock().unwrap();
        state.edit_reasons.push(edit_reason.to_string());
        let post = state
            .posts
            .values_mut()
            .flat_map(|posts| posts.iter_mut())
            .find(|post| post.id == post_id)
            .ok_or_else(|| InvitationError::status("update_post", 404))?;
        post.raw = raw.to_string();
        Ok(())
    }
}

/// Builder for orchestrators over the in-memory collaborators
pub struct OrchestratorBuilder {
    mailing_list: FakeMailingList,
    forum: FakeForum,
    settings: Settings,
}

impl OrchestratorBuilder {
    /// Calendar with the upcoming Open Evening and current audit posts
    pub fn new() -> Self {
        Self {
            mailing_list: FakeMailingList::new(),
            forum: FakeForum::new()
                .with_topic(TestFixtures::open_evening_topic("2023-09-06T18:00:00.000Z"))
                .with_post(TestFixtures::LOG_TOPIC, &TestFixtures::log_post())
                .with_post(TestFixtures::TABLE_TOPIC, &TestFixtures::table_post()),
            settings: TestFixtures::settings(),
        }
    }

    pub fn with_mailing_list(mut self, mailing_list: FakeMailingList) -> Self {
        self.mailing_list = mailing_list;
        self
    }

    pub fn with_forum(mut self, forum: FakeForum) -> Self {
        self.forum = forum;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Orchestrator<FakeMailingList, FakeForum> {
        Orchestrator::new(self.mailing_list, self.forum, self.settings)
            .unwrap()
            .with_today(TestFixtures::today())
    }
}
