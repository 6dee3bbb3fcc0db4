//! Mailing-list provider over the Mailchimp marketing REST API
//!
//! Every call authenticates with HTTP basic auth (any user name, API key as
//! password). Non-success responses are mapped to
//! [`InvitationError::HttpStatus`] so the caller decides whether to degrade.

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use shared::{
    Campaign, CampaignPage, CampaignStatus, Member, MemberListing, MemberTag, SubscriptionStatus, SurveyAnswers,
    SurveyContact, SurveyResponse,
};
use std::time::Duration;
use tracing::debug;

use crate::config::MailchimpSettings;
use crate::error::{InvitationError, InvitationResult};
use crate::traits::MailingList;

const MEMBER_PAGE_SIZE: usize = 1000;
const TAG_PAGE_SIZE: usize = 100;

#[derive(Deserialize)]
struct MembersWire {
    #[serde(default)]
    total_items: usize,
    #[serde(default)]
    members: Vec<MemberWire>,
}

#[derive(Deserialize)]
struct MemberWire {
    contact_id: String,
    #[serde(default)]
    email_address: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ResponsesWire {
    #[serde(default)]
    responses: Vec<ResponseWire>,
}

#[derive(Deserialize)]
struct ResponseWire {
    response_id: String,
    #[serde(default)]
    submitted_at: Option<String>,
    contact: ContactWire,
}

#[derive(Deserialize)]
struct ContactWire {
    contact_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ResultWire {
    #[serde(default)]
    results: Vec<AnswerWire>,
}

#[derive(Deserialize)]
struct AnswerWire {
    question_id: String,
    #[serde(default)]
    answer: serde_json::Value,
}

#[derive(Deserialize)]
struct TagsWire {
    #[serde(default)]
    tags: Vec<MemberTag>,
}

#[derive(Deserialize)]
struct CampaignsWire {
    #[serde(default)]
    total_items: usize,
    #[serde(default)]
    campaigns: Vec<CampaignWire>,
}

#[derive(Deserialize)]
struct CampaignWire {
    id: String,
    #[serde(default)]
    web_id: u64,
    status: String,
    #[serde(default)]
    send_time: Option<String>,
}

#[derive(Deserialize)]
struct ContentWire {
    #[serde(default)]
    html: String,
}

fn parse_status(raw: Option<&str>) -> Option<SubscriptionStatus> {
    raw.and_then(|s| s.parse().ok())
}

fn answer_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl CampaignWire {
    fn into_campaign(self) -> InvitationResult<Campaign> {
        Ok(Campaign {
            status: self.status.parse()?,
            id: self.id,
            web_id: self.web_id,
            send_time: self.send_time.filter(|t| !t.is_empty()),
        })
    }
}

/// Real mailing-list implementation
pub struct RealMailingList {
    client: reqwest::Client,
    settings: MailchimpSettings,
}

impl RealMailingList {
    pub fn new(settings: MailchimpSettings) -> InvitationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| InvitationError::network("client", e))?;
        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_url, path)
    }

    fn member_path(&self, contact_id: &str) -> String {
        format!("/lists/{}/members/{}", self.settings.list_id, contact_id)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth("anystring", Some(&self.settings.api_key))
    }

    async fn send(&self, operation: &str, request: reqwest::RequestBuilder) -> InvitationResult<reqwest::Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| InvitationError::network(operation, e))?;
        if !response.status().is_success() {
            return Err(InvitationError::status(operation, response.status().as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> InvitationResult<T> {
        let response = self.send(operation, self.client.get(self.url(path)).query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| InvitationError::invalid_response(operation, e))
    }

    async fn post_tag(&self, operation: &str, contact_id: &str, tag: &str, status: &str) -> InvitationResult<()> {
        let path = format!("{}/tags", self.member_path(contact_id));
        let body = json!({ "tags": [{ "name": tag, "status": status }] });
        self.send(operation, self.client.post(self.url(&path)).json(&body)).await?;
        Ok(())
    }

    fn campaign_body(&self, title: &str) -> serde_json::Value {
        let template = &self.settings.campaign;
        let mut recipients = json!({ "list_id": self.settings.list_id });
        if let Some(segment_id) = template.saved_segment_id {
            recipients["segment_opts"] = json!({ "saved_segment_id": segment_id, "match": "all" });
        }
        let mut settings = json!({
            "subject_line": template.subject_line,
            "preview_text": template.preview_text,
            "title": title,
            "from_name": template.from_name,
            "reply_to": template.reply_to,
            "to_name": "*|FNAME|*",
            "authenticate": true,
            "auto_footer": false,
            "inline_css": false,
            "fb_comments": true,
            "drag_and_drop": false,
        });
        if let Some(template_id) = template.template_id {
            settings["template_id"] = json!(template_id);
        }
        json!({
            "type": "regular",
            "recipients": recipients,
            "settings": settings,
            "tracking": { "opens": true, "html_clicks": true, "text_clicks": true },
            "content_type": "multichannel",
        })
    }
}

#[async_trait::async_trait]
impl MailingList for RealMailingList {
    async fn list_members(&self) -> InvitationResult<MemberListing> {
        let path = format!("/lists/{}/members", self.settings.list_id);
        let query = [
            ("count", MEMBER_PAGE_SIZE.to_string()),
            ("exclude_fields", "members.interests,members.stats".to_string()),
        ];
        let wire: MembersWire = self.get_json("list_members", &path, &query).await?;
        Ok(MemberListing {
            total_items: wire.total_items,
            members: wire
                .members
                .into_iter()
                .map(|m| Member {
                    status: parse_status(m.status.as_deref()),
                    contact_id: m.contact_id,
                    email: m.email_address,
                    full_name: m.full_name,
                })
                .collect(),
        })
    }

    async fn survey_responses(&self) -> InvitationResult<Vec<SurveyResponse>> {
        debug!("survey_responses: ...takes a little while...");
        let path = format!("/reporting/surveys/{}/responses", self.settings.survey_id);
        let wire: ResponsesWire = self.get_json("survey_responses", &path, &[]).await?;
        Ok(wire
            .responses
            .into_iter()
            .map(|r| SurveyResponse {
                submitted_at: r.submitted_at.as_deref().and_then(|t| DateTime::parse_from_rfc3339(t).ok()),
                response_id: r.response_id,
                contact: SurveyContact {
                    status: parse_status(r.contact.status.as_deref()),
                    contact_id: r.contact.contact_id,
                    email: r.contact.email,
                    full_name: r.contact.full_name,
                },
            })
            .collect())
    }

    async fn survey_answers(&self, response_id: &str) -> InvitationResult<SurveyAnswers> {
        let path = format!("/reporting/surveys/{}/responses/{}", self.settings.survey_id, response_id);
        let wire: ResultWire = self.get_json("survey_answers", &path, &[]).await?;
        Ok(SurveyAnswers(
            wire.results
                .into_iter()
                .map(|a| (a.question_id, answer_text(&a.answer)))
                .collect(),
        ))
    }

    async fn member_tags(&self, contact_id: &str) -> InvitationResult<Vec<MemberTag>> {
        let path = format!("{}/tags", self.member_path(contact_id));
        let wire: TagsWire = self
            .get_json("member_tags", &path, &[("count", TAG_PAGE_SIZE.to_string())])
            .await?;
        Ok(wire.tags)
    }

    async fn add_tag(&self, contact_id: &str, tag: &str) -> InvitationResult<()> {
        self.post_tag("add_tag", contact_id, tag, "active").await
    }

    async fn remove_tag(&self, contact_id: &str, tag: &str) -> InvitationResult<()> {
        self.post_tag("remove_tag", contact_id, tag, "inactive").await
    }

    async fn set_status(&self, contact_id: &str, status: SubscriptionStatus) -> InvitationResult<()> {
        let request = self
            .client
            .patch(self.url(&self.member_path(contact_id)))
            .query(&[("skip_merge_validation", "true")])
            .json(&json!({ "status": status.as_api_str() }));
        self.send("set_status", request).await?;
        Ok(())
    }

    async fn archive(&self, contact_id: &str) -> InvitationResult<()> {
        let request = self.client.delete(self.url(&self.member_path(contact_id)));
        self.send("archive", request).await?;
        debug!("archive: Successfully archived contact_id '{}'.", contact_id);
        Ok(())
    }

    async fn campaigns(&self, status: CampaignStatus, count: usize) -> InvitationResult<CampaignPage> {
        let query = [
            ("count", count.to_string()),
            ("status", status.as_api_str().to_string()),
            ("since_create_time", self.settings.campaigns_since.clone()),
            ("sort_field", "create_time".to_string()),
            ("sort_dir", "DESC".to_string()),
            ("list_id", self.settings.list_id.clone()),
        ];
        let wire: CampaignsWire = self.get_json("campaigns", "/campaigns", &query).await?;
        Ok(CampaignPage {
            total_items: wire.total_items,
            campaigns: wire
                .campaigns
                .into_iter()
                .map(CampaignWire::into_campaign)
                .collect::<InvitationResult<_>>()?,
        })
    }

    async fn create_campaign(&self, title: &str) -> InvitationResult<Campaign> {
        let request = self.client.post(self.url("/campaigns")).json(&self.campaign_body(title));
        let response = self.send("create_campaign", request).await?;
        let wire: CampaignWire = response
            .json()
            .await
            .map_err(|e| InvitationError::invalid_response("create_campaign", e))?;
        wire.into_campaign()
    }

    async fn delete_campaign(&self, campaign_id: &str) -> InvitationResult<()> {
        let request = self.client.delete(self.url(&format!("/campaigns/{campaign_id}")));
        self.send("delete_campaign", request).await?;
        debug!("delete_campaign: Successfully deleted campaign: {}", campaign_id);
        Ok(())
    }

    async fn campaign_content(&self, campaign_id: &str) -> InvitationResult<String> {
        let path = format!("/campaigns/{campaign_id}/content");
        let wire: ContentWire = self
            .get_json("campaign_content", &path, &[("fields", "html".to_string())])
            .await?;
        Ok(wire.html)
    }

    async fn set_campaign_content(&self, campaign_id: &str, html: &str) -> InvitationResult<()> {
        let request = self
            .client
            .put(self.url(&format!("/campaigns/{campaign_id}/content")))
            .json(&json!({ "html": html }));
        self.send("set_campaign_content", request).await?;
        debug!("set_campaign_content: Updated content for campaign_id: {}", campaign_id);
        Ok(())
    }

    async fn send_campaign(&self, campaign_id: &str) -> InvitationResult<()> {
        let request = self.client.post(self.url(&format!("/campaigns/{campaign_id}/actions/send")));
        self.send("send_campaign", request).await?;
        debug!("send_campaign: Successfully sent campaign with id '{}'.", campaign_id);
        Ok(())
    }
}
