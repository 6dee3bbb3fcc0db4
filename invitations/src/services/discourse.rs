//! Forum implementation over the Discourse REST API
//!
//! The events calendar is public; topic and post calls carry the user API
//! key headers.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use shared::{CalendarTopic, ForumPost};
use std::time::Duration;
use tracing::debug;

use crate::config::DiscourseSettings;
use crate::error::{InvitationError, InvitationResult};
use crate::traits::Forum;

#[derive(Deserialize)]
struct CalendarWire {
    topic_list: TopicListWire,
}

#[derive(Deserialize)]
struct TopicListWire {
    #[serde(default)]
    topics: Vec<TopicWire>,
}

#[derive(Deserialize)]
struct TopicWire {
    id: u64,
    slug: String,
    title: String,
    #[serde(default)]
    event: Option<EventWire>,
}

#[derive(Deserialize)]
struct EventWire {
    #[serde(default)]
    start: Option<String>,
}

#[derive(Deserialize)]
struct TopicWireDetail {
    post_stream: PostStreamWire,
}

#[derive(Deserialize)]
struct PostStreamWire {
    #[serde(default)]
    stream: Vec<u64>,
}

#[derive(Deserialize)]
struct PostWire {
    #[serde(default)]
    raw: String,
}

/// Real forum implementation
pub struct RealForum {
    client: reqwest::Client,
    settings: DiscourseSettings,
}

impl RealForum {
    pub fn new(settings: DiscourseSettings) -> InvitationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| InvitationError::network("client", e))?;
        Ok(Self { client, settings })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("User-Api-Key", &self.settings.api_key)
            .header("User-Api-Client-Id", &self.settings.client_id)
    }

    async fn send(&self, operation: &str, request: reqwest::RequestBuilder) -> InvitationResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|e| InvitationError::network(operation, e))?;
        if !response.status().is_success() {
            return Err(InvitationError::status(operation, response.status().as_u16()));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, request: reqwest::RequestBuilder) -> InvitationResult<T> {
        self.send(operation, request)
            .await?
            .json()
            .await
            .map_err(|e| InvitationError::invalid_response(operation, e))
    }
}

#[async_trait::async_trait]
impl Forum for RealForum {
    async fn calendar_topics(&self) -> InvitationResult<Vec<CalendarTopic>> {
        let request = self.client.get(self.url("/c/events/l/calendar.json"));
        let wire: CalendarWire = self.get_json("calendar_topics", request).await?;
        Ok(wire
            .topic_list
            .topics
            .into_iter()
            .map(|t| CalendarTopic {
                id: t.id,
                slug: t.slug,
                title: t.title,
                event_start: t.event.and_then(|e| e.start),
            })
            .collect())
    }

    async fn latest_post(&self, topic_id: u64) -> InvitationResult<ForumPost> {
        let request = self.authorized(self.client.get(self.url(&format!("/t/{topic_id}.json"))));
        let topic: TopicWireDetail = self.get_json("latest_post", request).await?;
        let post_id = topic
            .post_stream
            .stream
            .last()
            .copied()
            .ok_or_else(|| InvitationError::invalid_response("latest_post", format!("topic {topic_id} has no posts")))?;

        let request = self.authorized(self.client.get(self.url(&format!("/posts/{post_id}.json"))));
        let post: PostWire = self.get_json("latest_post", request).await?;
        Ok(ForumPost { id: post_id, raw: post.raw })
    }

    async fn create_post(&self, topic_id: u64, raw: &str) -> InvitationResult<()> {
        let request = self
            .authorized(self.client.post(self.url("/posts.json")))
            .json(&json!({ "topic_id": topic_id, "raw": raw }));
        self.send("create_post", request).await?;
        debug!("create_post: Reply posted successfully to topic {}.", topic_id);
        Ok(())
    }

    async fn update_post(&self, post_id: u64, raw: &str, edit_reason: &str) -> InvitationResult<()> {
        let request = self
            .authorized(self.client.put(self.url(&format!("/posts/{post_id}.json"))))
            .json(&json!({ "post": { "raw": raw, "edit_reason": edit_reason } }));
        self.send("update_post", request).await?;
        debug!("update_post: Post {} updated.", post_id);
        Ok(())
    }
}
