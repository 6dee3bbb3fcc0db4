//! Wire-level tests for the forum service

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::common::discourse_settings;
use crate::services::discourse::RealForum;
use crate::traits::Forum;

async fn service(server: &MockServer) -> RealForum {
    RealForum::new(discourse_settings(&server.uri())).unwrap()
}

#[tokio::test]
async fn test_calendar_topics_flatten_event_start() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/events/l/calendar.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "topic_list": { "topics": [
                { "id": 5678, "slug": "open-evening", "title": "Open Evening", "event": { "start": "2023-08-23T18:00:00Z" } },
                { "id": 42, "slug": "notes", "title": "Meeting notes" }
            ]}
        })))
        .mount(&server)
        .await;

    let topics = service(&server).await.calendar_topics().await.unwrap();

    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].event_start.as_deref(), Some("2023-08-23T18:00:00Z"));
    assert_eq!(topics[1].event_start, None);
}

#[tokio::test]
async fn test_latest_post_follows_stream_tail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/101.json"))
        .and(header("User-Api-Key", "forum-key"))
        .and(header("User-Api-Client-Id", "forum-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "post_stream": { "stream": [1, 2, 3] } })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts/3.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 3, "raw": "latest" })))
        .expect(1)
        .mount(&server)
        .await;

    let post = service(&server).await.latest_post(101).await.unwrap();

    assert_eq!(post.id, 3);
    assert_eq!(post.raw, "latest");
}

#[tokio::test]
async fn test_empty_topic_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/t/101.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "post_stream": { "stream": [] } })))
        .mount(&server)
        .await;

    assert!(service(&server).await.latest_post(101).await.is_err());
}

#[tokio::test]
async fn test_update_post_sends_edit_reason() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/posts/3.json"))
        .and(body_json(json!({ "post": { "raw": "new body", "edit_reason": "slmschimp-2023-09-09" } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    service(&server)
        .await
        .update_post(3, "new body", "slmschimp-2023-09-09")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_post_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/posts.json"))
        .respond_with(ResponseTemplate::new(422))
        .mount(&server)
        .await;

    assert!(service(&server).await.create_post(101, "hello").await.is_err());
}
