//! Realtime stream integration tests
//!
//! Subscriptions follow membership: removed members stop receiving events.

mod common;

#[cfg(feature = "ssr")]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use futures_util::StreamExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use uuid::Uuid;
    use wazap::backend::realtime::conversation_events;
    use wazap::shared::messaging::{UpsertConversationResponse, User};
    use wazap::shared::{EventType, RealtimeEvent};

    use super::common::TestApp;

    struct Group {
        app: TestApp,
        ana: User,
        ana_token: String,
        bo: User,
        bo_token: String,
        id: Uuid,
    }

    async fn group() -> Group {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;
        let id = app
            .server
            .post("/api/conversations")
            .authorization_bearer(&ana_token)
            .json(&json!({ "participants": [bo.id, cy.id], "is_group": true, "group_name": "Trip" }))
            .await
            .json::<UpsertConversationResponse>()
            .conversation_id;
        Group {
            app,
            ana,
            ana_token,
            bo,
            bo_token,
            id,
        }
    }

    async fn say(group: &Group, content: &str) {
        group
            .app
            .server
            .post(&format!("/api/conversations/{}/messages", group.id))
            .authorization_bearer(&group.ana_token)
            .json(&json!({ "kind": "text", "sender": group.ana.id, "content": content }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    async fn kick_bo(group: &Group) {
        group
            .app
            .server
            .delete(&format!("/api/conversations/{}/participants/{}", group.id, group.bo.id))
            .authorization_bearer(&group.ana_token)
            .await
            .assert_status_ok();
    }

    async fn drain(stream: impl futures_util::Stream<Item = RealtimeEvent>) -> Vec<RealtimeEvent> {
        tokio::time::timeout(Duration::from_secs(1), stream.collect::<Vec<_>>())
            .await
            .expect("stream should end once the member is removed")
    }

    #[tokio::test]
    async fn test_kicked_member_stops_receiving_messages() {
        let group = group().await;
        let rx = group.app.state.broadcast.subscribe(group.id);
        let bo_events = conversation_events(group.app.state.clone(), group.id, group.bo.id, rx, None);

        say(&group, "before kick").await;
        kick_bo(&group).await;
        say(&group, "secret after kick").await;

        let events = drain(bo_events).await;
        let contents: Vec<_> = events
            .iter()
            .filter(|e| e.event_type == EventType::MessageCreated)
            .map(|e| e.payload["payload"]["content"].clone())
            .collect();
        assert_eq!(contents, vec![json!("before kick")]);
        assert_eq!(
            events.last().map(|e| e.event_type),
            Some(EventType::ConversationUpdated)
        );

        group
            .app
            .server
            .get(&format!("/api/conversations/{}/events", group.id))
            .authorization_bearer(&group.bo_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_filtered_stream_still_ends_on_removal() {
        let group = group().await;
        let rx = group.app.state.broadcast.subscribe(group.id);
        let bo_events = conversation_events(
            group.app.state.clone(),
            group.id,
            group.bo.id,
            rx,
            Some(vec![EventType::MessageCreated]),
        );

        kick_bo(&group).await;
        say(&group, "secret after kick").await;

        assert!(drain(bo_events).await.is_empty());
    }

    #[tokio::test]
    async fn test_remaining_members_keep_their_stream() {
        let group = group().await;
        let rx = group.app.state.broadcast.subscribe(group.id);
        let mut ana_events =
            Box::pin(conversation_events(group.app.state.clone(), group.id, group.ana.id, rx, None));

        kick_bo(&group).await;
        say(&group, "still here").await;

        let first = ana_events.next().await.map(|e| e.event_type);
        assert_eq!(first, Some(EventType::ConversationUpdated));
        let second = tokio::time::timeout(Duration::from_secs(1), ana_events.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.payload["payload"]["content"], json!("still here"));
    }
}
