//! Conversation API integration tests
//!
//! Resolver behavior, group administration and conversation listing.

mod common;

#[cfg(feature = "ssr")]
mod tests {
    use axum::body::Bytes;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wazap::backend::storage::handlers::{UploadResponse, UploadUrlResponse};
    use wazap::shared::messaging::{
        Conversation, GroupInfo, ListConversationsResponse, SendMessageResponse,
        UpsertConversationResponse,
    };

    use super::common::{token_for, TestApp};

    async fn create_group(app: &TestApp, token: &str, participants: serde_json::Value) -> uuid::Uuid {
        let response = app
            .server
            .post("/api/conversations")
            .authorization_bearer(token)
            .json(&json!({
                "participants": participants,
                "is_group": true,
                "group_name": "  Family  ",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<UpsertConversationResponse>().conversation_id
    }

    async fn upload(app: &TestApp, token: &str, bytes: &'static [u8]) -> uuid::Uuid {
        let ticket = app
            .server
            .post("/api/storage/upload-url")
            .authorization_bearer(token)
            .await
            .json::<UploadUrlResponse>()
            .ticket;
        app.server
            .post(&format!("/api/storage/upload/{}", ticket))
            .content_type("image/png")
            .bytes(Bytes::from_static(bytes))
            .await
            .json::<UploadResponse>()
            .storage_id
    }

    #[tokio::test]
    async fn test_requests_without_valid_user_are_rejected() {
        let app = TestApp::new().await;

        app.server
            .get("/api/conversations")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        // Valid token, but the identity provider never told us about the user
        let response = app
            .server
            .get("/api/conversations")
            .authorization_bearer(token_for("user_unknown"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<serde_json::Value>()["error"], "User not found");
    }

    #[tokio::test]
    async fn test_direct_conversation_is_unique_per_pair() {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;

        let first = app
            .server
            .post("/api/conversations")
            .authorization_bearer(&ana_token)
            .json(&json!({ "participants": [ana.id, bo.id], "is_group": false }))
            .await;
        first.assert_status(StatusCode::CREATED);
        let first = first.json::<UpsertConversationResponse>();
        assert!(first.created);

        // Same pair, reversed, from the other side
        let second = app
            .server
            .post("/api/conversations")
            .authorization_bearer(&bo_token)
            .json(&json!({ "participants": [bo.id, ana.id], "is_group": false }))
            .await;
        second.assert_status(StatusCode::OK);
        let second = second.json::<UpsertConversationResponse>();
        assert!(!second.created);
        assert_eq!(first.conversation_id, second.conversation_id);
    }

    #[tokio::test]
    async fn test_direct_conversation_needs_two_participants() {
        let app = TestApp::new().await;
        let (ana, token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;

        app.server
            .post("/api/conversations")
            .authorization_bearer(&token)
            .json(&json!({ "participants": [ana.id, bo.id, cy.id], "is_group": false }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .post("/api/conversations")
            .authorization_bearer(&token)
            .json(&json!({ "participants": [ana.id, ana.id], "is_group": false }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_group_creator_becomes_admin() {
        let app = TestApp::new().await;
        let (ana, token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;

        let id = create_group(&app, &token, json!([bo.id])).await;

        let members = app
            .server
            .get(&format!("/api/conversations/{}/members", id))
            .authorization_bearer(&token)
            .await;
        members.assert_status_ok();
        let members: Vec<serde_json::Value> = members.json();
        assert_eq!(members.len(), 2);

        let conversations = app
            .server
            .get("/api/conversations")
            .authorization_bearer(&token)
            .await
            .json::<ListConversationsResponse>()
            .conversations;
        assert_eq!(conversations.len(), 1);
        let group = &conversations[0].conversation;
        assert_eq!(group.admins, vec![ana.id]);
        assert_eq!(group.group_name.as_deref(), Some("Family"));
        assert!(conversations[0].other_user.is_none());
    }

    #[tokio::test]
    async fn test_only_admins_add_participants() {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;
        let id = create_group(&app, &ana_token, json!([bo.id])).await;

        app.server
            .post(&format!("/api/conversations/{}/participants", id))
            .authorization_bearer(&bo_token)
            .json(&json!({ "participants": [cy.id] }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let updated = app
            .server
            .post(&format!("/api/conversations/{}/participants", id))
            .authorization_bearer(&ana_token)
            .json(&json!({ "participants": [bo.id, cy.id] }))
            .await
            .json::<Conversation>();
        assert_eq!(updated.participants, vec![bo.id, ana.id, cy.id]);
    }

    #[tokio::test]
    async fn test_leaving_as_last_admin_promotes_first_member() {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;
        let id = create_group(&app, &ana_token, json!([bo.id, cy.id])).await;

        let after = app
            .server
            .delete(&format!("/api/conversations/{}/participants/{}", id, ana.id))
            .authorization_bearer(&ana_token)
            .await
            .json::<Conversation>();
        assert_eq!(after.participants, vec![bo.id, cy.id]);
        assert_eq!(after.admins, vec![bo.id]);

        // The former admin can no longer see the group
        app.server
            .get(&format!("/api/conversations/{}/members", id))
            .authorization_bearer(&ana_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_update_admins_validation() {
        let app = TestApp::new().await;
        let (ana, token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;
        let (outsider, _) = app.user("zed", "Zed").await;
        let id = create_group(&app, &token, json!([bo.id])).await;
        let path = format!("/api/conversations/{}/admins", id);

        app.server
            .put(&path)
            .authorization_bearer(&token)
            .json(&json!({ "admins": [] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        app.server
            .put(&path)
            .authorization_bearer(&token)
            .json(&json!({ "admins": [outsider.id] }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let updated = app
            .server
            .put(&path)
            .authorization_bearer(&token)
            .json(&json!({ "admins": [bo.id, ana.id, bo.id] }))
            .await
            .json::<Conversation>();
        assert_eq!(updated.admins, vec![bo.id, ana.id]);
    }

    #[tokio::test]
    async fn test_update_group_info() {
        let app = TestApp::new().await;
        let (_, token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;
        let id = create_group(&app, &token, json!([bo.id])).await;
        let path = format!("/api/conversations/{}/group", id);

        app.server
            .patch(&path)
            .authorization_bearer(&token)
            .json(&json!({ "group_name": "   " }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let info = app
            .server
            .patch(&path)
            .authorization_bearer(&token)
            .json(&json!({ "group_name": " Cousins " }))
            .await
            .json::<GroupInfo>();
        assert_eq!(info.group_name.as_deref(), Some("Cousins"));
        assert_eq!(info.group_image, None);
    }

    #[tokio::test]
    async fn test_conversations_sorted_by_last_activity() {
        let app = TestApp::new().await;
        let (ana, token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;

        let with_bo = app
            .server
            .post("/api/conversations")
            .authorization_bearer(&token)
            .json(&json!({ "participants": [bo.id], "is_group": false }))
            .await
            .json::<UpsertConversationResponse>()
            .conversation_id;
        let with_cy = app
            .server
            .post("/api/conversations")
            .authorization_bearer(&token)
            .json(&json!({ "participants": [cy.id], "is_group": false }))
            .await
            .json::<UpsertConversationResponse>()
            .conversation_id;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        app.server
            .post(&format!("/api/conversations/{}/messages", with_bo))
            .authorization_bearer(&token)
            .json(&json!({ "kind": "text", "sender": ana.id, "content": "oi" }))
            .await
            .assert_status(StatusCode::CREATED);

        let listed = app
            .server
            .get("/api/conversations")
            .authorization_bearer(&token)
            .await
            .json::<ListConversationsResponse>()
            .conversations;
        let order: Vec<_> = listed.iter().map(|s| s.conversation.id).collect();
        assert_eq!(order, vec![with_bo, with_cy]);
        assert_eq!(listed[0].other_user.as_ref().map(|u| u.id), Some(bo.id));
        assert!(listed[0].last_message.is_some());
        assert!(listed[1].last_message.is_none());
    }

    #[tokio::test]
    async fn test_delete_conversation_permissions() {
        let app = TestApp::new().await;
        let (_, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let id = create_group(&app, &ana_token, json!([bo.id])).await;
        let path = format!("/api/conversations/{}", id);

        app.server
            .delete(&path)
            .authorization_bearer(&bo_token)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        app.server
            .delete(&path)
            .authorization_bearer(&ana_token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        app.server
            .delete(&path)
            .authorization_bearer(&ana_token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_members_cannot_remove_others() {
        let app = TestApp::new().await;
        let (_, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;
        let id = create_group(&app, &ana_token, json!([bo.id, cy.id])).await;

        let response = app
            .server
            .delete(&format!("/api/conversations/{}/participants/{}", id, cy.id))
            .authorization_bearer(&bo_token)
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(
            response.json::<serde_json::Value>()["error"],
            "Only group admins can do that"
        );

        let members = app
            .server
            .get(&format!("/api/conversations/{}/members", id))
            .authorization_bearer(&bo_token)
            .await
            .json::<serde_json::Value>();
        assert_eq!(members.as_array().map(Vec::len), Some(3));
    }

    #[tokio::test]
    async fn test_last_member_leaving_deletes_group() {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let id = create_group(&app, &ana_token, json!([bo.id])).await;

        app.server
            .delete(&format!("/api/conversations/{}/participants/{}", id, ana.id))
            .authorization_bearer(&ana_token)
            .await
            .assert_status_ok();
        app.server
            .delete(&format!("/api/conversations/{}/participants/{}", id, bo.id))
            .authorization_bearer(&bo_token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        app.server
            .get(&format!("/api/conversations/{}/members", id))
            .authorization_bearer(&bo_token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        let remaining =
            wazap::backend::conversations::db::get_conversation(&app.state.pool, id)
                .await
                .unwrap();
        assert!(remaining.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_additions_are_all_kept() {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, _) = app.user("bo", "Bo").await;
        let (cy, _) = app.user("cy", "Cy").await;
        let (dee, _) = app.user("dee", "Dee").await;
        let id = create_group(&app, &ana_token, json!([bo.id])).await;
        let path = format!("/api/conversations/{}/participants", id);

        let (first, second) = tokio::join!(
            app.server
                .post(&path)
                .authorization_bearer(&ana_token)
                .json(&json!({ "participants": [cy.id] })),
            app.server
                .post(&path)
                .authorization_bearer(&ana_token)
                .json(&json!({ "participants": [dee.id] })),
        );
        first.assert_status_ok();
        second.assert_status_ok();

        let stored = wazap::backend::conversations::db::get_conversation(&app.state.pool, id)
            .await
            .unwrap()
            .unwrap();
        let mut participants = stored.participants.clone();
        participants.sort();
        let mut expected = vec![ana.id, bo.id, cy.id, dee.id];
        expected.sort();
        assert_eq!(participants, expected);
    }

    #[tokio::test]
    async fn test_delete_conversation_removes_messages_and_blobs() {
        let app = TestApp::new().await;
        let (ana, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let id = app
            .server
            .post("/api/conversations")
            .authorization_bearer(&ana_token)
            .json(&json!({ "participants": [bo.id], "is_group": false }))
            .await
            .json::<UpsertConversationResponse>()
            .conversation_id;
        let photo = upload(&app, &ana_token, b"\x89PNG beach").await;
        let message_id = app
            .server
            .post(&format!("/api/conversations/{}/messages", id))
            .authorization_bearer(&ana_token)
            .json(&json!({ "kind": "image", "sender": ana.id, "storage_id": photo }))
            .await
            .json::<SendMessageResponse>()
            .message_id;

        app.server
            .delete(&format!("/api/conversations/{}", id))
            .authorization_bearer(&bo_token)
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let message = wazap::backend::messaging::db::get_message(&app.state.pool, message_id)
            .await
            .unwrap();
        assert!(message.is_none());
        app.server
            .get(&format!("/api/storage/{}", photo))
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_group_image_must_be_own_upload() {
        let app = TestApp::new().await;
        let (_, ana_token) = app.user("ana", "Ana").await;
        let (bo, bo_token) = app.user("bo", "Bo").await;
        let id = create_group(&app, &ana_token, json!([bo.id])).await;
        let bos_photo = upload(&app, &bo_token, b"\x89PNG bo").await;
        let path = format!("/api/conversations/{}/group", id);

        app.server
            .patch(&path)
            .authorization_bearer(&ana_token)
            .json(&json!({ "group_name": "Family", "group_image": bos_photo }))
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let anas_photo = upload(&app, &ana_token, b"\x89PNG ana").await;
        let info = app
            .server
            .patch(&path)
            .authorization_bearer(&ana_token)
            .json(&json!({ "group_name": "Family", "group_image": anas_photo }))
            .await
            .json::<GroupInfo>();
        assert!(info.group_image.is_some());

        // Re-saving the same image is not a second attachment
        app.server
            .patch(&path)
            .authorization_bearer(&ana_token)
            .json(&json!({ "group_name": "Cousins", "group_image": anas_photo }))
            .await
            .assert_status_ok();
    }
}
