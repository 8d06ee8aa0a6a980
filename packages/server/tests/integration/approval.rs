use crate::common::{TestApp, routes};
use serde_json::json;

async fn set_status(app: &TestApp, id: i32, status: &str) -> crate::common::TestResponse {
    app.patch_with_token(
        &routes::registration_status(id),
        &json!({ "status": status }),
        &app.admin_token(),
    )
    .await
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn approval_queues_one_confirmation() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = set_status(&app, id, "approved").await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["registration"]["status"], "approved");
        assert_eq!(res.body["notification"]["recipient"], "asha@club.test");

        let deliveries = app.settled_deliveries(id).await;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0]["status"], "sent");
        assert_eq!(deliveries[0]["attempts"], 1);

        let sent = app.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_address, "asha@club.test");
        assert!(sent[0].content.subject.contains("Debug Club"));
        assert!(sent[0].content.html.contains("Rust Night"));
    }

    #[tokio::test]
    async fn repeated_approval_is_a_no_op() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let first = set_status(&app, id, "approved").await;
        assert_eq!(first.status, 200);
        let first_updated = first.body["registration"]["updatedAt"].clone();

        let second = set_status(&app, id, "approved").await;
        assert_eq!(second.status, 200);
        assert_eq!(second.body["registration"]["status"], "approved");
        assert!(second.body["notification"].is_null());
        assert_eq!(second.body["registration"]["updatedAt"], first_updated);

        assert_eq!(app.settled_deliveries(id).await.len(), 1);
    }

    #[tokio::test]
    async fn rejection_sends_nothing() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = set_status(&app, id, "rejected").await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["registration"]["status"], "rejected");
        assert!(res.body["notification"].is_null());
        assert!(app.settled_deliveries(id).await.is_empty());
    }

    #[tokio::test]
    async fn rejected_registration_can_be_approved_later() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        assert_eq!(set_status(&app, id, "rejected").await.status, 200);
        let res = set_status(&app, id, "approved").await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["registration"]["status"], "approved");
        assert!(!res.body["notification"].is_null());
    }

    #[tokio::test]
    async fn approved_registration_can_be_rejected() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        assert_eq!(set_status(&app, id, "approved").await.status, 200);
        let res = set_status(&app, id, "rejected").await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["registration"]["status"], "rejected");
    }

    #[tokio::test]
    async fn team_confirmation_goes_to_leader() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;
        let res = app
            .post_without_token(
                routes::SUBMIT,
                &crate::common::team_body(event_id, "Null Pointers", ["R1", "R2", "R3"]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let id = res.body["registrationId"].as_i64().unwrap() as i32;

        assert_eq!(set_status(&app, id, "approved").await.status, 200);
        app.settled_deliveries(id).await;

        let sent = app.notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_address, "null-pointers@club.test");
        assert_eq!(sent[0].to_name, "Asha Verma");
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn failed_delivery_keeps_approval() {
        let app = TestApp::spawn().await;
        app.notifier.set_failing(true);
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = set_status(&app, id, "approved").await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["registration"]["status"], "approved");

        let deliveries = app.settled_deliveries(id).await;
        assert_eq!(deliveries[0]["status"], "failed");
        assert!(
            deliveries[0]["lastError"]
                .as_str()
                .unwrap()
                .contains("relay unavailable")
        );

        let list = app
            .get_with_token(&routes::event_registrations(event_id), &app.admin_token())
            .await;
        assert_eq!(list.body["registrations"][0]["status"], "approved");
    }

    #[tokio::test]
    async fn pending_is_not_a_reviewable_status() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = set_status(&app, id, "pending").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert!(res.body["message"].as_str().unwrap().contains("approved"));
    }

    #[tokio::test]
    async fn unknown_registration_is_not_found() {
        let app = TestApp::spawn().await;

        let res = set_status(&app, 909_090, "approved").await;

        assert_eq!(res.status, 404);
        assert!(app.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn mismatched_event_is_not_found_and_unchanged() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let other = app.create_event("Go Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = app
            .patch_with_token(
                &routes::registration_status(id),
                &json!({ "status": "approved", "eventId": other }),
                &app.admin_token(),
            )
            .await;
        assert_eq!(res.status, 404);

        let list = app
            .get_with_token(&routes::event_registrations(event_id), &app.admin_token())
            .await;
        assert_eq!(list.body["registrations"][0]["status"], "pending");
    }

    #[tokio::test]
    async fn members_cannot_review() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");

        let res = app
            .patch_with_token(
                &routes::registration_status(id),
                &json!({ "status": "approved" }),
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
    }
}
