use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::DeliveryStatus;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use server::config::NotificationConfig;
use server::entity::notification_delivery;
use server::notification::NotificationDispatcher;

use crate::common::{TestApp, routes};

/// Approve a fresh registration and return its id once its confirmation
/// attempt has settled.
async fn approved_registration(app: &TestApp, email: &str, roll: &str) -> i32 {
    let event_id = app.create_event("Rust Night", None).await;
    let id = app.register_individual(event_id, email, roll).await;
    let res = app
        .patch_with_token(
            &routes::registration_status(id),
            &json!({ "status": "approved" }),
            &app.admin_token(),
        )
        .await;
    assert_eq!(res.status, 200, "approve failed: {}", res.text);
    app.settled_deliveries(id).await;
    id
}

/// Write a delivery row directly, as a crashed or long-failing dispatcher
/// would have left it.
async fn insert_delivery(
    app: &TestApp,
    registration_id: i32,
    status: DeliveryStatus,
    attempts: i32,
    created_at: DateTime<Utc>,
    last_attempt_at: Option<DateTime<Utc>>,
) -> i32 {
    notification_delivery::ActiveModel {
        registration_id: Set(registration_id),
        recipient: Set("asha@club.test".into()),
        recipient_name: Set("Asha Verma".into()),
        event_title: Set("Rust Night".into()),
        event_date: Set(NaiveDate::from_ymd_opt(2099, 3, 1).unwrap()),
        status: Set(status),
        attempts: Set(attempts),
        last_error: Set(None),
        created_at: Set(created_at),
        last_attempt_at: Set(last_attempt_at),
        sent_at: Set(None),
        ..Default::default()
    }
    .insert(&app.db)
    .await
    .unwrap()
    .id
}

async fn delivery(app: &TestApp, id: i32) -> notification_delivery::Model {
    notification_delivery::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .unwrap()
}

fn dispatcher(app: &TestApp) -> NotificationDispatcher {
    NotificationDispatcher::new(
        app.db.clone(),
        app.notifier.clone(),
        NotificationConfig::default(),
    )
}

mod manual_retry {
    use super::*;

    #[tokio::test]
    async fn retry_delivers_a_failed_confirmation() {
        let app = TestApp::spawn().await;
        app.notifier.set_failing(true);
        let id = approved_registration(&app, "asha@club.test", "R1").await;
        let delivery = &app.settled_deliveries(id).await[0];
        assert_eq!(delivery["status"], "failed");
        let delivery_id = delivery["id"].as_i64().unwrap() as i32;

        app.notifier.set_failing(false);
        let res = app
            .post_with_token(
                &routes::notification_retry(delivery_id),
                &json!({}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "sent");
        assert_eq!(res.body["attempts"], 2);
        assert!(res.body["lastError"].is_null());
        assert!(!res.body["sentAt"].is_null());
        assert_eq!(app.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn failed_retry_is_reported_in_body() {
        let app = TestApp::spawn().await;
        app.notifier.set_failing(true);
        let id = approved_registration(&app, "asha@club.test", "R1").await;
        let delivery_id = app.settled_deliveries(id).await[0]["id"].as_i64().unwrap() as i32;

        let res = app
            .post_with_token(
                &routes::notification_retry(delivery_id),
                &json!({}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["status"], "failed");
        assert_eq!(res.body["attempts"], 2);
    }

    #[tokio::test]
    async fn sent_confirmation_is_not_resent() {
        let app = TestApp::spawn().await;
        let id = approved_registration(&app, "asha@club.test", "R1").await;
        let delivery_id = app.settled_deliveries(id).await[0]["id"].as_i64().unwrap() as i32;

        let res = app
            .post_with_token(
                &routes::notification_retry(delivery_id),
                &json!({}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
        assert_eq!(app.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn unknown_delivery_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .post_with_token(
                &routes::notification_retry(31_337),
                &json!({}),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn deliveries_filter_by_status() {
        let app = TestApp::spawn().await;
        approved_registration(&app, "asha@club.test", "R1").await;
        app.notifier.set_failing(true);
        let failed = approved_registration(&app, "ravi@club.test", "R2").await;

        let res = app
            .get_with_token(
                &format!("{}?status=failed", routes::NOTIFICATIONS),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let deliveries = res.body["deliveries"].as_array().unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0]["registrationId"].as_i64().unwrap(), failed as i64);
        assert_eq!(res.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn listing_requires_admin() {
        let app = TestApp::spawn().await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");

        let res = app.get_with_token(routes::NOTIFICATIONS, &token).await;
        assert_eq!(res.status, 403);

        let res = app.get_without_token(routes::NOTIFICATIONS).await;
        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_token(
                &format!("{}?status=bounced", routes::NOTIFICATIONS),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 400);
    }
}

mod sweeper {
    use super::*;

    async fn pending_registration(app: &TestApp) -> i32 {
        let event_id = app.create_event("Rust Night", None).await;
        app.register_individual(event_id, "asha@club.test", "R1").await
    }

    #[tokio::test]
    async fn sweep_retries_failed_delivery_after_backoff() {
        let app = TestApp::spawn().await;
        app.notifier.set_failing(true);
        let id = approved_registration(&app, "asha@club.test", "R1").await;

        app.notifier.set_failing(false);
        let dispatcher = dispatcher(&app);

        // The first retry waits for the base delay.
        assert_eq!(dispatcher.sweep(Utc::now()).await.unwrap(), 0);
        assert!(app.notifier.sent().is_empty());

        let later = Utc::now() + Duration::hours(2);
        assert_eq!(dispatcher.sweep(later).await.unwrap(), 1);

        let deliveries = app.settled_deliveries(id).await;
        assert_eq!(deliveries[0]["status"], "sent");
        assert_eq!(app.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn sweep_leaves_sent_deliveries_alone() {
        let app = TestApp::spawn().await;
        approved_registration(&app, "asha@club.test", "R1").await;

        let later = Utc::now() + Duration::days(2);
        assert_eq!(dispatcher(&app).sweep(later).await.unwrap(), 0);
        assert_eq!(app.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn abandoned_pending_delivery_is_sent() {
        let app = TestApp::spawn().await;
        let registration_id = pending_registration(&app).await;
        let now = Utc::now();
        let fresh =
            insert_delivery(&app, registration_id, DeliveryStatus::Pending, 0, now, None).await;
        let abandoned = insert_delivery(
            &app,
            registration_id,
            DeliveryStatus::Pending,
            0,
            now - Duration::minutes(10),
            None,
        )
        .await;

        assert_eq!(dispatcher(&app).sweep(now).await.unwrap(), 1);

        let row = delivery(&app, abandoned).await;
        assert_eq!(row.status, DeliveryStatus::Sent);
        assert_eq!(row.attempts, 1);
        assert_eq!(delivery(&app, fresh).await.status, DeliveryStatus::Pending);
    }

    #[tokio::test]
    async fn interrupted_sending_delivery_is_resent() {
        let app = TestApp::spawn().await;
        let registration_id = pending_registration(&app).await;
        let now = Utc::now();
        let started = now - Duration::minutes(10);
        let interrupted = insert_delivery(
            &app,
            registration_id,
            DeliveryStatus::Sending,
            1,
            started,
            Some(started),
        )
        .await;
        let in_flight = insert_delivery(
            &app,
            registration_id,
            DeliveryStatus::Sending,
            1,
            now,
            Some(now),
        )
        .await;

        assert_eq!(dispatcher(&app).sweep(now).await.unwrap(), 1);

        let row = delivery(&app, interrupted).await;
        assert_eq!(row.status, DeliveryStatus::Sent);
        assert_eq!(row.attempts, 2);
        assert_eq!(delivery(&app, in_flight).await.status, DeliveryStatus::Sending);
        assert_eq!(app.notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn exhausted_delivery_is_not_swept() {
        let app = TestApp::spawn().await;
        let registration_id = pending_registration(&app).await;
        let long_ago = Utc::now() - Duration::days(7);
        let max_attempts = i32::from(NotificationConfig::default().retry.max_attempts);
        let exhausted = insert_delivery(
            &app,
            registration_id,
            DeliveryStatus::Failed,
            max_attempts,
            long_ago,
            Some(long_ago),
        )
        .await;

        assert_eq!(dispatcher(&app).sweep(Utc::now()).await.unwrap(), 0);

        let row = delivery(&app, exhausted).await;
        assert_eq!(row.status, DeliveryStatus::Failed);
        assert_eq!(row.attempts, max_attempts);
        assert!(app.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn backlog_of_failures_does_not_starve_recovery() {
        let app = TestApp::spawn().await;
        let registration_id = pending_registration(&app).await;
        let now = Utc::now();
        for _ in 0..120 {
            let status = DeliveryStatus::Failed;
            insert_delivery(&app, registration_id, status, 1, now, Some(now)).await;
        }
        let abandoned = insert_delivery(
            &app,
            registration_id,
            DeliveryStatus::Pending,
            0,
            now - Duration::minutes(10),
            None,
        )
        .await;

        assert_eq!(dispatcher(&app).sweep(now).await.unwrap(), 1);
        assert_eq!(delivery(&app, abandoned).await.status, DeliveryStatus::Sent);
    }
}
