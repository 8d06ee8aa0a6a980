use crate::common::{TestApp, individual_body, routes, team_body};
use serde_json::json;
use server::registration::{RegistrationFilter, RegistrationLedger};

mod submission {
    use super::*;

    #[tokio::test]
    async fn individual_registration_is_recorded_as_pending() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(event_id, "asha@club.test", "CS21B042"),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["message"], "Registration successful");
        let registration_id = res.body["registrationId"].as_i64().unwrap();

        let list = app
            .get_with_token(&routes::event_registrations(event_id), &app.admin_token())
            .await;
        assert_eq!(list.status, 200);
        let rows = list.body["registrations"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"].as_i64().unwrap(), registration_id);
        assert_eq!(rows[0]["type"], "individual");
        assert_eq!(rows[0]["status"], "pending");
        assert_eq!(rows[0]["attended"], false);
        assert_eq!(rows[0]["roll"], "CS21B042");
    }

    #[tokio::test]
    async fn team_registration_lists_its_members() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", "R3"]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let list = app
            .get_with_token(&routes::event_registrations(event_id), &app.admin_token())
            .await;
        let row = &list.body["registrations"][0];
        assert_eq!(row["type"], "team");
        assert_eq!(row["teamName"], "Null Pointers");
        assert_eq!(row["members"].as_array().unwrap().len(), 2);
        assert_eq!(row["members"][1]["roll"], "R3");
    }

    #[tokio::test]
    async fn unknown_event_is_rejected() {
        let app = TestApp::spawn().await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(999_999, "asha@club.test", "CS21B042"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "EVENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn past_deadline_closes_registration() {
        let app = TestApp::spawn().await;
        let event_id = app
            .create_event("Last Year", Some("2000-01-01T00:00:00Z"))
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(event_id, "asha@club.test", "CS21B042"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "REGISTRATION_CLOSED");
    }

    #[tokio::test]
    async fn future_deadline_accepts_registration() {
        let app = TestApp::spawn().await;
        let event_id = app
            .create_event("Next Year", Some("2099-01-01T00:00:00Z"))
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(event_id, "asha@club.test", "CS21B042"),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn invalid_fields_are_all_reported() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &json!({
                    "type": "individual",
                    "eventId": event_id,
                    "name": "A",
                    "email": "not-an-email",
                    "phone": "12345",
                    "roll": "CS21B042",
                }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        let fields = res.body["fields"].as_array().unwrap();
        assert!(fields.contains(&json!("name")));
        assert!(fields.contains(&json!("email")));
        assert!(fields.contains(&json!("phone")));
        assert!(!fields.contains(&json!("roll")));
    }

    #[tokio::test]
    async fn unknown_submission_type_is_rejected() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &json!({ "type": "squad", "eventId": event_id }),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }
}

mod uniqueness {
    use super::*;

    #[tokio::test]
    async fn same_email_twice_is_a_duplicate() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        app.register_individual(event_id, "asha@club.test", "CS21B042")
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(event_id, " ASHA@Club.Test ", "CS21B099"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "DUPLICATE_REGISTRANT");
        assert_eq!(res.body["fields"], json!(["email"]));
    }

    #[tokio::test]
    async fn same_roll_twice_is_a_duplicate() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        app.register_individual(event_id, "asha@club.test", "CS21B042")
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(event_id, "ravi@club.test", "cs21b042"),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["fields"], json!(["roll"]));
    }

    #[tokio::test]
    async fn same_registrant_may_join_another_event() {
        let app = TestApp::spawn().await;
        let first = app.create_event("Rust Night", None).await;
        let second = app.create_event("Go Night", None).await;
        app.register_individual(first, "asha@club.test", "CS21B042")
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &individual_body(second, "asha@club.test", "CS21B042"),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn team_name_is_unique_per_event() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;
        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", "R3"]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let mut second = team_body(event_id, "Null Pointers", ["R4", "R5", "R6"]);
        second["teamName"] = json!("  null pointers ");
        second["leader"]["email"] = json!("other@club.test");
        let res = app.post_without_token(routes::SUBMIT, &second).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "DUPLICATE_REGISTRANT");
        assert_eq!(res.body["fields"], json!(["teamName"]));
    }

    #[tokio::test]
    async fn member_roll_cannot_join_two_teams() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;
        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", "R3"]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Dangling Refs", ["R7", "R3", "R8"]),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["fields"], json!(["member1Roll"]));
    }

    #[tokio::test]
    async fn individual_roll_blocks_team_member() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;
        app.register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", "R3"]),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "DUPLICATE_REGISTRANT");
        assert_eq!(res.body["fields"], json!(["leaderRoll"]));
    }

    #[tokio::test]
    async fn repeated_roll_within_team_names_each_position() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", " r1"]),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "DUPLICATE_ROLL_IN_TEAM");
        assert_eq!(res.body["fields"], json!(["leaderRoll", "member2Roll"]));
    }

    #[tokio::test]
    async fn rejected_team_leaves_no_partial_claims() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Hackathon", None).await;
        app.register_individual(event_id, "asha@club.test", "R3")
            .await;

        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", "R3"]),
            )
            .await;
        assert_eq!(res.status, 400);

        // The failed submission must not hold its team name or rolls.
        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R1", "R2", "R4"]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn concurrent_duplicates_admit_exactly_one() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let url = app.url(routes::SUBMIT);

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let client = app.client.clone();
            let url = url.clone();
            let body = individual_body(event_id, "asha@club.test", "CS21B042");
            tasks.spawn(async move {
                client
                    .post(url)
                    .json(&body)
                    .send()
                    .await
                    .expect("Failed to send POST request")
                    .status()
                    .as_u16()
            });
        }

        let mut statuses = Vec::new();
        while let Some(status) = tasks.join_next().await {
            statuses.push(status.unwrap());
        }

        assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1);
        assert_eq!(statuses.iter().filter(|s| **s == 400).count(), 7);

        let list = app
            .get_with_token(&routes::event_registrations(event_id), &app.admin_token())
            .await;
        assert_eq!(list.body["pagination"]["total"], 1);
    }
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn account_registration_uses_token_identity() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");

        let res = app
            .post_with_token(
                routes::REGISTRATIONS,
                &json!({ "eventId": event_id }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["registration"]["type"], "account");
        assert_eq!(res.body["registration"]["userId"], "acct-7");
        assert_eq!(res.body["registration"]["name"], "Ravi Kumar");
        assert_eq!(res.body["registration"]["status"], "pending");
    }

    #[tokio::test]
    async fn account_registers_once_per_event() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");
        let body = json!({ "eventId": event_id });

        let first = app
            .post_with_token(routes::REGISTRATIONS, &body, &token)
            .await;
        assert_eq!(first.status, 201, "{}", first.text);

        let second = app
            .post_with_token(routes::REGISTRATIONS, &body, &token)
            .await;
        assert_eq!(second.status, 400);
        assert_eq!(second.body["code"], "DUPLICATE_REGISTRANT");
        assert_eq!(second.body["fields"], json!(["userId"]));
    }

    #[tokio::test]
    async fn account_registration_requires_token() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;

        let res = app
            .post_without_token(routes::REGISTRATIONS, &json!({ "eventId": event_id }))
            .await;

        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn user_sees_own_registrations_with_event() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");
        let res = app
            .post_with_token(
                routes::REGISTRATIONS,
                &json!({ "eventId": event_id }),
                &token,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);

        let res = app
            .get_with_token(&routes::user_registrations("acct-7"), &token)
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let rows = res.body["registrations"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["event"]["title"], "Rust Night");
        assert_eq!(rows[0]["eventId"].as_i64().unwrap(), event_id as i64);
    }

    #[tokio::test]
    async fn user_cannot_read_another_accounts_registrations() {
        let app = TestApp::spawn().await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");

        let res = app
            .get_with_token(&routes::user_registrations("acct-8"), &token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

mod administration {
    use super::*;

    #[tokio::test]
    async fn listing_requires_admin() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let token = app.member_token("acct-7", "Ravi Kumar", "ravi@club.test");

        let res = app
            .get_with_token(&routes::event_registrations(event_id), &token)
            .await;

        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn listing_unknown_event_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .get_with_token(&routes::event_registrations(424_242), &app.admin_token())
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let first = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;
        let second = app
            .register_individual(event_id, "ravi@club.test", "R2")
            .await;

        let res = app
            .get_with_token(&routes::event_registrations(event_id), &app.admin_token())
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let ids: Vec<i64> = res.body["registrations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![second as i64, first as i64]);
    }

    #[tokio::test]
    async fn listing_far_past_the_last_page_is_empty() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        app.register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = app
            .get_with_token(
                &format!(
                    "{}?page={}",
                    routes::event_registrations(event_id),
                    u64::MAX
                ),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["registrations"].as_array().unwrap().is_empty());
        assert_eq!(res.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn ledger_tolerates_huge_page_numbers() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        app.register_individual(event_id, "asha@club.test", "R1")
            .await;

        let filter = RegistrationFilter {
            status: None,
            page: u64::MAX,
            per_page: 100,
        };
        let (rows, total) = RegistrationLedger::new(&app.db)
            .list_for_event(event_id, &filter)
            .await
            .unwrap();

        assert!(rows.is_empty());
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn listing_filters_by_status() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let approved = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;
        app.register_individual(event_id, "ravi@club.test", "R2")
            .await;
        let token = app.admin_token();
        let res = app
            .patch_with_token(
                &routes::registration_status(approved),
                &json!({ "status": "approved" }),
                &token,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .get_with_token(
                &format!("{}?status=approved", routes::event_registrations(event_id)),
                &token,
            )
            .await;

        assert_eq!(res.status, 200);
        let rows = res.body["registrations"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"].as_i64().unwrap(), approved as i64);

        let res = app
            .get_with_token(
                &format!("{}?status=maybe", routes::event_registrations(event_id)),
                &token,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn attendance_is_recorded() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = app
            .patch_with_token(
                &routes::registration(id),
                &json!({ "attended": true }),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["attended"], true);
        assert_eq!(res.body["status"], "pending");
    }

    #[tokio::test]
    async fn attendance_must_be_boolean() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        let id = app
            .register_individual(event_id, "asha@club.test", "R1")
            .await;

        let res = app
            .patch_with_token(
                &routes::registration(id),
                &json!({ "attended": "yes" }),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn attendance_on_unknown_registration_is_not_found() {
        let app = TestApp::spawn().await;

        let res = app
            .patch_with_token(
                &routes::registration(777_777),
                &json!({ "attended": true }),
                &app.admin_token(),
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn export_is_csv_with_header_row() {
        let app = TestApp::spawn().await;
        let event_id = app.create_event("Rust Night", None).await;
        app.register_individual(event_id, "asha@club.test", "R1")
            .await;
        let res = app
            .post_without_token(
                routes::SUBMIT,
                &team_body(event_id, "Null Pointers", ["R2", "R3", "R4"]),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .get_with_token(&routes::event_export(event_id), &app.admin_token())
            .await;

        assert_eq!(res.status, 200);
        let content_type = res.headers["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/csv"));
        let disposition = res.headers["content-disposition"].to_str().unwrap();
        assert!(disposition.contains("rust-night-registrations.csv"));

        let lines: Vec<&str> = res.text.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Name,Email,Phone,Roll,Team"));
        assert!(res.text.contains("Null Pointers"));
        assert!(res.text.contains("asha@club.test"));
    }
}
