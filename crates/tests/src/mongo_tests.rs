//! Storage behaviour that only MongoDB can show: indexes, query operators and
//! BSON round-trips. Run with `cargo test -- --ignored` against a live server.

use crate::fixtures::test_app::TestApp;
use bson::Document;
use leadflow_services::dao::base::DaoError;
use leadflow_services::testing::RecordingGateway;
use serde_json::{Value, json};
use std::time::Duration;

const NEEDS_MONGO: &str = "requires MongoDB (LEADFLOW__DATABASE__URL)";

#[tokio::test]
#[ignore = "requires MongoDB (LEADFLOW__DATABASE__URL)"]
async fn indexes_are_created_and_enforce_unique_email() {
    let app = TestApp::spawn_mongo().await;
    let db = app.db.as_ref().expect(NEEDS_MONGO);

    let names = db
        .collection::<Document>("users")
        .list_index_names()
        .await
        .unwrap();
    assert!(names.iter().any(|n| n.starts_with("email")));
    let names = db
        .collection::<Document>("notifications")
        .list_index_names()
        .await
        .unwrap();
    assert!(names.len() > 1);

    let user = app
        .register_user("Ada Admin", "admin@leadflow.test", "Admin123!")
        .await;
    let mut copy = app.backends.users.find_by_id(user.object_id()).await.unwrap();
    copy.id = None;
    let err = app.backends.users.insert(&copy).await.unwrap_err();
    assert!(matches!(err, DaoError::DuplicateKey(_)));
}

#[tokio::test]
#[ignore = "requires MongoDB (LEADFLOW__DATABASE__URL)"]
async fn search_is_case_insensitive_and_literal() {
    let app = TestApp::spawn_mongo().await;
    let team = app.seed_team().await;
    for (name, company) in [("Acme Corp", "Acme"), ("Abc Ltd", "Abc"), ("Globex", "A.c Holdings")] {
        app.create_lead(
            &team.admin.access_token,
            json!({ "name": name, "company": company }),
        )
        .await;
    }

    let resp = app
        .auth_get("/api/leads?search=ACME", &team.admin.access_token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Acme Corp");

    // matches on company too, and `.` is not a wildcard
    let resp = app
        .auth_get("/api/leads?search=a.c", &team.admin.access_token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Globex");
}

#[tokio::test]
#[ignore = "requires MongoDB (LEADFLOW__DATABASE__URL)"]
async fn stage_dates_survive_storage() {
    let app = TestApp::spawn_mongo().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.alice.access_token,
            json!({
                "name": "Acme Corp",
                "leadQualified": { "meetingDate": "2026-11-02" },
            }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_get(&format!("/api/leads/{lead_id}"), &team.alice.access_token)
        .send()
        .await
        .unwrap();
    let stored: Value = resp.json().await.unwrap();
    let meeting = stored["leadQualified"]["meetingDate"].as_str().unwrap();
    assert!(meeting.starts_with("2026-11-02"), "got {meeting}");
    assert_eq!(stored["createdAt"], lead["createdAt"]);
}

#[tokio::test]
#[ignore = "requires MongoDB (LEADFLOW__DATABASE__URL)"]
async fn notifications_list_newest_first_and_cascade_with_their_lead() {
    let app = TestApp::spawn_mongo().await;
    let team = app.seed_team().await;
    let mut ids = Vec::new();
    for name in ["First", "Second", "Third"] {
        let lead = app
            .create_lead(
                &team.admin.access_token,
                json!({ "name": name, "assignedTo": team.bob.id }),
            )
            .await;
        ids.push(lead["id"].as_str().unwrap().to_string());
    }

    let inbox = app.notifications(&team.bob).await;
    let names: Vec<&str> = inbox
        .iter()
        .filter_map(|n| n["relatedLead"]["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);

    let resp = app
        .auth_delete(&format!("/api/leads/{}", ids[2]), &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(app.unread_count(&team.bob).await, 2);
}

#[tokio::test]
#[ignore = "requires MongoDB (LEADFLOW__DATABASE__URL)"]
async fn invalid_tokens_are_pulled_from_the_user_document() {
    let app = TestApp::spawn_mongo_with_gateway(
        RecordingGateway::new().with_invalid_tokens(["stale-token"]),
    )
    .await;
    let team = app.seed_team().await;
    app.register_device(&team.bob, "stale-token").await;
    app.register_device(&team.alice, "alice-device").await;

    app.create_lead(
        &team.admin.access_token,
        json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
    )
    .await;

    assert_eq!(app.push.wait_for(1, Duration::from_secs(2)).await.len(), 1);
    let tokens = app.wait_for_tokens(&team.bob, |t| t.is_empty()).await;
    assert!(tokens.is_empty());
    assert_eq!(app.stored_tokens(&team.alice).await, vec!["alice-device"]);
}
