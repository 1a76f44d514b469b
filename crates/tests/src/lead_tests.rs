use crate::fixtures::test_app::TestApp;
use leadflow_services::testing::RecordingGateway;
use serde_json::{Value, json};
use std::time::Duration;

const PUSH_WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn assigned_lead_creation_notifies_assignee_in_app_and_by_push() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    app.register_device(&team.bob, "bob-device-1").await;

    let lead = app
        .create_lead(
            &team.alice.access_token,
            json!({ "name": "Acme Corp", "company": "Acme", "assignedTo": team.bob.id }),
        )
        .await;
    assert_eq!(lead["name"], "Acme Corp");
    assert_eq!(lead["status"], "cold");
    assert_eq!(lead["assignedTo"], team.bob.id);
    assert_eq!(lead["createdBy"], team.alice.id);
    let lead_id = lead["id"].as_str().unwrap();

    let inbox = app.notifications(&team.bob).await;
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["type"], "leadAssignment");
    assert_eq!(
        inbox[0]["message"],
        "A new lead (Acme Corp) has been assigned to you"
    );
    assert_eq!(inbox[0]["read"], false);
    assert_eq!(inbox[0]["relatedLead"]["id"], lead_id);
    assert_eq!(inbox[0]["relatedLead"]["name"], "Acme Corp");

    let sent = app.push.wait_for(1, PUSH_WAIT).await;
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].multicast);
    let payload = &sent[0].payload;
    assert_eq!(payload["token"], "bob-device-1");
    assert_eq!(payload["notification"]["title"], "New Lead Assigned");
    assert_eq!(payload["data"]["type"], "leadAssignment");
    assert_eq!(payload["data"]["leadId"], lead_id);
    assert_eq!(payload["data"]["click_action"], "FLUTTER_NOTIFICATION_CLICK");

    assert!(app.notifications(&team.alice).await.is_empty());
}

#[tokio::test]
async fn self_assigned_or_unassigned_leads_notify_nobody() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    app.register_device(&team.alice, "alice-device").await;

    app.create_lead(
        &team.alice.access_token,
        json!({ "name": "Mine", "assignedTo": team.alice.id }),
    )
    .await;
    app.create_lead(&team.alice.access_token, json!({ "name": "Nobody's" }))
        .await;

    assert_eq!(app.unread_count(&team.alice).await, 0);
    assert!(app.push.wait_for(1, Duration::from_millis(200)).await.is_empty());
}

#[tokio::test]
async fn invalid_lead_is_rejected_and_dispatches_nothing() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    app.register_device(&team.bob, "bob-device-1").await;

    for body in [
        json!({ "name": "Acme Corp", "email": "not-an-email", "assignedTo": team.bob.id }),
        json!({ "company": "No Name Inc", "assignedTo": team.bob.id }),
        json!({ "name": "Acme Corp", "value": -5, "assignedTo": team.bob.id }),
        json!({ "name": "Acme Corp", "suspect": { "jobUrl": "ftp://x" }, "assignedTo": team.bob.id }),
    ] {
        let resp = app
            .auth_post("/api/leads", &team.alice.access_token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 422, "body: {body}");
    }

    assert_eq!(app.unread_count(&team.bob).await, 0);
    assert!(app.push.wait_for(1, Duration::from_millis(200)).await.is_empty());
}

#[tokio::test]
async fn assigning_to_unknown_user_is_unprocessable() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_post("/api/leads", &team.alice.access_token)
        .json(&json!({ "name": "Ghost Lead", "assignedTo": bson::oid::ObjectId::new().to_hex() }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn status_change_by_admin_notifies_assignee() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.admin.access_token)
        .json(&json!({ "status": "hot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "hot");

    let inbox = app.notifications(&team.bob).await;
    assert_eq!(inbox.len(), 2);
    // newest first
    assert_eq!(inbox[0]["type"], "leadUpdate");
    assert_eq!(
        inbox[0]["message"],
        "Lead Acme Corp status changed from cold to hot"
    );

    // same status again is not a change
    app.auth_put(&format!("/api/leads/{lead_id}"), &team.admin.access_token)
        .json(&json!({ "status": "hot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(app.notifications(&team.bob).await.len(), 2);
}

#[tokio::test]
async fn assignee_updating_own_lead_is_not_notified() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.bob.access_token)
        .json(&json!({ "status": "warm", "notes": "Called twice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    assert_eq!(app.notifications(&team.bob).await.len(), 1);
}

#[tokio::test]
async fn status_and_reassignment_fire_independently() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.admin.access_token)
        .json(&json!({ "status": "warm", "assignedTo": team.alice.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let inbox = app.notifications(&team.alice).await;
    let mut kinds: Vec<&str> = inbox.iter().filter_map(|n| n["type"].as_str()).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["leadAssignment", "leadUpdate"]);
    // the previous assignee hears nothing more
    assert_eq!(app.notifications(&team.bob).await.len(), 1);
}

#[tokio::test]
async fn unassigning_with_null_clears_the_assignee() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.admin.access_token)
        .json(&json!({ "assignedTo": null }))
        .send()
        .await
        .unwrap();
    let updated: Value = resp.json().await.unwrap();
    assert!(updated["assignedTo"].is_null());
}

#[tokio::test]
async fn stage_records_merge_field_by_field() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.alice.access_token,
            json!({
                "name": "Acme Corp",
                "suspect": { "leadSource": "upwork", "jobUrl": "https://upwork.com/job/1" },
            }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();
    assert_eq!(lead["suspect"]["leadSource"], "upwork");

    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.alice.access_token)
        .json(&json!({
            "suspect": { "leadSource": "linkedin" },
            "leadQualified": { "interestedServices": ["mvp", "ui/ux"], "meetingDate": "2026-11-02" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["suspect"]["leadSource"], "linkedin");
    assert_eq!(updated["suspect"]["jobUrl"], "https://upwork.com/job/1");
    assert_eq!(
        updated["leadQualified"]["interestedServices"],
        json!(["mvp", "ui/ux"])
    );
    assert_eq!(updated["leadQualified"]["budgetCurrency"], "USD");

    // creating a deal record needs its outcome
    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.alice.access_token)
        .json(&json!({ "deal": { "finalDealValue": 1000 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn only_assignee_or_admin_may_update_an_assigned_lead() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_put(&format!("/api/leads/{lead_id}"), &team.alice.access_token)
        .json(&json!({ "status": "hot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let missing = bson::oid::ObjectId::new().to_hex();
    let resp = app
        .auth_put(&format!("/api/leads/{missing}"), &team.admin.access_token)
        .json(&json!({ "status": "hot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_put("/api/leads/not-an-id", &team.admin.access_token)
        .json(&json!({ "status": "hot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn delete_requires_admin_and_cascades_notifications() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();
    assert_eq!(app.notifications(&team.bob).await.len(), 1);

    let resp = app
        .auth_delete(&format!("/api/leads/{lead_id}"), &team.bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let missing = bson::oid::ObjectId::new().to_hex();
    let resp = app
        .auth_delete(&format!("/api/leads/{missing}"), &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = app
        .auth_delete(&format!("/api/leads/{lead_id}"), &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);

    assert!(app.notifications(&team.bob).await.is_empty());
    let resp = app
        .auth_get(&format!("/api/leads/{lead_id}"), &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn activities_notify_and_can_be_completed_and_removed() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_post(
            &format!("/api/leads/{lead_id}/activities"),
            &team.admin.access_token,
        )
        .json(&json!({
            "type": "follow-up",
            "description": "Send the proposal",
            "dueDate": "2026-11-01",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    let activities = updated["activities"].as_array().unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["type"], "follow-up");
    assert_eq!(activities[0]["completed"], false);
    let activity_id = activities[0]["id"].as_str().unwrap().to_string();

    let inbox = app.notifications(&team.bob).await;
    assert_eq!(inbox[0]["type"], "activity");
    assert_eq!(
        inbox[0]["message"],
        "Follow-up for lead Acme Corp is scheduled for 2026-11-01"
    );

    let resp = app
        .auth_put(
            &format!("/api/leads/{lead_id}/activities/{activity_id}"),
            &team.bob.access_token,
        )
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["activities"][0]["completed"], true);
    assert!(updated["activities"][0]["completedAt"].is_string());

    let resp = app
        .auth_delete(
            &format!("/api/leads/{lead_id}/activities/{activity_id}"),
            &team.bob.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert!(updated["activities"].as_array().unwrap().is_empty());

    let resp = app
        .auth_delete(
            &format!("/api/leads/{lead_id}/activities/{activity_id}"),
            &team.bob.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn blank_activity_description_is_unprocessable() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(&team.alice.access_token, json!({ "name": "Acme Corp" }))
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let resp = app
        .auth_post(
            &format!("/api/leads/{lead_id}/activities"),
            &team.alice.access_token,
        )
        .json(&json!({ "type": "call", "description": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);

    let resp = app
        .auth_post(
            &format!("/api/leads/{lead_id}/activities"),
            &team.alice.access_token,
        )
        .json(&json!({ "type": "smoke-signal", "description": "Puff" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn sales_reps_only_list_their_own_leads() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    for (name, assignee, status) in [
        ("Acme Corp", &team.bob.id, "hot"),
        ("Globex", &team.bob.id, "cold"),
        ("Initech", &team.alice.id, "warm"),
    ] {
        app.create_lead(
            &team.admin.access_token,
            json!({ "name": name, "assignedTo": assignee, "status": status }),
        )
        .await;
    }

    let resp = app
        .auth_get("/api/leads", &team.bob.access_token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 2);

    // a rep cannot widen the filter to someone else's leads
    let resp = app
        .auth_get(
            &format!("/api/leads?assignedTo={}", team.alice.id),
            &team.bob.access_token,
        )
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 2);

    let resp = app
        .auth_get("/api/leads?sort=name", &team.admin.access_token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    let names: Vec<&str> = page["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Acme Corp", "Globex", "Initech"]);

    let resp = app
        .auth_get("/api/leads?status=hot&search=acme", &team.admin.access_token)
        .send()
        .await
        .unwrap();
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);

    let resp = app
        .auth_get("/api/leads?sort=passwordHash", &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn lead_visibility_is_limited_to_admin_assignee_and_creator() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    let lead = app
        .create_lead(
            &team.admin.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;
    let lead_id = lead["id"].as_str().unwrap();

    let status = |token: String| {
        let req = app.auth_get(&format!("/api/leads/{lead_id}"), &token);
        async move { req.send().await.unwrap().status().as_u16() }
    };
    assert_eq!(status(team.bob.access_token.clone()).await, 200);
    assert_eq!(status(team.admin.access_token.clone()).await, 200);
    assert_eq!(status(team.alice.access_token.clone()).await, 403);
}

#[tokio::test]
async fn invalid_device_tokens_are_pruned_after_delivery() {
    let app = TestApp::spawn_with_gateway(
        RecordingGateway::new().with_invalid_tokens(["stale-token"]),
    )
    .await;
    let team = app.seed_team().await;
    app.register_device(&team.bob, "stale-token").await;
    assert_eq!(app.stored_tokens(&team.bob).await, vec!["stale-token"]);

    app.create_lead(
        &team.alice.access_token,
        json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
    )
    .await;

    assert_eq!(app.push.wait_for(1, PUSH_WAIT).await.len(), 1);
    let tokens = app.wait_for_tokens(&team.bob, |t| t.is_empty()).await;
    assert!(tokens.is_empty());
    // in-app delivery is unaffected
    assert_eq!(app.unread_count(&team.bob).await, 1);
}

#[tokio::test]
async fn push_transport_failure_keeps_tokens_and_the_request_succeeds() {
    let app = TestApp::spawn_with_gateway(RecordingGateway::new().failing()).await;
    let team = app.seed_team().await;
    app.register_device(&team.bob, "bob-device-1").await;

    app.create_lead(
        &team.alice.access_token,
        json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
    )
    .await;

    app.push.wait_for(1, PUSH_WAIT).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(app.stored_tokens(&team.bob).await, vec!["bob-device-1"]);
    assert_eq!(app.unread_count(&team.bob).await, 1);
}

#[tokio::test]
async fn out_of_range_page_returns_an_empty_page() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;
    app.create_lead(
        &team.admin.access_token,
        json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
    )
    .await;

    let resp = app
        .auth_get(
            &format!("/api/leads?page={}", u64::MAX),
            &team.admin.access_token,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let page: Value = resp.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert!(page["items"].as_array().unwrap().is_empty());
}
