use crate::fixtures::test_app::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn only_admins_list_and_create_users() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_get("/api/users", &team.alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_get("/api/users", &team.admin.access_token)
        .send()
        .await
        .unwrap();
    let users: Vec<Value> = resp.json().await.unwrap();
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));

    let resp = app
        .auth_post("/api/users", &team.alice.access_token)
        .json(&json!({ "name": "Eve", "email": "eve@leadflow.test", "password": "Password1!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_post("/api/users", &team.admin.access_token)
        .json(&json!({
            "name": "Second Admin",
            "email": "admin2@leadflow.test",
            "password": "Password1!",
            "role": "admin",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["role"], "admin");
}

#[tokio::test]
async fn sales_directory_lists_reps_only() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_get("/api/users/sales", &team.bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let reps: Vec<Value> = resp.json().await.unwrap();
    let mut names: Vec<&str> = reps.iter().filter_map(|r| r["name"].as_str()).collect();
    names.sort();
    assert_eq!(names, vec![team.alice.name.as_str(), team.bob.name.as_str()]);
    assert!(reps.iter().all(|r| r.get("role").is_none()));
}

#[tokio::test]
async fn users_read_themselves_but_not_others() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_get(&format!("/api/users/{}", team.bob.id), &team.bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let me: Value = resp.json().await.unwrap();
    assert_eq!(me["email"], team.bob.email);
    assert_eq!(me["notificationPreferences"]["push"]["followUps"], true);

    let resp = app
        .auth_get(&format!("/api/users/{}", team.alice.id), &team.bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn non_admin_role_changes_are_ignored() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_put(&format!("/api/users/{}", team.bob.id), &team.bob.access_token)
        .json(&json!({ "name": "Robert", "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["name"], "Robert");
    assert_eq!(updated["role"], "sales");

    let resp = app
        .auth_put(&format!("/api/users/{}", team.bob.id), &team.admin.access_token)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["role"], "admin");

    // the new role applies to the next request
    let resp = app
        .auth_get("/api/users", &team.bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn preferences_can_only_be_changed_by_their_owner() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_put(
            &format!("/api/users/{}/notification-preferences", team.bob.id),
            &team.admin.access_token,
        )
        .json(&json!({ "push": { "followUps": false } }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_deletes_others_but_not_themselves() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let resp = app
        .auth_delete(&format!("/api/users/{}", team.admin.id), &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = app
        .auth_delete(&format!("/api/users/{}", team.alice.id), &team.bob.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = app
        .auth_delete(&format!("/api/users/{}", team.alice.id), &team.admin.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // a deleted user's token stops working
    let resp = app
        .auth_get("/api/auth/me", &team.alice.access_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}
