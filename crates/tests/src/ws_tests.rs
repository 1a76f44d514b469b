use crate::fixtures::test_app::TestApp;
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(app: &TestApp, token: &str) -> Socket {
    let (socket, _) = tokio_tungstenite::connect_async(app.ws_url(token))
        .await
        .expect("WS connect failed");
    socket
}

async fn send(socket: &mut Socket, frame: Value) {
    socket
        .send(Message::Text(frame.to_string().into()))
        .await
        .unwrap();
}

/// Next text frame, skipping protocol frames.
async fn next_frame(socket: &mut Socket) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("Timeout waiting for WS message")
            .unwrap()
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

#[tokio::test]
async fn joined_assignee_receives_notification_frames() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let mut bob = connect(&app, &team.bob.access_token).await;
    send(&mut bob, json!({ "type": "join", "data": team.bob.id })).await;
    let joined = next_frame(&mut bob).await;
    assert_eq!(joined["type"], "joined");
    assert_eq!(joined["data"]["room"], team.bob.id);

    let lead = app
        .create_lead(
            &team.alice.access_token,
            json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
        )
        .await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(frame["type"], "notification");
    assert_eq!(frame["data"]["type"], "leadAssignment");
    assert_eq!(frame["data"]["recipient"], team.bob.id);
    assert_eq!(frame["data"]["relatedLead"]["id"], lead["id"]);

    // the pushed view matches what the inbox returns
    let inbox = app.notifications(&team.bob).await;
    assert_eq!(frame["data"]["id"], inbox[0]["id"]);
}

#[tokio::test]
async fn join_accepts_object_payload() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let mut alice = connect(&app, &team.alice.access_token).await;
    send(
        &mut alice,
        json!({ "type": "join", "data": { "userId": team.alice.id } }),
    )
    .await;
    assert_eq!(next_frame(&mut alice).await["type"], "joined");

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    let health: Value = resp.json().await.unwrap();
    assert_eq!(health["connections"], 1);
}

#[tokio::test]
async fn joining_someone_elses_room_is_refused() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let mut alice = connect(&app, &team.alice.access_token).await;
    send(&mut alice, json!({ "type": "join", "data": team.bob.id })).await;
    let frame = next_frame(&mut alice).await;
    assert_eq!(frame["type"], "error");

    app.create_lead(
        &team.admin.access_token,
        json!({ "name": "Acme Corp", "assignedTo": team.bob.id }),
    )
    .await;

    // alice sees nothing of bob's notification
    send(&mut alice, json!({ "type": "ping" })).await;
    assert_eq!(next_frame(&mut alice).await["type"], "pong");
}

#[tokio::test]
async fn malformed_frames_get_an_error_reply() {
    let app = TestApp::spawn().await;
    let team = app.seed_team().await;

    let mut bob = connect(&app, &team.bob.access_token).await;
    bob.send(Message::Text("not json".into())).await.unwrap();
    assert_eq!(next_frame(&mut bob).await["type"], "error");

    send(&mut bob, json!({ "type": "join", "data": 42 })).await;
    assert_eq!(next_frame(&mut bob).await["type"], "error");
}

#[tokio::test]
async fn upgrade_without_valid_token_is_rejected() {
    let app = TestApp::spawn().await;

    let result = tokio_tungstenite::connect_async(app.ws_url("bogus")).await;
    assert!(result.is_err());
}
