//! Integration tests for the REST chat operations: connect, disconnect,
//! send-message, admin commands and log inspection.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

use chathub_server::chat::ChatService;
use chathub_server::sink::LogSink;

/// Helper: start the server on a random port and return its base URL.
async fn start_test_server() -> String {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = chathub_server::state::AppState {
        chat: Arc::new(ChatService::new(Arc::new(LogSink), "admin")),
        subscribers: chathub_server::ws::new_subscriber_registry(),
        stream_buffer: 64,
        shutdown: shutdown_rx,
    };

    let app = chathub_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
        let _keep = shutdown_tx;
    });

    format!("http://{}", addr)
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> Value {
    let resp = client.post(url).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

async fn connect(client: &reqwest::Client, base_url: &str, username: &str) -> Value {
    post(
        client,
        format!("{}/api/chat/connect", base_url),
        json!({ "username": username }),
    )
    .await
}

async fn send(client: &reqwest::Client, base_url: &str, token: &str, text: &str) -> Value {
    post(
        client,
        format!("{}/api/chat/send", base_url),
        json!({ "user_token": token, "text": text }),
    )
    .await
}

async fn actions(client: &reqwest::Client, base_url: &str) -> Value {
    client
        .get(format!("{}/api/chat/actions", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_connect_duplicate_disconnect_then_send() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let first = connect(&client, &base_url, "alice").await;
    assert_eq!(first["status"]["is_ok"], true);
    let token = first["user_token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 32);

    let second = connect(&client, &base_url, "alice").await;
    assert_eq!(second["status"]["is_ok"], false);
    assert_eq!(
        second["status"]["error_message"],
        "User with such name already exists."
    );
    assert_eq!(second["user_token"], "");

    let bye = post(
        &client,
        format!("{}/api/chat/disconnect", base_url),
        json!({ "user_token": token }),
    )
    .await;
    assert_eq!(bye["is_ok"], true);

    let late = send(&client, &base_url, &token, "hi").await;
    assert_eq!(late["is_ok"], false);
    assert_eq!(late["error_message"], "Token is not valid.");

    let log = actions(&client, &base_url).await;
    assert_eq!(log["length"], 2);
    assert_eq!(log["actions"][0]["action_type"], "CONNECT");
    assert_eq!(log["actions"][1]["action_type"], "DISCONNECT");
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let first = connect(&client, &base_url, "bob").await;
    let token = first["user_token"].as_str().unwrap();
    post(
        &client,
        format!("{}/api/chat/disconnect", base_url),
        json!({ "user_token": token }),
    )
    .await;

    let again = connect(&client, &base_url, "bob").await;
    assert_eq!(again["status"]["is_ok"], true);
    assert_ne!(again["user_token"], first["user_token"]);
}

#[tokio::test]
async fn test_admin_kick_revokes_target() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let admin = connect(&client, &base_url, "admin").await;
    let bob = connect(&client, &base_url, "bob").await;
    let ta = admin["user_token"].as_str().unwrap();
    let tb = bob["user_token"].as_str().unwrap();

    let kicked = send(&client, &base_url, ta, r"\kick bob").await;
    assert_eq!(kicked["is_ok"], true);

    let log = actions(&client, &base_url).await;
    let entries = log["actions"].as_array().unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[2]["username"], "bob");
    assert_eq!(entries[2]["action_type"], "DISCONNECT");
    assert_eq!(entries[3]["username"], "admin");
    assert_eq!(entries[3]["action_type"], "SEND_MESSAGE");
    assert_eq!(entries[3]["payload"], r"\kick bob");

    let rejected = send(&client, &base_url, tb, "am I still here?").await;
    assert_eq!(rejected["is_ok"], false);
    assert_eq!(rejected["error_message"], "Token is not valid.");
}

#[tokio::test]
async fn test_kick_without_target_is_plain_message() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let admin = connect(&client, &base_url, "admin").await;
    let ta = admin["user_token"].as_str().unwrap();

    let sent = send(&client, &base_url, ta, r"\kick").await;
    assert_eq!(sent["is_ok"], true);

    let missing = send(&client, &base_url, ta, r"\kick nobody").await;
    assert_eq!(missing["is_ok"], false);
    assert_eq!(missing["error_message"], "User <nobody> is not connected.");

    // Both command messages are still in the history.
    let log = actions(&client, &base_url).await;
    assert_eq!(log["length"], 3);
}

#[tokio::test]
async fn test_concurrent_connects_single_winner() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let attempts: Vec<_> = (0..20)
        .map(|_| {
            let client = client.clone();
            let base_url = base_url.clone();
            tokio::spawn(async move { connect(&client, &base_url, "racer").await })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        let body = attempt.await.unwrap();
        if body["status"]["is_ok"] == true {
            winners += 1;
        } else {
            assert_eq!(
                body["status"]["error_message"],
                "User with such name already exists."
            );
        }
    }
    assert_eq!(winners, 1);

    let log = actions(&client, &base_url).await;
    assert_eq!(log["length"], 1);
}

#[tokio::test]
async fn test_actions_paging_and_stats() {
    let base_url = start_test_server().await;
    let client = reqwest::Client::new();

    let carol = connect(&client, &base_url, "carol").await;
    let token = carol["user_token"].as_str().unwrap();
    for i in 0..4 {
        send(&client, &base_url, token, &format!("msg {}", i)).await;
    }

    let all = actions(&client, &base_url).await;
    let entries = all["actions"].as_array().unwrap();
    assert_eq!(all["length"], 5);
    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry["index"], i as u64);
    }

    let tail: Value = client
        .get(format!("{}/api/chat/actions?from=3", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tail["actions"].as_array().unwrap().len(), 2);
    assert_eq!(tail["actions"][0]["payload"], "msg 2");

    let stats: Value = client
        .get(format!("{}/api/chat/stats", base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["actions"], 5);
    assert_eq!(stats["sessions"], 1);
    assert_eq!(stats["subscribers"], 0);
}

#[tokio::test]
async fn test_health() {
    let base_url = start_test_server().await;
    let body = reqwest::get(format!("{}/health", base_url))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "ok");
}
