//! Full gateway over TCP: real joke-store process, real accounts client.

#![cfg(unix)]

use jokes_core::{GatewayConfig, Joke, JokeCollection, RawConfig, SuccessPolicy};
use jokes_server::{bind, AppState};
use jokes_test_utils::FakeStore;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use tokio::sync::oneshot;
use reqwest::StatusCode;
use warp::Filter;

/// Accounts service that only accepts `Bearer root`
fn fake_accounts() -> SocketAddr {
    let admin = warp::path!("admin")
        .and(warp::header::optional::<String>("authorization"))
        .map(|auth: Option<String>| {
            let status = if auth.as_deref() == Some("Bearer root") {
                warp::http::StatusCode::OK
            } else {
                warp::http::StatusCode::FORBIDDEN
            };
            warp::reply::with_status("", status)
        });
    let (addr, server) = warp::serve(admin).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn config(store: &FakeStore, accounts: SocketAddr) -> GatewayConfig {
    GatewayConfig::try_from(RawConfig {
        jokes_binary: Some(store.binary().display().to_string()),
        jokes_db_path: Some(store.db_path().display().to_string()),
        accounts_service_url: Some(format!("http://{accounts}")),
        max_string_length: Some("40".to_string()),
        port: Some("0".to_string()),
        bind_address: Some("127.0.0.1".to_string()),
        success_policy: Some(store.policy().to_string()),
        command_timeout_secs: Some("10".to_string()),
        ..RawConfig::default()
    })
    .unwrap()
}

async fn start(store: &FakeStore) -> (String, oneshot::Sender<()>) {
    let config = config(store, fake_accounts());
    let (tx, rx) = oneshot::channel::<()>();
    let state = AppState::from_config(&config).unwrap();
    let (addr, server) = bind(state, config.listen, async move {
        let _ = rx.await;
    })
    .unwrap();
    tokio::spawn(server);
    (format!("http://{addr}"), tx)
}

async fn round_trip(policy: SuccessPolicy) {
    let store = FakeStore::new(policy);
    let (base, _shutdown) = start(&store).await;
    let http = reqwest::Client::new();

    let denied = http
        .post(format!("{base}/joke"))
        .bearer_auth("guest")
        .json(&serde_json::json!({"lang": "en", "text": "nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(store.contents(), "");

    let added = http
        .post(format!("{base}/joke"))
        .bearer_auth("root")
        .json(&serde_json::json!({"lang": " en ", "text": "I would tell a UDP joke, but you might not get it"}))
        .send()
        .await
        .unwrap();
    assert_eq!(added.status(), StatusCode::CREATED);
    assert_eq!(added.text().await.unwrap(), "Joke added successfully");

    let joke: Joke = http
        .get(format!("{base}/joke?preferredLang=en"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(joke, Joke::new("en", "I would tell a UDP joke, but you might n"));

    let all: JokeCollection = http
        .get(format!("{base}/jokes"))
        .bearer_auth("root")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.jokes, vec![joke.clone()]);

    let deleted = http
        .delete(format!("{base}/"))
        .bearer_auth("root")
        .json(&joke)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::OK);
    assert_eq!(store.contents(), "");

    let missing = http.get(format!("{base}/joke")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(missing.text().await.unwrap(), "Failed to get joke");
}

#[tokio::test]
async fn round_trip_with_exit_code_policy() {
    round_trip(SuccessPolicy::ExitCode).await;
}

#[tokio::test]
async fn round_trip_with_sentinel_policy() {
    round_trip(SuccessPolicy::Sentinel).await;
}

#[tokio::test]
async fn graceful_shutdown_stops_the_server() {
    let store = FakeStore::new(SuccessPolicy::ExitCode);
    let config = config(&store, fake_accounts());
    let (tx, rx) = oneshot::channel::<()>();
    let (addr, server) = bind(AppState::from_config(&config).unwrap(), config.listen, async move {
        let _ = rx.await;
    })
    .unwrap();
    let handle = tokio::spawn(server);

    tx.send(()).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(reqwest::get(format!("http://{addr}/joke")).await.is_err());
}
