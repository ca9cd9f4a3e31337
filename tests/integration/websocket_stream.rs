use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use serde_json::Value;
use storage_agent::{Agent, topics};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::helpers::{array_status, system_info, test_config, wait_until, within};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_agent() -> Agent {
    Agent::builder(test_config())
        .without_system_collector()
        .start()
        .await
        .unwrap()
}

async fn connect(agent: &Agent, expected_clients: usize) -> Client {
    let url = format!("ws://{}/api/v1/ws", agent.addr());
    let (client, _) = within(connect_async(url)).await.unwrap();

    let registry = agent.hub().registry().clone();
    wait_until(Duration::from_secs(2), || {
        registry.client_count() == expected_clients
    })
    .await;
    client
}

/// Next text frame as JSON, skipping control frames
async fn next_event(client: &mut Client) -> Value {
    loop {
        let msg = within(client.next()).await.unwrap().unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn test_client_receives_event_envelope() {
    let agent = start_agent().await;
    let mut client = connect(&agent, 1).await;

    agent
        .bus()
        .publish_typed(topics::SYSTEM_UPDATE, system_info("tower"));

    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "system_update");
    assert_eq!(event["data"]["hostname"], "tower");
    assert!(event["timestamp"].as_str().is_some());

    agent.shutdown().await;
}

#[tokio::test]
async fn test_subscribe_frame_narrows_stream() {
    let agent = start_agent().await;
    let mut client = connect(&agent, 1).await;

    client
        .send(Message::Text(
            r#"{"subscribe":["array_status_update"]}"#.to_string(),
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    agent
        .bus()
        .publish_typed(topics::SYSTEM_UPDATE, system_info("ignored"));
    agent
        .bus()
        .publish_typed(topics::ARRAY_STATUS_UPDATE, array_status("STARTED"));

    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "array_status_update");
    assert_eq!(event["data"]["state"], "STARTED");

    // back to everything
    client
        .send(Message::Text(r#"{"subscribe":null}"#.to_string()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    agent
        .bus()
        .publish_typed(topics::SYSTEM_UPDATE, system_info("seen"));
    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "system_update");
    assert_eq!(event["data"]["hostname"], "seen");

    agent.shutdown().await;
}

#[tokio::test]
async fn test_malformed_control_frame_keeps_connection() {
    let agent = start_agent().await;
    let mut client = connect(&agent, 1).await;

    client
        .send(Message::Text("definitely not json".to_string()))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(agent.hub().registry().client_count(), 1);

    agent
        .bus()
        .publish_typed(topics::ARRAY_STATUS_UPDATE, array_status("STARTED"));
    let event = next_event(&mut client).await;
    assert_eq!(event["event"], "array_status_update");

    agent.shutdown().await;
}

#[tokio::test]
async fn test_clients_have_independent_filters() {
    let agent = start_agent().await;
    let mut arrays = connect(&agent, 1).await;
    let mut everything = connect(&agent, 2).await;

    arrays
        .send(Message::Text(
            r#"{"subscribe":["array_status_update"]}"#.to_string(),
        ))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    agent
        .bus()
        .publish_typed(topics::SYSTEM_UPDATE, system_info("tower"));
    agent
        .bus()
        .publish_typed(topics::ARRAY_STATUS_UPDATE, array_status("STOPPED"));

    assert_eq!(next_event(&mut everything).await["event"], "system_update");
    assert_eq!(
        next_event(&mut everything).await["event"],
        "array_status_update"
    );
    assert_eq!(next_event(&mut arrays).await["event"], "array_status_update");

    agent.shutdown().await;
}

#[tokio::test]
async fn test_client_close_unregisters() {
    let agent = start_agent().await;
    let mut client = connect(&agent, 1).await;

    client.close(None).await.unwrap();

    let registry = agent.hub().registry().clone();
    wait_until(Duration::from_secs(2), || registry.client_count() == 0).await;

    agent.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_socket() {
    let agent = start_agent().await;
    let mut client = connect(&agent, 1).await;

    let shutdown = tokio::spawn(agent.shutdown());

    // the stream ends with a close frame or a plain end of stream
    let closed = within(async {
        loop {
            match client.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break true,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed);

    within(shutdown).await.unwrap();
}

#[tokio::test]
async fn test_client_without_pongs_is_dropped() {
    let mut config = test_config();
    config.websocket.ping_interval_secs = 1;
    config.websocket.read_timeout_secs = 2;
    let agent = Agent::builder(config)
        .without_system_collector()
        .start()
        .await
        .unwrap();
    let registry = agent.hub().registry().clone();

    // never polled, so it never answers a ping
    let silent = connect(&agent, 1).await;
    let mut live = connect(&agent, 2).await;

    let reader = tokio::spawn(async move {
        let mut pings = 0;
        while let Some(Ok(msg)) = live.next().await {
            if matches!(msg, Message::Ping(_)) {
                pings += 1;
                if pings == 3 {
                    break;
                }
            }
        }
        (pings, live)
    });

    wait_until(Duration::from_secs(4), || registry.client_count() == 1).await;

    let (pings, live) = tokio::time::timeout(Duration::from_secs(5), reader)
        .await
        .expect("pings not received in time")
        .unwrap();
    assert_eq!(pings, 3);
    assert_eq!(registry.client_count(), 1);

    drop(silent);
    drop(live);
    agent.shutdown().await;
}
