//! WebSocket endpoint for real-time event streaming
//!
//! Each connection runs two tasks:
//! - **writer**: drains the client's outbound queue into the socket and sends a ping every
//!   `ping_interval`; a closed queue (unregistered, evicted or hub shutdown) sends a close
//!   frame and ends it
//! - **reader**: applies `{"subscribe": ...}` control frames to the client's topic filter and
//!   extends the read deadline on every pong; any read error, close frame or missed deadline
//!   ends it and unregisters the client

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{
    SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::{Deserialize, Deserializer};
use tokio::sync::mpsc;
use tokio::time::{Instant, interval_at, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::api::state::ApiState;
use crate::hub::{ClientId, ClientRegistration, HubRegistry, TopicFilter, WsEvent, WsHub};

/// Client → server control frame
///
/// `subscribe` absent: no change. `null` or `[]`: every topic. A list: exactly those topics.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct ControlMessage {
    #[serde(default, deserialize_with = "deserialize_some")]
    pub subscribe: Option<Option<Vec<String>>>,
}

fn deserialize_some<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Apply a text frame to `filter`
///
/// Returns whether the filter changed. Frames that are not a control message are ignored.
pub fn apply_control(filter: &TopicFilter, text: &str) -> bool {
    match serde_json::from_str::<ControlMessage>(text) {
        Ok(ControlMessage {
            subscribe: Some(topics),
        }) => {
            debug!(?topics, "client updated topic filter");
            filter.set(topics);
            true
        }
        Ok(_) => false,
        Err(e) => {
            debug!("ignoring malformed control frame: {e}");
            false
        }
    }
}

/// WebSocket upgrade handler
///
/// GET /api/v1/ws
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state.hub))
}

/// Serve one client for the lifetime of its connection
pub async fn handle_websocket(socket: WebSocket, hub: WsHub) {
    let Some(ClientRegistration {
        id,
        filter,
        outbound,
    }) = hub.registry().register()
    else {
        debug!("hub closed, rejecting websocket client");
        if let Err(e) = socket.close().await {
            debug!("failed to close rejected socket: {e}");
        }
        return;
    };

    info!(client = id, "websocket client connected");

    let config = hub.config().clone();
    let registry = hub.registry().clone();
    let (sink, stream) = socket.split();

    let mut send_task = tokio::spawn(write_loop(sink, outbound, config.ping_interval, id));
    let mut recv_task = tokio::spawn(read_loop(
        stream,
        filter,
        config.read_timeout,
        registry.clone(),
        id,
    ));

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            // let the writer flush and send its close frame
            if timeout(config.drain_grace, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
    }

    registry.unregister(id);
    info!(client = id, "websocket client disconnected");
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Arc<WsEvent>>,
    ping_interval: Duration,
    id: ClientId,
) {
    let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!(client = id, "failed to send close frame: {e}");
                    }
                    break;
                };

                let text = match serde_json::to_string(&*event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(client = id, event = event.event, "failed to encode event: {e}");
                        continue;
                    }
                };

                if sink.send(Message::Text(text)).await.is_err() {
                    debug!(client = id, "websocket send failed, client disconnected");
                    break;
                }
            }

            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    debug!(client = id, "websocket ping failed, client disconnected");
                    break;
                }
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    filter: Arc<TopicFilter>,
    read_timeout: Duration,
    registry: Arc<HubRegistry>,
    id: ClientId,
) {
    let mut deadline = Instant::now() + read_timeout;

    loop {
        let msg = match timeout_at(deadline, stream.next()).await {
            Err(_) => {
                debug!(client = id, "read deadline passed without pong");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                debug!(client = id, "websocket read failed: {e}");
                break;
            }
            Ok(Some(Ok(msg))) => msg,
        };

        match msg {
            Message::Text(text) => {
                apply_control(&filter, &text);
            }
            Message::Pong(_) => {
                deadline = Instant::now() + read_timeout;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Binary(_) => {}
        }
    }

    registry.unregister(id);
}
