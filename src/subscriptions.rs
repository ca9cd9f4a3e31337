//! Bus consumers: the cache subscriber and the WebSocket broadcast loop
//!
//! Both mailboxes are subscribed inside [`Subscriptions::start`] before any task is spawned,
//! so nothing published after `start` returns can be missed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace};

use crate::bindings::{broadcast_topic_names, CacheDispatch};
use crate::bus::Mailbox;
use crate::cache::CacheStore;
use crate::events::{AgentBus, Payload};
use crate::hub::WsHub;

/// Running bus consumers
#[derive(Debug)]
pub struct Subscriptions {
    cache_task: JoinHandle<()>,
    broadcast_task: JoinHandle<()>,
}

impl Subscriptions {
    /// Subscribe both loops and spawn them
    ///
    /// Both stop when `cancel` fires and detach their mailbox from the bus on the way out.
    pub fn start(
        bus: Arc<AgentBus>,
        cache: Arc<CacheStore>,
        hub: WsHub,
        cancel: &CancellationToken,
    ) -> Self {
        let dispatch = CacheDispatch::default();
        let cache_mailbox = bus.subscribe(dispatch.topics());

        let broadcast_topics = broadcast_topic_names();
        let broadcast_mailbox = bus.subscribe(&broadcast_topics);

        info!(
            cache_topics = dispatch.topics().len(),
            broadcast_topics = broadcast_topics.len(),
            "bus subscriptions ready"
        );

        let cache_task = tokio::spawn(cache_loop(
            bus.clone(),
            cache_mailbox,
            dispatch,
            cache,
            cancel.child_token(),
        ));
        let broadcast_task = tokio::spawn(broadcast_loop(
            bus,
            broadcast_mailbox,
            hub,
            cancel.child_token(),
        ));

        Self {
            cache_task,
            broadcast_task,
        }
    }

    /// Named handles of both loops
    pub fn into_tasks(self) -> [(&'static str, JoinHandle<()>); 2] {
        [
            ("cache_subscriber", self.cache_task),
            ("ws_broadcast", self.broadcast_task),
        ]
    }

    /// Wait for both loops to finish
    pub async fn join(self) {
        if let Err(e) = self.cache_task.await {
            debug!("cache subscriber ended abnormally: {e}");
        }
        if let Err(e) = self.broadcast_task.await {
            debug!("broadcast loop ended abnormally: {e}");
        }
    }
}

/// Apply every message from `mailbox` to the cache until cancelled
#[instrument(skip_all, name = "cache_subscriber")]
pub async fn cache_loop(
    bus: Arc<AgentBus>,
    mut mailbox: Mailbox<Payload>,
    dispatch: CacheDispatch,
    cache: Arc<CacheStore>,
    cancel: CancellationToken,
) {
    debug!("starting cache subscriber");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = mailbox.recv() => match msg {
                Some(payload) => {
                    dispatch.apply(&cache, payload);
                }
                None => break,
            },
        }
    }

    bus.unsubscribe(&mailbox, &[]);
    debug!("cache subscriber stopped");
}

/// Forward every message from `mailbox` to the hub until cancelled
#[instrument(skip_all, name = "ws_broadcast")]
pub async fn broadcast_loop(
    bus: Arc<AgentBus>,
    mut mailbox: Mailbox<Payload>,
    hub: WsHub,
    cancel: CancellationToken,
) {
    debug!("starting websocket broadcast loop");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            msg = mailbox.recv() => match msg {
                Some(payload) => {
                    if !hub.broadcast(payload) {
                        trace!("event not handed to hub");
                    }
                }
                None => break,
            },
        }
    }

    bus.unsubscribe(&mailbox, &[]);
    debug!("websocket broadcast loop stopped");
}
