use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use storage_agent::hub::{HubConfig, WsEvent};
use storage_agent::subscriptions::Subscriptions;
use storage_agent::{AgentBus, CacheStore, Payload, WsHub, topics};
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

use crate::helpers::{array_status, disks, system_info, wait_until, within};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_filtered_client_only_sees_its_topics() {
    let bus = Arc::new(AgentBus::new(1024));
    let cache = Arc::new(CacheStore::new());
    let cancel = CancellationToken::new();
    let config = HubConfig {
        client_buffer: 1024,
        broadcast_buffer: 1024,
        ..Default::default()
    };
    let (hub, hub_task) = WsHub::spawn(config, cancel.child_token());
    let subscriptions = Subscriptions::start(bus.clone(), cache, hub.clone(), &cancel);

    let mut everything = hub.registry().register().unwrap();
    let mut arrays = hub.registry().register().unwrap();
    arrays
        .filter
        .set(Some(vec![topics::ARRAY_STATUS_UPDATE.name().to_string()]));

    let noise = {
        let bus = bus.clone();
        tokio::spawn(async move {
            for i in 0..100 {
                bus.publish_typed(topics::SYSTEM_UPDATE, system_info(&format!("host{i}")));
                bus.publish_typed(topics::DISK_LIST_UPDATE, disks(&["disk1"]));
                tokio::task::yield_now().await;
            }
        })
    };

    for state in ["STARTED", "STOPPED", "STARTED"] {
        bus.publish_typed(topics::ARRAY_STATUS_UPDATE, array_status(state));
        tokio::task::yield_now().await;
    }
    within(noise).await.unwrap();

    let mut states = Vec::new();
    for _ in 0..3 {
        let event = within(arrays.outbound.recv()).await.unwrap();
        assert_eq!(event.event, "array_status_update");
        let Payload::ArrayStatus(status) = &event.data else {
            panic!("unexpected payload for {}", event.event);
        };
        states.push(status.state.clone());
    }
    assert_eq!(states, vec!["STARTED", "STOPPED", "STARTED"]);

    // unfiltered client gets all 203 events
    wait_until(Duration::from_secs(2), || {
        hub.registry().stats().delivered >= 206
    })
    .await;
    let mut received = 0;
    while everything.outbound.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 203);
    assert!(matches!(arrays.outbound.try_recv(), Err(TryRecvError::Empty)));

    cancel.cancel();
    within(subscriptions.join()).await;
    within(hub_task).await.unwrap();
}

#[tokio::test]
async fn test_evicted_client_does_not_block_others() {
    let cancel = CancellationToken::new();
    let config = HubConfig {
        client_buffer: 2,
        ..Default::default()
    };
    let (hub, _task) = WsHub::spawn(config, cancel.clone());

    let stuck = hub.registry().register().unwrap();
    let mut draining = hub.registry().register().unwrap();

    for i in 0..10 {
        assert!(hub.broadcast(Payload::from(system_info(&format!("host{i}")))));
        let event = within(draining.outbound.recv()).await.unwrap();
        let Payload::System(info) = &event.data else {
            panic!("unexpected payload for {}", event.event);
        };
        assert_eq!(info.hostname, format!("host{i}"));
    }

    assert!(!hub.registry().contains(stuck.id));
    assert!(hub.registry().contains(draining.id));
    assert_eq!(hub.registry().stats().evicted, 1);

    cancel.cancel();
}

#[tokio::test]
async fn test_shutdown_closes_clients_and_rejects_new_ones() {
    let cancel = CancellationToken::new();
    let (hub, task) = WsHub::spawn(HubConfig::default(), cancel.clone());
    let mut client = hub.registry().register().unwrap();

    assert!(hub.broadcast_event(WsEvent::new(Payload::from(array_status("STARTED")))));
    assert_eq!(
        within(client.outbound.recv()).await.unwrap().event,
        "array_status_update"
    );

    cancel.cancel();
    within(task).await.unwrap();

    assert_eq!(within(client.outbound.recv()).await.map(|e| e.event), None);
    assert!(hub.registry().is_closed());
    assert!(hub.registry().register().is_none());
}
