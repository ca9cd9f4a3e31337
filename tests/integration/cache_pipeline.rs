use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use storage_agent::bindings::CacheDispatch;
use storage_agent::hub::HubConfig;
use storage_agent::models::{CollectorStateEvent, RunState};
use storage_agent::subscriptions::Subscriptions;
use storage_agent::{AgentBus, CacheStore, Payload, WsHub, topics};
use tokio_util::sync::CancellationToken;

use crate::helpers::{array_status, disks, system_info, wait_until, within};

#[tokio::test]
async fn test_published_values_land_in_cache() {
    let bus = Arc::new(AgentBus::new(64));
    let cache = Arc::new(CacheStore::new());
    let cancel = CancellationToken::new();
    let (hub, hub_task) = WsHub::spawn(HubConfig::default(), cancel.child_token());

    let subscriptions = Subscriptions::start(bus.clone(), cache.clone(), hub, &cancel);

    bus.publish_typed(topics::SYSTEM_UPDATE, system_info("tower"));
    bus.publish_typed(topics::ARRAY_STATUS_UPDATE, array_status("STARTED"));
    bus.publish_typed(topics::DISK_LIST_UPDATE, disks(&["disk1", "disk2"]));

    wait_until(Duration::from_secs(2), || {
        cache.system().is_some() && cache.array().is_some() && cache.disks().len() == 2
    })
    .await;

    assert_eq!(cache.system().unwrap().hostname, "tower");
    assert_eq!(cache.array().unwrap().state, "STARTED");

    // a later snapshot replaces the earlier one
    bus.publish_typed(topics::ARRAY_STATUS_UPDATE, array_status("STOPPED"));
    wait_until(Duration::from_secs(2), || {
        cache.array().is_some_and(|a| a.state == "STOPPED")
    })
    .await;

    cancel.cancel();
    within(subscriptions.join()).await;
    within(hub_task).await.unwrap();

    assert_eq!(bus.topic_count(), 0);
}

#[tokio::test]
async fn test_cache_entries_untouched_by_unrelated_topics() {
    let bus = Arc::new(AgentBus::new(64));
    let cache = Arc::new(CacheStore::new());
    let cancel = CancellationToken::new();
    let (hub, _hub_task) = WsHub::spawn(HubConfig::default(), cancel.child_token());

    let subscriptions = Subscriptions::start(bus.clone(), cache.clone(), hub, &cancel);

    // collector state changes are broadcast only, the cache has no entry for them
    let delivered = bus.publish(
        topics::COLLECTOR_STATE_CHANGE.name(),
        Payload::from(CollectorStateEvent {
            event: "collector_enabled".to_string(),
            collector: "docker".to_string(),
            enabled: true,
            status: RunState::Running,
            interval: 10,
            timestamp: Utc::now(),
        }),
    );
    assert_eq!(delivered, 1);

    bus.publish_typed(topics::SYSTEM_UPDATE, system_info("tower"));
    wait_until(Duration::from_secs(2), || cache.system().is_some()).await;

    assert_eq!(cache.populated_entries(), vec!["system"]);

    cancel.cancel();
    within(subscriptions.join()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_readers_never_see_torn_lists() {
    let cache = Arc::new(CacheStore::new());
    let dispatch = Arc::new(CacheDispatch::default());

    let writer = {
        let cache = cache.clone();
        let dispatch = dispatch.clone();
        tokio::spawn(async move {
            for len in 1..=200usize {
                let names: Vec<String> = (0..len).map(|i| format!("disk{i}")).collect();
                let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                assert!(dispatch.apply(&cache, Payload::from(disks(&refs))));
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move {
                let mut last = 0;
                for _ in 0..500 {
                    let list = cache.disks();
                    // every snapshot is complete and lists only grow
                    assert!(list.len() >= last);
                    for (i, disk) in list.iter().enumerate() {
                        assert_eq!(disk.name, format!("disk{i}"));
                    }
                    last = list.len();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    within(writer).await.unwrap();
    for reader in readers {
        within(reader).await.unwrap();
    }

    assert_eq!(cache.disks().len(), 200);
}
